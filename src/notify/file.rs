use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::notify::channel::{with_deadline, NotificationChannel};
use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Text,
    /// One JSON object per line, mirroring the notification message.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: FileFormat,
}

/// Appends alerts to a local log file. Useful as an always-available
/// fallback when no network channel is configured.
pub struct FileChannel {
    config: FileConfig,
    enabled: bool,
}

impl FileChannel {
    pub fn new(config: FileConfig) -> Self {
        let enabled = !config.path.as_os_str().is_empty();
        if !enabled {
            log::debug!("file channel disabled: path is required");
        }
        Self { config, enabled }
    }

    fn render_line(&self, message: &NotificationMessage) -> Result<String, ChannelError> {
        match self.config.format {
            FileFormat::Text => Ok(format!(
                "{} {}: {} - {} [{}]\n",
                message.timestamp.to_rfc3339(),
                message.severity.as_str().to_uppercase(),
                message.title,
                message.body,
                message.alert_type
            )),
            FileFormat::Json => {
                let line = serde_json::to_string(message)
                    .map_err(|e| ChannelError::Delivery(format!("serialization failed: {}", e)))?;
                Ok(format!("{}\n", line))
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for FileChannel {
    fn channel_type(&self) -> &'static str {
        "file"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(
        &self,
        message: &NotificationMessage,
        ctx: &OpContext,
    ) -> Result<(), ChannelError> {
        let line = self.render_line(message)?;

        with_deadline(ctx, async {
            if let Some(parent) = self.config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        ChannelError::Delivery(format!("cannot create log dir: {}", e))
                    })?;
                }
            }

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.config.path)
                .await
                .map_err(|e| ChannelError::Delivery(format!("cannot open alert log: {}", e)))?;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| ChannelError::Delivery(format!("cannot append alert: {}", e)))?;
            file.flush()
                .await
                .map_err(|e| ChannelError::Delivery(format!("cannot flush alert log: {}", e)))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Alert, AlertSeverity};
    use tempfile::TempDir;

    fn message() -> NotificationMessage {
        let alert = Alert::new(
            AlertSeverity::Warning,
            "storage-usage",
            "High storage usage",
            "total is above threshold",
        );
        NotificationMessage::from_alert(&alert)
    }

    #[test]
    fn text_line_carries_level_and_type() {
        let channel = FileChannel::new(FileConfig {
            path: PathBuf::from("/tmp/alerts.log"),
            format: FileFormat::Text,
        });
        let line = channel.render_line(&message()).unwrap();
        assert!(line.contains("WARNING: High storage usage"));
        assert!(line.ends_with("[storage-usage]\n"));
    }

    #[tokio::test]
    async fn json_lines_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.jsonl");
        let channel = FileChannel::new(FileConfig {
            path: path.clone(),
            format: FileFormat::Json,
        });

        let msg = message();
        channel.send(&msg, &OpContext::unbounded()).await.unwrap();
        channel.send(&msg, &OpContext::unbounded()).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let last = contents.lines().last().unwrap();
        let parsed: NotificationMessage = serde_json::from_str(last).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn expired_deadline_cancels_the_send() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.log");
        let channel = FileChannel::new(FileConfig {
            path: path.clone(),
            format: FileFormat::Text,
        });

        let ctx = OpContext::with_timeout(std::time::Duration::ZERO);
        let err = channel.send(&message(), &ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!path.exists());
    }
}
