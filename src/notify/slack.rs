use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::notify::channel::{with_deadline, NotificationChannel};
use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    /// Override the webhook's default channel, e.g. "#ops-alerts".
    pub channel: Option<String>,
    pub username: Option<String>,
}

/// Slack incoming webhook using the attachment format so severity shows
/// as a color bar.
pub struct SlackChannel {
    config: SlackConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl SlackChannel {
    pub fn new(config: SlackConfig) -> Self {
        let enabled = !config.webhook_url.is_empty();
        if !enabled {
            log::debug!("slack channel disabled: webhook_url is required");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            enabled,
        }
    }

    fn payload(&self, message: &NotificationMessage) -> serde_json::Value {
        let mut payload = json!({
            "attachments": [{
                "color": message.color,
                "title": format!("{} {}", message.emoji, message.title),
                "text": message.body,
                "footer": message.alert_type,
                "ts": message.timestamp.timestamp(),
            }]
        });
        if let Some(channel) = &self.config.channel {
            payload["channel"] = json!(channel);
        }
        if let Some(username) = &self.config.username {
            payload["username"] = json!(username);
        }
        payload
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn channel_type(&self) -> &'static str {
        "slack"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(
        &self,
        message: &NotificationMessage,
        ctx: &OpContext,
    ) -> Result<(), ChannelError> {
        let request = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(message));

        with_deadline(ctx, async {
            let response = request
                .send()
                .await
                .map_err(|e| ChannelError::Delivery(format!("slack request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(ChannelError::Delivery(format!(
                    "slack returned status {}",
                    response.status()
                )));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Alert, AlertSeverity};

    #[test]
    fn payload_uses_severity_color() {
        let channel = SlackChannel::new(SlackConfig {
            webhook_url: "https://hooks.slack.com/services/T/B/x".to_string(),
            channel: Some("#ops".to_string()),
            username: None,
        });
        let alert = Alert::new(AlertSeverity::Critical, "health", "Down", "details");
        let payload = channel.payload(&NotificationMessage::from_alert(&alert));

        assert_eq!(payload["attachments"][0]["color"], "#ff0000");
        assert_eq!(payload["channel"], "#ops");
        assert!(payload["attachments"][0]["title"]
            .as_str()
            .unwrap()
            .contains("Down"));
    }
}
