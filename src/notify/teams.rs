use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::notify::channel::{with_deadline, NotificationChannel};
use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsConfig {
    pub webhook_url: String,
}

/// Microsoft Teams incoming webhook using the MessageCard format.
pub struct TeamsChannel {
    config: TeamsConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl TeamsChannel {
    pub fn new(config: TeamsConfig) -> Self {
        let enabled = !config.webhook_url.is_empty();
        if !enabled {
            log::debug!("teams channel disabled: webhook_url is required");
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

    fn payload(message: &NotificationMessage) -> serde_json::Value {
        json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            // Teams wants the hex color without the leading '#'.
            "themeColor": message.color.trim_start_matches('#'),
            "summary": message.title,
            "sections": [{
                "activityTitle": format!("{} {}", message.emoji, message.title),
                "activitySubtitle": format!("{} | {}", message.severity, message.alert_type),
                "text": message.body,
            }]
        })
    }
}

#[async_trait]
impl NotificationChannel for TeamsChannel {
    fn channel_type(&self) -> &'static str {
        "teams"
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
            .json(&Self::payload(message));

        with_deadline(ctx, async {
            let response = request
                .send()
                .await
                .map_err(|e| ChannelError::Delivery(format!("teams request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(ChannelError::Delivery(format!(
                    "teams returned status {}",
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
    fn card_strips_the_color_hash() {
        let alert = Alert::new(AlertSeverity::Warning, "quota", "Quota warning", "details");
        let payload = TeamsChannel::payload(&NotificationMessage::from_alert(&alert));
        assert_eq!(payload["themeColor"], "ff9500");
        assert_eq!(payload["@type"], "MessageCard");
    }
}
