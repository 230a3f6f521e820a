use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::notify::channel::{with_deadline, NotificationChannel};
use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Extra request headers, e.g. an Authorization token.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// Generic JSON webhook: the full `NotificationMessage` is POSTed as the
/// request body, leaving interpretation to the receiver.
pub struct WebhookChannel {
    config: WebhookConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Self {
        let enabled = !config.url.is_empty();
        if !enabled {
            log::debug!("webhook channel disabled: url is required");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            enabled,
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(
        &self,
        message: &NotificationMessage,
        ctx: &OpContext,
    ) -> Result<(), ChannelError> {
        let mut request = self.client.post(&self.config.url).json(message);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        with_deadline(ctx, async {
            let response = request
                .send()
                .await
                .map_err(|e| ChannelError::Delivery(format!("webhook request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(ChannelError::Delivery(format!(
                    "webhook returned status {}",
                    response.status()
                )));
            }
            Ok(())
        })
        .await
    }
}
