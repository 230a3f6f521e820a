use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};

use crate::notify::channel::{with_deadline, NotificationChannel};
use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
    /// STARTTLS when true, plain connection otherwise.
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// SMTP delivery via lettre. The transport is built per send; alert
/// volume is low enough that connection reuse is not worth the state.
pub struct EmailChannel {
    config: EmailConfig,
    enabled: bool,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        let enabled = !config.smtp_host.is_empty()
            && !config.from.is_empty()
            && !config.to.is_empty();
        if !enabled {
            log::debug!("email channel disabled: smtp_host, from and to are all required");
        }
        Self { config, enabled }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| ChannelError::Config(format!("smtp relay setup failed: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };

        let mut builder = builder.port(self.config.smtp_port);
        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }

    fn render_subject(message: &NotificationMessage) -> String {
        format!("[{}] {}", message.severity, message.title)
    }

    fn render_body(message: &NotificationMessage) -> String {
        format!(
            "{} {}\n\nSeverity: {}\nCategory: {}\nTime: {}\n\n{}\n",
            message.emoji,
            message.title,
            message.severity,
            message.alert_type,
            message.timestamp.to_rfc3339(),
            message.body
        )
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn channel_type(&self) -> &'static str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(
        &self,
        message: &NotificationMessage,
        ctx: &OpContext,
    ) -> Result<(), ChannelError> {
        let from = self
            .config
            .from
            .parse()
            .map_err(|e| ChannelError::Config(format!("invalid from address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(Self::render_subject(message))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.config.to {
            let to = recipient
                .parse()
                .map_err(|e| ChannelError::Config(format!("invalid recipient {}: {}", recipient, e)))?;
            builder = builder.to(to);
        }

        let email = builder
            .body(Self::render_body(message))
            .map_err(|e| ChannelError::Delivery(format!("message build failed: {}", e)))?;

        let transport = self.build_transport()?;
        with_deadline(ctx, async {
            transport
                .send(email)
                .await
                .map_err(|e| ChannelError::Delivery(format!("smtp send failed: {}", e)))?;
            Ok(())
        })
        .await
    }
}
