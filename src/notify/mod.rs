//! Alert delivery across email, webhook, chat and file channels. Channels
//! are independent: one failing delivery never blocks the others, and the
//! dispatch report carries every per-channel outcome.

pub mod channel;
pub mod email;
pub mod file;
pub mod slack;
pub mod teams;
pub mod webhook;

use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::OpContext;

pub use channel::NotificationChannel;
pub use email::{EmailChannel, EmailConfig};
pub use file::{FileChannel, FileConfig, FileFormat};
pub use slack::{SlackChannel, SlackConfig};
pub use teams::{TeamsChannel, TeamsConfig};
pub use webhook::{WebhookChannel, WebhookConfig};

/// Severity ordering drives minimum-severity filtering: Info < Warning <
/// Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    /// Accent color used by chat channels.
    pub fn color(self) -> &'static str {
        match self {
            AlertSeverity::Critical => "#ff0000",
            AlertSeverity::Warning => "#ff9500",
            AlertSeverity::Info => "#439fe0",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            AlertSeverity::Critical => "🚨",
            AlertSeverity::Warning => "⚠️",
            AlertSeverity::Info => "ℹ️",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub severity: AlertSeverity,
    /// Machine-readable category, e.g. "storage-usage".
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Free-form context for channels and downstream consumers.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Alert {
    pub fn new(
        severity: AlertSeverity,
        alert_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            alert_type: alert_type.into(),
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Channel-agnostic rendering of an alert. Every channel formats the same
/// message so operators see consistent content regardless of medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub alert_id: Uuid,
    pub severity: AlertSeverity,
    pub alert_type: String,
    pub title: String,
    pub body: String,
    pub color: String,
    pub emoji: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NotificationMessage {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            alert_id: alert.id,
            severity: alert.severity,
            alert_type: alert.alert_type.clone(),
            title: alert.title.clone(),
            body: alert.message.clone(),
            color: alert.severity.color().to_string(),
            emoji: alert.severity.emoji().to_string(),
            timestamp: alert.created_at,
            metadata: alert.metadata.clone(),
        }
    }
}

/// Filters are AND-combined; an alert must pass every configured filter
/// to be dispatched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFilters {
    pub min_severity: Option<AlertSeverity>,
    /// When set, only these alert types pass.
    pub allowed_types: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_types: Vec<String>,
    /// Restrict delivery to 09:00-17:00 UTC.
    #[serde(default)]
    pub business_hours_only: bool,
    /// Restrict delivery to Monday through Friday.
    #[serde(default)]
    pub weekdays_only: bool,
}

impl NotificationFilters {
    pub fn should_notify(&self, alert: &Alert, at: DateTime<Utc>) -> bool {
        if let Some(min) = self.min_severity {
            if alert.severity < min {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed_types {
            if !allowed.iter().any(|t| t == &alert.alert_type) {
                return false;
            }
        }
        if self.excluded_types.iter().any(|t| t == &alert.alert_type) {
            return false;
        }
        if self.business_hours_only && !(9..17).contains(&at.hour()) {
            return false;
        }
        if self.weekdays_only && at.weekday().number_from_monday() > 5 {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    #[serde(default)]
    pub filters: NotificationFilters,
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
    pub slack: Option<SlackConfig>,
    pub teams: Option<TeamsConfig>,
    pub file: Option<FileConfig>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are disabled")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("channel misconfigured: {0}")]
    Config(String),
    /// The caller-imposed deadline expired before the channel answered.
    #[error("delivery cancelled: deadline exceeded")]
    Cancelled,
}

impl ChannelError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChannelError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: String,
}

/// Outcome of one dispatch. Per-channel failures live here, not in the
/// top-level result: partial delivery is success with caveats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub alert_id: Uuid,
    /// True when the filters suppressed the alert; no channel was tried.
    pub filtered: bool,
    pub attempted: u64,
    pub delivered: Vec<String>,
    pub failures: Vec<ChannelFailure>,
}

impl DispatchReport {
    fn filtered(alert_id: Uuid) -> Self {
        Self {
            alert_id,
            filtered: true,
            attempted: 0,
            delivered: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fans alerts out to every enabled channel concurrently.
pub struct NotificationManager {
    config: NotificationConfig,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationManager {
    /// Channels are built from whichever configuration sections are
    /// present; absent sections are skipped silently.
    pub fn new(config: NotificationConfig) -> Self {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
        if let Some(email) = &config.email {
            channels.push(Arc::new(EmailChannel::new(email.clone())));
        }
        if let Some(webhook) = &config.webhook {
            channels.push(Arc::new(WebhookChannel::new(webhook.clone())));
        }
        if let Some(slack) = &config.slack {
            channels.push(Arc::new(SlackChannel::new(slack.clone())));
        }
        if let Some(teams) = &config.teams {
            channels.push(Arc::new(TeamsChannel::new(teams.clone())));
        }
        if let Some(file) = &config.file {
            channels.push(Arc::new(FileChannel::new(file.clone())));
        }
        Self { config, channels }
    }

    pub fn channel_types(&self) -> Vec<&'static str> {
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.channel_type())
            .collect()
    }

    pub fn should_notify(&self, alert: &Alert, at: DateTime<Utc>) -> bool {
        self.config.filters.should_notify(alert, at)
    }

    /// Send an alert through every enabled channel, each send bounded by
    /// the caller's deadline. Time-window filters are evaluated against
    /// the alert's own timestamp, not the wall clock at dispatch time.
    /// Channel failures are collected into the report; the call itself
    /// only fails when notifications are disabled outright.
    pub async fn dispatch(
        &self,
        alert: &Alert,
        ctx: &OpContext,
    ) -> Result<DispatchReport, NotifyError> {
        if !self.config.enabled {
            return Err(NotifyError::Disabled);
        }
        if !self.should_notify(alert, alert.created_at) {
            log::debug!("alert {} suppressed by notification filters", alert.id);
            return Ok(DispatchReport::filtered(alert.id));
        }

        let message = NotificationMessage::from_alert(alert);
        let enabled: Vec<Arc<dyn NotificationChannel>> = self
            .channels
            .iter()
            .filter(|c| c.is_enabled())
            .cloned()
            .collect();

        let tasks = enabled.iter().map(|channel| {
            let channel = Arc::clone(channel);
            let message = message.clone();
            let ctx = *ctx;
            async move {
                let outcome = channel.send(&message, &ctx).await;
                (channel.channel_type(), outcome)
            }
        });

        let mut delivered = Vec::new();
        let mut failures = Vec::new();
        for (channel_type, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => delivered.push(channel_type.to_string()),
                Err(e) => {
                    log::warn!("alert {} delivery via {} failed: {}", alert.id, channel_type, e);
                    failures.push(ChannelFailure {
                        channel: channel_type.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(DispatchReport {
            alert_id: alert.id,
            filtered: false,
            attempted: (delivered.len() + failures.len()) as u64,
            delivered,
            failures,
        })
    }
}
