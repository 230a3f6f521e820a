use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::model::{Backup, BackupStatus};

/// Storage provider kinds supported by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    Local,
    S3,
    AzureBlob,
    GoogleCloud,
    Multi,
}

impl std::str::FromStr for ProviderKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ProviderKind::Local),
            "s3" | "s3-compatible" => Ok(ProviderKind::S3),
            "azure" | "azure-blob" => Ok(ProviderKind::AzureBlob),
            "gcs" | "google-cloud" => Ok(ProviderKind::GoogleCloud),
            "multi" | "multi-storage" => Ok(ProviderKind::Multi),
            other => Err(StorageError::Validation {
                field: "provider".to_string(),
                message: format!("unknown provider kind: {}", other),
            }),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderKind::Local => "local",
            ProviderKind::S3 => "s3",
            ProviderKind::AzureBlob => "azure-blob",
            ProviderKind::GoogleCloud => "google-cloud",
            ProviderKind::Multi => "multi",
        };
        f.write_str(s)
    }
}

/// Deadline carried through every network-facing operation. A provider
/// checks the remaining budget before blocking calls and reports
/// `StorageError::Cancelled` once it is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct OpContext {
    deadline: Option<Instant>,
}

impl OpContext {
    /// No deadline; operations run to completion or backend failure.
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Remaining budget, or an immediate cancellation error when expired.
    pub fn remaining(&self) -> Result<Option<Duration>, StorageError> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    Err(StorageError::Cancelled)
                } else {
                    Ok(Some(deadline - now))
                }
            }
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Run a future under the context's deadline, mapping expiry to
/// `StorageError::Cancelled` so callers can tell a caller-imposed abort
/// from a backend-reported failure.
pub async fn with_deadline<T, F>(ctx: &OpContext, fut: F) -> Result<T, StorageError>
where
    F: std::future::Future<Output = Result<T, StorageError>>,
{
    match ctx.remaining()? {
        None => fut.await,
        Some(budget) => match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Cancelled),
        },
    }
}

/// Metadata describing one stored backup artifact, as reported by a
/// provider's list/get-metadata operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBackupMetadata {
    pub id: Uuid,
    pub database: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub compressed_size: u64,
    pub checksum: String,
    pub status: BackupStatus,
}

impl From<&Backup> for StoredBackupMetadata {
    fn from(backup: &Backup) -> Self {
        Self {
            id: backup.id,
            database: backup.database.clone(),
            created_at: backup.created_at,
            size: backup.size,
            compressed_size: backup.compressed_size,
            checksum: backup.checksum.clone(),
            status: backup.status,
        }
    }
}

/// Filter for provider listings. Fields are AND-combined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageListFilter {
    pub database: Option<String>,
    pub status: Option<BackupStatus>,
    pub created_after: Option<DateTime<Utc>>,
}

impl StorageListFilter {
    pub fn matches(&self, meta: &StoredBackupMetadata) -> bool {
        if let Some(db) = &self.database {
            if &meta.database != db {
                return false;
            }
        }
        if let Some(status) = self.status {
            if meta.status != status {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if meta.created_at < after {
                return false;
            }
        }
        true
    }
}

/// Outcome of a provider health probe. Providers without the capability
/// report `NotApplicable` rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum ProviderHealthState {
    Healthy,
    Unhealthy { error: String },
    NotApplicable,
}

/// Uniform contract over one physical storage backend.
///
/// Every network-facing operation takes an [`OpContext`] so callers can
/// impose a deadline; expiry surfaces as [`StorageError::Cancelled`].
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persist one backup artifact. Storing an id that already exists
    /// overwrites the previous artifact (replicas are byte-identical).
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError>;

    /// Fetch a backup artifact by id.
    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError>;

    /// Remove a backup artifact. Deleting an id that is absent is not an
    /// error.
    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError>;

    /// List stored artifacts matching the filter.
    async fn list(
        &self,
        filter: &StorageListFilter,
        ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError>;

    /// Metadata for one stored artifact.
    async fn get_metadata(
        &self,
        id: Uuid,
        ctx: &OpContext,
    ) -> Result<StoredBackupMetadata, StorageError>;

    /// Cheap connectivity/authentication probe.
    async fn test_connection(&self, ctx: &OpContext) -> Result<(), StorageError>;

    fn kind(&self) -> ProviderKind;

    /// Stable name used in reports and error aggregation.
    fn name(&self) -> String {
        self.kind().to_string()
    }

    /// Names to report usage under. Compositions enumerate their members
    /// here so per-provider breakdowns show every physical backend.
    fn provider_names(&self) -> Vec<String> {
        vec![self.name()]
    }

    /// Explicit optional capability: a provider either implements the
    /// health probe or declares it unsupported here.
    fn supports_health_check(&self) -> bool {
        false
    }

    /// Health probe for providers that declare the capability. The default
    /// reports `NotApplicable`.
    async fn health_check(&self, _ctx: &OpContext) -> ProviderHealthState {
        ProviderHealthState::NotApplicable
    }

    /// Backend-specific descriptors for diagnostics.
    fn provider_info(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Errors from storage configuration and operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Bad or incomplete configuration, rejected before any I/O.
    #[error("invalid configuration for `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A backend operation was attempted and failed.
    #[error("{provider} backend error: {message}")]
    Backend { provider: String, message: String },

    #[error("backup not found: {id}")]
    NotFound { id: Uuid },

    /// The caller-imposed deadline was reached before the backend answered.
    #[error("operation cancelled: deadline exceeded")]
    Cancelled,

    /// Every provider in a multi-provider composition failed.
    #[error("all storage providers failed: {summary}")]
    AllProvidersFailed { summary: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Collapse per-provider failures into one aggregate error.
    pub fn aggregate(failures: Vec<(String, StorageError)>) -> Self {
        let summary = failures
            .iter()
            .map(|(name, err)| format!("{}: {}", name, err))
            .collect::<Vec<_>>()
            .join("; ");
        StorageError::AllProvidersFailed { summary }
    }
}
