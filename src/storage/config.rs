use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::provider::{ProviderKind, StorageError};

/// Seconds a secondary replica write may take before it is abandoned.
/// The primary-success return path never waits longer than this.
pub const DEFAULT_REPLICATION_TIMEOUT_SECS: u64 = 30;

/// Provider tag plus per-provider settings. Validated by the factory
/// before any provider is constructed; immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub kind: ProviderKind,
    pub local: Option<LocalConfig>,
    pub s3: Option<S3Config>,
    pub azure: Option<AzureConfig>,
    pub gcs: Option<GcsConfig>,
    pub multi: Option<MultiConfig>,
}

impl StorageConfig {
    pub fn local(config: LocalConfig) -> Self {
        Self {
            kind: ProviderKind::Local,
            local: Some(config),
            ..Default::default()
        }
    }

    pub fn s3(config: S3Config) -> Self {
        Self {
            kind: ProviderKind::S3,
            s3: Some(config),
            ..Default::default()
        }
    }

    pub fn azure(config: AzureConfig) -> Self {
        Self {
            kind: ProviderKind::AzureBlob,
            azure: Some(config),
            ..Default::default()
        }
    }

    pub fn gcs(config: GcsConfig) -> Self {
        Self {
            kind: ProviderKind::GoogleCloud,
            gcs: Some(config),
            ..Default::default()
        }
    }
}

/// Local filesystem storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub base_path: String,
    /// Create the base directory when missing. Defaults to true.
    pub create_dirs: Option<bool>,
}

impl LocalConfig {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.base_path.is_empty() {
            return Err(StorageError::Validation {
                field: "local.base_path".to_string(),
                message: "base path cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// S3-compatible storage settings (AWS S3, MinIO, R2, Spaces).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for MinIO and other S3-compatible services.
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub path_prefix: Option<String>,
    /// Path-style addressing, required by MinIO.
    pub force_path_style: Option<bool>,
}

impl S3Config {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.bucket.is_empty() {
            return Err(StorageError::Validation {
                field: "s3.bucket".to_string(),
                message: "bucket name cannot be empty".to_string(),
            });
        }
        if self.access_key_id.is_empty() {
            return Err(StorageError::Validation {
                field: "s3.access_key_id".to_string(),
                message: "access key id cannot be empty".to_string(),
            });
        }
        if self.secret_access_key.is_empty() {
            return Err(StorageError::Validation {
                field: "s3.secret_access_key".to_string(),
                message: "secret access key cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Azure Blob Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    pub account_name: String,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    pub container: String,
    pub path_prefix: Option<String>,
}

impl AzureConfig {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.account_name.is_empty() {
            return Err(StorageError::Validation {
                field: "azure.account_name".to_string(),
                message: "storage account name cannot be empty".to_string(),
            });
        }
        if self.container.is_empty() {
            return Err(StorageError::Validation {
                field: "azure.container".to_string(),
                message: "container name cannot be empty".to_string(),
            });
        }
        if self.account_key.is_none() && self.sas_token.is_none() {
            return Err(StorageError::Validation {
                field: "azure.account_key".to_string(),
                message: "either account_key or sas_token must be provided".to_string(),
            });
        }
        Ok(())
    }
}

/// Google Cloud Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    pub bucket: String,
    pub project_id: String,
    /// Inline service account key JSON. Falls back to application default
    /// credentials when absent.
    pub service_account_key: Option<String>,
    pub path_prefix: Option<String>,
}

impl GcsConfig {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.bucket.is_empty() {
            return Err(StorageError::Validation {
                field: "gcs.bucket".to_string(),
                message: "bucket name cannot be empty".to_string(),
            });
        }
        if self.project_id.is_empty() {
            return Err(StorageError::Validation {
                field: "gcs.project_id".to_string(),
                message: "project id cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Primary/secondary composition. The primary is listed first; secondary
/// order decides store/retrieve failover order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiConfig {
    pub primary: ProviderKind,
    pub secondaries: Vec<ProviderKind>,
    /// Per-secondary replication deadline in seconds.
    pub replication_timeout_secs: Option<u64>,
}

impl MultiConfig {
    pub fn validate(&self, available: &HashMap<ProviderKind, ()>) -> Result<(), StorageError> {
        if self.primary == ProviderKind::Multi || self.secondaries.contains(&ProviderKind::Multi) {
            return Err(StorageError::Validation {
                field: "multi.primary".to_string(),
                message: "multi-provider compositions cannot nest".to_string(),
            });
        }
        if !available.contains_key(&self.primary) {
            return Err(StorageError::Validation {
                field: "multi.primary".to_string(),
                message: format!("no configuration present for primary provider {}", self.primary),
            });
        }
        for secondary in &self.secondaries {
            if !available.contains_key(secondary) {
                return Err(StorageError::Validation {
                    field: "multi.secondaries".to_string(),
                    message: format!("no configuration present for secondary provider {}", secondary),
                });
            }
        }
        Ok(())
    }

    pub fn replication_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.replication_timeout_secs
                .unwrap_or(DEFAULT_REPLICATION_TIMEOUT_SECS),
        )
    }
}
