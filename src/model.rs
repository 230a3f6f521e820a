use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a backup. Transitions are forward-only:
/// Pending -> InProgress -> Completed | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BackupStatus {
    /// Whether a transition to `next` is allowed. A status never moves
    /// backwards and terminal states never change.
    pub fn can_transition_to(self, next: BackupStatus) -> bool {
        matches!(
            (self, next),
            (BackupStatus::Pending, BackupStatus::InProgress)
                | (BackupStatus::InProgress, BackupStatus::Completed)
                | (BackupStatus::InProgress, BackupStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::Pending => "pending",
            BackupStatus::InProgress => "in-progress",
            BackupStatus::Completed => "completed",
            BackupStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression algorithm applied to a backup artifact. The algorithms
/// themselves are external; this layer only records which one was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    #[default]
    None,
    Gzip,
    Zstd,
    Lz4,
}

impl CompressionAlgorithm {
    pub fn is_none(self) -> bool {
        matches!(self, CompressionAlgorithm::None)
    }
}

/// One capture of a database's schema/data with its storage metadata.
/// Owned by the backup manager; read-only in this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: Uuid,
    pub database: String,
    pub created_at: DateTime<Utc>,
    /// Raw (uncompressed) size in bytes.
    pub size: u64,
    /// Size of the stored artifact in bytes.
    pub compressed_size: u64,
    pub compression: CompressionAlgorithm,
    pub checksum: String,
    pub status: BackupStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Backup {
    /// compressed / raw, or 0 when the raw size is 0.
    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.compressed_size as f64 / self.size as f64
        }
    }
}

/// Filter over the backup catalog. Fields are AND-combined; `None` matches
/// everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupFilter {
    pub database: Option<String>,
    pub status: Option<BackupStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub tag: Option<String>,
}

impl BackupFilter {
    pub fn matches(&self, backup: &Backup) -> bool {
        if let Some(db) = &self.database {
            if &backup.database != db {
                return false;
            }
        }
        if let Some(status) = self.status {
            if backup.status != status {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if backup.created_at < after {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !backup.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}
