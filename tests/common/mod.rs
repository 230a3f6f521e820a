// Shared fixtures; not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use schemasync_storage::model::{Backup, BackupStatus, CompressionAlgorithm};
use schemasync_storage::storage::{
    OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// Build a completed backup with sensible defaults.
pub fn test_backup(database: &str) -> Backup {
    Backup {
        id: Uuid::new_v4(),
        database: database.to_string(),
        created_at: Utc::now() - Duration::hours(1),
        size: 1024,
        compressed_size: 512,
        compression: CompressionAlgorithm::Gzip,
        checksum: format!("sum-{}", Uuid::new_v4()),
        status: BackupStatus::Completed,
        tags: vec!["nightly".to_string()],
        description: Some("integration test backup".to_string()),
    }
}

pub fn test_backup_aged(database: &str, age_days: i64, size: u64, compressed: u64) -> Backup {
    let mut backup = test_backup(database);
    backup.created_at = Utc::now() - Duration::days(age_days);
    backup.size = size;
    backup.compressed_size = compressed;
    backup
}

/// In-memory provider that records everything stored in it.
#[derive(Default)]
pub struct RecordingProvider {
    pub label: String,
    pub stored: Mutex<Vec<Backup>>,
}

impl RecordingProvider {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            stored: Mutex::new(Vec::new()),
        }
    }

    pub fn stored_ids(&self) -> Vec<Uuid> {
        self.stored.lock().unwrap().iter().map(|b| b.id).collect()
    }
}

#[async_trait]
impl StorageProvider for RecordingProvider {
    async fn store(&self, backup: &Backup, _ctx: &OpContext) -> Result<(), StorageError> {
        self.stored.lock().unwrap().push(backup.clone());
        Ok(())
    }

    async fn retrieve(&self, id: Uuid, _ctx: &OpContext) -> Result<Backup, StorageError> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(StorageError::NotFound { id })
    }

    async fn delete(&self, id: Uuid, _ctx: &OpContext) -> Result<(), StorageError> {
        // Absent ids are not an error, matching the provider contract.
        self.stored.lock().unwrap().retain(|b| b.id != id);
        Ok(())
    }

    async fn list(
        &self,
        filter: &StorageListFilter,
        _ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(StoredBackupMetadata::from)
            .filter(|m| filter.matches(m))
            .collect())
    }

    async fn get_metadata(
        &self,
        id: Uuid,
        ctx: &OpContext,
    ) -> Result<StoredBackupMetadata, StorageError> {
        let backup = self.retrieve(id, ctx).await?;
        Ok(StoredBackupMetadata::from(&backup))
    }

    async fn test_connection(&self, _ctx: &OpContext) -> Result<(), StorageError> {
        Ok(())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn name(&self) -> String {
        self.label.clone()
    }

    fn supports_health_check(&self) -> bool {
        true
    }

    async fn health_check(&self, _ctx: &OpContext) -> ProviderHealthState {
        ProviderHealthState::Healthy
    }

    fn provider_info(&self) -> HashMap<String, String> {
        let mut info = HashMap::new();
        info.insert("provider".to_string(), self.label.clone());
        info
    }
}

/// Provider that rejects every operation.
pub struct FailingProvider {
    pub label: String,
}

impl FailingProvider {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }

    fn error(&self) -> StorageError {
        StorageError::backend(self.label.clone(), "injected failure")
    }
}

#[async_trait]
impl StorageProvider for FailingProvider {
    async fn store(&self, _backup: &Backup, _ctx: &OpContext) -> Result<(), StorageError> {
        Err(self.error())
    }

    async fn retrieve(&self, _id: Uuid, _ctx: &OpContext) -> Result<Backup, StorageError> {
        Err(self.error())
    }

    async fn delete(&self, _id: Uuid, _ctx: &OpContext) -> Result<(), StorageError> {
        Err(self.error())
    }

    async fn list(
        &self,
        _filter: &StorageListFilter,
        _ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError> {
        Err(self.error())
    }

    async fn get_metadata(
        &self,
        _id: Uuid,
        _ctx: &OpContext,
    ) -> Result<StoredBackupMetadata, StorageError> {
        Err(self.error())
    }

    async fn test_connection(&self, _ctx: &OpContext) -> Result<(), StorageError> {
        Err(self.error())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn name(&self) -> String {
        self.label.clone()
    }

    fn supports_health_check(&self) -> bool {
        true
    }

    async fn health_check(&self, _ctx: &OpContext) -> ProviderHealthState {
        ProviderHealthState::Unhealthy {
            error: "injected failure".to_string(),
        }
    }
}
