use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{Backup, BackupFilter};

/// Read-only view of the backup manager's metadata. The manager itself is an
/// external collaborator; this subsystem queries it and never mutates it.
#[async_trait]
pub trait BackupCatalog: Send + Sync {
    /// List backups matching the filter. Filter fields are AND-combined.
    async fn list_backups(&self, filter: &BackupFilter) -> anyhow::Result<Vec<Backup>>;

    /// All backups for one database.
    async fn backups_for_database(&self, database: &str) -> anyhow::Result<Vec<Backup>> {
        self.list_backups(&BackupFilter {
            database: Some(database.to_string()),
            ..Default::default()
        })
        .await
    }
}

/// In-memory catalog for tests and embedded callers that already hold the
/// backup list.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    backups: Arc<RwLock<Vec<Backup>>>,
}

impl InMemoryCatalog {
    pub fn new(backups: Vec<Backup>) -> Self {
        Self {
            backups: Arc::new(RwLock::new(backups)),
        }
    }

    pub async fn replace(&self, backups: Vec<Backup>) {
        *self.backups.write().await = backups;
    }
}

#[async_trait]
impl BackupCatalog for InMemoryCatalog {
    async fn list_backups(&self, filter: &BackupFilter) -> anyhow::Result<Vec<Backup>> {
        let backups = self.backups.read().await;
        Ok(backups.iter().filter(|b| filter.matches(b)).cloned().collect())
    }
}
