use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::model::Backup;
use crate::storage::config::LocalConfig;
use crate::storage::provider::{
    with_deadline, OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// Local filesystem storage provider. Artifacts live under
/// `<base_path>/backups/<id>.json`, written atomically via a temp file.
pub struct LocalProvider {
    config: LocalConfig,
    base_path: PathBuf,
}

impl LocalProvider {
    pub async fn new(config: LocalConfig) -> Result<Self, StorageError> {
        config.validate()?;
        let base_path = PathBuf::from(&config.base_path);

        if config.create_dirs.unwrap_or(true) {
            fs::create_dir_all(base_path.join("backups")).await?;
        }

        if !base_path.exists() {
            return Err(StorageError::Validation {
                field: "local.base_path".to_string(),
                message: format!("base path does not exist: {}", base_path.display()),
            });
        }
        if !base_path.is_dir() {
            return Err(StorageError::Validation {
                field: "local.base_path".to_string(),
                message: format!("base path is not a directory: {}", base_path.display()),
            });
        }

        Ok(Self { config, base_path })
    }

    fn backups_dir(&self) -> PathBuf {
        self.base_path.join("backups")
    }

    fn backup_path(&self, id: Uuid) -> PathBuf {
        self.backups_dir().join(format!("{}.json", id))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn read_backup(&self, path: &Path, id: Uuid) -> Result<Backup, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound { id });
        }
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError> {
        let contents = serde_json::to_vec_pretty(backup)?;
        let path = self.backup_path(backup.id);
        with_deadline(ctx, async {
            fs::create_dir_all(self.backups_dir()).await?;
            self.write_atomic(&path, &contents).await
        })
        .await
    }

    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError> {
        let path = self.backup_path(id);
        with_deadline(ctx, self.read_backup(&path, id)).await
    }

    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError> {
        let path = self.backup_path(id);
        with_deadline(ctx, async {
            if path.exists() {
                fs::remove_file(&path).await?;
            }
            Ok(())
        })
        .await
    }

    async fn list(
        &self,
        filter: &StorageListFilter,
        ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError> {
        with_deadline(ctx, async {
            let dir = self.backups_dir();
            if !dir.exists() {
                return Ok(Vec::new());
            }

            let mut results = Vec::new();
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if !name.ends_with(".json") {
                    continue;
                }
                let contents = fs::read_to_string(entry.path()).await?;
                let backup: Backup = serde_json::from_str(&contents)?;
                let meta = StoredBackupMetadata::from(&backup);
                if filter.matches(&meta) {
                    results.push(meta);
                }
            }
            Ok(results)
        })
        .await
    }

    async fn get_metadata(
        &self,
        id: Uuid,
        ctx: &OpContext,
    ) -> Result<StoredBackupMetadata, StorageError> {
        let backup = self.retrieve(id, ctx).await?;
        Ok(StoredBackupMetadata::from(&backup))
    }

    async fn test_connection(&self, ctx: &OpContext) -> Result<(), StorageError> {
        // Probe by writing and removing a marker file.
        let test_path = self.base_path.join(".write_probe");
        with_deadline(ctx, async {
            fs::write(&test_path, b"probe").await?;
            fs::remove_file(&test_path).await?;
            Ok(())
        })
        .await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn supports_health_check(&self) -> bool {
        true
    }

    async fn health_check(&self, ctx: &OpContext) -> ProviderHealthState {
        match self.test_connection(ctx).await {
            Ok(()) => ProviderHealthState::Healthy,
            Err(e) => ProviderHealthState::Unhealthy {
                error: e.to_string(),
            },
        }
    }

    fn provider_info(&self) -> HashMap<String, String> {
        let mut info = HashMap::new();
        info.insert("provider".to_string(), "local".to_string());
        info.insert("base_path".to_string(), self.config.base_path.clone());
        info
    }
}
