use async_trait::async_trait;
use azure_storage::prelude::*;
use azure_storage_blobs::prelude::*;
use futures::StreamExt;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::Backup;
use crate::storage::config::AzureConfig;
use crate::storage::provider::{
    with_deadline, OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// Azure Blob Storage provider.
pub struct AzureProvider {
    client: BlobServiceClient,
    config: AzureConfig,
    path_prefix: String,
}

impl AzureProvider {
    pub async fn new(config: AzureConfig) -> Result<Self, StorageError> {
        config.validate()?;

        let client = if let Some(account_key) = &config.account_key {
            let credentials =
                StorageCredentials::access_key(config.account_name.clone(), account_key.clone());
            BlobServiceClient::new(config.account_name.clone(), credentials)
        } else if let Some(sas_token) = &config.sas_token {
            let credentials = StorageCredentials::sas_token(sas_token.clone()).map_err(|e| {
                StorageError::Validation {
                    field: "azure.sas_token".to_string(),
                    message: format!("invalid SAS token: {}", e),
                }
            })?;
            BlobServiceClient::new(config.account_name.clone(), credentials)
        } else {
            // validate() guarantees one of the two is present
            return Err(StorageError::Validation {
                field: "azure.account_key".to_string(),
                message: "either account_key or sas_token must be provided".to_string(),
            });
        };

        let path_prefix = config
            .path_prefix
            .clone()
            .unwrap_or_else(|| "schemasync".to_string());

        Ok(Self {
            client,
            config,
            path_prefix,
        })
    }

    fn blob_name(&self, id: Uuid) -> String {
        format!("{}/backups/{}.json", self.path_prefix, id)
    }

    fn list_prefix(&self) -> String {
        format!("{}/backups/", self.path_prefix)
    }

    fn map_error(err: azure_core::error::Error) -> StorageError {
        let msg = err.to_string();
        if msg.contains("401") || msg.contains("403") || msg.contains("AuthenticationFailed") {
            StorageError::backend("azure-blob", format!("authentication failed: {}", msg))
        } else {
            StorageError::backend("azure-blob", msg)
        }
    }

    fn is_not_found(err: &azure_core::error::Error) -> bool {
        let msg = err.to_string();
        msg.contains("404") || msg.contains("BlobNotFound")
    }

    async fn fetch_backup(&self, blob_name: &str, id: Uuid) -> Result<Backup, StorageError> {
        let blob_client = self
            .client
            .container_client(&self.config.container)
            .blob_client(blob_name);

        match blob_client.get_content().await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if Self::is_not_found(&e) => Err(StorageError::NotFound { id }),
            Err(e) => Err(Self::map_error(e)),
        }
    }
}

#[async_trait]
impl StorageProvider for AzureProvider {
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError> {
        let blob_name = self.blob_name(backup.id);
        let contents = serde_json::to_vec(backup)?;

        with_deadline(ctx, async {
            let blob_client = self
                .client
                .container_client(&self.config.container)
                .blob_client(&blob_name);
            blob_client
                .put_block_blob(contents)
                .content_type("application/json")
                .await
                .map(|_| ())
                .map_err(Self::map_error)
        })
        .await
    }

    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError> {
        let blob_name = self.blob_name(id);
        with_deadline(ctx, self.fetch_backup(&blob_name, id)).await
    }

    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError> {
        let blob_name = self.blob_name(id);
        with_deadline(ctx, async {
            let blob_client = self
                .client
                .container_client(&self.config.container)
                .blob_client(&blob_name);
            match blob_client.delete().await {
                Ok(_) => Ok(()),
                Err(e) if Self::is_not_found(&e) => Ok(()),
                Err(e) => Err(Self::map_error(e)),
            }
        })
        .await
    }

    async fn list(
        &self,
        filter: &StorageListFilter,
        ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError> {
        let prefix = self.list_prefix();
        with_deadline(ctx, async {
            let container_client = self.client.container_client(&self.config.container);
            let mut results = Vec::new();
            let mut stream = container_client
                .list_blobs()
                .prefix(prefix.clone())
                .into_stream();

            while let Some(page) = stream.next().await {
                let page = page.map_err(Self::map_error)?;
                for blob in page.blobs.blobs() {
                    let Some(stem) = blob
                        .name
                        .strip_prefix(&prefix)
                        .and_then(|name| name.strip_suffix(".json"))
                    else {
                        continue;
                    };
                    let Ok(id) = stem.parse::<Uuid>() else { continue };
                    let backup = self.fetch_backup(&blob.name, id).await?;
                    let meta = StoredBackupMetadata::from(&backup);
                    if filter.matches(&meta) {
                        results.push(meta);
                    }
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
        with_deadline(ctx, async {
            self.client
                .container_client(&self.config.container)
                .get_properties()
                .await
                .map(|_| ())
                .map_err(Self::map_error)
        })
        .await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::AzureBlob
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
        info.insert("provider".to_string(), "azure-blob".to_string());
        info.insert("account_name".to_string(), self.config.account_name.clone());
        info.insert("container".to_string(), self.config.container.clone());
        info.insert(
            "auth_method".to_string(),
            if self.config.account_key.is_some() {
                "account_key".to_string()
            } else {
                "sas_token".to_string()
            },
        );
        info
    }
}
