use async_trait::async_trait;
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::{
    delete::DeleteObjectRequest,
    download::Range,
    get::GetObjectRequest,
    list::ListObjectsRequest,
    upload::{Media, UploadObjectRequest, UploadType},
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::Backup;
use crate::storage::config::GcsConfig;
use crate::storage::provider::{
    with_deadline, OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// Google Cloud Storage provider.
pub struct GcsProvider {
    client: Client,
    config: GcsConfig,
    path_prefix: String,
}

impl GcsProvider {
    pub async fn new(config: GcsConfig) -> Result<Self, StorageError> {
        config.validate()?;

        let client_config = if let Some(service_account_key) = &config.service_account_key {
            let credentials = CredentialsFile::new_from_str(service_account_key)
                .await
                .map_err(|e| StorageError::Validation {
                    field: "gcs.service_account_key".to_string(),
                    message: format!("invalid service account key: {}", e),
                })?;
            ClientConfig::default()
                .with_credentials(credentials)
                .await
                .map_err(|e| StorageError::backend("gcs", format!("credential setup failed: {}", e)))?
        } else {
            // Application default credentials
            ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| StorageError::backend("gcs", format!("authentication failed: {}", e)))?
        };

        let client = Client::new(client_config);
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

    fn object_name(&self, id: Uuid) -> String {
        format!("{}/backups/{}.json", self.path_prefix, id)
    }

    fn list_prefix(&self) -> String {
        format!("{}/backups/", self.path_prefix)
    }

    fn map_error(err: google_cloud_storage::http::Error) -> StorageError {
        StorageError::backend("gcs", err.to_string())
    }

    async fn fetch_backup(&self, object_name: String, id: Uuid) -> Result<Backup, StorageError> {
        let request = GetObjectRequest {
            bucket: self.config.bucket.clone(),
            object: object_name,
            ..Default::default()
        };

        match self.client.download_object(&request, &Range::default()).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.to_string().contains("404") => Err(StorageError::NotFound { id }),
            Err(e) => Err(Self::map_error(e)),
        }
    }
}

#[async_trait]
impl StorageProvider for GcsProvider {
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError> {
        let object_name = self.object_name(backup.id);
        let contents = serde_json::to_vec(backup)?;

        with_deadline(ctx, async {
            let upload_type = UploadType::Simple(Media::new(object_name));
            let request = UploadObjectRequest {
                bucket: self.config.bucket.clone(),
                ..Default::default()
            };
            self.client
                .upload_object(&request, contents, &upload_type)
                .await
                .map(|_| ())
                .map_err(Self::map_error)
        })
        .await
    }

    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError> {
        let object_name = self.object_name(id);
        with_deadline(ctx, self.fetch_backup(object_name, id)).await
    }

    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError> {
        let object_name = self.object_name(id);
        with_deadline(ctx, async {
            let request = DeleteObjectRequest {
                bucket: self.config.bucket.clone(),
                object: object_name,
                ..Default::default()
            };
            match self.client.delete_object(&request).await {
                Ok(_) => Ok(()),
                Err(e) if e.to_string().contains("404") => Ok(()),
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
            let mut results = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let request = ListObjectsRequest {
                    bucket: self.config.bucket.clone(),
                    prefix: Some(prefix.clone()),
                    page_token: page_token.take(),
                    ..Default::default()
                };

                let response = self
                    .client
                    .list_objects(&request)
                    .await
                    .map_err(Self::map_error)?;

                for object in response.items.unwrap_or_default() {
                    let Some(stem) = object
                        .name
                        .strip_prefix(&prefix)
                        .and_then(|name| name.strip_suffix(".json"))
                    else {
                        continue;
                    };
                    let Ok(id) = stem.parse::<Uuid>() else { continue };
                    let backup = self.fetch_backup(object.name.clone(), id).await?;
                    let meta = StoredBackupMetadata::from(&backup);
                    if filter.matches(&meta) {
                        results.push(meta);
                    }
                }

                match response.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
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
            let request = ListObjectsRequest {
                bucket: self.config.bucket.clone(),
                max_results: Some(1),
                ..Default::default()
            };
            self.client
                .list_objects(&request)
                .await
                .map(|_| ())
                .map_err(Self::map_error)
        })
        .await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleCloud
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
        info.insert("provider".to_string(), "google-cloud".to_string());
        info.insert("bucket".to_string(), self.config.bucket.clone());
        info.insert("project_id".to_string(), self.config.project_id.clone());
        info.insert(
            "auth_method".to_string(),
            if self.config.service_account_key.is_some() {
                "service_account_key".to_string()
            } else {
                "default_credentials".to_string()
            },
        );
        info
    }
}
