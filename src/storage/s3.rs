use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::Backup;
use crate::storage::config::S3Config;
use crate::storage::provider::{
    with_deadline, OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// S3-compatible storage provider. Works against AWS S3, MinIO, Cloudflare
/// R2, DigitalOcean Spaces and other S3-compatible services.
pub struct S3Provider {
    client: Client,
    config: S3Config,
}

impl S3Provider {
    pub async fn new(config: S3Config) -> Result<Self, StorageError> {
        config.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config).credentials_provider(
            aws_sdk_s3::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                config.session_token.clone(),
                None,
                "schemasync-s3-provider",
            ),
        );
        if config.force_path_style.unwrap_or(false) {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        Ok(Self { client, config })
    }

    fn object_key(&self, id: Uuid) -> String {
        match self.config.path_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}/backups/{}.json", prefix.trim_end_matches('/'), id)
            }
            _ => format!("backups/{}.json", id),
        }
    }

    fn list_prefix(&self) -> String {
        match self.config.path_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}/backups/", prefix.trim_end_matches('/'))
            }
            _ => "backups/".to_string(),
        }
    }

    fn map_error(err: &str) -> StorageError {
        if err.contains("NoSuchBucket") {
            StorageError::Validation {
                field: "s3.bucket".to_string(),
                message: "bucket does not exist".to_string(),
            }
        } else {
            StorageError::backend("s3", err)
        }
    }

    async fn fetch_backup(&self, key: &str, id: Uuid) -> Result<Backup, StorageError> {
        match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => {
                let body = response
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::backend("s3", format!("failed to read object body: {}", e)))?;
                Ok(serde_json::from_slice(&body.into_bytes())?)
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NoSuchKey") || msg.contains("NotFound") {
                    Err(StorageError::NotFound { id })
                } else {
                    Err(Self::map_error(&msg))
                }
            }
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError> {
        let key = self.object_key(backup.id);
        let contents = serde_json::to_vec(backup)?;
        with_deadline(ctx, async {
            self.client
                .put_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .body(ByteStream::from(contents))
                .content_type("application/json")
                .send()
                .await
                .map(|_| ())
                .map_err(|e| Self::map_error(&e.to_string()))
        })
        .await
    }

    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError> {
        let key = self.object_key(id);
        with_deadline(ctx, self.fetch_backup(&key, id)).await
    }

    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError> {
        let key = self.object_key(id);
        with_deadline(ctx, async {
            // S3 deletes succeed even when the object is absent.
            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| Self::map_error(&e.to_string()))
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
            let mut continuation_token: Option<String> = None;

            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.config.bucket)
                    .prefix(&prefix)
                    .max_keys(1000);
                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| Self::map_error(&e.to_string()))?;

                for object in response.contents() {
                    let Some(key) = object.key() else { continue };
                    let Some(stem) = key
                        .rsplit('/')
                        .next()
                        .and_then(|name| name.strip_suffix(".json"))
                    else {
                        continue;
                    };
                    let Ok(id) = stem.parse::<Uuid>() else { continue };
                    let backup = self.fetch_backup(key, id).await?;
                    let meta = StoredBackupMetadata::from(&backup);
                    if filter.matches(&meta) {
                        results.push(meta);
                    }
                }

                if response.is_truncated() == Some(true) {
                    continuation_token = response.next_continuation_token().map(String::from);
                } else {
                    break;
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
                .head_bucket()
                .bucket(&self.config.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| Self::map_error(&e.to_string()))
        })
        .await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::S3
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
        info.insert("provider".to_string(), "s3".to_string());
        info.insert("bucket".to_string(), self.config.bucket.clone());
        info.insert("region".to_string(), self.config.region.clone());
        if let Some(endpoint) = &self.config.endpoint {
            info.insert("endpoint".to_string(), endpoint.clone());
        }
        info
    }
}
