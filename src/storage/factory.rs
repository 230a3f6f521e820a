use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::azure::AzureProvider;
use crate::storage::config::StorageConfig;
use crate::storage::gcs::GcsProvider;
use crate::storage::local::LocalProvider;
use crate::storage::multi::MultiStorageProvider;
use crate::storage::provider::{ProviderKind, StorageError, StorageProvider};
use crate::storage::s3::S3Provider;

/// Builds validated storage providers from configuration.
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Validate a configuration without constructing the provider. Errors
    /// name the offending field so the operator can fix it.
    pub fn validate_config(config: &StorageConfig) -> Result<(), StorageError> {
        match config.kind {
            ProviderKind::Local => config
                .local
                .as_ref()
                .ok_or_else(|| missing_section("local"))?
                .validate(),
            ProviderKind::S3 => config
                .s3
                .as_ref()
                .ok_or_else(|| missing_section("s3"))?
                .validate(),
            ProviderKind::AzureBlob => config
                .azure
                .as_ref()
                .ok_or_else(|| missing_section("azure"))?
                .validate(),
            ProviderKind::GoogleCloud => config
                .gcs
                .as_ref()
                .ok_or_else(|| missing_section("gcs"))?
                .validate(),
            ProviderKind::Multi => {
                let multi = config
                    .multi
                    .as_ref()
                    .ok_or_else(|| missing_section("multi"))?;
                let mut available = HashMap::new();
                if config.local.is_some() {
                    available.insert(ProviderKind::Local, ());
                }
                if config.s3.is_some() {
                    available.insert(ProviderKind::S3, ());
                }
                if config.azure.is_some() {
                    available.insert(ProviderKind::AzureBlob, ());
                }
                if config.gcs.is_some() {
                    available.insert(ProviderKind::GoogleCloud, ());
                }
                multi.validate(&available)?;

                // Validate every referenced member config too.
                for kind in std::iter::once(multi.primary).chain(multi.secondaries.iter().copied()) {
                    Self::validate_config(&narrow(config, kind))?;
                }
                Ok(())
            }
        }
    }

    /// Construct a provider from configuration, validating first.
    pub async fn create_provider(
        config: StorageConfig,
    ) -> Result<Arc<dyn StorageProvider>, StorageError> {
        Self::validate_config(&config)?;

        match config.kind {
            ProviderKind::Local => {
                let local = config.local.expect("validated");
                Ok(Arc::new(LocalProvider::new(local).await?))
            }
            ProviderKind::S3 => {
                let s3 = config.s3.expect("validated");
                Ok(Arc::new(S3Provider::new(s3).await?))
            }
            ProviderKind::AzureBlob => {
                let azure = config.azure.expect("validated");
                Ok(Arc::new(AzureProvider::new(azure).await?))
            }
            ProviderKind::GoogleCloud => {
                let gcs = config.gcs.expect("validated");
                Ok(Arc::new(GcsProvider::new(gcs).await?))
            }
            ProviderKind::Multi => {
                let multi = config.multi.clone().expect("validated");

                let mut members: Vec<Arc<dyn StorageProvider>> = Vec::new();
                for kind in std::iter::once(multi.primary).chain(multi.secondaries.iter().copied()) {
                    let member = Box::pin(Self::create_provider(narrow(&config, kind))).await?;
                    members.push(member);
                }

                Ok(Arc::new(MultiStorageProvider::with_replication_timeout(
                    members,
                    multi.replication_timeout(),
                )?))
            }
        }
    }

    pub fn available_providers() -> Vec<ProviderKind> {
        vec![
            ProviderKind::Local,
            ProviderKind::S3,
            ProviderKind::AzureBlob,
            ProviderKind::GoogleCloud,
            ProviderKind::Multi,
        ]
    }
}

fn missing_section(section: &str) -> StorageError {
    StorageError::Validation {
        field: section.to_string(),
        message: format!("{} provider selected but its configuration section is missing", section),
    }
}

/// Single-provider view of a multi-provider configuration.
fn narrow(config: &StorageConfig, kind: ProviderKind) -> StorageConfig {
    StorageConfig {
        kind,
        local: config.local.clone(),
        s3: config.s3.clone(),
        azure: config.azure.clone(),
        gcs: config.gcs.clone(),
        multi: None,
    }
}
