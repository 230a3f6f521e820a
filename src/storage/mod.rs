//! Redundant persistence of backup artifacts across heterogeneous
//! storage backends.

pub mod azure;
pub mod config;
pub mod factory;
pub mod gcs;
pub mod local;
pub mod multi;
pub mod provider;
pub mod s3;

pub use azure::AzureProvider;
pub use config::{
    AzureConfig, GcsConfig, LocalConfig, MultiConfig, S3Config, StorageConfig,
    DEFAULT_REPLICATION_TIMEOUT_SECS,
};
pub use factory::StorageProviderFactory;
pub use gcs::GcsProvider;
pub use local::LocalProvider;
pub use multi::{MemberHealth, MultiStorageProvider};
pub use provider::{
    OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};
pub use s3::S3Provider;
