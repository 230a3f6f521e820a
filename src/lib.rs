//! # schemasync-storage - Backup Storage Reliability Layer
//!
//! Redundant backup storage for database schema synchronization: backups
//! are written across multiple storage backends, observed by a monitor
//! that derives usage, quota, optimization, health and trend reports, and
//! surfaced to operators through pluggable notification channels.
//!
//! ## Features
//!
//! - **Multi-Backend Storage**: Local filesystem, AWS S3, Azure Blob and
//!   Google Cloud Storage behind one provider trait
//! - **Redundant Writes**: Primary-first stores with best-effort
//!   replication and ordered read failover
//! - **Storage Monitoring**: Usage, quota, optimization, health and trend
//!   reports computed fresh from the backup catalog
//! - **Alerting**: Email, webhook, Slack, Teams and file channels with
//!   severity and business-hours filtering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use schemasync_storage::catalog::InMemoryCatalog;
//! use schemasync_storage::monitor::{QuotaConfig, StorageMonitor};
//! use schemasync_storage::storage::{StorageConfig, StorageProviderFactory, LocalConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = StorageProviderFactory::create_provider(StorageConfig::local(LocalConfig {
//!         base_path: "/var/lib/schemasync/backups".to_string(),
//!         create_dirs: Some(true),
//!     }))
//!     .await?;
//!
//!     let catalog = Arc::new(InMemoryCatalog::default());
//!     let monitor = StorageMonitor::new(catalog, provider, QuotaConfig::default());
//!     let health = monitor.health_report().await?;
//!     println!("overall health: {:?}", health.overall_health);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`model`] - Backup records, statuses and catalog filters
//! - [`catalog`] - Read-only view of the backup manager's metadata
//! - [`storage`] - Provider trait, concrete backends, redundancy and the
//!   configuration-driven factory
//! - [`monitor`] - Derived reports and threshold alerts
//! - [`notify`] - Alert fan-out across delivery channels

pub mod catalog;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod storage;

pub use catalog::{BackupCatalog, InMemoryCatalog};
pub use model::{Backup, BackupFilter, BackupStatus, CompressionAlgorithm};
pub use monitor::{MonitorError, StorageMonitor};
pub use notify::{Alert, AlertSeverity, NotificationManager};
pub use storage::{StorageError, StorageProvider, StorageProviderFactory};
