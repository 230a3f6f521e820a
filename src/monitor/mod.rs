//! Derived reporting over the backup catalog: usage, quotas, optimization
//! opportunities, health and growth trends. Every report is computed fresh
//! from a catalog snapshot taken at call time; nothing is cached.

pub mod health;
pub mod optimize;
pub mod quota;
pub mod trends;
pub mod usage;

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::catalog::BackupCatalog;
use crate::model::{Backup, BackupFilter, BackupStatus};
use crate::notify::{Alert, AlertSeverity};
use crate::storage::{OpContext, ProviderHealthState, StorageListFilter, StorageProvider};

pub use health::{
    compute_health, summarize, ConnectivityProbe, HealthIssue, HealthLevel, HealthReport,
    HealthSummary, IssueSeverity, ProviderHealth,
};
pub use optimize::{
    compute_optimizations, CompressionAnalysis, DuplicateGroup, DuplicationAnalysis,
    OptimizationReport, Priority, Recommendation, RetentionAnalysis,
};
pub use quota::{
    check_quotas, DatabaseQuota, ProviderQuota, QuotaConfig, QuotaSeverity, QuotaStatus,
    QuotaWarning,
};
pub use trends::{
    compute_trends, BackupFrequencyTrend, CompressionTrend, DatabaseTrend, TrendDirection,
    TrendReport, UsagePrediction,
};
pub use usage::{
    compute_database_usage, compute_usage, AgeBucket, AgeGroupUsage, DatabaseUsage,
    DatabaseUsageDetail, DatabaseUsageReport, GrowthEstimate, ProviderUsage, UsageReport,
};

/// Total usage above this raises a storage alert.
pub const USAGE_ALERT_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024 * 1024;
/// Corpus-wide compression ratio above this raises an efficiency alert.
pub const COMPRESSION_ALERT_RATIO: f64 = 0.8;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("backup listing failed: {0}")]
    Catalog(#[source] anyhow::Error),
}

/// Read-only observer over a backup catalog and its storage provider.
pub struct StorageMonitor {
    catalog: Arc<dyn BackupCatalog>,
    provider: Arc<dyn StorageProvider>,
    quotas: QuotaConfig,
}

impl StorageMonitor {
    pub fn new(
        catalog: Arc<dyn BackupCatalog>,
        provider: Arc<dyn StorageProvider>,
        quotas: QuotaConfig,
    ) -> Self {
        Self {
            catalog,
            provider,
            quotas,
        }
    }

    async fn snapshot(&self) -> Result<Vec<Backup>, MonitorError> {
        self.catalog
            .list_backups(&BackupFilter::default())
            .await
            .map_err(MonitorError::Catalog)
    }

    pub async fn storage_usage(&self) -> Result<UsageReport, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();
        Ok(compute_usage(&backups, &self.provider.provider_names(), now))
    }

    pub async fn usage_by_database(&self) -> Result<DatabaseUsageReport, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();
        Ok(compute_database_usage(&backups, now))
    }

    pub async fn quota_status(&self) -> Result<QuotaStatus, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();
        Ok(check_quotas(&backups, &self.quotas, now))
    }

    pub async fn optimization_report(&self) -> Result<OptimizationReport, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();
        Ok(compute_optimizations(&backups, now))
    }

    /// Detailed health: a timed listing probe against the provider, the
    /// provider's own health state, quota warnings and high-priority
    /// optimization findings folded into one report.
    pub async fn health_report(&self) -> Result<HealthReport, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();

        let probe_ctx = OpContext::with_timeout(PROBE_TIMEOUT);
        let started = Instant::now();
        let probe = match self
            .provider
            .list(&StorageListFilter::default(), &probe_ctx)
            .await
        {
            Ok(_) => ConnectivityProbe {
                ok: true,
                latency_ms: started.elapsed().as_millis() as u64,
                error: None,
            },
            Err(e) => ConnectivityProbe {
                ok: false,
                latency_ms: started.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            },
        };

        let state = if self.provider.supports_health_check() {
            self.provider.health_check(&probe_ctx).await
        } else {
            ProviderHealthState::NotApplicable
        };
        let providers = vec![ProviderHealth {
            provider: self.provider.name(),
            state,
        }];

        let quotas = check_quotas(&backups, &self.quotas, now);
        let optimizations = compute_optimizations(&backups, now);
        Ok(compute_health(probe, providers, &quotas, &optimizations, now))
    }

    pub async fn health_summary(&self) -> Result<HealthSummary, MonitorError> {
        let report = self.health_report().await?;
        Ok(summarize(&report))
    }

    pub async fn trend_report(&self, period_days: i64) -> Result<TrendReport, MonitorError> {
        let backups = self.snapshot().await?;
        let now = Utc::now();
        Ok(compute_trends(&backups, period_days, now))
    }

    pub async fn storage_alerts(&self) -> Result<Vec<Alert>, MonitorError> {
        let usage = self.storage_usage().await?;
        Ok(generate_storage_alerts(&usage))
    }

    /// Completed backups for a database, newest first. The head of the
    /// list is the natural rollback target.
    pub async fn rollback_candidates(&self, database: &str) -> Result<Vec<Backup>, MonitorError> {
        let mut candidates: Vec<Backup> = self
            .catalog
            .backups_for_database(database)
            .await
            .map_err(MonitorError::Catalog)?
            .into_iter()
            .filter(|b| b.status == BackupStatus::Completed)
            .collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(candidates)
    }
}

/// Threshold alerts derived from a usage report.
pub fn generate_storage_alerts(usage: &UsageReport) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if usage.total_size > USAGE_ALERT_THRESHOLD_BYTES {
        alerts.push(
            Alert::new(
                AlertSeverity::Warning,
                "storage-usage",
                "High storage usage",
                format!(
                    "total backup storage is {} bytes, above the {} byte threshold",
                    usage.total_size, USAGE_ALERT_THRESHOLD_BYTES
                ),
            )
            .with_metadata("total_size", usage.total_size.to_string()),
        );
    }

    if usage.total_backups > 0 && usage.compression_ratio > COMPRESSION_ALERT_RATIO {
        alerts.push(
            Alert::new(
                AlertSeverity::Info,
                "compression-efficiency",
                "Poor compression efficiency",
                format!(
                    "corpus-wide compression ratio is {:.2}, above {:.2}",
                    usage.compression_ratio, COMPRESSION_ALERT_RATIO
                ),
            )
            .with_metadata("compression_ratio", format!("{:.2}", usage.compression_ratio)),
        );
    }

    alerts
}
