use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Backup;

/// Warning thresholds in percent. A scope turns critical at or above 95%
/// regardless of its warning threshold.
pub const DATABASE_WARNING_PERCENT: f64 = 90.0;
pub const PROVIDER_WARNING_PERCENT: f64 = 85.0;
pub const TOTAL_WARNING_PERCENT: f64 = 80.0;
pub const CRITICAL_PERCENT: f64 = 95.0;

/// Quota limits in bytes. All limits are optional; scopes without a limit
/// are reported as unlimited and never warn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub enabled: bool,
    pub total_quota: Option<u64>,
    #[serde(default)]
    pub database_quotas: BTreeMap<String, u64>,
    #[serde(default)]
    pub provider_quotas: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub generated_at: DateTime<Utc>,
    pub enabled: bool,
    pub total_quota: Option<u64>,
    pub used_storage: u64,
    pub usage_percentage: f64,
    /// Clamped to zero when usage exceeds the quota.
    pub available_storage: Option<u64>,
    pub quota_exceeded: bool,
    /// Days until the total quota fills at the 30-day growth rate. Absent
    /// without a quota, without growth, or when already full.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days_to_full: Option<f64>,
    pub databases: Vec<DatabaseQuota>,
    pub providers: Vec<ProviderQuota>,
    pub warnings: Vec<QuotaWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseQuota {
    pub database: String,
    pub quota: u64,
    pub used: u64,
    pub usage_percentage: f64,
    pub exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderQuota {
    pub provider: String,
    pub quota: u64,
    pub used: u64,
    pub usage_percentage: f64,
    pub exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaWarning {
    /// "total", "database" or "provider".
    pub scope: String,
    pub subject: String,
    pub severity: QuotaSeverity,
    pub usage_percentage: f64,
    pub message: String,
}

fn percent(used: u64, quota: u64) -> f64 {
    if quota == 0 {
        0.0
    } else {
        used as f64 / quota as f64 * 100.0
    }
}

fn classify(usage_percentage: f64, warning_threshold: f64) -> Option<QuotaSeverity> {
    if usage_percentage >= CRITICAL_PERCENT {
        Some(QuotaSeverity::Critical)
    } else if usage_percentage >= warning_threshold {
        Some(QuotaSeverity::Warning)
    } else {
        None
    }
}

/// Usage counted against quotas is the stored footprint, so compressed
/// sizes are what accumulate.
fn used_bytes(backups: &[Backup]) -> u64 {
    backups.iter().map(|b| b.compressed_size).sum()
}

/// Growth rate in bytes per day over the trailing 30 days.
fn recent_growth_per_day(backups: &[Backup], now: DateTime<Utc>) -> f64 {
    let window_start = now - Duration::days(30);
    let recent: u64 = backups
        .iter()
        .filter(|b| b.created_at >= window_start)
        .map(|b| b.compressed_size)
        .sum();
    recent as f64 / 30.0
}

/// Evaluate every configured quota scope against the snapshot.
pub fn check_quotas(backups: &[Backup], config: &QuotaConfig, now: DateTime<Utc>) -> QuotaStatus {
    let used = used_bytes(backups);
    let mut warnings = Vec::new();

    let (usage_percentage, available, exceeded) = match config.total_quota {
        Some(quota) => {
            let pct = percent(used, quota);
            (pct, Some(quota.saturating_sub(used)), used > quota)
        }
        None => (0.0, None, false),
    };

    if config.enabled && config.total_quota.is_some() {
        if let Some(severity) = classify(usage_percentage, TOTAL_WARNING_PERCENT) {
            warnings.push(QuotaWarning {
                scope: "total".to_string(),
                subject: "total".to_string(),
                severity,
                usage_percentage,
                message: format!(
                    "total storage at {:.1}% of quota ({} of {} bytes)",
                    usage_percentage,
                    used,
                    config.total_quota.unwrap_or(0)
                ),
            });
        }
    }

    let mut per_database: BTreeMap<&str, u64> = BTreeMap::new();
    for backup in backups {
        *per_database.entry(backup.database.as_str()).or_insert(0) += backup.compressed_size;
    }

    let databases = config
        .database_quotas
        .iter()
        .map(|(database, &quota)| {
            let db_used = per_database.get(database.as_str()).copied().unwrap_or(0);
            let pct = percent(db_used, quota);
            if config.enabled {
                if let Some(severity) = classify(pct, DATABASE_WARNING_PERCENT) {
                    warnings.push(QuotaWarning {
                        scope: "database".to_string(),
                        subject: database.clone(),
                        severity,
                        usage_percentage: pct,
                        message: format!("database {} at {:.1}% of its quota", database, pct),
                    });
                }
            }
            DatabaseQuota {
                database: database.clone(),
                quota,
                used: db_used,
                usage_percentage: pct,
                exceeded: db_used > quota,
            }
        })
        .collect();

    // Replicas carry the full corpus, so every provider scope is charged
    // the whole stored footprint.
    let providers = config
        .provider_quotas
        .iter()
        .map(|(provider, &quota)| {
            let pct = percent(used, quota);
            if config.enabled {
                if let Some(severity) = classify(pct, PROVIDER_WARNING_PERCENT) {
                    warnings.push(QuotaWarning {
                        scope: "provider".to_string(),
                        subject: provider.clone(),
                        severity,
                        usage_percentage: pct,
                        message: format!("provider {} at {:.1}% of its quota", provider, pct),
                    });
                }
            }
            ProviderQuota {
                provider: provider.clone(),
                quota,
                used,
                usage_percentage: pct,
                exceeded: used > quota,
            }
        })
        .collect();

    let estimated_days_to_full = match (config.total_quota, available) {
        (Some(_), Some(available)) if available > 0 => {
            let growth = recent_growth_per_day(backups, now);
            if growth > 0.0 {
                Some(available as f64 / growth)
            } else {
                None
            }
        }
        _ => None,
    };

    QuotaStatus {
        generated_at: now,
        enabled: config.enabled,
        total_quota: config.total_quota,
        used_storage: used,
        usage_percentage,
        available_storage: available,
        quota_exceeded: exceeded,
        estimated_days_to_full,
        databases,
        providers,
        warnings,
    }
}
