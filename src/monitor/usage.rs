use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Backup;

/// Usage snapshot over the whole backup corpus, recomputed per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub generated_at: DateTime<Utc>,
    pub total_backups: u64,
    pub total_size: u64,
    pub total_compressed_size: u64,
    /// total_compressed_size / total_size, 0 when total_size is 0.
    pub compression_ratio: f64,
    pub providers: Vec<ProviderUsage>,
    pub databases: Vec<DatabaseUsage>,
    pub age_groups: AgeGroupUsage,
}

/// Usage attributed to one provider. Replicas are byte-identical, so every
/// provider in a composition carries the full corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub provider: String,
    pub backup_count: u64,
    pub total_size: u64,
    pub total_compressed_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseUsage {
    pub database: String,
    pub backup_count: u64,
    pub total_size: u64,
    pub total_compressed_size: u64,
    pub compression_ratio: f64,
    pub oldest_backup: DateTime<Utc>,
    pub newest_backup: DateTime<Utc>,
}

/// Backups partitioned by age relative to the report's "now":
/// daily <= 24h, weekly <= 7d, monthly <= 30d, older beyond that.
/// Bucket counts always sum to the total backup count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupUsage {
    pub daily: AgeBucket,
    pub weekly: AgeBucket,
    pub monthly: AgeBucket,
    pub older: AgeBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub backup_count: u64,
    pub total_size: u64,
}

impl AgeBucket {
    fn add(&mut self, backup: &Backup) {
        self.backup_count += 1;
        self.total_size += backup.size;
    }
}

/// Per-database usage with histograms and a growth estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseUsageReport {
    pub generated_at: DateTime<Utc>,
    pub databases: Vec<DatabaseUsageDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseUsageDetail {
    pub database: String,
    pub backup_count: u64,
    pub total_size: u64,
    pub total_compressed_size: u64,
    /// Backup counts keyed by status name.
    pub status_counts: BTreeMap<String, u64>,
    /// Backup counts keyed by age bucket name.
    pub age_counts: BTreeMap<String, u64>,
    /// Absent when fewer than 2 backups exist or the span is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<GrowthEstimate>,
}

/// Simplified linear growth: total size divided by the elapsed days
/// between the oldest and newest backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub bytes_per_day: f64,
    pub projected_weekly: f64,
    pub projected_monthly: f64,
}

pub(crate) fn ratio(compressed: u64, raw: u64) -> f64 {
    if raw == 0 {
        0.0
    } else {
        compressed as f64 / raw as f64
    }
}

pub(crate) fn age_bucket_name(created_at: DateTime<Utc>, now: DateTime<Utc>) -> &'static str {
    let age = now - created_at;
    if age <= Duration::hours(24) {
        "daily"
    } else if age <= Duration::days(7) {
        "weekly"
    } else if age <= Duration::days(30) {
        "monthly"
    } else {
        "older"
    }
}

/// Single pass over the snapshot accumulating totals and breakdowns.
pub fn compute_usage(
    backups: &[Backup],
    provider_names: &[String],
    now: DateTime<Utc>,
) -> UsageReport {
    let mut total_size = 0u64;
    let mut total_compressed = 0u64;
    let mut age_groups = AgeGroupUsage::default();
    let mut by_database: BTreeMap<&str, (u64, u64, u64, DateTime<Utc>, DateTime<Utc>)> =
        BTreeMap::new();

    for backup in backups {
        total_size += backup.size;
        total_compressed += backup.compressed_size;

        match age_bucket_name(backup.created_at, now) {
            "daily" => age_groups.daily.add(backup),
            "weekly" => age_groups.weekly.add(backup),
            "monthly" => age_groups.monthly.add(backup),
            _ => age_groups.older.add(backup),
        }

        let entry = by_database.entry(backup.database.as_str()).or_insert((
            0,
            0,
            0,
            backup.created_at,
            backup.created_at,
        ));
        entry.0 += 1;
        entry.1 += backup.size;
        entry.2 += backup.compressed_size;
        entry.3 = entry.3.min(backup.created_at);
        entry.4 = entry.4.max(backup.created_at);
    }

    let databases = by_database
        .into_iter()
        .map(
            |(database, (count, size, compressed, oldest, newest))| DatabaseUsage {
                database: database.to_string(),
                backup_count: count,
                total_size: size,
                total_compressed_size: compressed,
                compression_ratio: ratio(compressed, size),
                oldest_backup: oldest,
                newest_backup: newest,
            },
        )
        .collect();

    let providers = provider_names
        .iter()
        .map(|name| ProviderUsage {
            provider: name.clone(),
            backup_count: backups.len() as u64,
            total_size,
            total_compressed_size: total_compressed,
        })
        .collect();

    UsageReport {
        generated_at: now,
        total_backups: backups.len() as u64,
        total_size,
        total_compressed_size: total_compressed,
        compression_ratio: ratio(total_compressed, total_size),
        providers,
        databases,
        age_groups,
    }
}

/// Per-database report with status/age histograms and the simplified
/// growth estimate.
pub fn compute_database_usage(backups: &[Backup], now: DateTime<Utc>) -> DatabaseUsageReport {
    let mut grouped: BTreeMap<&str, Vec<&Backup>> = BTreeMap::new();
    for backup in backups {
        grouped.entry(backup.database.as_str()).or_default().push(backup);
    }

    let databases = grouped
        .into_iter()
        .map(|(database, group)| {
            let mut status_counts = BTreeMap::new();
            let mut age_counts = BTreeMap::new();
            let mut total_size = 0u64;
            let mut total_compressed = 0u64;
            let mut oldest = group[0].created_at;
            let mut newest = group[0].created_at;

            for backup in &group {
                total_size += backup.size;
                total_compressed += backup.compressed_size;
                *status_counts
                    .entry(backup.status.as_str().to_string())
                    .or_insert(0) += 1;
                *age_counts
                    .entry(age_bucket_name(backup.created_at, now).to_string())
                    .or_insert(0) += 1;
                oldest = oldest.min(backup.created_at);
                newest = newest.max(backup.created_at);
            }

            let growth = if group.len() >= 2 && newest > oldest {
                let elapsed_days = (newest - oldest).num_seconds() as f64 / 86_400.0;
                let bytes_per_day = total_size as f64 / elapsed_days;
                Some(GrowthEstimate {
                    bytes_per_day,
                    projected_weekly: bytes_per_day * 7.0,
                    projected_monthly: bytes_per_day * 30.0,
                })
            } else {
                None
            };

            DatabaseUsageDetail {
                database: database.to_string(),
                backup_count: group.len() as u64,
                total_size,
                total_compressed_size: total_compressed,
                status_counts,
                age_counts,
                growth,
            }
        })
        .collect();

    DatabaseUsageReport {
        generated_at: now,
        databases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackupStatus, CompressionAlgorithm};
    use uuid::Uuid;

    fn backup(database: &str, age_hours: i64, size: u64, now: DateTime<Utc>) -> Backup {
        Backup {
            id: Uuid::new_v4(),
            database: database.to_string(),
            created_at: now - Duration::hours(age_hours),
            size,
            compressed_size: size / 2,
            compression: CompressionAlgorithm::Gzip,
            checksum: format!("sum-{}", age_hours),
            status: BackupStatus::Completed,
            tags: Vec::new(),
            description: None,
        }
    }

    #[test]
    fn age_buckets_partition_the_corpus() {
        let now = Utc::now();
        let backups = vec![
            backup("a", 1, 10, now),    // daily
            backup("a", 48, 10, now),   // weekly
            backup("b", 200, 10, now),  // monthly (~8.3 days)
            backup("b", 2000, 10, now), // older (~83 days)
        ];

        let report = compute_usage(&backups, &["local".to_string()], now);
        let bucket_total = report.age_groups.daily.backup_count
            + report.age_groups.weekly.backup_count
            + report.age_groups.monthly.backup_count
            + report.age_groups.older.backup_count;
        assert_eq!(bucket_total, report.total_backups);
        assert_eq!(report.age_groups.daily.backup_count, 1);
        assert_eq!(report.age_groups.weekly.backup_count, 1);
        assert_eq!(report.age_groups.monthly.backup_count, 1);
        assert_eq!(report.age_groups.older.backup_count, 1);
    }

    #[test]
    fn totals_are_sums_over_the_snapshot() {
        let now = Utc::now();
        let backups = vec![backup("a", 1, 100, now), backup("b", 2, 300, now)];
        let report = compute_usage(&backups, &["local".to_string()], now);
        assert_eq!(report.total_size, 400);
        assert_eq!(report.total_compressed_size, 200);
        assert!((report.compression_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_corpus_has_zero_ratio() {
        let now = Utc::now();
        let report = compute_usage(&[], &["local".to_string()], now);
        assert_eq!(report.compression_ratio, 0.0);
        assert_eq!(report.total_backups, 0);
    }

    #[test]
    fn growth_estimate_needs_two_distinct_timestamps() {
        let now = Utc::now();
        let single = vec![backup("a", 1, 100, now)];
        let report = compute_database_usage(&single, now);
        assert!(report.databases[0].growth.is_none());

        let pair = vec![backup("a", 1, 100, now), backup("a", 49, 100, now)];
        let report = compute_database_usage(&pair, now);
        let growth = report.databases[0].growth.as_ref().unwrap();
        // 200 bytes over 2 days
        assert!((growth.bytes_per_day - 100.0).abs() < 1.0);
        assert!((growth.projected_weekly - growth.bytes_per_day * 7.0).abs() < 1e-9);
    }
}
