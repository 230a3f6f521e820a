use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::model::Backup;

/// Compression ratios above this are treated as barely compressed.
pub const POOR_COMPRESSION_RATIO: f64 = 0.9;
/// Assumed savings when enabling compression on an uncompressed backup.
pub const ASSUMED_COMPRESSION_SAVINGS: f64 = 0.3;
/// Backups older than this many days are cleanup candidates.
pub const RETENTION_CUTOFF_DAYS: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub generated_at: DateTime<Utc>,
    pub compression: CompressionAnalysis,
    pub retention: RetentionAnalysis,
    pub duplication: DuplicationAnalysis,
    pub recommendations: Vec<Recommendation>,
    /// Sum of the three per-analysis savings figures. The analyses can
    /// overlap (an old uncompressed duplicate counts in all three), so
    /// this is an upper bound, not an achievable total.
    pub total_potential_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionAnalysis {
    pub uncompressed_backups: Vec<Uuid>,
    pub poorly_compressed_backups: Vec<Uuid>,
    pub potential_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionAnalysis {
    pub cleanup_candidates: Vec<Uuid>,
    pub cutoff_days: i64,
    pub potential_savings: f64,
    /// 1 - eligible/total; 1.0 for an empty corpus.
    pub retention_effectiveness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationAnalysis {
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub potential_savings: f64,
}

/// Backups sharing a checksum. Keeping one copy frees the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub checksum: String,
    pub backup_count: u64,
    pub total_size: u64,
    pub potential_savings: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// "compression", "retention" or "duplication".
    pub category: String,
    pub priority: Priority,
    pub description: String,
    pub estimated_savings: f64,
}

fn analyze_compression(backups: &[Backup]) -> CompressionAnalysis {
    let mut uncompressed = Vec::new();
    let mut poorly_compressed = Vec::new();
    let mut savings = 0.0;

    for backup in backups {
        if backup.compression.is_none() {
            uncompressed.push(backup.id);
            savings += backup.size as f64 * ASSUMED_COMPRESSION_SAVINGS;
        } else if backup.compression_ratio() > POOR_COMPRESSION_RATIO {
            poorly_compressed.push(backup.id);
        }
    }

    CompressionAnalysis {
        uncompressed_backups: uncompressed,
        poorly_compressed_backups: poorly_compressed,
        potential_savings: savings,
    }
}

fn analyze_retention(backups: &[Backup], now: DateTime<Utc>) -> RetentionAnalysis {
    let cutoff = now - Duration::days(RETENTION_CUTOFF_DAYS);
    let mut candidates = Vec::new();
    let mut savings = 0u64;

    for backup in backups {
        if backup.created_at < cutoff {
            candidates.push(backup.id);
            savings += backup.compressed_size;
        }
    }

    let effectiveness = if backups.is_empty() {
        1.0
    } else {
        1.0 - candidates.len() as f64 / backups.len() as f64
    };

    RetentionAnalysis {
        cleanup_candidates: candidates,
        cutoff_days: RETENTION_CUTOFF_DAYS,
        potential_savings: savings as f64,
        retention_effectiveness: effectiveness,
    }
}

fn analyze_duplication(backups: &[Backup]) -> DuplicationAnalysis {
    let mut by_checksum: BTreeMap<&str, Vec<&Backup>> = BTreeMap::new();
    for backup in backups {
        if !backup.checksum.is_empty() {
            by_checksum.entry(backup.checksum.as_str()).or_default().push(backup);
        }
    }

    let mut groups = Vec::new();
    let mut savings = 0u64;
    for (checksum, members) in by_checksum {
        if members.len() < 2 {
            continue;
        }
        let total_size: u64 = members.iter().map(|b| b.size).sum();
        // One copy is kept, the largest stays conservative.
        let kept = members.iter().map(|b| b.size).max().unwrap_or(0);
        let group_savings = total_size - kept;
        savings += group_savings;
        groups.push(DuplicateGroup {
            checksum: checksum.to_string(),
            backup_count: members.len() as u64,
            total_size,
            potential_savings: group_savings,
        });
    }

    DuplicationAnalysis {
        duplicate_groups: groups,
        potential_savings: savings as f64,
    }
}

fn build_recommendations(
    compression: &CompressionAnalysis,
    retention: &RetentionAnalysis,
    duplication: &DuplicationAnalysis,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !compression.uncompressed_backups.is_empty() {
        recommendations.push(Recommendation {
            category: "compression".to_string(),
            priority: Priority::High,
            description: format!(
                "{} backups are stored uncompressed; enabling compression saves roughly 30% of their size",
                compression.uncompressed_backups.len()
            ),
            estimated_savings: compression.potential_savings,
        });
    } else if !compression.poorly_compressed_backups.is_empty() {
        recommendations.push(Recommendation {
            category: "compression".to_string(),
            priority: Priority::Medium,
            description: format!(
                "{} backups compress poorly (ratio above {:.0}%); consider a stronger algorithm",
                compression.poorly_compressed_backups.len(),
                POOR_COMPRESSION_RATIO * 100.0
            ),
            estimated_savings: 0.0,
        });
    }

    if !retention.cleanup_candidates.is_empty() {
        recommendations.push(Recommendation {
            category: "retention".to_string(),
            priority: Priority::Medium,
            description: format!(
                "{} backups are older than {} days and eligible for cleanup",
                retention.cleanup_candidates.len(),
                retention.cutoff_days
            ),
            estimated_savings: retention.potential_savings,
        });
    }

    if !duplication.duplicate_groups.is_empty() {
        recommendations.push(Recommendation {
            category: "duplication".to_string(),
            priority: Priority::Low,
            description: format!(
                "{} checksum groups contain duplicate backups",
                duplication.duplicate_groups.len()
            ),
            estimated_savings: duplication.potential_savings,
        });
    }

    recommendations
}

/// Full optimization pass over the snapshot.
pub fn compute_optimizations(backups: &[Backup], now: DateTime<Utc>) -> OptimizationReport {
    let compression = analyze_compression(backups);
    let retention = analyze_retention(backups, now);
    let duplication = analyze_duplication(backups);
    let recommendations = build_recommendations(&compression, &retention, &duplication);
    let total_potential_savings =
        compression.potential_savings + retention.potential_savings + duplication.potential_savings;

    OptimizationReport {
        generated_at: now,
        compression,
        retention,
        duplication,
        recommendations,
        total_potential_savings,
    }
}
