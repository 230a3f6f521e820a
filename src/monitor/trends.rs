use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Backup;
use crate::monitor::usage::ratio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Growth and frequency analysis over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub generated_at: DateTime<Utc>,
    pub period_days: i64,
    /// Backups created inside the window.
    pub backup_count: u64,
    /// Raw bytes added inside the window.
    pub total_growth: u64,
    pub growth_rate_per_day: f64,
    pub trend: TrendDirection,
    pub database_trends: Vec<DatabaseTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<BackupFrequencyTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<UsagePrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseTrend {
    pub database: String,
    pub backup_count: u64,
    pub total_size: u64,
    pub trend: TrendDirection,
}

/// Backup cadence comparison between the two halves of the window.
/// Only produced once the window spans at least 14 days of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFrequencyTrend {
    pub first_half_count: u64,
    pub second_half_count: u64,
    pub trend: TrendDirection,
}

/// First vs last quartile of backups ordered by creation time. A lower
/// ratio means better compression, so the direction tracks efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionTrend {
    pub first_quartile_ratio: f64,
    pub last_quartile_ratio: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePrediction {
    /// Raw size of the entire corpus, not just the window.
    pub current_usage: u64,
    pub daily_growth: f64,
    pub predicted_30d: f64,
    pub predicted_90d: f64,
    pub predicted_365d: f64,
    /// 0.8 with 10+ window backups, 0.6 with 5+, 0.5 below that.
    pub confidence: f64,
}

/// Compare two magnitudes; changes within the threshold are stable.
fn direction(first: f64, second: f64, threshold: f64) -> TrendDirection {
    if first <= 0.0 {
        return if second > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        };
    }
    let change = (second - first) / first;
    if change > threshold {
        TrendDirection::Increasing
    } else if change < -threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn halves<'a>(sorted: &'a [&'a Backup]) -> (&'a [&'a Backup], &'a [&'a Backup]) {
    sorted.split_at(sorted.len() / 2)
}

fn size_trend(sorted: &[&Backup]) -> TrendDirection {
    if sorted.len() < 2 {
        return TrendDirection::Stable;
    }
    let (first, second) = halves(sorted);
    let first_size: u64 = first.iter().map(|b| b.size).sum();
    let second_size: u64 = second.iter().map(|b| b.size).sum();
    direction(first_size as f64, second_size as f64, 0.10)
}

fn frequency_trend(sorted: &[&Backup]) -> Option<BackupFrequencyTrend> {
    let oldest = sorted.first()?.created_at;
    let newest = sorted.last()?.created_at;
    if newest - oldest < Duration::days(14) {
        return None;
    }
    let (first, second) = halves(sorted);
    Some(BackupFrequencyTrend {
        first_half_count: first.len() as u64,
        second_half_count: second.len() as u64,
        trend: direction(first.len() as f64, second.len() as f64, 0.20),
    })
}

fn compression_trend(sorted: &[&Backup]) -> Option<CompressionTrend> {
    let quartile = sorted.len() / 4;
    if quartile == 0 {
        return None;
    }
    let first = &sorted[..quartile];
    let last = &sorted[sorted.len() - quartile..];

    let first_ratio = ratio(
        first.iter().map(|b| b.compressed_size).sum(),
        first.iter().map(|b| b.size).sum(),
    );
    let last_ratio = ratio(
        last.iter().map(|b| b.compressed_size).sum(),
        last.iter().map(|b| b.size).sum(),
    );

    // A shrinking ratio is an efficiency gain.
    let trend = match direction(first_ratio, last_ratio, 0.05) {
        TrendDirection::Increasing => TrendDirection::Decreasing,
        TrendDirection::Decreasing => TrendDirection::Increasing,
        TrendDirection::Stable => TrendDirection::Stable,
    };

    Some(CompressionTrend {
        first_quartile_ratio: first_ratio,
        last_quartile_ratio: last_ratio,
        trend,
    })
}

fn prediction(all: &[Backup], daily_growth: f64, window_count: usize) -> Option<UsagePrediction> {
    if window_count == 0 {
        return None;
    }
    let current: u64 = all.iter().map(|b| b.size).sum();
    let confidence = if window_count >= 10 {
        0.8
    } else if window_count >= 5 {
        0.6
    } else {
        0.5
    };
    Some(UsagePrediction {
        current_usage: current,
        daily_growth,
        predicted_30d: current as f64 + daily_growth * 30.0,
        predicted_90d: current as f64 + daily_growth * 90.0,
        predicted_365d: current as f64 + daily_growth * 365.0,
        confidence,
    })
}

/// Analyze the trailing `period_days` window of the snapshot.
pub fn compute_trends(backups: &[Backup], period_days: i64, now: DateTime<Utc>) -> TrendReport {
    let window_start = now - Duration::days(period_days);
    let mut window: Vec<&Backup> = backups
        .iter()
        .filter(|b| b.created_at >= window_start)
        .collect();
    window.sort_by_key(|b| b.created_at);

    let total_growth: u64 = window.iter().map(|b| b.size).sum();
    let growth_rate_per_day = total_growth as f64 / period_days.max(1) as f64;

    let mut by_database: BTreeMap<&str, Vec<&Backup>> = BTreeMap::new();
    for &backup in &window {
        by_database.entry(backup.database.as_str()).or_default().push(backup);
    }
    let database_trends = by_database
        .into_iter()
        .map(|(database, group)| DatabaseTrend {
            database: database.to_string(),
            backup_count: group.len() as u64,
            total_size: group.iter().map(|b| b.size).sum(),
            trend: size_trend(&group),
        })
        .collect();

    TrendReport {
        generated_at: now,
        period_days,
        backup_count: window.len() as u64,
        total_growth,
        growth_rate_per_day,
        trend: size_trend(&window),
        database_trends,
        frequency: frequency_trend(&window),
        compression: compression_trend(&window),
        prediction: prediction(backups, growth_rate_per_day, window.len()),
    }
}
