mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use common::{test_backup, test_backup_aged, FailingProvider, RecordingProvider};
use schemasync_storage::catalog::InMemoryCatalog;
use schemasync_storage::model::CompressionAlgorithm;
use schemasync_storage::monitor::{
    HealthLevel, QuotaConfig, QuotaSeverity, StorageMonitor, TrendDirection,
};
use schemasync_storage::notify::AlertSeverity;
use schemasync_storage::storage::{LocalConfig, LocalProvider, StorageProvider};

async fn local_provider(dir: &TempDir) -> Arc<dyn StorageProvider> {
    Arc::new(
        LocalProvider::new(LocalConfig {
            base_path: dir.path().to_string_lossy().to_string(),
            create_dirs: Some(true),
        })
        .await
        .unwrap(),
    )
}

fn monitor_with(
    backups: Vec<schemasync_storage::model::Backup>,
    provider: Arc<dyn StorageProvider>,
    quotas: QuotaConfig,
) -> StorageMonitor {
    StorageMonitor::new(Arc::new(InMemoryCatalog::new(backups)), provider, quotas)
}

#[tokio::test]
async fn usage_report_sums_the_catalog() {
    let dir = TempDir::new().unwrap();
    let backups = vec![
        test_backup_aged("orders", 1, 1000, 400),
        test_backup_aged("orders", 2, 1000, 400),
        test_backup_aged("billing", 3, 500, 200),
    ];
    let monitor = monitor_with(backups, local_provider(&dir).await, QuotaConfig::default());

    let usage = monitor.storage_usage().await.unwrap();
    assert_eq!(usage.total_backups, 3);
    assert_eq!(usage.total_size, 2500);
    assert_eq!(usage.total_compressed_size, 1000);
    assert!((usage.compression_ratio - 0.4).abs() < 1e-9);
    assert_eq!(usage.databases.len(), 2);

    let orders = usage.databases.iter().find(|d| d.database == "orders").unwrap();
    assert_eq!(orders.backup_count, 2);
    assert_eq!(orders.total_size, 2000);
}

#[tokio::test]
async fn every_report_round_trips_through_json() {
    let dir = TempDir::new().unwrap();
    let quotas = QuotaConfig {
        enabled: true,
        total_quota: Some(10_000),
        ..Default::default()
    };
    let monitor = monitor_with(
        vec![
            test_backup("orders"),
            test_backup_aged("billing", 3, 500, 200),
        ],
        local_provider(&dir).await,
        quotas,
    );

    let usage = monitor.storage_usage().await.unwrap();
    let parsed: schemasync_storage::monitor::UsageReport =
        serde_json::from_str(&serde_json::to_string(&usage).unwrap()).unwrap();
    assert_eq!(parsed, usage);

    let quota = monitor.quota_status().await.unwrap();
    let parsed: schemasync_storage::monitor::QuotaStatus =
        serde_json::from_str(&serde_json::to_string(&quota).unwrap()).unwrap();
    assert_eq!(parsed, quota);

    let health = monitor.health_report().await.unwrap();
    let parsed: schemasync_storage::monitor::HealthReport =
        serde_json::from_str(&serde_json::to_string(&health).unwrap()).unwrap();
    assert_eq!(parsed, health);

    let trends = monitor.trend_report(30).await.unwrap();
    let parsed: schemasync_storage::monitor::TrendReport =
        serde_json::from_str(&serde_json::to_string(&trends).unwrap()).unwrap();
    assert_eq!(parsed, trends);
}

#[tokio::test]
async fn quota_status_flags_a_nearly_full_total() {
    let dir = TempDir::new().unwrap();
    let quotas = QuotaConfig {
        enabled: true,
        total_quota: Some(100),
        ..Default::default()
    };
    // 95 of 100 bytes used.
    let monitor = monitor_with(
        vec![test_backup_aged("orders", 1, 200, 95)],
        local_provider(&dir).await,
        quotas,
    );

    let status = monitor.quota_status().await.unwrap();
    assert!((status.usage_percentage - 95.0).abs() < 1e-9);
    assert!(!status.quota_exceeded);
    assert_eq!(status.warnings.len(), 1);
    assert_eq!(status.warnings[0].severity, QuotaSeverity::Critical);
}

#[tokio::test]
async fn optimization_report_covers_all_three_analyses() {
    let dir = TempDir::new().unwrap();
    let mut uncompressed_a = test_backup_aged("orders", 1, 1000, 1000);
    uncompressed_a.compression = CompressionAlgorithm::None;
    let mut uncompressed_b = test_backup_aged("orders", 2, 500, 500);
    uncompressed_b.compression = CompressionAlgorithm::None;
    let old = test_backup_aged("orders", 120, 400, 100);
    let mut dup_a = test_backup_aged("billing", 3, 300, 100);
    dup_a.checksum = "same".to_string();
    let mut dup_b = test_backup_aged("billing", 4, 300, 100);
    dup_b.checksum = "same".to_string();

    let monitor = monitor_with(
        vec![uncompressed_a, uncompressed_b, old, dup_a, dup_b],
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    let report = monitor.optimization_report().await.unwrap();
    assert_eq!(report.compression.uncompressed_backups.len(), 2);
    assert!((report.compression.potential_savings - 0.3 * 1500.0).abs() < 1e-9);
    assert_eq!(report.retention.cleanup_candidates.len(), 1);
    assert_eq!(report.duplication.duplicate_groups.len(), 1);
    assert_eq!(report.duplication.duplicate_groups[0].potential_savings, 300);
    assert_eq!(report.recommendations.len(), 3);
}

#[tokio::test]
async fn health_report_is_healthy_with_a_working_provider() {
    let dir = TempDir::new().unwrap();
    let monitor = monitor_with(
        vec![test_backup("orders")],
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    let report = monitor.health_report().await.unwrap();
    assert_eq!(report.overall_health, HealthLevel::Healthy);
    assert!(report.connectivity.ok);
    assert!(report.issues.is_empty());
}

#[tokio::test]
async fn health_report_goes_critical_when_the_provider_fails() {
    let monitor = monitor_with(
        vec![test_backup("orders")],
        Arc::new(FailingProvider::new("broken")),
        QuotaConfig::default(),
    );

    let report = monitor.health_report().await.unwrap();
    assert_eq!(report.overall_health, HealthLevel::Critical);
    assert!(!report.connectivity.ok);

    let summary = monitor.health_summary().await.unwrap();
    assert_eq!(summary.overall_health, HealthLevel::Critical);
    assert!(summary.critical_issues >= 1);
    assert!(!summary.recommended_actions.is_empty());
}

#[tokio::test]
async fn trend_report_sees_recent_growth() {
    let dir = TempDir::new().unwrap();
    let backups = vec![
        test_backup_aged("orders", 25, 100, 50),
        test_backup_aged("orders", 20, 100, 50),
        test_backup_aged("orders", 10, 300, 150),
        test_backup_aged("orders", 2, 400, 200),
    ];
    let monitor = monitor_with(backups, local_provider(&dir).await, QuotaConfig::default());

    let report = monitor.trend_report(30).await.unwrap();
    assert_eq!(report.backup_count, 4);
    assert_eq!(report.total_growth, 900);
    assert_eq!(report.trend, TrendDirection::Increasing);
    let prediction = report.prediction.unwrap();
    assert_eq!(prediction.current_usage, 900);
    assert!(prediction.predicted_30d > prediction.current_usage as f64);
}

#[tokio::test]
async fn storage_alerts_fire_on_thresholds() {
    let dir = TempDir::new().unwrap();
    let mut huge = test_backup("orders");
    huge.size = 11 * 1024 * 1024 * 1024;
    huge.compressed_size = 10 * 1024 * 1024 * 1024;
    let monitor = monitor_with(vec![huge], local_provider(&dir).await, QuotaConfig::default());

    let alerts = monitor.storage_alerts().await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .any(|a| a.alert_type == "storage-usage" && a.severity == AlertSeverity::Warning));
    assert!(alerts
        .iter()
        .any(|a| a.alert_type == "compression-efficiency" && a.severity == AlertSeverity::Info));
}

#[tokio::test]
async fn usage_breakdown_names_every_composition_member() {
    let primary = Arc::new(RecordingProvider::new("s3 (primary)")) as Arc<dyn StorageProvider>;
    let secondary = Arc::new(RecordingProvider::new("local (replica)")) as Arc<dyn StorageProvider>;
    let multi = Arc::new(
        schemasync_storage::storage::MultiStorageProvider::new(vec![primary, secondary]).unwrap(),
    );
    let monitor = monitor_with(
        vec![test_backup_aged("orders", 1, 1000, 400)],
        multi,
        QuotaConfig::default(),
    );

    let usage = monitor.storage_usage().await.unwrap();
    let names: Vec<&str> = usage.providers.iter().map(|p| p.provider.as_str()).collect();
    assert_eq!(names, vec!["s3 (primary)", "local (replica)"]);
    // Replicas are byte-identical, so each member carries the full corpus.
    assert!(usage.providers.iter().all(|p| p.total_size == 1000));
}

#[tokio::test]
async fn database_usage_report_buckets_by_age_and_status() {
    let dir = TempDir::new().unwrap();
    let backups = vec![
        test_backup_aged("orders", 0, 100, 50),
        test_backup_aged("orders", 10, 100, 50),
    ];
    let monitor = monitor_with(backups, local_provider(&dir).await, QuotaConfig::default());

    let report = monitor.usage_by_database().await.unwrap();
    assert_eq!(report.databases.len(), 1);
    let orders = &report.databases[0];
    assert_eq!(orders.backup_count, 2);
    assert_eq!(orders.status_counts.get("completed"), Some(&2));
    assert_eq!(orders.age_counts.get("daily"), Some(&1));
    assert_eq!(orders.age_counts.get("monthly"), Some(&1));
    assert!(orders.growth.is_some());
}

#[tokio::test]
async fn quota_time_to_full_reflects_recent_growth() {
    let dir = TempDir::new().unwrap();
    let quotas = QuotaConfig {
        enabled: true,
        total_quota: Some(1000),
        ..Default::default()
    };
    // 300 bytes stored within the trailing 30 days.
    let monitor = monitor_with(
        vec![test_backup_aged("orders", 5, 600, 300)],
        local_provider(&dir).await,
        quotas,
    );

    let status = monitor.quota_status().await.unwrap();
    let days = status.estimated_days_to_full.unwrap();
    assert!((days - 70.0).abs() < 1e-6);
}

#[tokio::test]
async fn reports_are_recomputed_from_the_live_catalog() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new(vec![test_backup("orders")]));
    let monitor = StorageMonitor::new(
        catalog.clone(),
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    assert_eq!(monitor.storage_usage().await.unwrap().total_backups, 1);
    catalog
        .replace(vec![test_backup("orders"), test_backup("billing")])
        .await;
    assert_eq!(monitor.storage_usage().await.unwrap().total_backups, 2);
}

#[tokio::test]
async fn rollback_candidates_are_scoped_to_the_database() {
    let dir = TempDir::new().unwrap();
    let newest = test_backup_aged("orders", 1, 100, 50);
    let older = test_backup_aged("orders", 5, 100, 50);
    let other = test_backup_aged("billing", 1, 100, 50);
    let monitor = monitor_with(
        vec![older.clone(), other, newest.clone()],
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    let candidates = monitor.rollback_candidates("orders").await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, newest.id);
    assert_eq!(candidates[1].id, older.id);
    assert!(candidates[0].created_at > candidates[1].created_at);
}

#[tokio::test]
async fn old_backups_fall_outside_the_trend_window() {
    let dir = TempDir::new().unwrap();
    let recent = test_backup_aged("orders", 5, 100, 50);
    let ancient = test_backup_aged("orders", 200, 100, 50);
    let monitor = monitor_with(
        vec![recent, ancient],
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    let report = monitor.trend_report(30).await.unwrap();
    assert_eq!(report.backup_count, 1);
    assert_eq!(report.total_growth, 100);
    // Prediction still covers the whole corpus.
    assert_eq!(report.prediction.unwrap().current_usage, 200);
}

#[tokio::test]
async fn age_buckets_use_the_report_timestamp() {
    let dir = TempDir::new().unwrap();
    let mut boundary = test_backup("orders");
    boundary.created_at = Utc::now() - Duration::hours(23);
    let monitor = monitor_with(
        vec![boundary],
        local_provider(&dir).await,
        QuotaConfig::default(),
    );

    let usage = monitor.storage_usage().await.unwrap();
    assert_eq!(usage.age_groups.daily.backup_count, 1);
    assert_eq!(usage.age_groups.weekly.backup_count, 0);
}
