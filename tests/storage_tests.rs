mod common;

use tempfile::TempDir;

use common::test_backup;
use schemasync_storage::storage::{
    LocalConfig, LocalProvider, OpContext, ProviderHealthState, StorageConfig, StorageError,
    StorageListFilter, StorageProvider, StorageProviderFactory,
};

fn local_config(dir: &TempDir) -> LocalConfig {
    LocalConfig {
        base_path: dir.path().to_string_lossy().to_string(),
        create_dirs: Some(true),
    }
}

#[tokio::test]
async fn local_provider_store_retrieve_delete() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();
    let ctx = OpContext::unbounded();
    let backup = test_backup("orders");

    provider.store(&backup, &ctx).await.unwrap();
    let retrieved = provider.retrieve(backup.id, &ctx).await.unwrap();
    assert_eq!(retrieved, backup);

    let meta = provider.get_metadata(backup.id, &ctx).await.unwrap();
    assert_eq!(meta.id, backup.id);
    assert_eq!(meta.checksum, backup.checksum);

    provider.delete(backup.id, &ctx).await.unwrap();
    let err = provider.retrieve(backup.id, &ctx).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn store_overwrites_existing_artifact() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();
    let ctx = OpContext::unbounded();

    let mut backup = test_backup("orders");
    provider.store(&backup, &ctx).await.unwrap();
    backup.description = Some("rewritten".to_string());
    provider.store(&backup, &ctx).await.unwrap();

    let retrieved = provider.retrieve(backup.id, &ctx).await.unwrap();
    assert_eq!(retrieved.description.as_deref(), Some("rewritten"));

    let listed = provider
        .list(&StorageListFilter::default(), &ctx)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn delete_of_missing_id_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();
    let ctx = OpContext::unbounded();
    provider.delete(uuid::Uuid::new_v4(), &ctx).await.unwrap();
}

#[tokio::test]
async fn list_applies_database_filter() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();
    let ctx = OpContext::unbounded();

    provider.store(&test_backup("orders"), &ctx).await.unwrap();
    provider.store(&test_backup("orders"), &ctx).await.unwrap();
    provider.store(&test_backup("billing"), &ctx).await.unwrap();

    let filter = StorageListFilter {
        database: Some("orders".to_string()),
        ..Default::default()
    };
    let listed = provider.list(&filter, &ctx).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|m| m.database == "orders"));
}

#[tokio::test]
async fn local_provider_reports_health() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();
    let ctx = OpContext::unbounded();

    assert!(provider.supports_health_check());
    provider.test_connection(&ctx).await.unwrap();
    assert_eq!(provider.health_check(&ctx).await, ProviderHealthState::Healthy);
}

#[tokio::test]
async fn expired_deadline_cancels_before_io() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(local_config(&dir)).await.unwrap();

    let ctx = OpContext::with_timeout(std::time::Duration::ZERO);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let err = provider.store(&test_backup("orders"), &ctx).await.unwrap_err();
    assert!(matches!(err, StorageError::Cancelled));
}

#[tokio::test]
async fn factory_builds_a_local_provider() {
    let dir = TempDir::new().unwrap();
    let provider = StorageProviderFactory::create_provider(StorageConfig::local(local_config(&dir)))
        .await
        .unwrap();

    let ctx = OpContext::unbounded();
    let backup = test_backup("orders");
    provider.store(&backup, &ctx).await.unwrap();
    assert_eq!(provider.retrieve(backup.id, &ctx).await.unwrap(), backup);
}
