use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::model::Backup;
use crate::storage::config::DEFAULT_REPLICATION_TIMEOUT_SECS;
use crate::storage::provider::{
    OpContext, ProviderHealthState, ProviderKind, StorageError, StorageListFilter,
    StorageProvider, StoredBackupMetadata,
};

/// Health of one member provider inside a composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberHealth {
    pub provider: String,
    pub state: ProviderHealthState,
}

/// Composition of several providers with a primary/secondary order.
///
/// The first provider is the primary. Writes land on the primary and are
/// best-effort replicated to every secondary; reads fail over down the
/// order; deletes succeed when at least one member succeeds. Partial
/// failure is the expected steady state: durability somewhere beats full
/// redundancy.
pub struct MultiStorageProvider {
    providers: Vec<Arc<dyn StorageProvider>>,
    replication_timeout: Duration,
}

impl MultiStorageProvider {
    /// `providers` is ordered: primary first, then secondaries in failover
    /// order. At least one provider is required.
    pub fn new(providers: Vec<Arc<dyn StorageProvider>>) -> Result<Self, StorageError> {
        Self::with_replication_timeout(
            providers,
            Duration::from_secs(DEFAULT_REPLICATION_TIMEOUT_SECS),
        )
    }

    pub fn with_replication_timeout(
        providers: Vec<Arc<dyn StorageProvider>>,
        replication_timeout: Duration,
    ) -> Result<Self, StorageError> {
        if providers.is_empty() {
            return Err(StorageError::Validation {
                field: "multi.providers".to_string(),
                message: "at least one provider is required".to_string(),
            });
        }
        Ok(Self {
            providers,
            replication_timeout,
        })
    }

    fn primary(&self) -> &Arc<dyn StorageProvider> {
        &self.providers[0]
    }

    fn secondaries(&self) -> &[Arc<dyn StorageProvider>] {
        &self.providers[1..]
    }

    /// Replicate a successful primary write to every secondary. Each
    /// secondary gets its own bounded deadline so one unreachable replica
    /// cannot stall the return path; failures are logged and swallowed.
    async fn replicate_to_secondaries(&self, backup: &Backup) {
        let replication_ctx = OpContext::with_timeout(self.replication_timeout);
        let tasks = self.secondaries().iter().map(|provider| {
            let provider = provider.clone();
            let backup = backup.clone();
            async move {
                let name = provider.name();
                (name, provider.store(&backup, &replication_ctx).await)
            }
        });

        for (name, outcome) in join_all(tasks).await {
            if let Err(e) = outcome {
                log::warn!(
                    "replication of backup {} to secondary {} failed: {}",
                    backup.id,
                    name,
                    e
                );
            }
        }
    }

    /// Health of every member. Members without the health-check capability
    /// report `NotApplicable` rather than a failure.
    pub async fn member_health(&self, ctx: &OpContext) -> Vec<MemberHealth> {
        let tasks = self.providers.iter().map(|provider| {
            let provider = provider.clone();
            let ctx = *ctx;
            async move {
                let state = if provider.supports_health_check() {
                    provider.health_check(&ctx).await
                } else {
                    ProviderHealthState::NotApplicable
                };
                MemberHealth {
                    provider: provider.name(),
                    state,
                }
            }
        });
        join_all(tasks).await
    }
}

#[async_trait]
impl StorageProvider for MultiStorageProvider {
    /// Primary-first write with best-effort replication. On primary
    /// failure, secondaries are tried in order and the first acceptance
    /// wins; the call fails only when every member rejects it.
    async fn store(&self, backup: &Backup, ctx: &OpContext) -> Result<(), StorageError> {
        match self.primary().store(backup, ctx).await {
            Ok(()) => {
                self.replicate_to_secondaries(backup).await;
                Ok(())
            }
            Err(primary_err) => {
                log::warn!(
                    "primary {} rejected backup {}: {}",
                    self.primary().name(),
                    backup.id,
                    primary_err
                );
                let mut failures = vec![(self.primary().name(), primary_err)];

                for secondary in self.secondaries() {
                    match secondary.store(backup, ctx).await {
                        Ok(()) => {
                            log::info!(
                                "backup {} stored on secondary {} after primary failure",
                                backup.id,
                                secondary.name()
                            );
                            return Ok(());
                        }
                        Err(e) => failures.push((secondary.name(), e)),
                    }
                }

                Err(StorageError::aggregate(failures))
            }
        }
    }

    /// Failover read: providers in order, first success wins.
    async fn retrieve(&self, id: Uuid, ctx: &OpContext) -> Result<Backup, StorageError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.retrieve(id, ctx).await {
                Ok(backup) => return Ok(backup),
                Err(e) => failures.push((provider.name(), e)),
            }
        }
        Err(StorageError::aggregate(failures))
    }

    /// Best-effort delete on every member; overall success iff at least
    /// one member succeeds.
    async fn delete(&self, id: Uuid, ctx: &OpContext) -> Result<(), StorageError> {
        let tasks = self.providers.iter().map(|provider| {
            let provider = provider.clone();
            let ctx = *ctx;
            async move { (provider.name(), provider.delete(id, &ctx).await) }
        });

        let mut failures = Vec::new();
        let mut any_succeeded = false;
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => any_succeeded = true,
                Err(e) => {
                    log::warn!("delete of backup {} on {} failed: {}", id, name, e);
                    failures.push((name, e));
                }
            }
        }

        if any_succeeded {
            Ok(())
        } else {
            Err(StorageError::aggregate(failures))
        }
    }

    /// Replicas are byte-identical, so listings delegate to the primary.
    async fn list(
        &self,
        filter: &StorageListFilter,
        ctx: &OpContext,
    ) -> Result<Vec<StoredBackupMetadata>, StorageError> {
        self.primary().list(filter, ctx).await
    }

    async fn get_metadata(
        &self,
        id: Uuid,
        ctx: &OpContext,
    ) -> Result<StoredBackupMetadata, StorageError> {
        self.primary().get_metadata(id, ctx).await
    }

    async fn test_connection(&self, ctx: &OpContext) -> Result<(), StorageError> {
        // The composition is usable as long as the primary answers.
        self.primary().test_connection(ctx).await?;
        for secondary in self.secondaries() {
            if let Err(e) = secondary.test_connection(ctx).await {
                log::warn!("secondary {} connection test failed: {}", secondary.name(), e);
            }
        }
        Ok(())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Multi
    }

    /// Usage breakdowns name each member, not the composition itself.
    fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn supports_health_check(&self) -> bool {
        true
    }

    async fn health_check(&self, ctx: &OpContext) -> ProviderHealthState {
        let members = self.member_health(ctx).await;
        let primary_name = self.primary().name();

        // The composition stands or falls with its primary; secondary
        // failures are reported per-member via member_health.
        for member in &members {
            if member.provider == primary_name {
                if let ProviderHealthState::Unhealthy { error } = &member.state {
                    return ProviderHealthState::Unhealthy {
                        error: format!("primary {}: {}", primary_name, error),
                    };
                }
            } else if matches!(member.state, ProviderHealthState::Unhealthy { .. }) {
                log::warn!("secondary {} is unhealthy", member.provider);
            }
        }
        ProviderHealthState::Healthy
    }

    fn provider_info(&self) -> HashMap<String, String> {
        let mut info = HashMap::new();
        info.insert("provider".to_string(), "multi".to_string());
        info.insert("primary".to_string(), self.primary().name());
        info.insert(
            "secondaries".to_string(),
            self.secondaries()
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", "),
        );
        info.insert(
            "replication_timeout_secs".to_string(),
            self.replication_timeout.as_secs().to_string(),
        );
        info
    }
}
