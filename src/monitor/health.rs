use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::optimize::{OptimizationReport, Priority};
use crate::monitor::quota::{QuotaSeverity, QuotaStatus};
use crate::storage::ProviderHealthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

impl HealthLevel {
    /// Overall health only ever escalates while a report is assembled.
    pub fn escalate(self, other: HealthLevel) -> HealthLevel {
        self.max(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub severity: IssueSeverity,
    /// "connectivity", "quota" or "optimization".
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

/// Outcome of the timed listing probe against the active provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityProbe {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub state: ProviderHealthState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub overall_health: HealthLevel,
    pub connectivity: ConnectivityProbe,
    pub providers: Vec<ProviderHealth>,
    pub issues: Vec<HealthIssue>,
}

/// Condensed view of a health report for alert channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub generated_at: DateTime<Utc>,
    pub overall_health: HealthLevel,
    pub critical_issues: u64,
    pub warning_issues: u64,
    /// At most five distinct actions, ordered by first appearance.
    pub recommended_actions: Vec<String>,
}

/// Assemble the detailed report from the probe outcome, per-provider
/// states, quota evaluation and optimization findings.
pub fn compute_health(
    probe: ConnectivityProbe,
    providers: Vec<ProviderHealth>,
    quotas: &QuotaStatus,
    optimizations: &OptimizationReport,
    now: DateTime<Utc>,
) -> HealthReport {
    let mut overall = HealthLevel::Healthy;
    let mut issues = Vec::new();

    if !probe.ok {
        overall = overall.escalate(HealthLevel::Critical);
        issues.push(HealthIssue {
            severity: IssueSeverity::Critical,
            component: "connectivity".to_string(),
            message: format!(
                "storage listing probe failed: {}",
                probe.error.as_deref().unwrap_or("unknown error")
            ),
            recommended_action: Some("verify storage credentials and network reachability".to_string()),
        });
    }

    for provider in &providers {
        if let ProviderHealthState::Unhealthy { error } = &provider.state {
            overall = overall.escalate(HealthLevel::Warning);
            issues.push(HealthIssue {
                severity: IssueSeverity::Warning,
                component: "connectivity".to_string(),
                message: format!("provider {} is unhealthy: {}", provider.provider, error),
                recommended_action: Some(format!("investigate provider {}", provider.provider)),
            });
        }
    }

    for warning in &quotas.warnings {
        let (level, severity) = match warning.severity {
            QuotaSeverity::Critical => (HealthLevel::Critical, IssueSeverity::Critical),
            QuotaSeverity::Warning => (HealthLevel::Warning, IssueSeverity::Warning),
        };
        overall = overall.escalate(level);
        issues.push(HealthIssue {
            severity,
            component: "quota".to_string(),
            message: warning.message.clone(),
            recommended_action: Some(
                "free storage or raise the quota before writes start failing".to_string(),
            ),
        });
    }

    // Optimization findings are advisory and never degrade overall health.
    for recommendation in &optimizations.recommendations {
        if recommendation.priority == Priority::High {
            issues.push(HealthIssue {
                severity: IssueSeverity::Info,
                component: "optimization".to_string(),
                message: recommendation.description.clone(),
                recommended_action: None,
            });
        }
    }

    HealthReport {
        generated_at: now,
        overall_health: overall,
        connectivity: probe,
        providers,
        issues,
    }
}

/// Reduce a report to counts and the top recommended actions.
pub fn summarize(report: &HealthReport) -> HealthSummary {
    let critical = report
        .issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Critical)
        .count() as u64;
    let warnings = report
        .issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Warning)
        .count() as u64;

    let mut actions: Vec<String> = Vec::new();
    for issue in &report.issues {
        if let Some(action) = &issue.recommended_action {
            if !actions.contains(action) {
                actions.push(action.clone());
            }
            if actions.len() == 5 {
                break;
            }
        }
    }

    HealthSummary {
        generated_at: report.generated_at,
        overall_health: report.overall_health,
        critical_issues: critical,
        warning_issues: warnings,
        recommended_actions: actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::optimize::compute_optimizations;
    use crate::monitor::quota::{check_quotas, QuotaConfig};

    fn healthy_probe() -> ConnectivityProbe {
        ConnectivityProbe {
            ok: true,
            latency_ms: 3,
            error: None,
        }
    }

    fn empty_optimizations() -> OptimizationReport {
        compute_optimizations(&[], Utc::now())
    }

    fn empty_quotas() -> QuotaStatus {
        check_quotas(&[], &QuotaConfig::default(), Utc::now())
    }

    #[test]
    fn failed_probe_is_critical() {
        let probe = ConnectivityProbe {
            ok: false,
            latency_ms: 0,
            error: Some("connection refused".to_string()),
        };
        let report = compute_health(
            probe,
            Vec::new(),
            &empty_quotas(),
            &empty_optimizations(),
            Utc::now(),
        );
        assert_eq!(report.overall_health, HealthLevel::Critical);
        assert_eq!(report.issues[0].severity, IssueSeverity::Critical);
    }

    #[test]
    fn escalation_never_downgrades() {
        assert_eq!(
            HealthLevel::Critical.escalate(HealthLevel::Healthy),
            HealthLevel::Critical
        );
        assert_eq!(
            HealthLevel::Warning.escalate(HealthLevel::Critical),
            HealthLevel::Critical
        );
    }

    #[test]
    fn unhealthy_provider_is_a_warning_not_critical() {
        let providers = vec![ProviderHealth {
            provider: "s3 (backups)".to_string(),
            state: ProviderHealthState::Unhealthy {
                error: "timeout".to_string(),
            },
        }];
        let report = compute_health(
            healthy_probe(),
            providers,
            &empty_quotas(),
            &empty_optimizations(),
            Utc::now(),
        );
        assert_eq!(report.overall_health, HealthLevel::Warning);
    }

    #[test]
    fn optimization_findings_stay_informational() {
        use crate::model::{Backup, BackupStatus, CompressionAlgorithm};
        use uuid::Uuid;

        let uncompressed = Backup {
            id: Uuid::new_v4(),
            database: "orders".to_string(),
            created_at: Utc::now(),
            size: 1000,
            compressed_size: 1000,
            compression: CompressionAlgorithm::None,
            checksum: "sum".to_string(),
            status: BackupStatus::Completed,
            tags: Vec::new(),
            description: None,
        };
        let optimizations = compute_optimizations(&[uncompressed], Utc::now());

        let report = compute_health(
            healthy_probe(),
            Vec::new(),
            &empty_quotas(),
            &optimizations,
            Utc::now(),
        );
        assert_eq!(report.overall_health, HealthLevel::Healthy);
        assert!(report
            .issues
            .iter()
            .all(|i| i.severity == IssueSeverity::Info));
    }

    #[test]
    fn summary_dedups_actions_and_caps_at_five() {
        let mut report = compute_health(
            healthy_probe(),
            Vec::new(),
            &empty_quotas(),
            &empty_optimizations(),
            Utc::now(),
        );
        for i in 0..8 {
            report.issues.push(HealthIssue {
                severity: IssueSeverity::Warning,
                component: "quota".to_string(),
                message: format!("issue {}", i),
                recommended_action: Some(format!("action {}", i % 6)),
            });
        }
        let summary = summarize(&report);
        assert_eq!(summary.warning_issues, 8);
        assert_eq!(summary.recommended_actions.len(), 5);
        assert_eq!(summary.recommended_actions[0], "action 0");
    }
}
