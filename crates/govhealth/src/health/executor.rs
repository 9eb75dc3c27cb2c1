use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::catalog::{CheckId, CheckRegistry};
use super::checks::CheckEvidence;
use super::domain::RecordSnapshot;

/// Diagnostic for a check that could not complete. Tallied in scan stats,
/// never surfaced as an API failure.
#[derive(Debug, Clone)]
pub struct DegradedCheck {
    pub check_id: CheckId,
    pub reason: String,
}

/// Raw output of one executor pass, before any scoring.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    /// Evidence keyed by check id, in canonical (check id) order.
    pub evidence: Vec<(CheckId, CheckEvidence)>,
    pub degraded: Vec<DegradedCheck>,
    pub checks_executed: usize,
}

/// Run every registered check against the snapshot under bounded concurrency.
///
/// Checks are pure functions of the snapshot, so completion order carries no
/// meaning; results are sorted by check id before they reach scoring, which
/// keeps the pipeline deterministic.
pub async fn execute_checks(
    registry: &CheckRegistry,
    snapshot: Arc<RecordSnapshot>,
    concurrency: usize,
) -> ExecutionOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for definition in registry.checks() {
        let check_id = definition.id.clone();
        let kind = definition.kind;
        let snapshot = Arc::clone(&snapshot);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("executor semaphore never closed");
            (check_id, kind.run(&snapshot))
        });
    }

    let mut outcome = ExecutionOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((check_id, Ok(Some(evidence)))) => {
                outcome.checks_executed += 1;
                outcome.evidence.push((check_id, evidence));
            }
            Ok((_, Ok(None))) => {
                outcome.checks_executed += 1;
            }
            Ok((check_id, Err(error))) => {
                warn!(check = %check_id.0, %error, "check degraded, excluded from findings");
                outcome.degraded.push(DegradedCheck {
                    check_id,
                    reason: error.to_string(),
                });
            }
            Err(join_error) => {
                warn!(%join_error, "check task aborted, excluded from findings");
                outcome.degraded.push(DegradedCheck {
                    check_id: CheckId("unknown".to_string()),
                    reason: join_error.to_string(),
                });
            }
        }
    }

    outcome.evidence.sort_by(|a, b| a.0.cmp(&b.0));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::domain::{RecordSnapshot, TenantId};
    use chrono::{TimeZone, Utc};

    fn empty_snapshot() -> Arc<RecordSnapshot> {
        Arc::new(RecordSnapshot {
            tenant_id: TenantId("acme".to_string()),
            taken_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
            records: Vec::new(),
        })
    }

    #[tokio::test]
    async fn evidence_is_sorted_by_check_id() {
        let registry = CheckRegistry::standard().expect("catalog builds");
        let outcome = execute_checks(&registry, empty_snapshot(), 4).await;

        let ids: Vec<_> = outcome.evidence.iter().map(|(id, _)| id.clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(outcome.degraded.is_empty());
        assert_eq!(
            outcome.checks_executed + outcome.degraded.len(),
            registry.len()
        );
    }

    #[tokio::test]
    async fn lookback_overflow_degrades_window_checks_without_aborting() {
        let registry = CheckRegistry::standard().expect("catalog builds");
        let snapshot = Arc::new(RecordSnapshot {
            tenant_id: TenantId("acme".to_string()),
            taken_at: chrono::DateTime::<Utc>::MIN_UTC,
            records: Vec::new(),
        });
        let outcome = execute_checks(&registry, snapshot, 4).await;

        let degraded: Vec<_> = outcome
            .degraded
            .iter()
            .map(|check| check.check_id.0.as_str())
            .collect();
        assert!(degraded.contains(&"stale-draft"));
        assert!(degraded.contains(&"minutes-gap"));
        assert!(degraded.contains(&"overdue-policy-review"));
        for (id, _) in &outcome.evidence {
            assert!(!degraded.contains(&id.0.as_str()));
        }
        assert_eq!(
            outcome.checks_executed + outcome.degraded.len(),
            registry.len()
        );
    }

    #[tokio::test]
    async fn empty_corpus_still_raises_boolean_checks() {
        let registry = CheckRegistry::standard().expect("catalog builds");
        let outcome = execute_checks(&registry, empty_snapshot(), 1).await;

        // An empty corpus has no minutes, no financials, and no risk assessment.
        let raised: Vec<_> = outcome.evidence.iter().map(|(id, _)| id.0.as_str()).collect();
        assert!(raised.contains(&"minutes-gap"));
        assert!(raised.contains(&"missing-fiscal-period"));
        assert!(raised.contains(&"missing-risk-assessment"));
    }
}
