//! The scan orchestrator: executor, penalty arithmetic, aggregation, caps,
//! readiness, and prioritization composed in dependency order into one
//! immutable [`ScanResult`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::actions;
use super::catalog::CheckRegistry;
use super::domain::{RecordSnapshot, ScannerVersion};
use super::executor;
use super::readiness;
use super::result::{FindingsSummary, ScanResult, ScanStats};
use super::ruleset::RulesetConfig;
use super::scoring;

/// Execute one scan against an already-fetched snapshot. The ruleset is taken
/// by value: it is the single consistent configuration read for this scan, and
/// it is embedded unchanged as the result's `config_snapshot`.
pub async fn run_scan(
    registry: &CheckRegistry,
    snapshot: Arc<RecordSnapshot>,
    ruleset: RulesetConfig,
    version: ScannerVersion,
    check_concurrency: usize,
) -> ScanResult {
    let started = Instant::now();

    let execution = executor::execute_checks(registry, Arc::clone(&snapshot), check_concurrency).await;
    let findings = scoring::findings_from_evidence(execution.evidence, registry, &ruleset);

    let category_scores = scoring::category_scores(&findings);
    let category_penalties = scoring::category_penalties(&category_scores);
    let raw_score = scoring::compose_raw_score(&category_scores, &ruleset, version);

    // The legacy scorer predates blocking caps entirely.
    let (final_score, blockers_triggered) = match version {
        ScannerVersion::V1 => (raw_score, Vec::new()),
        ScannerVersion::V2 => scoring::apply_caps(raw_score, &findings, registry, &ruleset),
    };
    let is_capped = final_score < raw_score;

    let readiness = readiness::evaluate(ruleset.mode, &snapshot, final_score);
    let next_actions = actions::prioritize(&findings);
    let total_potential_gain = actions::total_potential_gain(&findings);
    let findings_summary = FindingsSummary::tally(&findings);

    let stats = ScanStats {
        corpus: snapshot.corpus_counters(),
        checks_executed: execution.checks_executed,
        degraded_checks: execution.degraded.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };

    debug!(
        tenant = %snapshot.tenant_id,
        raw = raw_score,
        finding_count = findings.len(),
        capped = is_capped,
        "scan assembled"
    );

    ScanResult {
        scan_id: Uuid::new_v4(),
        tenant_id: snapshot.tenant_id.clone(),
        scanned_at: Utc::now(),
        version,
        registry_version: registry.version().to_string(),
        mode: ruleset.mode,
        raw_score,
        final_score,
        category_scores,
        category_penalties,
        blockers_triggered,
        is_capped,
        findings_summary,
        findings,
        next_actions,
        total_potential_gain,
        readiness,
        stats,
        config_snapshot: ruleset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::domain::{
        Approval, Category, GovernanceRecord, RecordId, RecordKind, RecordStatus, ScanMode,
        TenantId,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn healthy_record(id: &str, kind: RecordKind) -> GovernanceRecord {
        let stamp = Utc.with_ymd_and_hms(2026, 5, 15, 9, 0, 0).unwrap();
        GovernanceRecord {
            id: RecordId(id.to_string()),
            title: format!("Record {id}"),
            kind,
            status: RecordStatus::Finalized,
            owner: Some("clerk".to_string()),
            created_at: stamp,
            updated_at: stamp,
            approvals: vec![
                Approval {
                    approver: "chair".to_string(),
                    approved_at: stamp,
                },
                Approval {
                    approver: "secretary".to_string(),
                    approved_at: stamp,
                },
            ],
            revisions: Vec::new(),
            parent_id: None,
            expires_at: None,
            last_reviewed_at: Some(stamp),
            retention_policy: Some("7y".to_string()),
            fiscal: None,
            tags: vec!["board".to_string()],
        }
    }

    fn healthy_snapshot() -> RecordSnapshot {
        let mut statement = healthy_record("fs-q1", RecordKind::FinancialStatement);
        statement.fiscal = Some(crate::health::domain::FiscalDetails {
            period_end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            reconciled: true,
        });
        RecordSnapshot {
            tenant_id: TenantId("acme".to_string()),
            taken_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
            records: vec![
                healthy_record("minutes-q2", RecordKind::MeetingMinutes),
                healthy_record("policy-1", RecordKind::Policy),
                healthy_record("risk-1", RecordKind::RiskAssessment),
                statement,
            ],
        }
    }

    fn orphaned_snapshot() -> RecordSnapshot {
        let mut snapshot = healthy_snapshot();
        for index in 0..5 {
            let mut record = healthy_record(&format!("orphan-{index}"), RecordKind::Resolution);
            record.parent_id = Some(RecordId("vanished".to_string()));
            snapshot.records.push(record);
        }
        snapshot
    }

    fn standard() -> (CheckRegistry, RulesetConfig) {
        let registry = CheckRegistry::standard().expect("catalog builds");
        let ruleset = RulesetConfig::defaults(&registry);
        (registry, ruleset)
    }

    #[tokio::test]
    async fn healthy_corpus_scores_clean() {
        let (registry, ruleset) = standard();
        let result = run_scan(
            &registry,
            Arc::new(healthy_snapshot()),
            ruleset,
            ScannerVersion::V2,
            4,
        )
        .await;

        assert_eq!(result.raw_score, 100.0);
        assert_eq!(result.final_score, 100.0);
        assert!(!result.is_capped);
        assert!(result.blockers_triggered.is_empty());
        assert!(result.findings.is_empty());
        assert!(result.readiness.is_none());
        assert_eq!(result.stats.degraded_checks, 0);
    }

    #[tokio::test]
    async fn orphan_scenario_matches_the_worked_example() {
        let (registry, ruleset) = standard();
        let result = run_scan(
            &registry,
            Arc::new(orphaned_snapshot()),
            ruleset,
            ScannerVersion::V2,
            4,
        )
        .await;

        let orphan = result
            .findings
            .iter()
            .find(|finding| finding.check_id.0 == "orphan-record")
            .expect("orphan finding present");
        assert_eq!(orphan.occurrence_count, 5);
        // min(15, 15 * 5 * 1.5) = 15
        assert_eq!(orphan.penalty_applied, 15.0);
        assert_eq!(result.category_scores[&Category::DataIntegrity], 85.0);
        assert_eq!(result.final_score, result.raw_score.min(60.0));
        assert!(result.is_capped);
        assert_eq!(result.blockers_triggered.len(), 1);
        assert_eq!(result.blockers_triggered[0].cap_id.0, "orphan-records-cap");
    }

    #[tokio::test]
    async fn final_equals_raw_iff_no_blockers() {
        let (registry, ruleset) = standard();
        for snapshot in [healthy_snapshot(), orphaned_snapshot()] {
            let result = run_scan(
                &registry,
                Arc::new(snapshot),
                ruleset.clone(),
                ScannerVersion::V2,
                4,
            )
            .await;
            assert!(result.final_score <= result.raw_score);
            assert_eq!(
                result.final_score == result.raw_score,
                result.blockers_triggered.is_empty()
            );
        }
    }

    #[tokio::test]
    async fn scan_completes_when_window_checks_cannot_compute() {
        let (registry, ruleset) = standard();
        let mut snapshot = healthy_snapshot();
        // A snapshot stamp this early leaves no room for any lookback window.
        snapshot.taken_at = chrono::DateTime::<Utc>::MIN_UTC;
        let result = run_scan(
            &registry,
            Arc::new(snapshot),
            ruleset,
            ScannerVersion::V2,
            4,
        )
        .await;

        assert!(result.stats.degraded_checks > 0);
        assert_eq!(
            result.stats.checks_executed + result.stats.degraded_checks,
            registry.len()
        );
        assert!(result
            .findings
            .iter()
            .all(|finding| finding.check_id.0 != "stale-draft"));
    }

    #[tokio::test]
    async fn identical_inputs_scan_identically() {
        let (registry, ruleset) = standard();
        let snapshot = Arc::new(orphaned_snapshot());
        let first = run_scan(
            &registry,
            Arc::clone(&snapshot),
            ruleset.clone(),
            ScannerVersion::V2,
            1,
        )
        .await;
        let second = run_scan(&registry, snapshot, ruleset, ScannerVersion::V2, 8).await;

        assert_ne!(first.scan_id, second.scan_id);
        assert_eq!(first.category_scores, second.category_scores);
        assert_eq!(first.raw_score, second.raw_score);
        assert_eq!(first.final_score, second.final_score);
        assert_eq!(first.findings, second.findings);
        assert_eq!(first.next_actions, second.next_actions);
    }

    #[tokio::test]
    async fn penalties_stay_within_catalog_bounds() {
        let (registry, ruleset) = standard();
        let result = run_scan(
            &registry,
            Arc::new(orphaned_snapshot()),
            ruleset,
            ScannerVersion::V2,
            4,
        )
        .await;
        for finding in &result.findings {
            let definition = registry.check(&finding.check_id).expect("known check");
            assert!(finding.penalty_applied >= 0.0);
            assert!(finding.penalty_applied <= definition.max_penalty);
        }
        for score in result.category_scores.values() {
            assert!((0.0..=100.0).contains(score));
        }
    }

    #[tokio::test]
    async fn audit_mode_attaches_readiness() {
        let (registry, mut ruleset) = standard();
        ruleset.mode = ScanMode::Audit;
        let result = run_scan(
            &registry,
            Arc::new(healthy_snapshot()),
            ruleset,
            ScannerVersion::V2,
            4,
        )
        .await;
        let readiness = result.readiness.expect("audit mode carries readiness");
        assert!(readiness.passed);
        assert_eq!(result.mode, ScanMode::Audit);
    }

    #[tokio::test]
    async fn v1_scanner_never_caps() {
        let (registry, ruleset) = standard();
        let result = run_scan(
            &registry,
            Arc::new(orphaned_snapshot()),
            ruleset,
            ScannerVersion::V1,
            4,
        )
        .await;
        assert!(!result.is_capped);
        assert!(result.blockers_triggered.is_empty());
        assert_eq!(result.final_score, result.raw_score);
    }
}
