//! Mode-specific readiness checklists. Audit mode runs a fixed set of
//! independent predicates over the snapshot; court mode is a stricter
//! superset. Both gate on the capped score as well: checklist and threshold
//! are each necessary, neither sufficient.

use super::domain::{RecordKind, RecordSnapshot, RecordStatus, ScanMode};
use super::result::{ChecklistItem, Readiness};

pub const READINESS_SCORE_THRESHOLD: f64 = 80.0;

/// Evaluate readiness for the given mode. Normal mode carries no verdict.
pub fn evaluate(mode: ScanMode, snapshot: &RecordSnapshot, final_score: f64) -> Option<Readiness> {
    let items = match mode {
        ScanMode::Normal => return None,
        ScanMode::Audit => audit_items(snapshot),
        ScanMode::Court => {
            let mut items = audit_items(snapshot);
            items.extend(court_items(snapshot));
            items
        }
    };

    let checklist_ok = items.iter().all(|item| item.passed);
    let score_met = final_score >= READINESS_SCORE_THRESHOLD;
    Some(Readiness {
        mode,
        passed: checklist_ok && score_met,
        score_threshold: READINESS_SCORE_THRESHOLD,
        score_met,
        items,
    })
}

fn item(id: &str, name: &str, passed: bool, detail: String) -> ChecklistItem {
    ChecklistItem {
        id: id.to_string(),
        name: name.to_string(),
        passed,
        detail,
    }
}

fn audit_items(snapshot: &RecordSnapshot) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    let finalized_minutes = snapshot
        .records_of_kind(RecordKind::MeetingMinutes)
        .any(|record| record.status == RecordStatus::Finalized);
    items.push(item(
        "finalized-minutes",
        "Latest meeting minutes finalized",
        finalized_minutes,
        if finalized_minutes {
            "finalized meeting minutes on file".to_string()
        } else {
            "no finalized meeting minutes on file".to_string()
        },
    ));

    let known: std::collections::BTreeSet<_> =
        snapshot.records.iter().map(|record| &record.id).collect();
    let orphans = snapshot
        .records
        .iter()
        .filter(|record| matches!(&record.parent_id, Some(parent) if !known.contains(parent)))
        .count();
    items.push(item(
        "no-orphan-records",
        "No orphan records",
        orphans == 0,
        format!("{orphans} record(s) reference a missing parent"),
    ));

    let broken_histories = snapshot
        .records
        .iter()
        .filter(|record| !record.revision_history_complete())
        .count();
    items.push(item(
        "revision-history-complete",
        "Revision history complete",
        broken_histories == 0,
        format!("{broken_histories} record(s) with gapped revision logs"),
    ));

    let today = snapshot.taken_at.date_naive();
    let overdue_filings = snapshot
        .records_of_kind(RecordKind::Filing)
        .filter(|record| {
            record.status != RecordStatus::Finalized
                && record.status != RecordStatus::Archived
                && matches!(record.expires_at, Some(due) if due < today)
        })
        .count();
    items.push(item(
        "filings-current",
        "Filings current",
        overdue_filings == 0,
        format!("{overdue_filings} filing(s) past due"),
    ));

    let unreconciled = snapshot
        .records_of_kind(RecordKind::FinancialStatement)
        .filter(|record| matches!(record.fiscal, Some(fiscal) if !fiscal.reconciled))
        .count();
    items.push(item(
        "financials-reconciled",
        "Financial statements reconciled",
        unreconciled == 0,
        format!("{unreconciled} statement(s) unreconciled"),
    ));

    items
}

fn court_items(snapshot: &RecordSnapshot) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    let unsigned = snapshot
        .records_of_kind(RecordKind::Resolution)
        .filter(|record| record.status == RecordStatus::Finalized && record.approvals.len() < 2)
        .count();
    items.push(item(
        "resolutions-fully-approved",
        "Resolutions fully approved",
        unsigned == 0,
        format!("{unsigned} resolution(s) below the two-approval requirement"),
    ));

    let risk_current = snapshot
        .latest_of_kind(RecordKind::RiskAssessment)
        .map(|record| {
            snapshot
                .taken_at
                .signed_duration_since(record.updated_at)
                .num_days()
                <= 365
        })
        .unwrap_or(false);
    items.push(item(
        "risk-assessment-current",
        "Risk assessment current",
        risk_current,
        if risk_current {
            "risk assessment reviewed within the last year".to_string()
        } else {
            "no risk assessment within the last year".to_string()
        },
    ));

    let future_stamps = snapshot
        .records
        .iter()
        .filter(|record| {
            record.created_at > snapshot.taken_at || record.updated_at > snapshot.taken_at
        })
        .count();
    items.push(item(
        "no-future-timestamps",
        "No future timestamps",
        future_stamps == 0,
        format!("{future_stamps} record(s) dated after the snapshot"),
    ));

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::domain::{
        Approval, GovernanceRecord, RecordId, RecordSnapshot, TenantId,
    };
    use chrono::{TimeZone, Utc};

    fn minutes() -> GovernanceRecord {
        let stamp = Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap();
        GovernanceRecord {
            id: RecordId("minutes-q2".to_string()),
            title: "Q2 board minutes".to_string(),
            kind: RecordKind::MeetingMinutes,
            status: RecordStatus::Finalized,
            owner: Some("secretary".to_string()),
            created_at: stamp,
            updated_at: stamp,
            approvals: vec![Approval {
                approver: "chair".to_string(),
                approved_at: stamp,
            }],
            revisions: Vec::new(),
            parent_id: None,
            expires_at: None,
            last_reviewed_at: None,
            retention_policy: Some("10y".to_string()),
            fiscal: None,
            tags: vec!["board".to_string()],
        }
    }

    fn snapshot(records: Vec<GovernanceRecord>) -> RecordSnapshot {
        RecordSnapshot {
            tenant_id: TenantId("acme".to_string()),
            taken_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
            records,
        }
    }

    #[test]
    fn normal_mode_has_no_readiness() {
        assert!(evaluate(ScanMode::Normal, &snapshot(vec![minutes()]), 100.0).is_none());
    }

    #[test]
    fn checklist_pass_with_score_79_fails() {
        let readiness = evaluate(ScanMode::Audit, &snapshot(vec![minutes()]), 79.0)
            .expect("audit mode yields readiness");
        assert!(readiness.items.iter().all(|item| item.passed));
        assert!(!readiness.score_met);
        assert!(!readiness.passed);
    }

    #[test]
    fn score_80_with_failing_item_fails() {
        // No finalized minutes: the first checklist item fails.
        let readiness = evaluate(ScanMode::Audit, &snapshot(Vec::new()), 80.0)
            .expect("audit mode yields readiness");
        assert!(readiness.score_met);
        assert!(readiness.items.iter().any(|item| !item.passed));
        assert!(!readiness.passed);
        let failed: Vec<_> = readiness
            .items
            .iter()
            .filter(|item| !item.passed)
            .map(|item| item.id.as_str())
            .collect();
        assert!(failed.contains(&"finalized-minutes"));
    }

    #[test]
    fn both_conditions_met_passes() {
        let readiness = evaluate(ScanMode::Audit, &snapshot(vec![minutes()]), 80.0)
            .expect("audit mode yields readiness");
        assert!(readiness.passed);
    }

    #[test]
    fn court_mode_extends_the_audit_checklist() {
        let audit = evaluate(ScanMode::Audit, &snapshot(vec![minutes()]), 90.0)
            .expect("audit readiness");
        let court = evaluate(ScanMode::Court, &snapshot(vec![minutes()]), 90.0)
            .expect("court readiness");
        assert!(court.items.len() > audit.items.len());
        let audit_ids: Vec<_> = audit.items.iter().map(|item| item.id.clone()).collect();
        for id in audit_ids {
            assert!(court.items.iter().any(|item| item.id == id));
        }
        // Court adds the risk-assessment gate, which this corpus fails.
        assert!(!court.passed);
    }
}
