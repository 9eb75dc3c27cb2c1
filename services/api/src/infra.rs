use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use govhealth::health::{
    Approval, FiscalDetails, GovernanceRecord, RecordId, RecordKind, RecordSnapshot, RecordStatus,
    RevisionEntry, SnapshotError, SnapshotProvider, TenantId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot provider backed by an in-process corpus. Tenants seen for the
/// first time receive the seeded demo corpus, so the service can be exercised
/// end to end without an external record repository.
#[derive(Default)]
pub(crate) struct SeededSnapshotProvider {
    snapshots: Mutex<HashMap<TenantId, RecordSnapshot>>,
}

#[async_trait]
impl SnapshotProvider for SeededSnapshotProvider {
    async fn fetch(&self, tenant: &TenantId) -> Result<RecordSnapshot, SnapshotError> {
        let mut guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        let snapshot = guard
            .entry(tenant.clone())
            .or_insert_with(|| seed_corpus(tenant.clone(), Utc::now()));
        Ok(snapshot.clone())
    }
}

fn approvals(stamp: DateTime<Utc>, approvers: &[&str]) -> Vec<Approval> {
    approvers
        .iter()
        .map(|approver| Approval {
            approver: approver.to_string(),
            approved_at: stamp,
        })
        .collect()
}

fn base_record(id: &str, title: &str, kind: RecordKind, stamp: DateTime<Utc>) -> GovernanceRecord {
    GovernanceRecord {
        id: RecordId(id.to_string()),
        title: title.to_string(),
        kind,
        status: RecordStatus::Finalized,
        owner: Some("governance-team".to_string()),
        created_at: stamp,
        updated_at: stamp,
        approvals: approvals(stamp, &["chair", "secretary"]),
        revisions: vec![RevisionEntry {
            sequence: 1,
            revised_at: stamp,
            author: "governance-team".to_string(),
        }],
        parent_id: None,
        expires_at: None,
        last_reviewed_at: Some(stamp),
        retention_policy: Some("7y".to_string()),
        fiscal: None,
        tags: vec!["board".to_string()],
    }
}

/// Demo corpus with a healthy governance core plus a handful of deliberate
/// defects so scans return interesting findings, caps, and next actions.
pub(crate) fn seed_corpus(tenant: TenantId, now: DateTime<Utc>) -> RecordSnapshot {
    let recent = now - Duration::days(20);
    let mut records = Vec::new();

    records.push(base_record(
        "minutes-board-latest",
        "Board meeting minutes",
        RecordKind::MeetingMinutes,
        recent,
    ));

    let mut policy = base_record(
        "policy-data-retention",
        "Data retention policy",
        RecordKind::Policy,
        recent,
    );
    policy.expires_at = Some((now + Duration::days(400)).date_naive());
    records.push(policy);

    records.push(base_record(
        "risk-register-annual",
        "Annual risk assessment",
        RecordKind::RiskAssessment,
        recent,
    ));

    let mut statement = base_record(
        "statement-q1",
        "Quarterly financial statement",
        RecordKind::FinancialStatement,
        recent,
    );
    statement.fiscal = Some(FiscalDetails {
        period_end: (now - Duration::days(35)).date_naive(),
        reconciled: true,
    });
    records.push(statement);

    // Deliberate defects below.

    let mut resolution = base_record(
        "resolution-budget",
        "Budget approval resolution",
        RecordKind::Resolution,
        recent,
    );
    resolution.approvals = approvals(recent, &["chair"]);
    records.push(resolution);

    let mut stale_draft = base_record(
        "policy-conduct-draft",
        "Code of conduct refresh",
        RecordKind::Policy,
        now - Duration::days(150),
    );
    stale_draft.status = RecordStatus::Draft;
    stale_draft.approvals.clear();
    records.push(stale_draft);

    for index in 1..=2 {
        let mut orphan = base_record(
            &format!("amendment-{index}"),
            "Amendment to retired bylaws",
            RecordKind::Resolution,
            recent,
        );
        orphan.parent_id = Some(RecordId("bylaws-2019-retired".to_string()));
        records.push(orphan);
    }

    let mut untagged = base_record(
        "contract-landscaping",
        "Groundskeeping services contract",
        RecordKind::Contract,
        recent,
    );
    untagged.tags.clear();
    records.push(untagged);

    RecordSnapshot {
        tenant_id: tenant,
        taken_at: now,
        records,
    }
}
