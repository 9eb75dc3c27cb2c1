//! The fixed check catalog. Each variant is a pure function of the snapshot:
//! no shared state, no ordering dependence, safe to run concurrently.

use chrono::Duration;

use super::catalog::{CheckDefinition, CheckId};
use super::domain::{
    Category, Effort, GovernanceRecord, RecordKind, RecordSnapshot, RecordStatus, Severity,
};

const STALE_DRAFT_DAYS: i64 = 90;
const POLICY_REVIEW_DAYS: i64 = 365;
const MINUTES_GAP_DAYS: i64 = 92;
const STALE_FINANCIALS_DAYS: i64 = 180;
const STALE_RISK_DAYS: i64 = 365;
const OWNER_CONCENTRATION_RATIO: f64 = 0.6;
const OWNER_CONCENTRATION_MIN_RECORDS: usize = 10;

/// Evidence produced by a single check. `count` drives the penalty formula;
/// `record_ids` lets callers link findings back to offending records.
#[derive(Debug, Clone)]
pub struct CheckEvidence {
    pub count: u32,
    pub record_ids: Vec<super::domain::RecordId>,
    pub detail: String,
}

impl CheckEvidence {
    fn boolean(detail: impl Into<String>) -> Self {
        Self {
            count: 1,
            record_ids: Vec::new(),
            detail: detail.into(),
        }
    }

    fn from_records(records: Vec<&GovernanceRecord>, detail: impl Into<String>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            count: records.len() as u32,
            record_ids: records.iter().map(|record| record.id.clone()).collect(),
            detail: detail.into(),
        })
    }
}

/// Error raised when a single check cannot complete. The executor isolates
/// these; a failing check never aborts the scan.
#[derive(Debug, thiserror::Error)]
#[error("check '{check}' failed: {reason}")]
pub struct CheckExecutionError {
    pub check: String,
    pub reason: String,
}

/// Statically registered check set, one variant per catalog entry. Checks are
/// versioned and ship with the scoring logic, so there is no runtime plugin
/// loading to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    // Governance hygiene
    MissingRecordOwner,
    StaleDraft,
    UnapprovedFinalized,
    MinutesGap,
    OverduePolicyReview,
    // Financial integrity
    UnreconciledStatement,
    MissingFiscalPeriod,
    DuplicateFiscalPeriod,
    StaleFinancials,
    UnretainedFinancialRecord,
    // Compliance & recordkeeping
    OverdueFiling,
    ExpiredPolicy,
    MissingRetentionPolicy,
    UnsignedResolution,
    UntaggedRecord,
    // Risk & exposure
    MissingRiskAssessment,
    StaleRiskAssessment,
    ExpiredContract,
    OwnerConcentration,
    UnreviewedRiskAssessment,
    // Data integrity
    OrphanRecord,
    DuplicateRecordId,
    BrokenRevisionHistory,
    FutureTimestamp,
    MissingTitle,
}

impl CheckKind {
    /// Evaluate this check against the snapshot. `Ok(None)` means the
    /// condition did not hold — a valid, non-error outcome.
    pub fn run(&self, snapshot: &RecordSnapshot) -> Result<Option<CheckEvidence>, CheckExecutionError> {
        match self {
            CheckKind::MissingRecordOwner => Ok(missing_record_owner(snapshot)),
            CheckKind::StaleDraft => stale_draft(snapshot),
            CheckKind::UnapprovedFinalized => Ok(unapproved_finalized(snapshot)),
            CheckKind::MinutesGap => minutes_gap(snapshot),
            CheckKind::OverduePolicyReview => overdue_policy_review(snapshot),
            CheckKind::UnreconciledStatement => Ok(unreconciled_statement(snapshot)),
            CheckKind::MissingFiscalPeriod => Ok(missing_fiscal_period(snapshot)),
            CheckKind::DuplicateFiscalPeriod => Ok(duplicate_fiscal_period(snapshot)),
            CheckKind::StaleFinancials => stale_financials(snapshot),
            CheckKind::UnretainedFinancialRecord => Ok(unretained_financial_record(snapshot)),
            CheckKind::OverdueFiling => Ok(overdue_filing(snapshot)),
            CheckKind::ExpiredPolicy => Ok(expired_policy(snapshot)),
            CheckKind::MissingRetentionPolicy => Ok(missing_retention_policy(snapshot)),
            CheckKind::UnsignedResolution => Ok(unsigned_resolution(snapshot)),
            CheckKind::UntaggedRecord => Ok(untagged_record(snapshot)),
            CheckKind::MissingRiskAssessment => Ok(missing_risk_assessment(snapshot)),
            CheckKind::StaleRiskAssessment => stale_risk_assessment(snapshot),
            CheckKind::ExpiredContract => Ok(expired_contract(snapshot)),
            CheckKind::OwnerConcentration => Ok(owner_concentration(snapshot)),
            CheckKind::UnreviewedRiskAssessment => Ok(unreviewed_risk_assessment(snapshot)),
            CheckKind::OrphanRecord => Ok(orphan_record(snapshot)),
            CheckKind::DuplicateRecordId => Ok(duplicate_record_id(snapshot)),
            CheckKind::BrokenRevisionHistory => Ok(broken_revision_history(snapshot)),
            CheckKind::FutureTimestamp => Ok(future_timestamp(snapshot)),
            CheckKind::MissingTitle => Ok(missing_title(snapshot)),
        }
    }

    /// Full catalog with scoring metadata. Ids are stable; cap trigger sets
    /// reference them.
    pub fn catalog() -> Vec<CheckDefinition> {
        use Category::*;
        use Effort::*;
        use Severity::*;

        let def = |id: &'static str,
                   title: &'static str,
                   category: Category,
                   severity: Severity,
                   base: f64,
                   max: f64,
                   effort: Effort,
                   fix_route: &'static str,
                   auto_fixable: bool,
                   kind: CheckKind| CheckDefinition {
            id: CheckId(id.to_string()),
            title,
            category,
            severity,
            base_deduction: base,
            max_penalty: max,
            effort,
            fix_route,
            auto_fixable,
            kind,
        };

        vec![
            def("missing-record-owner", "Records without an owner",
                GovernanceHygiene, Warning, 2.0, 20.0, S,
                "/govern/records/owners", true, CheckKind::MissingRecordOwner),
            def("stale-draft", "Drafts left untouched",
                GovernanceHygiene, Warning, 3.0, 15.0, M,
                "/govern/records/drafts", false, CheckKind::StaleDraft),
            def("unapproved-finalized", "Finalized records without approval",
                GovernanceHygiene, Critical, 10.0, 30.0, M,
                "/govern/approvals/queue", false, CheckKind::UnapprovedFinalized),
            def("minutes-gap", "Meeting minutes gap",
                GovernanceHygiene, Critical, 12.0, 12.0, L,
                "/govern/minutes/schedule", false, CheckKind::MinutesGap),
            def("overdue-policy-review", "Policies overdue for review",
                GovernanceHygiene, Warning, 4.0, 20.0, M,
                "/govern/policies/review", false, CheckKind::OverduePolicyReview),
            def("unreconciled-statement", "Unreconciled financial statements",
                FinancialIntegrity, Critical, 10.0, 40.0, M,
                "/govern/finance/reconcile", false, CheckKind::UnreconciledStatement),
            def("missing-fiscal-period", "No fiscal period on file",
                FinancialIntegrity, Critical, 15.0, 15.0, L,
                "/govern/finance/statements", false, CheckKind::MissingFiscalPeriod),
            def("duplicate-fiscal-period", "Duplicate fiscal periods",
                FinancialIntegrity, Warning, 5.0, 20.0, M,
                "/govern/finance/statements", false, CheckKind::DuplicateFiscalPeriod),
            def("stale-financials", "Financial statements out of date",
                FinancialIntegrity, Warning, 8.0, 8.0, M,
                "/govern/finance/statements", false, CheckKind::StaleFinancials),
            def("unretained-financial-record", "Financial records without retention",
                FinancialIntegrity, Info, 1.0, 10.0, S,
                "/govern/retention/assign", true, CheckKind::UnretainedFinancialRecord),
            def("overdue-filing", "Filings past due",
                Compliance, Critical, 12.0, 36.0, M,
                "/govern/filings/overdue", false, CheckKind::OverdueFiling),
            def("expired-policy", "Expired policies still active",
                Compliance, Warning, 5.0, 25.0, M,
                "/govern/policies/renew", false, CheckKind::ExpiredPolicy),
            def("missing-retention-policy", "Records without retention policy",
                Compliance, Info, 1.0, 12.0, S,
                "/govern/retention/assign", true, CheckKind::MissingRetentionPolicy),
            def("unsigned-resolution", "Resolutions missing approvals",
                Compliance, Critical, 8.0, 32.0, M,
                "/govern/approvals/queue", false, CheckKind::UnsignedResolution),
            def("untagged-record", "Untagged records",
                Compliance, Info, 1.0, 8.0, S,
                "/govern/records/tags", true, CheckKind::UntaggedRecord),
            def("missing-risk-assessment", "No risk assessment on file",
                RiskExposure, Critical, 15.0, 15.0, L,
                "/govern/risk/assess", false, CheckKind::MissingRiskAssessment),
            def("stale-risk-assessment", "Risk assessment out of date",
                RiskExposure, Warning, 10.0, 10.0, M,
                "/govern/risk/assess", false, CheckKind::StaleRiskAssessment),
            def("expired-contract", "Expired contracts still active",
                RiskExposure, Warning, 6.0, 30.0, M,
                "/govern/contracts/renew", false, CheckKind::ExpiredContract),
            def("owner-concentration", "Ownership concentrated on one person",
                RiskExposure, Info, 5.0, 5.0, S,
                "/govern/records/owners", false, CheckKind::OwnerConcentration),
            def("unreviewed-risk-assessment", "Risk assessments never reviewed",
                RiskExposure, Critical, 9.0, 27.0, M,
                "/govern/risk/review", false, CheckKind::UnreviewedRiskAssessment),
            def("orphan-record", "Orphan records",
                DataIntegrity, Critical, 15.0, 15.0, S,
                "/govern/records/relink", false, CheckKind::OrphanRecord),
            def("duplicate-record-id", "Duplicate record identifiers",
                DataIntegrity, Critical, 10.0, 30.0, S,
                "/govern/records/dedupe", false, CheckKind::DuplicateRecordId),
            def("broken-revision-history", "Broken revision history",
                DataIntegrity, Critical, 8.0, 24.0, M,
                "/govern/records/history", false, CheckKind::BrokenRevisionHistory),
            def("future-timestamp", "Timestamps in the future",
                DataIntegrity, Warning, 4.0, 16.0, S,
                "/govern/records/timestamps", false, CheckKind::FutureTimestamp),
            def("missing-title", "Records without a title",
                DataIntegrity, Info, 1.0, 10.0, S,
                "/govern/records/titles", true, CheckKind::MissingTitle),
        ]
    }
}

/// Start of the lookback window ending at the snapshot timestamp. Fails only
/// when the subtraction leaves the representable time range; the executor
/// degrades the check instead of aborting the scan.
fn window_start(
    check: &'static str,
    snapshot: &RecordSnapshot,
    days: i64,
) -> Result<chrono::DateTime<chrono::Utc>, CheckExecutionError> {
    snapshot
        .taken_at
        .checked_sub_signed(Duration::days(days))
        .ok_or_else(|| CheckExecutionError {
            check: check.to_string(),
            reason: format!("lookback of {days} days leaves the representable time range"),
        })
}

fn missing_record_owner(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.is_active() && record.owner.is_none())
        .collect();
    let detail = format!("{} active record(s) have no owner assigned", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn stale_draft(snapshot: &RecordSnapshot) -> Result<Option<CheckEvidence>, CheckExecutionError> {
    let cutoff = window_start("stale-draft", snapshot, STALE_DRAFT_DAYS)?;
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.status == RecordStatus::Draft && record.updated_at < cutoff)
        .collect();
    let detail = format!(
        "{} draft(s) untouched for more than {STALE_DRAFT_DAYS} days",
        offenders.len()
    );
    Ok(CheckEvidence::from_records(offenders, detail))
}

fn unapproved_finalized(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.status == RecordStatus::Finalized && record.approvals.is_empty())
        .collect();
    let detail = format!("{} finalized record(s) carry no approval", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn minutes_gap(snapshot: &RecordSnapshot) -> Result<Option<CheckEvidence>, CheckExecutionError> {
    let latest = snapshot
        .records_of_kind(RecordKind::MeetingMinutes)
        .filter(|record| record.status == RecordStatus::Finalized)
        .map(|record| record.updated_at)
        .max();
    let cutoff = window_start("minutes-gap", snapshot, MINUTES_GAP_DAYS)?;
    let evidence = match latest {
        None => Some(CheckEvidence::boolean("no finalized meeting minutes on file")),
        Some(stamp) if stamp < cutoff => Some(CheckEvidence::boolean(format!(
            "no finalized meeting minutes in the last {MINUTES_GAP_DAYS} days"
        ))),
        Some(_) => None,
    };
    Ok(evidence)
}

fn overdue_policy_review(
    snapshot: &RecordSnapshot,
) -> Result<Option<CheckEvidence>, CheckExecutionError> {
    let cutoff = window_start("overdue-policy-review", snapshot, POLICY_REVIEW_DAYS)?;
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::Policy)
        .filter(|record| {
            record.is_active()
                && record.last_reviewed_at.unwrap_or(record.created_at) < cutoff
        })
        .collect();
    let detail = format!(
        "{} policy(ies) not reviewed within {POLICY_REVIEW_DAYS} days",
        offenders.len()
    );
    Ok(CheckEvidence::from_records(offenders, detail))
}

fn unreconciled_statement(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::FinancialStatement)
        .filter(|record| matches!(record.fiscal, Some(fiscal) if !fiscal.reconciled))
        .collect();
    let detail = format!("{} financial statement(s) unreconciled", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn missing_fiscal_period(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let any = snapshot
        .records_of_kind(RecordKind::FinancialStatement)
        .any(|record| record.fiscal.is_some());
    if any {
        None
    } else {
        Some(CheckEvidence::boolean(
            "no financial statement with fiscal details on file",
        ))
    }
}

fn duplicate_fiscal_period(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let mut seen = std::collections::BTreeMap::new();
    for record in snapshot.records_of_kind(RecordKind::FinancialStatement) {
        if let Some(fiscal) = record.fiscal {
            seen.entry(fiscal.period_end).or_insert_with(Vec::new).push(record);
        }
    }
    let offenders: Vec<_> = seen
        .into_values()
        .filter(|records| records.len() > 1)
        .flatten()
        .collect();
    let detail = format!(
        "{} statement(s) share a fiscal period with another statement",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn stale_financials(
    snapshot: &RecordSnapshot,
) -> Result<Option<CheckEvidence>, CheckExecutionError> {
    let latest = snapshot
        .records_of_kind(RecordKind::FinancialStatement)
        .filter_map(|record| record.fiscal.map(|fiscal| fiscal.period_end))
        .max();
    let Some(period_end) = latest else {
        // missing-fiscal-period owns the empty case.
        return Ok(None);
    };
    let days = snapshot
        .taken_at
        .date_naive()
        .signed_duration_since(period_end)
        .num_days();
    if days > STALE_FINANCIALS_DAYS {
        Ok(Some(CheckEvidence::boolean(format!(
            "latest fiscal period ended {days} days ago"
        ))))
    } else {
        Ok(None)
    }
}

fn unretained_financial_record(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::FinancialStatement)
        .filter(|record| record.retention_policy.is_none())
        .collect();
    let detail = format!(
        "{} financial record(s) lack a retention policy",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn overdue_filing(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let today = snapshot.taken_at.date_naive();
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::Filing)
        .filter(|record| {
            record.status != RecordStatus::Finalized
                && record.status != RecordStatus::Archived
                && matches!(record.expires_at, Some(due) if due < today)
        })
        .collect();
    let detail = format!("{} filing(s) past their due date", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn expired_policy(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let today = snapshot.taken_at.date_naive();
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::Policy)
        .filter(|record| {
            record.is_active() && matches!(record.expires_at, Some(expiry) if expiry < today)
        })
        .collect();
    let detail = format!("{} active policy(ies) past expiry", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn missing_retention_policy(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| {
            record.kind != RecordKind::FinancialStatement && record.retention_policy.is_none()
        })
        .collect();
    let detail = format!("{} record(s) lack a retention policy", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn unsigned_resolution(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::Resolution)
        .filter(|record| record.status == RecordStatus::Finalized && record.approvals.len() < 2)
        .collect();
    let detail = format!(
        "{} resolution(s) finalized without the required two approvals",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn untagged_record(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.is_active() && record.tags.is_empty())
        .collect();
    let detail = format!("{} active record(s) carry no tags", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn missing_risk_assessment(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    if snapshot.records_of_kind(RecordKind::RiskAssessment).next().is_some() {
        None
    } else {
        Some(CheckEvidence::boolean("no risk assessment on file"))
    }
}

fn stale_risk_assessment(
    snapshot: &RecordSnapshot,
) -> Result<Option<CheckEvidence>, CheckExecutionError> {
    let Some(latest) = snapshot.latest_of_kind(RecordKind::RiskAssessment) else {
        // missing-risk-assessment owns the empty case.
        return Ok(None);
    };
    let cutoff = window_start("stale-risk-assessment", snapshot, STALE_RISK_DAYS)?;
    if latest.updated_at < cutoff {
        Ok(Some(CheckEvidence::boolean(format!(
            "latest risk assessment older than {STALE_RISK_DAYS} days"
        ))))
    } else {
        Ok(None)
    }
}

fn expired_contract(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let today = snapshot.taken_at.date_naive();
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::Contract)
        .filter(|record| {
            record.is_active() && matches!(record.expires_at, Some(expiry) if expiry < today)
        })
        .collect();
    let detail = format!("{} active contract(s) past expiry", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}

fn owner_concentration(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let owned: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.is_active())
        .filter_map(|record| record.owner.as_deref())
        .collect();
    if owned.len() < OWNER_CONCENTRATION_MIN_RECORDS {
        return None;
    }
    let mut tally: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for owner in &owned {
        *tally.entry(owner).or_insert(0) += 1;
    }
    let (owner, count) = tally.into_iter().max_by_key(|(_, count)| *count)?;
    let ratio = count as f64 / owned.len() as f64;
    if ratio > OWNER_CONCENTRATION_RATIO {
        Some(CheckEvidence::boolean(format!(
            "'{owner}' owns {:.0}% of active records",
            ratio * 100.0
        )))
    } else {
        None
    }
}

fn unreviewed_risk_assessment(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records_of_kind(RecordKind::RiskAssessment)
        .filter(|record| record.status == RecordStatus::Finalized && record.approvals.is_empty())
        .collect();
    let detail = format!(
        "{} finalized risk assessment(s) never reviewed",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn orphan_record(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let known: std::collections::BTreeSet<_> =
        snapshot.records.iter().map(|record| &record.id).collect();
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| {
            matches!(&record.parent_id, Some(parent) if !known.contains(parent))
        })
        .collect();
    let detail = format!(
        "{} record(s) reference a parent that does not exist",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn duplicate_record_id(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let mut seen = std::collections::BTreeMap::new();
    for record in &snapshot.records {
        *seen.entry(&record.id).or_insert(0u32) += 1;
    }
    let duplicated: Vec<_> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id.clone())
        .collect();
    if duplicated.is_empty() {
        return None;
    }
    Some(CheckEvidence {
        count: duplicated.len() as u32,
        detail: format!("{} record id(s) appear more than once", duplicated.len()),
        record_ids: duplicated,
    })
}

fn broken_revision_history(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| !record.revision_history_complete())
        .collect();
    let detail = format!(
        "{} record(s) have gaps in their revision log",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn future_timestamp(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| {
            record.created_at > snapshot.taken_at || record.updated_at > snapshot.taken_at
        })
        .collect();
    let detail = format!(
        "{} record(s) carry timestamps later than the snapshot",
        offenders.len()
    );
    CheckEvidence::from_records(offenders, detail)
}

fn missing_title(snapshot: &RecordSnapshot) -> Option<CheckEvidence> {
    let offenders: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.title.trim().is_empty())
        .collect();
    let detail = format!("{} record(s) have an empty title", offenders.len());
    CheckEvidence::from_records(offenders, detail)
}
