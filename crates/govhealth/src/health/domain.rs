use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for the tenant whose corpus is being scanned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a governance record inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

/// The five fixed check categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GovernanceHygiene,
    FinancialIntegrity,
    Compliance,
    RiskExposure,
    DataIntegrity,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::GovernanceHygiene,
        Category::FinancialIntegrity,
        Category::Compliance,
        Category::RiskExposure,
        Category::DataIntegrity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::GovernanceHygiene => "governance_hygiene",
            Category::FinancialIntegrity => "financial_integrity",
            Category::Compliance => "compliance",
            Category::RiskExposure => "risk_exposure",
            Category::DataIntegrity => "data_integrity",
        }
    }
}

/// Severity attached to a check definition and carried onto its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Ordering weight for tie-breaks: critical outranks warning outranks info.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 2,
            Severity::Warning => 1,
            Severity::Info => 0,
        }
    }
}

/// Remediation effort bucket used by the next-action prioritizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    S,
    M,
    L,
}

impl Effort {
    pub fn weight(&self) -> f64 {
        match self {
            Effort::S => 1.0,
            Effort::M => 2.0,
            Effort::L => 4.0,
        }
    }
}

/// Scan mode controlling which readiness checklist (if any) is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Normal,
    Audit,
    Court,
}

/// Scanner generation. Selected once at the API boundary; the pipeline never
/// branches on it internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerVersion {
    V1,
    #[default]
    V2,
}

impl ScannerVersion {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Some(ScannerVersion::V1),
            "v2" | "2" => Some(ScannerVersion::V2),
            _ => None,
        }
    }
}

/// Kind of governance record held in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Policy,
    MeetingMinutes,
    Resolution,
    FinancialStatement,
    Contract,
    Filing,
    RiskAssessment,
}

/// Lifecycle status of a governance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    InReview,
    Finalized,
    Archived,
}

/// A recorded approval on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub approver: String,
    pub approved_at: DateTime<Utc>,
}

/// One entry in a record's revision log. Sequences start at 1 and a complete
/// history is contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub sequence: u32,
    pub revised_at: DateTime<Utc>,
    pub author: String,
}

/// Fiscal metadata attached to financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiscalDetails {
    pub period_end: NaiveDate,
    pub reconciled: bool,
}

/// A single governance/compliance record as seen by the checks. The scan only
/// ever reads these; the corpus itself is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRecord {
    pub id: RecordId,
    pub title: String,
    pub kind: RecordKind,
    pub status: RecordStatus,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approvals: Vec<Approval>,
    pub revisions: Vec<RevisionEntry>,
    pub parent_id: Option<RecordId>,
    pub expires_at: Option<NaiveDate>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub retention_policy: Option<String>,
    pub fiscal: Option<FiscalDetails>,
    pub tags: Vec<String>,
}

impl GovernanceRecord {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            RecordStatus::Draft | RecordStatus::InReview | RecordStatus::Finalized
        )
    }

    /// A revision log is complete when sequences run 1..=n without gaps.
    pub fn revision_history_complete(&self) -> bool {
        let mut sequences: Vec<u32> = self.revisions.iter().map(|entry| entry.sequence).collect();
        sequences.sort_unstable();
        sequences
            .iter()
            .enumerate()
            .all(|(index, sequence)| *sequence == index as u32 + 1)
    }
}

/// Read-only view of a tenant's corpus captured at a point in time. All checks
/// are pure functions of this structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub tenant_id: TenantId,
    pub taken_at: DateTime<Utc>,
    pub records: Vec<GovernanceRecord>,
}

impl RecordSnapshot {
    pub fn records_of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &GovernanceRecord> {
        self.records.iter().filter(move |record| record.kind == kind)
    }

    /// Latest record of the given kind by `updated_at`, if any exists.
    pub fn latest_of_kind(&self, kind: RecordKind) -> Option<&GovernanceRecord> {
        self.records_of_kind(kind).max_by_key(|record| record.updated_at)
    }

    /// Counters reported back in `ScanResult::stats`.
    pub fn corpus_counters(&self) -> BTreeMap<String, u64> {
        let mut counters = BTreeMap::new();
        counters.insert("total_records".to_string(), self.records.len() as u64);
        for record in &self.records {
            let key = match record.status {
                RecordStatus::Draft => "draft_records",
                RecordStatus::InReview => "in_review_records",
                RecordStatus::Finalized => "finalized_records",
                RecordStatus::Archived => "archived_records",
            };
            *counters.entry(key.to_string()).or_insert(0) += 1;
        }
        counters
    }
}
