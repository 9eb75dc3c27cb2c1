use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{CapId, CheckId};
use super::domain::{Category, Effort, RecordId, ScanMode, ScannerVersion, Severity, TenantId};
use super::ruleset::RulesetConfig;

/// Evidence that a check's condition held against the corpus, with the
/// bounded penalty it contributed. Immutable once the scan is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: CheckId,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub occurrence_count: u32,
    pub record_ids: Vec<RecordId>,
    pub penalty_applied: f64,
    pub effort: Effort,
    pub fix_route: String,
    pub auto_fixable: bool,
}

/// One triggered blocking cap. Every triggered cap is reported, not only the
/// binding one, so no gating issue is hidden behind a tighter cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockerTriggered {
    pub cap_id: CapId,
    pub name: String,
    pub cap_value: f64,
    pub score_before_cap: f64,
    pub triggered_by: Vec<CheckId>,
}

/// Ranked remediation recommendation derived from a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub check_id: CheckId,
    pub title: String,
    pub priority_score: f64,
    pub estimated_gain: f64,
    pub effort: Effort,
    pub fix_route: String,
    pub auto_fixable: bool,
}

/// Per-severity finding counts for the response header block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl FindingsSummary {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        summary.total = findings.len();
        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
        }
        summary
    }
}

/// One entry of the mode-specific readiness checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Mode-specific pass/fail verdict layered atop the numeric score. Both the
/// checklist and the score threshold must hold; neither alone is sufficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub mode: ScanMode,
    pub passed: bool,
    pub score_threshold: f64,
    pub score_met: bool,
    pub items: Vec<ChecklistItem>,
}

/// Corpus and execution counters reported with every scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub corpus: BTreeMap<String, u64>,
    pub checks_executed: usize,
    pub degraded_checks: usize,
    pub duration_ms: u64,
}

/// Immutable product of one scan. Produced once by the orchestrator, cached
/// with a TTL, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub tenant_id: TenantId,
    pub scanned_at: DateTime<Utc>,
    pub version: ScannerVersion,
    pub registry_version: String,
    pub mode: ScanMode,
    pub raw_score: f64,
    pub final_score: f64,
    pub category_scores: BTreeMap<Category, f64>,
    pub category_penalties: BTreeMap<Category, f64>,
    pub blockers_triggered: Vec<BlockerTriggered>,
    pub is_capped: bool,
    pub findings_summary: FindingsSummary,
    pub findings: Vec<Finding>,
    pub next_actions: Vec<NextAction>,
    pub total_potential_gain: f64,
    pub readiness: Option<Readiness>,
    pub stats: ScanStats,
    pub config_snapshot: RulesetConfig,
}
