//! Penalty, aggregation, composition, and cap arithmetic. Pure functions over
//! findings and a single consistent ruleset read.

use std::collections::BTreeMap;

use super::catalog::{CheckId, CheckRegistry};
use super::checks::CheckEvidence;
use super::domain::{Category, ScannerVersion};
use super::result::{BlockerTriggered, Finding};
use super::ruleset::RulesetConfig;

/// Bounded penalty for one finding. The `max_penalty` ceiling keeps checks
/// whose occurrence count scales with corpus size from crushing large tenants.
pub fn penalty(base_deduction: f64, max_penalty: f64, count: u32, multiplier: f64) -> f64 {
    (base_deduction * f64::from(count) * multiplier).min(max_penalty)
}

/// Turn executor evidence into findings with their penalties applied.
/// Evidence for checks missing from the registry is dropped; the registry is
/// the source of truth for what a scan can report.
pub fn findings_from_evidence(
    evidence: Vec<(CheckId, CheckEvidence)>,
    registry: &CheckRegistry,
    ruleset: &RulesetConfig,
) -> Vec<Finding> {
    evidence
        .into_iter()
        .filter_map(|(check_id, evidence)| {
            let definition = registry.check(&check_id)?;
            let penalty_applied = penalty(
                definition.base_deduction,
                definition.max_penalty,
                evidence.count,
                ruleset.multiplier(definition.severity),
            );
            Some(Finding {
                check_id,
                category: definition.category,
                severity: definition.severity,
                title: definition.title.to_string(),
                description: evidence.detail,
                occurrence_count: evidence.count,
                record_ids: evidence.record_ids,
                penalty_applied,
                effort: definition.effort,
                fix_route: definition.fix_route.to_string(),
                auto_fixable: definition.auto_fixable,
            })
        })
        .collect()
}

/// Clamp per-category deductions into 0..=100 scores. Every category is
/// present in the output even when it has no findings.
pub fn category_scores(findings: &[Finding]) -> BTreeMap<Category, f64> {
    let mut deductions: BTreeMap<Category, f64> = BTreeMap::new();
    for finding in findings {
        *deductions.entry(finding.category).or_insert(0.0) += finding.penalty_applied;
    }
    Category::ALL
        .into_iter()
        .map(|category| {
            let deduction = deductions.get(&category).copied().unwrap_or(0.0);
            (category, (100.0 - deduction).clamp(0.0, 100.0))
        })
        .collect()
}

/// The reported penalty is the clamped deduction, not the raw sum: once a
/// category bottoms out at zero it reports exactly 100 regardless of how far
/// past the floor its findings went.
pub fn category_penalties(scores: &BTreeMap<Category, f64>) -> BTreeMap<Category, f64> {
    scores
        .iter()
        .map(|(category, score)| (*category, 100.0 - score))
        .collect()
}

/// Weighted composition of category scores. The legacy v1 scorer predates
/// tenant weighting and averages the categories evenly.
pub fn compose_raw_score(
    scores: &BTreeMap<Category, f64>,
    ruleset: &RulesetConfig,
    version: ScannerVersion,
) -> f64 {
    match version {
        ScannerVersion::V1 => {
            let count = scores.len().max(1) as f64;
            scores.values().sum::<f64>() / count
        }
        ScannerVersion::V2 => scores
            .iter()
            .map(|(category, score)| score * ruleset.weight(*category) / 100.0)
            .sum(),
    }
}

/// Apply blocking caps: a cap triggers on the presence of at least one
/// finding from its trigger set. The final score is the minimum of the raw
/// score and every triggered cap value; all triggered caps are reported.
pub fn apply_caps(
    raw_score: f64,
    findings: &[Finding],
    registry: &CheckRegistry,
    ruleset: &RulesetConfig,
) -> (f64, Vec<BlockerTriggered>) {
    let mut blockers = Vec::new();
    for cap in registry.caps() {
        if !ruleset.enabled_caps.contains(&cap.id) {
            continue;
        }
        let triggered_by: Vec<CheckId> = findings
            .iter()
            .filter(|finding| cap.trigger_check_ids.contains(&finding.check_id))
            .map(|finding| finding.check_id.clone())
            .collect();
        if !triggered_by.is_empty() {
            blockers.push(BlockerTriggered {
                cap_id: cap.id.clone(),
                name: cap.name.to_string(),
                cap_value: cap.cap_value,
                score_before_cap: raw_score,
                triggered_by,
            });
        }
    }

    let final_score = blockers
        .iter()
        .map(|blocker| blocker.cap_value)
        .fold(raw_score, f64::min);
    (final_score, blockers)
}
