//! Next-action prioritization: gain-to-effort ranking of unresolved findings.

use std::cmp::Ordering;

use super::result::{Finding, NextAction};

/// Rank findings by `penalty_applied / effort_weight`, descending. Ties break
/// by severity (critical first), then by estimated gain descending, then by
/// check id so the order is total.
pub fn prioritize(findings: &[Finding]) -> Vec<NextAction> {
    let mut actions: Vec<NextAction> = findings
        .iter()
        .map(|finding| NextAction {
            check_id: finding.check_id.clone(),
            title: finding.title.clone(),
            priority_score: finding.penalty_applied / finding.effort.weight(),
            estimated_gain: finding.penalty_applied,
            effort: finding.effort,
            fix_route: finding.fix_route.clone(),
            auto_fixable: finding.auto_fixable,
        })
        .collect();

    let severity_rank = |check_id: &super::catalog::CheckId| {
        findings
            .iter()
            .find(|finding| &finding.check_id == check_id)
            .map(|finding| finding.severity.rank())
            .unwrap_or(0)
    };

    actions.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| severity_rank(&b.check_id).cmp(&severity_rank(&a.check_id)))
            .then_with(|| {
                b.estimated_gain
                    .partial_cmp(&a.estimated_gain)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.check_id.cmp(&b.check_id))
    });
    actions
}

/// Optimistic upper bound on recoverable score: category clamping can make
/// the true achievable gain smaller.
pub fn total_potential_gain(findings: &[Finding]) -> f64 {
    findings.iter().map(|finding| finding.penalty_applied).sum()
}
