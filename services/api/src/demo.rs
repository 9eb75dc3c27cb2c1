use crate::infra::SeededSnapshotProvider;
use clap::Args;
use govhealth::error::AppError;
use govhealth::health::{
    CheckRegistry, HealthScanService, InMemoryRulesetStore, ScanMode, ScanResult,
    ScanServiceConfig, ScannerVersion, TenantId,
};
use std::sync::Arc;

type DemoService = HealthScanService<SeededSnapshotProvider, InMemoryRulesetStore>;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Tenant whose corpus should be scanned
    #[arg(long, default_value = "demo-tenant")]
    pub(crate) tenant: String,
    /// Scanner version override (v1 or v2)
    #[arg(long, value_parser = parse_version)]
    pub(crate) version: Option<ScannerVersion>,
    /// Scan mode for the tenant ruleset (normal, audit, or court)
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<ScanMode>,
    /// Emit the full scan result as JSON instead of the summary view
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Tenant name used for the demo corpus
    #[arg(long, default_value = "demo-tenant")]
    pub(crate) tenant: String,
}

fn parse_version(raw: &str) -> Result<ScannerVersion, String> {
    ScannerVersion::parse(raw)
        .ok_or_else(|| format!("unknown scanner version '{raw}', expected v1 or v2"))
}

fn parse_mode(raw: &str) -> Result<ScanMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "normal" => Ok(ScanMode::Normal),
        "audit" => Ok(ScanMode::Audit),
        "court" => Ok(ScanMode::Court),
        other => Err(format!(
            "unknown scan mode '{other}', expected normal, audit, or court"
        )),
    }
}

fn demo_service() -> Result<Arc<DemoService>, AppError> {
    let registry = Arc::new(CheckRegistry::standard()?);
    let rulesets = Arc::new(InMemoryRulesetStore::new(registry.clone()));
    let provider = Arc::new(SeededSnapshotProvider::default());
    Ok(Arc::new(HealthScanService::new(
        registry,
        provider,
        rulesets,
        ScanServiceConfig::default(),
    )))
}

fn set_mode(service: &DemoService, tenant: &TenantId, mode: ScanMode) -> bool {
    let mut ruleset = match service.ruleset(tenant) {
        Ok(ruleset) => ruleset,
        Err(err) => {
            println!("  Ruleset unavailable: {err}");
            return false;
        }
    };
    ruleset.mode = mode;
    match service.update_ruleset(tenant, ruleset) {
        Ok(_) => true,
        Err(err) => {
            println!("  Ruleset update rejected: {err}");
            false
        }
    }
}

pub(crate) async fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let ScanArgs {
        tenant,
        version,
        mode,
        json,
    } = args;

    let service = demo_service()?;
    let tenant = TenantId(tenant);

    if let Some(mode) = mode {
        if !set_mode(&service, &tenant, mode) {
            return Ok(());
        }
    }

    let outcome = match service.score(&tenant, version).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("Scan unavailable: {err}");
            return Ok(());
        }
    };

    if json {
        match serde_json::to_string_pretty(&*outcome.result) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Scan result not serializable: {err}"),
        }
        return Ok(());
    }

    render_scan(&outcome.result);
    render_next_actions(&outcome.result);
    render_readiness(&outcome.result);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = demo_service()?;
    let tenant = TenantId(args.tenant);

    println!("Governance health demo for tenant '{tenant}'");
    println!("\n1. Baseline scan (normal mode, v2 scanner)");
    let baseline = match service.score(&tenant, None).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Scan unavailable: {err}");
            return Ok(());
        }
    };
    render_scan(&baseline.result);
    render_next_actions(&baseline.result);

    println!("\n2. Audit readiness (same corpus, audit-mode ruleset)");
    if !set_mode(&service, &tenant, ScanMode::Audit) {
        return Ok(());
    }
    let audit = match service.score(&tenant, None).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Scan unavailable: {err}");
            return Ok(());
        }
    };
    render_readiness(&audit.result);

    println!("\n3. Legacy comparison (v1 scanner, unweighted and uncapped)");
    let legacy = match service.score(&tenant, Some(ScannerVersion::V1)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Scan unavailable: {err}");
            return Ok(());
        }
    };
    println!(
        "  v1 final score {:.1} vs v2 final score {:.1} (v2 raw {:.1})",
        legacy.result.final_score, baseline.result.final_score, baseline.result.raw_score
    );

    Ok(())
}

fn render_scan(result: &ScanResult) {
    println!(
        "  Final score {:.1} (raw {:.1}){}",
        result.final_score,
        result.raw_score,
        if result.is_capped { " [capped]" } else { "" }
    );
    println!("  Category scores:");
    for (category, score) in &result.category_scores {
        println!("    - {}: {:.1}", category.label(), score);
    }
    if result.blockers_triggered.is_empty() {
        println!("  Blockers: none");
    } else {
        println!("  Blockers:");
        for blocker in &result.blockers_triggered {
            println!(
                "    - {} caps the score at {:.0} (triggered by {})",
                blocker.name,
                blocker.cap_value,
                blocker
                    .triggered_by
                    .iter()
                    .map(|id| id.0.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    println!(
        "  Findings: {} total ({} critical / {} warning / {} info)",
        result.findings_summary.total,
        result.findings_summary.critical,
        result.findings_summary.warning,
        result.findings_summary.info
    );
}

fn render_next_actions(result: &ScanResult) {
    if result.next_actions.is_empty() {
        println!("  Next actions: none");
        return;
    }
    println!(
        "  Next actions (top {}, {:.1} points recoverable in total):",
        result.next_actions.len().min(5),
        result.total_potential_gain
    );
    for action in result.next_actions.iter().take(5) {
        println!(
            "    - {} (+{:.1} points, effort {:?}{}) via {}",
            action.title,
            action.estimated_gain,
            action.effort,
            if action.auto_fixable { ", auto-fixable" } else { "" },
            action.fix_route
        );
    }
}

fn render_readiness(result: &ScanResult) {
    let Some(readiness) = &result.readiness else {
        println!("  Readiness: not evaluated (normal mode)");
        return;
    };
    println!(
        "  Readiness ({:?} mode): {} | score {:.1} against threshold {:.0} ({})",
        readiness.mode,
        if readiness.passed { "PASS" } else { "FAIL" },
        result.final_score,
        readiness.score_threshold,
        if readiness.score_met { "met" } else { "not met" }
    );
    for item in &readiness.items {
        println!(
            "    [{}] {}: {}",
            if item.passed { "x" } else { " " },
            item.name,
            item.detail
        );
    }
}
