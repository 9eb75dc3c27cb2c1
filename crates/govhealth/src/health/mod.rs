//! Governance record health scoring: a fixed check catalog executed against a
//! read-only corpus snapshot, folded into a bounded weighted score with
//! blocking caps, a mode-specific readiness verdict, and ranked remediation
//! actions.

pub mod actions;
pub mod catalog;
pub mod checks;
pub mod domain;
pub mod executor;
pub mod readiness;
pub mod result;
pub mod router;
pub mod ruleset;
pub mod scan;
pub mod scoring;
pub mod service;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use catalog::{CapDefinition, CapId, CheckDefinition, CheckId, CheckRegistry, RegistryError};
pub use checks::{CheckEvidence, CheckExecutionError, CheckKind};
pub use domain::{
    Approval, Category, Effort, FiscalDetails, GovernanceRecord, RecordId, RecordKind,
    RecordSnapshot, RecordStatus, RevisionEntry, ScanMode, ScannerVersion, Severity, TenantId,
};
pub use result::{
    BlockerTriggered, ChecklistItem, Finding, FindingsSummary, NextAction, Readiness, ScanResult,
    ScanStats,
};
pub use router::health_router;
pub use ruleset::{
    ConfigValidationError, RulesetConfig, RulesetStore, RulesetStoreError,
};
pub use service::{
    HealthScanService, InMemoryRulesetStore, ScanOutcome, ScanServiceConfig, ScanServiceError,
};
pub use snapshot::{SnapshotError, SnapshotProvider};
