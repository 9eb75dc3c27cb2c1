use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::{CapId, CheckRegistry};
use super::domain::{Category, ScanMode, Severity, TenantId};

const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Per-tenant scoring configuration. Every scan records the exact values it
/// used, so later edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetConfig {
    /// Category weights in percent; validated to sum to 100.
    pub weights: BTreeMap<Category, f64>,
    pub severity_multipliers: BTreeMap<Severity, f64>,
    pub enabled_caps: BTreeSet<CapId>,
    pub mode: ScanMode,
    /// Bumped on every accepted write; the scan cache is keyed by it.
    #[serde(default)]
    pub revision: u64,
}

impl RulesetConfig {
    /// Documented defaults restored by a reset.
    pub fn defaults(registry: &CheckRegistry) -> Self {
        let weights = BTreeMap::from([
            (Category::GovernanceHygiene, 25.0),
            (Category::FinancialIntegrity, 20.0),
            (Category::Compliance, 25.0),
            (Category::RiskExposure, 10.0),
            (Category::DataIntegrity, 20.0),
        ]);
        let severity_multipliers = BTreeMap::from([
            (Severity::Info, 0.5),
            (Severity::Warning, 1.0),
            (Severity::Critical, 1.5),
        ]);
        Self {
            weights,
            severity_multipliers,
            enabled_caps: registry.cap_ids(),
            mode: ScanMode::Normal,
            revision: 0,
        }
    }

    pub fn weight(&self, category: Category) -> f64 {
        self.weights.get(&category).copied().unwrap_or(0.0)
    }

    pub fn multiplier(&self, severity: Severity) -> f64 {
        self.severity_multipliers.get(&severity).copied().unwrap_or(1.0)
    }

    /// Validate against the registry. Runs before every persist; an invalid
    /// config is never stored.
    pub fn validate(&self, registry: &CheckRegistry) -> Result<(), ConfigValidationError> {
        for category in Category::ALL {
            if !self.weights.contains_key(&category) {
                return Err(ConfigValidationError::MissingWeight { category });
            }
        }
        let sum: f64 = self.weights.values().sum();
        if (sum - 100.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigValidationError::WeightSum { sum });
        }
        if let Some((category, weight)) = self
            .weights
            .iter()
            .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
        {
            return Err(ConfigValidationError::NegativeWeight {
                category: *category,
                weight: *weight,
            });
        }
        for severity in [Severity::Info, Severity::Warning, Severity::Critical] {
            match self.severity_multipliers.get(&severity) {
                None => return Err(ConfigValidationError::MissingMultiplier { severity }),
                Some(multiplier) if !multiplier.is_finite() || *multiplier < 0.0 => {
                    return Err(ConfigValidationError::NegativeMultiplier {
                        severity,
                        multiplier: *multiplier,
                    })
                }
                Some(_) => {}
            }
        }
        for cap in &self.enabled_caps {
            if !registry.contains_cap(cap) {
                return Err(ConfigValidationError::UnknownCap {
                    cap: cap.0.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Rejected configuration writes. Surfaced synchronously, never persisted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("category weights sum to {sum}, expected 100")]
    WeightSum { sum: f64 },
    #[error("no weight configured for category {category:?}")]
    MissingWeight { category: Category },
    #[error("weight for {category:?} is {weight}, must be finite and >= 0")]
    NegativeWeight { category: Category, weight: f64 },
    #[error("no multiplier configured for severity {severity:?}")]
    MissingMultiplier { severity: Severity },
    #[error("multiplier for {severity:?} is {multiplier}, must be finite and >= 0")]
    NegativeMultiplier { severity: Severity, multiplier: f64 },
    #[error("enabled cap '{cap}' is not in the cap catalog")]
    UnknownCap { cap: String },
}

/// Error enumeration for ruleset persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RulesetStoreError {
    #[error("ruleset store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for per-tenant rulesets so the scan service can be
/// exercised in isolation. `load` falls back to defaults for unknown tenants.
pub trait RulesetStore: Send + Sync {
    fn load(&self, tenant: &TenantId) -> Result<RulesetConfig, RulesetStoreError>;
    fn save(&self, tenant: &TenantId, config: RulesetConfig) -> Result<RulesetConfig, RulesetStoreError>;
}
