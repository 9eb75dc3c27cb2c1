use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::checks::CheckKind;
use super::domain::{Category, Effort, Severity};

/// Stable identifier of a registered check. Cap trigger sets reference these,
/// so ids never change across catalog versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckId(pub String);

/// Stable identifier of a blocking cap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapId(pub String);

/// Immutable metadata for one registered check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckDefinition {
    pub id: CheckId,
    pub title: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub base_deduction: f64,
    pub max_penalty: f64,
    pub effort: Effort,
    pub fix_route: &'static str,
    pub auto_fixable: bool,
    #[serde(skip)]
    pub kind: CheckKind,
}

/// A hard score ceiling applied when any finding from its trigger set is present.
#[derive(Debug, Clone, Serialize)]
pub struct CapDefinition {
    pub id: CapId,
    pub name: &'static str,
    pub trigger_check_ids: BTreeSet<CheckId>,
    pub cap_value: f64,
}

/// Error raised while assembling the registry. Surfaced at startup, never
/// during a scan.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("check '{0}' registered twice")]
    DuplicateCheck(String),
    #[error("check '{id}' has max_penalty {max} below base_deduction {base}")]
    PenaltyBounds { id: String, base: f64, max: f64 },
    #[error("cap '{cap}' references unknown check '{check}'")]
    UnknownTrigger { cap: String, check: String },
}

/// Versioned, immutable catalog of checks and caps. Built once at startup and
/// shared across scans.
#[derive(Debug, Clone)]
pub struct CheckRegistry {
    version: &'static str,
    checks: BTreeMap<CheckId, CheckDefinition>,
    caps: BTreeMap<CapId, CapDefinition>,
}

impl CheckRegistry {
    /// The standard catalog: twenty-five checks across the five categories and
    /// the four blocking caps.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::build("2026.1", CheckKind::catalog(), standard_caps())
    }

    pub(crate) fn build(
        version: &'static str,
        definitions: Vec<CheckDefinition>,
        caps: Vec<CapDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut checks = BTreeMap::new();
        for definition in definitions {
            if definition.max_penalty < definition.base_deduction {
                return Err(RegistryError::PenaltyBounds {
                    id: definition.id.0.clone(),
                    base: definition.base_deduction,
                    max: definition.max_penalty,
                });
            }
            if checks.contains_key(&definition.id) {
                return Err(RegistryError::DuplicateCheck(definition.id.0.clone()));
            }
            checks.insert(definition.id.clone(), definition);
        }

        let mut cap_map = BTreeMap::new();
        for cap in caps {
            for trigger in &cap.trigger_check_ids {
                if !checks.contains_key(trigger) {
                    return Err(RegistryError::UnknownTrigger {
                        cap: cap.id.0.clone(),
                        check: trigger.0.clone(),
                    });
                }
            }
            cap_map.insert(cap.id.clone(), cap);
        }

        Ok(Self {
            version,
            checks,
            caps: cap_map,
        })
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn checks(&self) -> impl Iterator<Item = &CheckDefinition> {
        self.checks.values()
    }

    pub fn check(&self, id: &CheckId) -> Option<&CheckDefinition> {
        self.checks.get(id)
    }

    pub fn caps(&self) -> impl Iterator<Item = &CapDefinition> {
        self.caps.values()
    }

    pub fn cap_ids(&self) -> BTreeSet<CapId> {
        self.caps.keys().cloned().collect()
    }

    pub fn contains_cap(&self, id: &CapId) -> bool {
        self.caps.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

fn standard_caps() -> Vec<CapDefinition> {
    vec![
        CapDefinition {
            id: CapId("orphan-records-cap".to_string()),
            name: "Orphan records present",
            trigger_check_ids: BTreeSet::from([CheckId("orphan-record".to_string())]),
            cap_value: 60.0,
        },
        CapDefinition {
            id: CapId("corrupt-history-cap".to_string()),
            name: "Record history unreliable",
            trigger_check_ids: BTreeSet::from([
                CheckId("duplicate-record-id".to_string()),
                CheckId("broken-revision-history".to_string()),
            ]),
            cap_value: 70.0,
        },
        CapDefinition {
            id: CapId("no-financials-cap".to_string()),
            name: "Latest fiscal period unfiled",
            trigger_check_ids: BTreeSet::from([CheckId("missing-fiscal-period".to_string())]),
            cap_value: 75.0,
        },
        CapDefinition {
            id: CapId("unapproved-governance-cap".to_string()),
            name: "Governance records lack approval",
            trigger_check_ids: BTreeSet::from([
                CheckId("unapproved-finalized".to_string()),
                CheckId("unsigned-resolution".to_string()),
            ]),
            cap_value: 80.0,
        },
    ]
}
