//! The plan document
//!
//! An ordered set of typed changes plus metadata and a summary. The JSON
//! shape is stable and versioned; plans written by one release are readable
//! by later ones.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::{Action, PlannedChange};
use crate::error::{PlanError, PlanResult};

/// On-disk format version.
pub const PLAN_VERSION: &str = "1.0";

/// Reconciliation mode. Apply never deletes; sync additionally deletes
/// managed resources absent from the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Apply,
    Sync,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Apply => write!(f, "apply"),
            Mode::Sync => write!(f, "sync"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub generator: String,
    pub mode: Mode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_changes: usize,
    pub by_action: BTreeMap<String, usize>,
    pub by_resource: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub metadata: PlanMetadata,
    pub changes: Vec<PlannedChange>,
    pub execution_order: Vec<String>,
    pub summary: PlanSummary,
}

impl Plan {
    /// Assemble a plan from ordered changes; the execution order is the
    /// change order and the summary is recomputed.
    pub fn new(mode: Mode, changes: Vec<PlannedChange>) -> Self {
        let execution_order = changes.iter().map(|c| c.id.clone()).collect();
        let summary = summarize(&changes);
        Plan {
            metadata: PlanMetadata {
                version: PLAN_VERSION.to_string(),
                generated_at: Utc::now(),
                generator: format!("kongctl/{}", env!("CARGO_PKG_VERSION")),
                mode,
            },
            changes,
            execution_order,
            summary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn contains_deletes(&self) -> bool {
        self.delete_count() > 0
    }

    pub fn delete_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.action == Action::Delete)
            .count()
    }

    pub fn change(&self, id: &str) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| c.id == id)
    }

    /// Structural validation of a loaded plan: unique ids and an execution
    /// order that covers exactly the change set.
    pub fn validate(&self) -> PlanResult<()> {
        let mut ids = HashSet::new();
        for change in &self.changes {
            if !ids.insert(change.id.as_str()) {
                return Err(PlanError::InvalidPlan(format!(
                    "duplicate change id '{}'",
                    change.id
                )));
            }
        }
        if self.execution_order.len() != self.changes.len() {
            return Err(PlanError::InvalidPlan(format!(
                "execution order lists {} change(s), plan has {}",
                self.execution_order.len(),
                self.changes.len()
            )));
        }
        for id in &self.execution_order {
            if !ids.contains(id.as_str()) {
                return Err(PlanError::InvalidPlan(format!(
                    "execution order references unknown change '{id}'"
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> PlanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PlanResult<Plan> {
        let plan: Plan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }
}

fn summarize(changes: &[PlannedChange]) -> PlanSummary {
    let mut by_action: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_resource: BTreeMap<String, usize> = BTreeMap::new();
    for change in changes {
        *by_action.entry(change.action.to_string()).or_default() += 1;
        *by_resource
            .entry(change.resource_type.to_string())
            .or_default() += 1;
    }
    PlanSummary {
        total_changes: changes.len(),
        by_action,
        by_resource,
    }
}
