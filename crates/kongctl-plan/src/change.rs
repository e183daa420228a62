//! Typed changes
//!
//! A change is one create/update/delete of one resource. Its `fields` map
//! carries the full desired field set for creates and per-field `{old, new}`
//! pairs for updates. References to resources created in the same plan appear
//! as `ref:<ref>` placeholders until the executor substitutes concrete ids.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use kongctl_core::ProtectionChange;
use kongctl_core::resource::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    /// Single-letter tag used inside change ids.
    pub fn tag(self) -> char {
        match self {
            Action::Create => 'c',
            Action::Update => 'u',
            Action::Delete => 'd',
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "CREATE"),
            Action::Update => write!(f, "UPDATE"),
            Action::Delete => write!(f, "DELETE"),
        }
    }
}

/// Protection as carried on a change: the flat flag on creates, the
/// distinguished transition on updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Protection {
    Flag(bool),
    Change(ProtectionChange),
}

impl Protection {
    /// The protection state the change ends in.
    pub fn desired(self) -> bool {
        match self {
            Protection::Flag(flag) => flag,
            Protection::Change(change) => change.new,
        }
    }

    pub fn transition(self) -> Option<ProtectionChange> {
        match self {
            Protection::Flag(_) => None,
            Protection::Change(change) => Some(change),
        }
    }
}

/// One planned change. Field names are a compatibility surface; they match
/// the on-disk plan format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedChange {
    pub id: String,
    pub resource_type: ResourceKind,
    pub resource_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub action: Action,
    pub namespace: String,
    #[serde(default)]
    pub fields: JsonMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
}

impl PlannedChange {
    /// Stable id: `<seq>:<c|u|d>:<kind>:<ref>`.
    pub fn format_id(seq: usize, action: Action, kind: ResourceKind, r#ref: &str) -> String {
        format!("{}:{}:{}:{}", seq, action.tag(), kind, r#ref)
    }

    /// The protection state this change leaves the resource in.
    pub fn desired_protection(&self) -> bool {
        self.protection.map(Protection::desired).unwrap_or(false)
    }
}

/// Per-change lifecycle during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    Planned,
    Executing,
    Applied,
    Failed,
    Skipped,
}
