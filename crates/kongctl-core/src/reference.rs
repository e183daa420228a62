//! Reference-or-identifier values
//!
//! A change in a plan may point at a resource that does not exist remotely
//! yet. Until the executor creates the target and learns its identifier, the
//! field carries a `ref:<ref>` placeholder. The two states are one small
//! tagged value rather than a pointer into the graph.

use serde::{Deserialize, Serialize};

/// Prefix marking an unresolved reference in serialized plan fields.
pub const REF_PREFIX: &str = "ref:";

/// Either an unresolved ref to a resource declared in the same source set, or
/// a concrete remote identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefOrId {
    Ref(String),
    Id(String),
}

impl RefOrId {
    /// Parse the serialized form: `ref:<ref>` is a reference, anything else a
    /// concrete identifier.
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix(REF_PREFIX) {
            Some(r) => RefOrId::Ref(r.to_string()),
            None => RefOrId::Id(s.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RefOrId::Id(_))
    }

    /// The concrete identifier, if resolved.
    pub fn id(&self) -> Option<&str> {
        match self {
            RefOrId::Id(id) => Some(id),
            RefOrId::Ref(_) => None,
        }
    }
}

impl std::fmt::Display for RefOrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefOrId::Ref(r) => write!(f, "{REF_PREFIX}{r}"),
            RefOrId::Id(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for RefOrId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RefOrId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RefOrId::parse(&s))
    }
}
