//! Namespace grammar and filtering
//!
//! Namespaces partition managed resources. The grammar is DNS-label-like:
//! lowercase alphanumerics and single hyphens, 1..63 characters, starting and
//! ending alphanumeric.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoreError, Result};

/// Namespace applied when a resource declares none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Wildcard accepted by list filters; matches every namespace.
pub const WILDCARD: &str = "*";

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("static regex"))
}

/// Validate a namespace string against the grammar.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let fail = |message: &str| {
        Err(CoreError::InvalidNamespace {
            namespace: namespace.to_string(),
            message: message.to_string(),
        })
    };

    if namespace.is_empty() || namespace.len() > 63 {
        return fail("must be 1..63 characters");
    }
    if !namespace_re().is_match(namespace) {
        return fail("must be lowercase alphanumerics and hyphens, starting and ending alphanumeric");
    }
    if namespace.contains("--") {
        return fail("must not contain consecutive hyphens");
    }
    Ok(())
}

/// A set of target namespaces, or the wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceFilter {
    All,
    Named(BTreeSet<String>),
}

impl NamespaceFilter {
    /// Build a filter from explicit names; `"*"` anywhere collapses to `All`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            if name == WILDCARD {
                return NamespaceFilter::All;
            }
            set.insert(name);
        }
        NamespaceFilter::Named(set)
    }

    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            NamespaceFilter::All => true,
            NamespaceFilter::Named(set) => set.contains(namespace),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NamespaceFilter::Named(set) if set.is_empty())
    }
}

impl std::fmt::Display for NamespaceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamespaceFilter::All => write!(f, "*"),
            NamespaceFilter::Named(set) => {
                let names: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}
