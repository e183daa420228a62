//! Label semantics for managed resources
//!
//! kongctl marks every resource it manages with labels under the reserved
//! `KONGCTL-` prefix. Only two keys are authoritative:
//!
//! - `KONGCTL-namespace` - present on every managed resource; its presence is
//!   the sole test for "managed by this tool".
//! - `KONGCTL-protected` - present with value `"true"` iff the resource is
//!   protected. Absent means unprotected; a `"false"` value is a legacy form
//!   tolerated on read and removed on write.
//!
//! Two more legacy keys (`KONGCTL-managed`, `KONGCTL-last-updated`) are
//! tolerated on read and stripped on write. Everything outside the reserved
//! prefix belongs to the user and is diffed as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Reserved prefix for system labels.
pub const SYSTEM_PREFIX: &str = "KONGCTL-";

/// Namespace label; presence marks a resource as managed.
pub const NAMESPACE_KEY: &str = "KONGCTL-namespace";

/// Protection label; `"true"` marks a resource as protected.
pub const PROTECTED_KEY: &str = "KONGCTL-protected";

/// Legacy marker, read-tolerated only.
pub const LEGACY_MANAGED_KEY: &str = "KONGCTL-managed";

/// Legacy timestamp, read-tolerated only.
pub const LEGACY_LAST_UPDATED_KEY: &str = "KONGCTL-last-updated";

/// Prefixes users may not claim for their own label keys.
const RESERVED_USER_PREFIXES: &[&str] = &["kong", "konnect", "mesh", "kic", "_"];

/// A protection transition detected by the planner and interpreted here when
/// building update labels. `old` is the remote state, `new` the desired one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionChange {
    pub old: bool,
    pub new: bool,
}

impl ProtectionChange {
    /// True when the transition only lifts protection and changes nothing else
    /// about the flag's meaning. This is the one mutation allowed on a
    /// protected resource.
    pub fn is_unprotect(&self) -> bool {
        self.old && !self.new
    }
}

/// Filter a label map down to user-owned keys.
pub fn user_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter(|(k, _)| !k.starts_with(SYSTEM_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// A resource is managed iff the namespace label is present.
pub fn is_managed(labels: &BTreeMap<String, String>) -> bool {
    labels.contains_key(NAMESPACE_KEY)
}

/// A resource is protected iff the protection label reads exactly `"true"`.
/// Absent and legacy `"false"` both mean unprotected.
pub fn is_protected(labels: &BTreeMap<String, String>) -> bool {
    labels.get(PROTECTED_KEY).map(String::as_str) == Some("true")
}

/// True when the map carries any `KONGCTL-` key at all. Used by the legacy
/// fallback: resources with system labels but no namespace label are adopted
/// read-only instead of being shadowed by a conflicting create.
pub fn has_any_system_label(labels: &BTreeMap<String, String>) -> bool {
    labels.keys().any(|k| k.starts_with(SYSTEM_PREFIX))
}

/// The namespace a managed resource belongs to, if any.
pub fn namespace_of(labels: &BTreeMap<String, String>) -> Option<&str> {
    labels.get(NAMESPACE_KEY).map(String::as_str)
}

/// Returns true iff the user-visible label sets differ. System keys on either
/// side are ignored entirely, so drift in `KONGCTL-*` values never produces a
/// change on its own.
pub fn compare_user_labels(
    current: &BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> bool {
    user_labels(current) != user_labels(desired)
}

/// Build the full label set sent with a CREATE: the user labels plus the
/// namespace marker, plus the protection marker when requested.
pub fn build_create_labels(
    user: &BTreeMap<String, String>,
    namespace: &str,
    protected: bool,
) -> BTreeMap<String, String> {
    let mut labels = user_labels(user);
    labels.insert(NAMESPACE_KEY.to_string(), namespace.to_string());
    if protected {
        labels.insert(PROTECTED_KEY.to_string(), "true".to_string());
    }
    labels
}

/// Build the label patch sent with an UPDATE.
///
/// The result is three-valued: a key mapped to `Some(v)` is asserted, a key
/// mapped to `None` is removed on the remote (the wire encodes this as a JSON
/// null), and a key not in the map is left untouched.
///
/// - every desired user label is asserted;
/// - user labels present remotely but dropped from the desired set are
///   removed;
/// - the namespace label is always asserted;
/// - the protection label follows `protection`: asserted `"true"` when the
///   transition ends protected, removed when it ends unprotected, and left
///   alone when no transition happened - except that a lingering non-`"true"`
///   legacy value is removed;
/// - legacy `KONGCTL-managed` / `KONGCTL-last-updated` keys present remotely
///   are removed, never rewritten.
pub fn build_update_labels(
    desired_user: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
    namespace: &str,
    protection: Option<ProtectionChange>,
) -> BTreeMap<String, Option<String>> {
    let mut patch: BTreeMap<String, Option<String>> = BTreeMap::new();

    for (k, v) in user_labels(desired_user) {
        patch.insert(k, Some(v));
    }
    for k in user_labels(current).into_keys() {
        patch.entry(k).or_insert(None);
    }

    patch.insert(NAMESPACE_KEY.to_string(), Some(namespace.to_string()));

    match protection {
        Some(change) if change.new => {
            patch.insert(PROTECTED_KEY.to_string(), Some("true".to_string()));
        }
        Some(_) => {
            patch.insert(PROTECTED_KEY.to_string(), None);
        }
        None => {
            // No transition: normalize a legacy "false" value off the remote.
            if let Some(v) = current.get(PROTECTED_KEY)
                && v != "true"
            {
                patch.insert(PROTECTED_KEY.to_string(), None);
            }
        }
    }

    for legacy in [LEGACY_MANAGED_KEY, LEGACY_LAST_UPDATED_KEY] {
        if current.contains_key(legacy) {
            patch.insert(legacy.to_string(), None);
        }
    }

    patch
}

/// Validate a user-supplied label key.
///
/// Keys are 1..63 characters and may not start with a reserved platform
/// prefix unless they carry the `KONGCTL-`/`kongctl-` marker.
pub fn validate_user_label_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > 63 {
        return Err(CoreError::InvalidLabel {
            key: key.to_string(),
            message: "must be 1..63 characters".to_string(),
        });
    }
    if key.starts_with(SYSTEM_PREFIX) || key.starts_with("kongctl-") {
        return Ok(());
    }
    for prefix in RESERVED_USER_PREFIXES {
        if key.starts_with(prefix) {
            return Err(CoreError::InvalidLabel {
                key: key.to_string(),
                message: format!("keys may not start with reserved prefix '{prefix}'"),
            });
        }
    }
    Ok(())
}
