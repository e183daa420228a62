//! The consumed remote-state interface
//!
//! The planner and executor drive the control plane only through this trait.
//! The production implementation lives in `kongctl-konnect`; tests substitute
//! in-memory fakes. Methods are serial and cancellable at the implementation
//! level; the trait itself carries no cross-call state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;

use crate::labels;
use crate::namespace::NamespaceFilter;
use crate::resource::ResourceKind;

/// A remote resource in normalized form: identifier, display name, labels,
/// and the remaining kind-specific attributes as a JSON object. Child
/// resources carry the identifier of their owning API.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    pub id: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub attributes: JsonValue,
    pub parent_id: Option<String>,
}

impl RemoteResource {
    pub fn is_managed(&self) -> bool {
        labels::is_managed(&self.labels)
    }

    pub fn is_protected(&self) -> bool {
        labels::is_protected(&self.labels)
    }

    pub fn namespace(&self) -> Option<&str> {
        labels::namespace_of(&self.labels)
    }

    /// Legacy resources carry some `KONGCTL-*` label but no namespace label.
    pub fn is_legacy_managed(&self) -> bool {
        !self.is_managed() && labels::has_any_system_label(&self.labels)
    }
}

/// Errors surfaced by a remote store. Rate-limit and server-side statuses are
/// passed through unchanged; the store never retries on its own.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} {resource}: HTTP {status}: {message}")]
    Api {
        status: u16,
        operation: String,
        resource: String,
        message: String,
    },

    #[error("{operation} {resource}: {source}")]
    Transport {
        operation: String,
        resource: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation} {resource}: invalid response: {message}")]
    ResponseValidation {
        operation: String,
        resource: String,
        message: String,
    },

    #[error("{operation}: {message}")]
    InvalidRequest { operation: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no API client configured for {kind}")]
    Unsupported { kind: ResourceKind },
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StoreError::Api { status: 429, .. })
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, StoreError::Api { status, .. } if *status >= 500)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Api { status: 404, .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed access to the remote control plane, one operation set shared by all
/// kinds. `parent` is the owning API id and is required exactly for the
/// api child kinds.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List managed resources of a kind whose namespace label matches the
    /// filter. Non-managed resources are never returned.
    async fn list_managed(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        namespaces: &NamespaceFilter,
    ) -> StoreResult<Vec<RemoteResource>>;

    /// Legacy fallback: find a resource by name that carries some `KONGCTL-*`
    /// label but no namespace label. Such resources are adopted read-only.
    async fn find_adoptable(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        name: &str,
    ) -> StoreResult<Option<RemoteResource>>;

    async fn create(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource>;

    async fn update(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource>;

    async fn delete(&self, kind: ResourceKind, parent: Option<&str>, id: &str)
    -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(labels: &[(&str, &str)]) -> RemoteResource {
        RemoteResource {
            id: "id-1".into(),
            name: "one".into(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            attributes: serde_json::json!({}),
            parent_id: None,
        }
    }

    #[test]
    fn managed_and_legacy_classification() {
        let managed = remote(&[("KONGCTL-namespace", "default")]);
        assert!(managed.is_managed());
        assert!(!managed.is_legacy_managed());

        let legacy = remote(&[("KONGCTL-managed", "true")]);
        assert!(!legacy.is_managed());
        assert!(legacy.is_legacy_managed());

        let foreign = remote(&[("env", "prod")]);
        assert!(!foreign.is_managed());
        assert!(!foreign.is_legacy_managed());
    }

    #[test]
    fn error_classification() {
        let rate = StoreError::Api {
            status: 429,
            operation: "list".into(),
            resource: "portal".into(),
            message: "slow down".into(),
        };
        assert!(rate.is_rate_limited());
        assert!(!rate.is_server_error());

        let server = StoreError::Api {
            status: 503,
            operation: "create".into(),
            resource: "api".into(),
            message: "unavailable".into(),
        };
        assert!(server.is_server_error());
    }
}
