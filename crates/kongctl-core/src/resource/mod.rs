//! Typed resource model
//!
//! One struct per resource kind, each carrying the operator-chosen `ref`, a
//! human name, kind-specific attributes, optional user labels, and an
//! optional `kongctl` block with namespace and protection. Child kinds keep
//! an explicit back-reference to their parent API by ref.

mod api;
mod auth_strategy;
mod control_plane;
mod portal;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use api::{Api, ApiDocument, ApiImplementation, ApiPublication, ApiVersion, ImplementationService};
pub use auth_strategy::ApplicationAuthStrategy;
pub use control_plane::ControlPlane;
pub use portal::Portal;

use crate::error::CoreError;
use crate::namespace::DEFAULT_NAMESPACE;

/// The eight resource kinds the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ControlPlane,
    ApplicationAuthStrategy,
    Portal,
    Api,
    ApiVersion,
    ApiPublication,
    ApiImplementation,
    ApiDocument,
}

/// Kinds in the order the planner walks them: every kind appears after the
/// kinds it may reference.
pub const DEPENDENCY_ORDER: [ResourceKind; 8] = [
    ResourceKind::ControlPlane,
    ResourceKind::ApplicationAuthStrategy,
    ResourceKind::Portal,
    ResourceKind::Api,
    ResourceKind::ApiVersion,
    ResourceKind::ApiPublication,
    ResourceKind::ApiImplementation,
    ResourceKind::ApiDocument,
];

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::ControlPlane => "control_plane",
            ResourceKind::ApplicationAuthStrategy => "application_auth_strategy",
            ResourceKind::Portal => "portal",
            ResourceKind::Api => "api",
            ResourceKind::ApiVersion => "api_version",
            ResourceKind::ApiPublication => "api_publication",
            ResourceKind::ApiImplementation => "api_implementation",
            ResourceKind::ApiDocument => "api_document",
        }
    }

    /// Child kinds live under an API on the remote side.
    pub fn is_api_child(self) -> bool {
        matches!(
            self,
            ResourceKind::ApiVersion
                | ResourceKind::ApiPublication
                | ResourceKind::ApiImplementation
                | ResourceKind::ApiDocument
        )
    }

    pub fn all() -> [ResourceKind; 8] {
        DEPENDENCY_ORDER
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DEPENDENCY_ORDER
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// Per-resource tool metadata block, merged with `_defaults.kongctl` by the
/// loader. Explicit values win over inherited ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KongctlMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

impl KongctlMeta {
    /// Fill unset fields from an inherited default block.
    pub fn inherit(&mut self, defaults: &KongctlMeta) {
        if self.namespace.is_none() {
            self.namespace = defaults.namespace.clone();
        }
        if self.protected.is_none() {
            self.protected = defaults.protected;
        }
    }
}

/// Common accessors over every resource kind.
pub trait Resource {
    fn kind(&self) -> ResourceKind;
    fn ref_(&self) -> &str;
    fn name(&self) -> &str;
    fn labels(&self) -> &BTreeMap<String, String>;
    fn kongctl(&self) -> Option<&KongctlMeta>;
    fn origin(&self) -> Option<&PathBuf>;

    fn namespace(&self) -> &str {
        self.kongctl()
            .and_then(|m| m.namespace.as_deref())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    fn protected(&self) -> bool {
        self.kongctl().and_then(|m| m.protected).unwrap_or(false)
    }
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr, name: $name:ident) => {
        impl Resource for $ty {
            fn kind(&self) -> ResourceKind {
                $kind
            }
            fn ref_(&self) -> &str {
                &self.ref_
            }
            fn name(&self) -> &str {
                &self.$name
            }
            fn labels(&self) -> &std::collections::BTreeMap<String, String> {
                &self.labels
            }
            fn kongctl(&self) -> Option<&KongctlMeta> {
                self.kongctl.as_ref()
            }
            fn origin(&self) -> Option<&std::path::PathBuf> {
                self.origin.as_ref()
            }
        }
    };
}

impl_resource!(ControlPlane, ResourceKind::ControlPlane, name: name);
impl_resource!(ApplicationAuthStrategy, ResourceKind::ApplicationAuthStrategy, name: name);
impl_resource!(Portal, ResourceKind::Portal, name: name);
impl_resource!(Api, ResourceKind::Api, name: name);
impl_resource!(ApiVersion, ResourceKind::ApiVersion, name: version);
impl_resource!(ApiImplementation, ResourceKind::ApiImplementation, name: name);

impl Resource for ApiPublication {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ApiPublication
    }
    fn ref_(&self) -> &str {
        &self.ref_
    }
    // Publications have no name of their own; they are identified by the
    // (api, portal) pair and display as their ref.
    fn name(&self) -> &str {
        &self.ref_
    }
    fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
    fn kongctl(&self) -> Option<&KongctlMeta> {
        self.kongctl.as_ref()
    }
    fn origin(&self) -> Option<&PathBuf> {
        self.origin.as_ref()
    }
}

impl Resource for ApiDocument {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ApiDocument
    }
    fn ref_(&self) -> &str {
        &self.ref_
    }
    fn name(&self) -> &str {
        &self.title
    }
    fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
    fn kongctl(&self) -> Option<&KongctlMeta> {
        self.kongctl.as_ref()
    }
    fn origin(&self) -> Option<&PathBuf> {
        self.origin.as_ref()
    }
}

/// A borrowed view over any resource in a graph, tagged by kind.
#[derive(Debug, Clone, Copy)]
pub enum ResourceEntry<'a> {
    ControlPlane(&'a ControlPlane),
    ApplicationAuthStrategy(&'a ApplicationAuthStrategy),
    Portal(&'a Portal),
    Api(&'a Api),
    ApiVersion(&'a ApiVersion),
    ApiPublication(&'a ApiPublication),
    ApiImplementation(&'a ApiImplementation),
    ApiDocument(&'a ApiDocument),
}

impl<'a> ResourceEntry<'a> {
    pub fn as_resource(&self) -> &'a dyn Resource {
        match self {
            ResourceEntry::ControlPlane(r) => *r,
            ResourceEntry::ApplicationAuthStrategy(r) => *r,
            ResourceEntry::Portal(r) => *r,
            ResourceEntry::Api(r) => *r,
            ResourceEntry::ApiVersion(r) => *r,
            ResourceEntry::ApiPublication(r) => *r,
            ResourceEntry::ApiImplementation(r) => *r,
            ResourceEntry::ApiDocument(r) => *r,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.as_resource().kind()
    }

    pub fn ref_(&self) -> &'a str {
        self.as_resource().ref_()
    }

    /// Parent API ref for child kinds, filled in by the loader.
    pub fn api_ref(&self) -> Option<&'a str> {
        match self {
            ResourceEntry::ApiVersion(r) => r.api.as_deref(),
            ResourceEntry::ApiPublication(r) => r.api.as_deref(),
            ResourceEntry::ApiImplementation(r) => r.api.as_deref(),
            ResourceEntry::ApiDocument(r) => r.api.as_deref(),
            _ => None,
        }
    }
}
