//! API resource and its child kinds
//!
//! An API owns versions, publications, implementations, and documents. In
//! source documents children may be declared nested under the API or at the
//! top level with an explicit `api: <ref>` back-reference; the loader lifts
//! nested declarations into top-level lists and fills the back-reference.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::KongctlMeta;

/// A managed API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Api {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,

    // Nested child declarations; drained by the loader's lifting pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<ApiVersion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publications: Vec<ApiPublication>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implementations: Vec<ApiImplementation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<ApiDocument>,

    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

/// A version of an API, usually carrying an OpenAPI document in `spec`
/// (commonly embedded with a `!file` tag). The version string is the natural
/// key on the remote side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiVersion {
    #[serde(rename = "ref")]
    pub ref_: String,
    /// Parent API ref; implied when declared nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

/// A publication of an API to a portal. Identified remotely by the
/// (api, portal) pair; `portal` is a ref into the same source set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPublication {
    #[serde(rename = "ref")]
    pub ref_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    pub portal: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth_strategy_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve_registrations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

/// Where an API is served from: a service on a control plane. The control
/// plane is referenced by declared ref, or by UUID for one managed outside
/// this tool (the UUID form bypasses cross-resource validation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationService {
    pub control_plane_id: String,
    pub id: String,
}

/// An implementation binding an API to a gateway service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiImplementation {
    #[serde(rename = "ref")]
    pub ref_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default)]
    pub name: String,
    pub service: ImplementationService,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

/// A documentation page attached to an API. Documents form a tree per API:
/// `parent_document_ref` points at another document of the same API. The
/// (api, slug) pair is the natural key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    #[serde(rename = "ref")]
    pub ref_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_document_ref: Option<String>,
    /// Nested child pages; drained by the loader's lifting pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ApiDocument>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

impl ApiDocument {
    /// The slug used as part of the natural key; defaults to the ref when not
    /// set explicitly.
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.ref_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_children_deserialize() {
        let api: Api = serde_yaml::from_str(
            r##"
ref: users
name: Users API
versions:
  - ref: users-v1
    version: "1.0.0"
publications:
  - ref: users-pub
    portal: dev
documents:
  - ref: users-guide
    title: Guide
    content: "# Guide"
    children:
      - ref: users-guide-auth
        title: Auth
        content: "# Auth"
"##,
        )
        .unwrap();

        assert_eq!(api.versions.len(), 1);
        assert_eq!(api.publications.len(), 1);
        assert_eq!(api.documents.len(), 1);
        assert_eq!(api.documents[0].children.len(), 1);
        // Back-references stay empty until the loader lifts the children.
        assert!(api.versions[0].api.is_none());
    }

    #[test]
    fn document_slug_falls_back_to_ref() {
        let doc = ApiDocument {
            ref_: "guide".into(),
            title: "Guide".into(),
            ..Default::default()
        };
        assert_eq!(doc.slug(), "guide");

        let explicit = ApiDocument {
            ref_: "guide".into(),
            slug: Some("getting-started".into()),
            ..Default::default()
        };
        assert_eq!(explicit.slug(), "getting-started");
    }
}
