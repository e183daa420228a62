//! Developer portal resource

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::KongctlMeta;

/// A hosted developer portal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve_applications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve_developers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_api_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    /// Source file this resource was loaded from.
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}
