//! Application auth strategy resource

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::KongctlMeta;

/// An application auth strategy portals hand to developer applications.
/// `strategy_type` selects the credential flow (`key_auth` or
/// `openid_connect`); `configs` carries the flow-specific settings verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAuthStrategy {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kongctl: Option<KongctlMeta>,
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}
