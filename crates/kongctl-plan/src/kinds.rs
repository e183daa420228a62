//! Per-kind planning capabilities
//!
//! One handler per resource kind: desired-field construction, natural keys
//! for matching against remote state, field diffing, and the reference
//! fields the executor resolves at apply time. Dispatch is a match over
//! `ResourceKind`; nothing here reflects over types.

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use kongctl_core::labels::user_labels;
use kongctl_core::resource::{Resource, ResourceEntry, ResourceKind};
use kongctl_core::{RefOrId, RemoteResource};

/// Resolves desired refs to concrete remote ids where the target already
/// exists; anything else stays a placeholder for the executor.
pub(crate) struct Resolver<'a> {
    ids: &'a HashMap<(ResourceKind, String), String>,
}

impl<'a> Resolver<'a> {
    pub fn new(ids: &'a HashMap<(ResourceKind, String), String>) -> Self {
        Self { ids }
    }

    pub fn resolve(&self, kind: ResourceKind, r#ref: &str) -> RefOrId {
        match self.ids.get(&(kind, r#ref.to_string())) {
            Some(id) => RefOrId::Id(id.clone()),
            None => RefOrId::Ref(r#ref.to_string()),
        }
    }

    fn value(&self, kind: ResourceKind, r#ref: &str) -> JsonValue {
        JsonValue::String(self.resolve(kind, r#ref).to_string())
    }
}

/// The natural key a desired resource is matched on, namespaced by kind:
/// `name` for most kinds, the version string for versions, the slug for
/// documents, and the resolved portal id for publications. `None` means the
/// key cannot exist remotely yet (its portal is being created in this plan).
pub(crate) fn natural_key(entry: &ResourceEntry<'_>, resolver: &Resolver<'_>) -> Option<String> {
    match entry {
        ResourceEntry::ApiVersion(v) => Some(v.version.clone()),
        ResourceEntry::ApiDocument(d) => Some(d.slug().to_string()),
        ResourceEntry::ApiPublication(p) => resolver
            .resolve(ResourceKind::Portal, &p.portal)
            .id()
            .map(String::from),
        ResourceEntry::ApiImplementation(i) => Some(implementation_name(i).to_string()),
        other => Some(other.as_resource().name().to_string()),
    }
}

fn implementation_name(i: &kongctl_core::resource::ApiImplementation) -> &str {
    if i.name.is_empty() { &i.ref_ } else { &i.name }
}

/// The remote attribute the natural key lives in, for diffing purposes.
fn natural_key_attr(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::ApiVersion => "version",
        ResourceKind::ApiDocument => "slug",
        ResourceKind::ApiPublication => "portal_id",
        _ => "name",
    }
}

/// Build the full desired field set for a CREATE. User labels travel under
/// `labels`; the executor replaces them with the complete managed set.
/// Child kinds carry their parent under `api_id`, which routes the request
/// rather than travelling in the body.
pub(crate) fn create_fields(
    entry: &ResourceEntry<'_>,
    resolver: &Resolver<'_>,
) -> JsonMap<String, JsonValue> {
    let mut fields = JsonMap::new();

    let mut set = |key: &str, value: JsonValue| {
        fields.insert(key.to_string(), value);
    };
    fn opt_str(value: &Option<String>) -> Option<JsonValue> {
        value.as_ref().map(|v| JsonValue::String(v.clone()))
    }
    fn opt_bool(value: &Option<bool>) -> Option<JsonValue> {
        value.map(JsonValue::Bool)
    }

    match entry {
        ResourceEntry::Portal(p) => {
            set("name", json!(p.name));
            for (key, value) in [
                ("display_name", opt_str(&p.display_name)),
                ("description", opt_str(&p.description)),
                ("authentication_enabled", opt_bool(&p.authentication_enabled)),
                ("rbac_enabled", opt_bool(&p.rbac_enabled)),
                (
                    "auto_approve_applications",
                    opt_bool(&p.auto_approve_applications),
                ),
                (
                    "auto_approve_developers",
                    opt_bool(&p.auto_approve_developers),
                ),
                ("default_api_visibility", opt_str(&p.default_api_visibility)),
                (
                    "default_page_visibility",
                    opt_str(&p.default_page_visibility),
                ),
            ] {
                if let Some(value) = value {
                    set(key, value);
                }
            }
        }
        ResourceEntry::Api(a) => {
            set("name", json!(a.name));
            if let Some(description) = opt_str(&a.description) {
                set("description", description);
            }
            if let Some(slug) = opt_str(&a.slug) {
                set("slug", slug);
            }
        }
        ResourceEntry::ControlPlane(c) => {
            set("name", json!(c.name));
            for (key, value) in [
                ("description", opt_str(&c.description)),
                ("cluster_type", opt_str(&c.cluster_type)),
                ("auth_type", opt_str(&c.auth_type)),
                ("cloud_gateway", opt_bool(&c.cloud_gateway)),
            ] {
                if let Some(value) = value {
                    set(key, value);
                }
            }
        }
        ResourceEntry::ApplicationAuthStrategy(s) => {
            set("name", json!(s.name));
            set("strategy_type", json!(s.strategy_type));
            if let Some(display_name) = opt_str(&s.display_name) {
                set("display_name", display_name);
            }
            if let Some(configs) = &s.configs {
                set("configs", configs.clone());
            }
        }
        ResourceEntry::ApiVersion(v) => {
            set(
                "api_id",
                resolver.value(ResourceKind::Api, v.api.as_deref().unwrap_or_default()),
            );
            set("version", json!(v.version));
            if let Some(spec) = opt_str(&v.spec) {
                set("spec", spec);
            }
        }
        ResourceEntry::ApiPublication(p) => {
            set(
                "api_id",
                resolver.value(ResourceKind::Api, p.api.as_deref().unwrap_or_default()),
            );
            set("portal_id", resolver.value(ResourceKind::Portal, &p.portal));
            if !p.auth_strategy_ids.is_empty() {
                let strategies: Vec<JsonValue> = p
                    .auth_strategy_ids
                    .iter()
                    .map(|s| resolver.value(ResourceKind::ApplicationAuthStrategy, s))
                    .collect();
                set("auth_strategy_ids", JsonValue::Array(strategies));
            }
            if let Some(auto) = opt_bool(&p.auto_approve_registrations) {
                set("auto_approve_registrations", auto);
            }
            if let Some(visibility) = opt_str(&p.visibility) {
                set("visibility", visibility);
            }
        }
        ResourceEntry::ApiImplementation(i) => {
            set(
                "api_id",
                resolver.value(ResourceKind::Api, i.api.as_deref().unwrap_or_default()),
            );
            set("name", json!(implementation_name(i)));
            set(
                "service",
                json!({
                    "control_plane_id": resolver
                        .resolve(ResourceKind::ControlPlane, &i.service.control_plane_id)
                        .to_string(),
                    "id": i.service.id,
                }),
            );
        }
        ResourceEntry::ApiDocument(d) => {
            set(
                "api_id",
                resolver.value(ResourceKind::Api, d.api.as_deref().unwrap_or_default()),
            );
            set("title", json!(d.title));
            set("slug", json!(d.slug()));
            set("content", json!(d.content));
            if let Some(status) = opt_str(&d.status) {
                set("status", status);
            }
            if let Some(parent) = &d.parent_document_ref {
                set("parent_document_id", resolver.value(ResourceKind::ApiDocument, parent));
            }
        }
    }

    let user = user_labels(entry.as_resource().labels());
    if !user.is_empty() {
        set("labels", json!(user));
    }

    fields
}

/// Compare the desired fields against a matched remote resource, producing
/// per-field `{old, new}` pairs. Only fields the desired state declares are
/// compared; labels are diffed separately by the planner and system-label
/// drift never appears here.
pub(crate) fn diff_fields(
    entry: &ResourceEntry<'_>,
    remote: &RemoteResource,
    resolver: &Resolver<'_>,
) -> JsonMap<String, JsonValue> {
    let kind = entry.kind();
    let mut desired = create_fields(entry, resolver);
    desired.remove("labels");
    desired.remove("api_id");

    let key_attr = natural_key_attr(kind);
    let mut diffs = JsonMap::new();
    for (field, new) in desired {
        let old = if field == key_attr {
            JsonValue::String(remote.name.clone())
        } else {
            remote
                .attributes
                .get(&field)
                .cloned()
                .unwrap_or(JsonValue::Null)
        };
        if old != new {
            diffs.insert(field, json!({"old": old, "new": new}));
        }
    }
    diffs
}

/// A reference-bearing field: where it sits in the field map, what kind its
/// target is, and whether the terminal value is an array of references.
pub(crate) struct RefField {
    pub path: &'static [&'static str],
    pub kind: ResourceKind,
    pub each: bool,
}

/// The reference fields of each kind, resolved by the executor just before
/// the remote call.
pub(crate) fn ref_fields(kind: ResourceKind) -> &'static [RefField] {
    match kind {
        ResourceKind::ApiVersion => &[RefField {
            path: &["api_id"],
            kind: ResourceKind::Api,
            each: false,
        }],
        ResourceKind::ApiPublication => &[
            RefField {
                path: &["api_id"],
                kind: ResourceKind::Api,
                each: false,
            },
            RefField {
                path: &["portal_id"],
                kind: ResourceKind::Portal,
                each: false,
            },
            RefField {
                path: &["auth_strategy_ids"],
                kind: ResourceKind::ApplicationAuthStrategy,
                each: true,
            },
        ],
        ResourceKind::ApiImplementation => &[
            RefField {
                path: &["api_id"],
                kind: ResourceKind::Api,
                each: false,
            },
            RefField {
                path: &["service", "control_plane_id"],
                kind: ResourceKind::ControlPlane,
                each: false,
            },
        ],
        ResourceKind::ApiDocument => &[
            RefField {
                path: &["api_id"],
                kind: ResourceKind::Api,
                each: false,
            },
            RefField {
                path: &["parent_document_id"],
                kind: ResourceKind::ApiDocument,
                each: false,
            },
        ],
        _ => &[],
    }
}

/// Substitute `ref:<ref>` placeholders in a field map with concrete ids from
/// `lookup`. Returns the first reference that cannot be resolved.
pub(crate) fn resolve_refs(
    kind: ResourceKind,
    fields: &mut JsonMap<String, JsonValue>,
    lookup: &impl Fn(ResourceKind, &str) -> Option<String>,
) -> Result<(), String> {
    for ref_field in ref_fields(kind) {
        let Some(slot) = locate(fields, ref_field.path) else {
            continue;
        };
        if ref_field.each {
            if let JsonValue::Array(items) = slot {
                for item in items {
                    resolve_slot(item, ref_field.kind, lookup)?;
                }
            }
        } else {
            resolve_slot(slot, ref_field.kind, lookup)?;
        }
    }
    Ok(())
}

fn locate<'v>(
    fields: &'v mut JsonMap<String, JsonValue>,
    path: &[&str],
) -> Option<&'v mut JsonValue> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get_mut(*first)?;
    for segment in rest {
        current = current.get_mut(*segment)?;
    }
    Some(current)
}

fn resolve_slot(
    slot: &mut JsonValue,
    kind: ResourceKind,
    lookup: &impl Fn(ResourceKind, &str) -> Option<String>,
) -> Result<(), String> {
    let Some(text) = slot.as_str() else {
        return Ok(());
    };
    if let RefOrId::Ref(r#ref) = RefOrId::parse(text) {
        match lookup(kind, &r#ref) {
            Some(id) => *slot = JsonValue::String(id),
            None => return Err(format!("ref:{}", r#ref)),
        }
    }
    Ok(())
}

/// The placeholder targets a change's fields reference, used to decide
/// whether a change depends on a failed or skipped create.
pub(crate) fn placeholder_targets(
    kind: ResourceKind,
    fields: &JsonMap<String, JsonValue>,
) -> Vec<(ResourceKind, String)> {
    let mut targets = Vec::new();
    for ref_field in ref_fields(kind) {
        let Some(value) = locate_ref(fields, ref_field.path) else {
            continue;
        };
        let mut collect = |v: &JsonValue| {
            if let Some(text) = v.as_str()
                && let RefOrId::Ref(r#ref) = RefOrId::parse(text)
            {
                targets.push((ref_field.kind, r#ref));
            }
        };
        if ref_field.each {
            if let JsonValue::Array(items) = value {
                items.iter().for_each(&mut collect);
            }
        } else {
            collect(value);
        }
    }
    targets
}

fn locate_ref<'v>(fields: &'v JsonMap<String, JsonValue>, path: &[&str]) -> Option<&'v JsonValue> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get(*first)?;
    for segment in rest {
        current = current.get(*segment)?;
    }
    Some(current)
}
