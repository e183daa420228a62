//! Plan generation
//!
//! Diffs the desired resource graph against remote managed state and emits
//! ordered typed changes. Kinds are walked in dependency order so reference
//! targets always precede their referents; within a kind creates precede
//! updates, and deletes are appended in reverse kind order so children go
//! before their parents.

use std::collections::{HashMap, HashSet};

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use kongctl_core::graph::ResourceGraph;
use kongctl_core::labels::{self, user_labels};
use kongctl_core::namespace::{DEFAULT_NAMESPACE, NamespaceFilter};
use kongctl_core::resource::{DEPENDENCY_ORDER, Resource, ResourceEntry, ResourceKind};
use kongctl_core::{ProtectionChange, RefOrId, RemoteResource, RemoteStore};

use crate::change::{Action, PlannedChange, Protection};
use crate::error::{PlanError, PlanResult};
use crate::kinds::{self, Resolver};
use crate::plan::{Mode, Plan};

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub mode: Mode,
    /// Target namespaces; defaults to the namespaces present in the graph.
    pub namespaces: Option<Vec<String>>,
}

impl PlanOptions {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            namespaces: None,
        }
    }
}

pub struct Planner<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Planner<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    pub async fn plan(&self, graph: &ResourceGraph, options: &PlanOptions) -> PlanResult<Plan> {
        let filter = match &options.namespaces {
            Some(names) if !names.is_empty() => NamespaceFilter::from_names(names.clone()),
            _ => NamespaceFilter::from_names(graph.namespaces()),
        };

        let mut builder = PlanBuilder {
            store: self.store,
            graph,
            filter,
            mode: options.mode,
            ids: HashMap::new(),
            upserts: Vec::new(),
            deletes_by_kind: HashMap::new(),
        };

        for kind in DEPENDENCY_ORDER {
            if kind.is_api_child() {
                builder.plan_child_kind(kind).await?;
            } else {
                builder.plan_parent_kind(kind).await?;
            }
        }

        let mut ordered = builder.upserts;
        for kind in DEPENDENCY_ORDER.into_iter().rev() {
            if let Some(deletes) = builder.deletes_by_kind.remove(&kind) {
                ordered.extend(deletes);
            }
        }

        for (position, change) in ordered.iter_mut().enumerate() {
            change.id = PlannedChange::format_id(
                position + 1,
                change.action,
                change.resource_type,
                &change.resource_ref,
            );
        }

        tracing::debug!(changes = ordered.len(), mode = %options.mode, "plan generated");
        Ok(Plan::new(options.mode, ordered))
    }
}

struct PlanBuilder<'a> {
    store: &'a dyn RemoteStore,
    graph: &'a ResourceGraph,
    filter: NamespaceFilter,
    mode: Mode,
    /// Desired ref to remote id, for refs whose target already exists.
    ids: HashMap<(ResourceKind, String), String>,
    upserts: Vec<PlannedChange>,
    deletes_by_kind: HashMap<ResourceKind, Vec<PlannedChange>>,
}

impl PlanBuilder<'_> {
    async fn plan_parent_kind(&mut self, kind: ResourceKind) -> PlanResult<()> {
        let current = self.store.list_managed(kind, None, &self.filter).await?;
        let mut matched: HashSet<usize> = HashSet::new();
        let mut creates = Vec::new();
        let mut updates = Vec::new();

        for entry in self.graph.entries(kind) {
            let resource = entry.as_resource();
            let namespace = resource.namespace().to_string();
            if !self.filter.matches(&namespace) {
                continue;
            }

            let key = kinds::natural_key(&entry, &Resolver::new(&self.ids));
            let Some(key) = key else {
                creates.push(self.create_change(&entry));
                continue;
            };

            let position = current
                .iter()
                .position(|r| r.name == key && r.namespace() == Some(namespace.as_str()));

            let adopted;
            let remote = match position {
                Some(i) => {
                    matched.insert(i);
                    Some(&current[i])
                }
                None => match self.store.find_adoptable(kind, None, &key).await? {
                    Some(found) => {
                        adopted = found;
                        Some(&adopted)
                    }
                    None => None,
                },
            };

            match remote {
                None => creates.push(self.create_change(&entry)),
                Some(remote) => {
                    self.ids
                        .insert((kind, entry.ref_().to_string()), remote.id.clone());
                    if let Some(update) = self.update_change(&entry, remote, None)? {
                        updates.push(update);
                    }
                }
            }
        }

        self.upserts.extend(creates);
        self.upserts.extend(updates);

        if self.mode == Mode::Sync {
            for (position, remote) in current.iter().enumerate() {
                if matched.contains(&position) {
                    continue;
                }
                self.push_delete(kind, remote, None)?;
            }
        }
        Ok(())
    }

    async fn plan_child_kind(&mut self, kind: ResourceKind) -> PlanResult<()> {
        let mut listed: HashMap<String, Vec<RemoteResource>> = HashMap::new();
        let mut matched: HashMap<String, HashSet<usize>> = HashMap::new();
        let mut creates = Vec::new();
        let mut updates = Vec::new();

        for entry in self.graph.entries(kind) {
            let resource = entry.as_resource();
            let namespace = resource.namespace().to_string();
            if !self.filter.matches(&namespace) {
                continue;
            }

            let api_ref = entry.api_ref().unwrap_or_default();
            let api_id = self
                .ids
                .get(&(ResourceKind::Api, api_ref.to_string()))
                .cloned();

            let key = kinds::natural_key(&entry, &Resolver::new(&self.ids));

            let mut remote: Option<RemoteResource> = None;
            if let (Some(api_id), Some(key)) = (&api_id, &key) {
                if !listed.contains_key(api_id) {
                    let children = self
                        .store
                        .list_managed(kind, Some(api_id.as_str()), &self.filter)
                        .await?;
                    listed.insert(api_id.clone(), children);
                }
                let children = &listed[api_id];
                let position = children
                    .iter()
                    .position(|r| r.name == *key && r.namespace() == Some(namespace.as_str()));
                match position {
                    Some(i) => {
                        matched.entry(api_id.clone()).or_default().insert(i);
                        remote = Some(children[i].clone());
                    }
                    None => {
                        remote = self
                            .store
                            .find_adoptable(kind, Some(api_id.as_str()), key.as_str())
                            .await?;
                    }
                }
            }

            match remote {
                None => creates.push(self.create_change(&entry)),
                Some(remote) => {
                    self.ids
                        .insert((kind, entry.ref_().to_string()), remote.id.clone());
                    if let Some(update) = self.update_change(&entry, &remote, api_id.as_deref())? {
                        updates.push(update);
                    }
                }
            }
        }

        if kind == ResourceKind::ApiDocument {
            creates = order_document_creates(creates);
        }

        self.upserts.extend(creates);
        self.upserts.extend(updates);

        if self.mode == Mode::Sync {
            for (api_id, children) in &listed {
                let matched = matched.get(api_id);
                for (position, remote) in children.iter().enumerate() {
                    if matched.is_some_and(|set| set.contains(&position)) {
                        continue;
                    }
                    self.push_delete(kind, remote, Some(api_id.as_str()))?;
                }
            }

            // Children of APIs that are themselves being deleted go first;
            // the reverse-order assembly puts them ahead of the parent.
            let deleted_api_ids: Vec<String> = self
                .deletes_by_kind
                .get(&ResourceKind::Api)
                .map(|deletes| deletes.iter().filter_map(|d| d.resource_id.clone()).collect())
                .unwrap_or_default();
            for api_id in deleted_api_ids {
                let children = self
                    .store
                    .list_managed(kind, Some(api_id.as_str()), &self.filter)
                    .await?;
                for remote in &children {
                    self.push_delete(kind, remote, Some(api_id.as_str()))?;
                }
            }
        }
        Ok(())
    }

    fn create_change(&self, entry: &ResourceEntry<'_>) -> PlannedChange {
        let resource = entry.as_resource();
        PlannedChange {
            id: String::new(),
            resource_type: entry.kind(),
            resource_ref: resource.ref_().to_string(),
            resource_id: None,
            action: Action::Create,
            namespace: resource.namespace().to_string(),
            fields: kinds::create_fields(entry, &Resolver::new(&self.ids)),
            protection: Some(Protection::Flag(resource.protected())),
        }
    }

    /// Diff a matched resource; `None` means it is already in the desired
    /// state. Any mutation of a protected resource is fatal unless the change
    /// is only lifting protection.
    fn update_change(
        &self,
        entry: &ResourceEntry<'_>,
        remote: &RemoteResource,
        api_id: Option<&str>,
    ) -> PlanResult<Option<PlannedChange>> {
        let resource = entry.as_resource();
        let kind = entry.kind();
        let namespace = resource.namespace().to_string();

        let mut diffs = kinds::diff_fields(entry, remote, &Resolver::new(&self.ids));
        if labels::compare_user_labels(&remote.labels, resource.labels()) {
            diffs.insert(
                "labels".to_string(),
                json!({
                    "old": user_labels(&remote.labels),
                    "new": user_labels(resource.labels()),
                }),
            );
        }

        let old_protected = remote.is_protected();
        let new_protected = resource.protected();

        let change = |fields: JsonMap<String, JsonValue>, protection| {
            let mut fields = fields;
            if let Some(api_id) = api_id {
                fields.insert("api_id".to_string(), json!(api_id));
            }
            PlannedChange {
                id: String::new(),
                resource_type: kind,
                resource_ref: resource.ref_().to_string(),
                resource_id: Some(remote.id.clone()),
                action: Action::Update,
                namespace: namespace.clone(),
                fields,
                protection,
            }
        };

        if old_protected {
            if !diffs.is_empty() {
                return Err(PlanError::ProtectedResourceChange {
                    kind,
                    name: remote.name.clone(),
                    namespace: namespace.clone(),
                });
            }
            if new_protected {
                return Ok(None);
            }
            // The one permitted mutation: lifting protection, nothing else.
            return Ok(Some(change(
                JsonMap::new(),
                Some(Protection::Change(ProtectionChange {
                    old: true,
                    new: false,
                })),
            )));
        }

        let protection = (new_protected != old_protected).then(|| {
            Protection::Change(ProtectionChange {
                old: old_protected,
                new: new_protected,
            })
        });

        if diffs.is_empty() && protection.is_none() {
            return Ok(None);
        }
        Ok(Some(change(diffs, protection)))
    }

    fn push_delete(
        &mut self,
        kind: ResourceKind,
        remote: &RemoteResource,
        api_id: Option<&str>,
    ) -> PlanResult<()> {
        let namespace = remote
            .namespace()
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();
        if remote.is_protected() {
            return Err(PlanError::ProtectedResourceDeletion {
                kind,
                name: remote.name.clone(),
                namespace,
            });
        }

        let mut fields = JsonMap::new();
        if let Some(api_id) = api_id {
            fields.insert("api_id".to_string(), json!(api_id));
        }
        self.deletes_by_kind
            .entry(kind)
            .or_default()
            .push(PlannedChange {
                id: String::new(),
                resource_type: kind,
                resource_ref: remote.name.clone(),
                resource_id: Some(remote.id.clone()),
                action: Action::Delete,
                namespace,
                fields,
                protection: None,
            });
        Ok(())
    }
}

/// Reorder document creates so a parent page is always emitted before the
/// pages that reference it. Non-placeholder parents are already concrete.
fn order_document_creates(creates: Vec<PlannedChange>) -> Vec<PlannedChange> {
    let mut pending = creates;
    let mut ordered = Vec::with_capacity(pending.len());
    let mut emitted: HashSet<String> = HashSet::new();

    while !pending.is_empty() {
        let mut progressed = false;
        let mut remaining = Vec::new();
        for change in pending {
            let parent_ref = change
                .fields
                .get("parent_document_id")
                .and_then(JsonValue::as_str)
                .and_then(|text| match RefOrId::parse(text) {
                    RefOrId::Ref(r#ref) => Some(r#ref),
                    RefOrId::Id(_) => None,
                });
            let ready = match &parent_ref {
                Some(parent) => emitted.contains(parent),
                None => true,
            };
            if ready {
                emitted.insert(change.resource_ref.clone());
                ordered.push(change);
                progressed = true;
            } else {
                remaining.push(change);
            }
        }
        if !progressed {
            // A reference cycle would stall forever; emit what is left in
            // declaration order and let execution surface the failure.
            ordered.extend(remaining);
            break;
        }
        pending = remaining;
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStore, labels, remote};
    use kongctl_core::resource::{
        Api, ApiDocument, ApiPublication, ApiVersion, KongctlMeta, Portal,
    };

    fn portal(r#ref: &str, name: &str) -> Portal {
        Portal {
            ref_: r#ref.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    async fn plan(store: &FakeStore, graph: &ResourceGraph, mode: Mode) -> PlanResult<Plan> {
        Planner::new(store).plan(graph, &PlanOptions::new(mode)).await
    }

    #[tokio::test]
    async fn create_against_empty_remote() {
        let store = FakeStore::new();
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", "P")).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        assert_eq!(plan.changes.len(), 1);
        let change = &plan.changes[0];
        assert_eq!(change.action, Action::Create);
        assert_eq!(change.resource_type, ResourceKind::Portal);
        assert_eq!(change.resource_ref, "p1");
        assert_eq!(change.namespace, "default");
        assert_eq!(change.fields["name"], "P");
        assert_eq!(change.protection, Some(Protection::Flag(false)));
        assert_eq!(plan.execution_order, vec![change.id.clone()]);
    }

    #[tokio::test]
    async fn system_label_drift_produces_empty_plan() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[
                    ("env", "prod"),
                    ("KONGCTL-namespace", "default"),
                    ("KONGCTL-last-updated", "20240101-120000Z"),
                ],
                serde_json::json!({}),
            ),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.labels = labels(&[("env", "prod")]);
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        assert!(plan.is_empty(), "expected empty plan, got {:?}", plan.changes);
    }

    #[tokio::test]
    async fn planning_is_idempotent_for_matching_remote() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[("KONGCTL-namespace", "default")],
                serde_json::json!({"description": "docs"}),
            ),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.description = Some("docs".into());
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn user_label_change_emits_update_with_label_diff() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[("env", "prod"), ("KONGCTL-namespace", "default")],
                serde_json::json!({}),
            ),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.labels = labels(&[("env", "staging")]);
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        assert_eq!(plan.changes.len(), 1);
        let change = &plan.changes[0];
        assert_eq!(change.action, Action::Update);
        assert_eq!(change.resource_id.as_deref(), Some("p-1"));
        assert_eq!(change.fields["labels"]["old"]["env"], "prod");
        assert_eq!(change.fields["labels"]["new"]["env"], "staging");
    }

    #[tokio::test]
    async fn parents_precede_children_in_execution_order() {
        let store = FakeStore::new();
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("dev", "Dev Portal")).unwrap();
        graph
            .add_api(Api {
                ref_: "u".into(),
                name: "U".into(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api_publication(ApiPublication {
                ref_: "u-pub".into(),
                api: Some("u".into()),
                portal: "dev".into(),
                ..Default::default()
            })
            .unwrap();

        let plan = plan(&store, &graph, Mode::Apply).await.unwrap();
        assert_eq!(plan.changes.len(), 3);
        let position = |needle: &str| {
            plan.execution_order
                .iter()
                .position(|id| id.contains(needle))
                .unwrap()
        };
        assert!(position(":portal:dev") < position(":api:u"));
        assert!(position(":api:u") < position(":api_publication:u-pub"));

        // The publication carries placeholders for both parents.
        let publication = plan
            .changes
            .iter()
            .find(|c| c.resource_type == ResourceKind::ApiPublication)
            .unwrap();
        assert_eq!(publication.fields["api_id"], "ref:u");
        assert_eq!(publication.fields["portal_id"], "ref:dev");
    }

    #[tokio::test]
    async fn apply_mode_never_emits_deletes() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-1", "Orphan", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );

        let plan = plan(&store, &ResourceGraph::new(), Mode::Apply).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn sync_mode_deletes_unmatched_managed_resources() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-1", "Orphan", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-2", "Foreign", &[("env", "prod")], serde_json::json!({})),
        );

        let plan = plan(&store, &ResourceGraph::new(), Mode::Sync).await.unwrap();
        assert_eq!(plan.changes.len(), 1, "unmanaged resources are untouched");
        assert_eq!(plan.changes[0].action, Action::Delete);
        assert_eq!(plan.changes[0].resource_id.as_deref(), Some("p-1"));
    }

    #[tokio::test]
    async fn sync_deletes_respect_namespace_isolation() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-a", "In A", &[("KONGCTL-namespace", "team-a")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-b", "In B", &[("KONGCTL-namespace", "team-b")], serde_json::json!({})),
        );

        // The graph pins team-a as the only target namespace.
        let mut graph = ResourceGraph::new();
        let mut desired = portal("keep", "Keep");
        desired.kongctl = Some(KongctlMeta {
            namespace: Some("team-a".into()),
            protected: None,
        });
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        let deletes: Vec<_> = plan
            .changes
            .iter()
            .filter(|c| c.action == Action::Delete)
            .collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].resource_id.as_deref(), Some("p-a"));
    }

    #[tokio::test]
    async fn explicit_namespace_option_overrides_graph() {
        let store = FakeStore::new();
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", "Default NS")).unwrap();
        let mut scoped = portal("p2", "Team A");
        scoped.kongctl = Some(KongctlMeta {
            namespace: Some("team-a".into()),
            protected: None,
        });
        graph.add_portal(scoped).unwrap();

        let options = PlanOptions {
            mode: Mode::Apply,
            namespaces: Some(vec!["team-a".into()]),
        };
        let plan = Planner::new(&store).plan(&graph, &options).await.unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].resource_ref, "p2");
    }

    #[tokio::test]
    async fn protected_field_change_is_fatal() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[
                    ("KONGCTL-namespace", "default"),
                    ("KONGCTL-protected", "true"),
                ],
                serde_json::json!({"description": "old"}),
            ),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.description = Some("new".into());
        desired.kongctl = Some(KongctlMeta {
            namespace: None,
            protected: Some(true),
        });
        graph.add_portal(desired).unwrap();

        let err = plan(&store, &graph, Mode::Apply).await.unwrap_err();
        assert!(matches!(err, PlanError::ProtectedResourceChange { .. }));
    }

    #[tokio::test]
    async fn unprotect_without_other_changes_is_allowed() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[
                    ("KONGCTL-namespace", "default"),
                    ("KONGCTL-protected", "true"),
                ],
                serde_json::json!({}),
            ),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.kongctl = Some(KongctlMeta {
            namespace: None,
            protected: Some(false),
        });
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Apply).await.unwrap();
        assert_eq!(plan.changes.len(), 1);
        let change = &plan.changes[0];
        assert_eq!(change.action, Action::Update);
        assert_eq!(
            change.protection,
            Some(Protection::Change(ProtectionChange {
                old: true,
                new: false,
            }))
        );
        assert!(change.fields.is_empty());
    }

    #[tokio::test]
    async fn protecting_an_unprotected_resource_emits_transition() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-1", "P", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );

        let mut graph = ResourceGraph::new();
        let mut desired = portal("p1", "P");
        desired.kongctl = Some(KongctlMeta {
            namespace: None,
            protected: Some(true),
        });
        graph.add_portal(desired).unwrap();

        let plan = plan(&store, &graph, Mode::Apply).await.unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(
            plan.changes[0].protection,
            Some(Protection::Change(ProtectionChange {
                old: false,
                new: true,
            }))
        );
    }

    #[tokio::test]
    async fn legacy_resource_is_adopted_not_recreated() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote(
                "p-1",
                "P",
                &[("KONGCTL-managed", "true")],
                serde_json::json!({}),
            ),
        );

        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", "P")).unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        // No create; the namespace label will be asserted by the executor on
        // the next update, and the legacy resource is never deleted.
        assert!(
            plan.changes
                .iter()
                .all(|c| c.action != Action::Create && c.action != Action::Delete),
            "unexpected changes: {:?}",
            plan.changes
        );
    }

    #[tokio::test]
    async fn children_of_existing_api_get_concrete_parent_ids() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Api,
            None,
            remote("a-1", "Users API", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::ApiVersion,
            Some("a-1"),
            remote(
                "v-1",
                "1.0.0",
                &[("KONGCTL-namespace", "default")],
                serde_json::json!({}),
            ),
        );

        let mut graph = ResourceGraph::new();
        graph
            .add_api(Api {
                ref_: "users".into(),
                name: "Users API".into(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api_version(ApiVersion {
                ref_: "users-v1".into(),
                api: Some("users".into()),
                version: "1.0.0".into(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api_version(ApiVersion {
                ref_: "users-v2".into(),
                api: Some("users".into()),
                version: "2.0.0".into(),
                ..Default::default()
            })
            .unwrap();

        let plan = plan(&store, &graph, Mode::Apply).await.unwrap();
        // v1 matches remotely, v2 is new.
        assert_eq!(plan.changes.len(), 1);
        let change = &plan.changes[0];
        assert_eq!(change.resource_ref, "users-v2");
        assert_eq!(change.fields["api_id"], "a-1");
    }

    #[tokio::test]
    async fn deleted_api_children_are_deleted_before_parent() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Api,
            None,
            remote("a-1", "Old API", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::ApiVersion,
            Some("a-1"),
            remote(
                "v-1",
                "1.0.0",
                &[("KONGCTL-namespace", "default")],
                serde_json::json!({}),
            ),
        );

        let plan = plan(&store, &ResourceGraph::new(), Mode::Sync).await.unwrap();
        let position = |needle: &str| {
            plan.execution_order
                .iter()
                .position(|id| id.contains(needle))
                .unwrap()
        };
        assert!(position(":d:api_version:") < position(":d:api:"));
        let version_delete = plan
            .changes
            .iter()
            .find(|c| c.resource_type == ResourceKind::ApiVersion)
            .unwrap();
        assert_eq!(version_delete.fields["api_id"], "a-1");
    }

    #[tokio::test]
    async fn document_creates_are_parent_first() {
        let store = FakeStore::new();
        let mut graph = ResourceGraph::new();
        graph
            .add_api(Api {
                ref_: "users".into(),
                name: "Users API".into(),
                ..Default::default()
            })
            .unwrap();
        // Declared child-before-parent on purpose.
        graph
            .add_api_document(ApiDocument {
                ref_: "child".into(),
                api: Some("users".into()),
                title: "Child".into(),
                parent_document_ref: Some("parent".into()),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api_document(ApiDocument {
                ref_: "parent".into(),
                api: Some("users".into()),
                title: "Parent".into(),
                ..Default::default()
            })
            .unwrap();

        let plan = plan(&store, &graph, Mode::Apply).await.unwrap();
        let position = |needle: &str| {
            plan.execution_order
                .iter()
                .position(|id| id.contains(needle))
                .unwrap()
        };
        assert!(position(":api_document:parent") < position(":api_document:child"));
    }

    #[tokio::test]
    async fn publication_matching_by_portal_is_idempotent() {
        let store = FakeStore::new();
        store.insert(
            ResourceKind::Portal,
            None,
            remote("p-1", "Dev Portal", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::Api,
            None,
            remote("a-1", "Users API", &[("KONGCTL-namespace", "default")], serde_json::json!({})),
        );
        store.insert(
            ResourceKind::ApiPublication,
            Some("a-1"),
            remote(
                "p-1",
                "p-1",
                &[("KONGCTL-namespace", "default")],
                serde_json::json!({"portal_id": "p-1"}),
            ),
        );

        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("dev", "Dev Portal")).unwrap();
        graph
            .add_api(Api {
                ref_: "users".into(),
                name: "Users API".into(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api_publication(ApiPublication {
                ref_: "users-pub".into(),
                api: Some("users".into()),
                portal: "dev".into(),
                ..Default::default()
            })
            .unwrap();

        let plan = plan(&store, &graph, Mode::Sync).await.unwrap();
        assert!(plan.is_empty(), "unexpected changes: {:?}", plan.changes);
    }
}
