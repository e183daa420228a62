//! In-memory remote store used by planner and executor tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};

use kongctl_core::namespace::NamespaceFilter;
use kongctl_core::resource::ResourceKind;
use kongctl_core::{RemoteResource, RemoteStore, StoreError, StoreResult};

type Key = (ResourceKind, Option<String>);

#[derive(Default)]
struct Inner {
    resources: HashMap<Key, Vec<RemoteResource>>,
    counter: usize,
    fail_create_named: HashSet<String>,
    log: Vec<String>,
}

/// A fake remote. Creates mint sequential ids; the call log records every
/// write so tests can assert what did (or did not) reach the remote.
#[derive(Default)]
pub(crate) struct FakeStore {
    inner: Mutex<Inner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: ResourceKind, parent: Option<&str>, resource: RemoteResource) {
        self.inner
            .lock()
            .unwrap()
            .resources
            .entry((kind, parent.map(String::from)))
            .or_default()
            .push(resource);
    }

    /// Force creates whose natural key equals `name` to fail.
    pub fn fail_create_named(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_create_named
            .insert(name.to_string());
    }

    pub fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|line| !line.starts_with("list") && !line.starts_with("find"))
            .count()
    }

    pub fn get(&self, kind: ResourceKind, parent: Option<&str>, id: &str) -> Option<RemoteResource> {
        self.inner
            .lock()
            .unwrap()
            .resources
            .get(&(kind, parent.map(String::from)))
            .and_then(|items| items.iter().find(|r| r.id == id).cloned())
    }
}

pub(crate) fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn remote(
    id: &str,
    name: &str,
    label_pairs: &[(&str, &str)],
    attributes: JsonValue,
) -> RemoteResource {
    RemoteResource {
        id: id.to_string(),
        name: name.to_string(),
        labels: labels(label_pairs),
        attributes,
        parent_id: None,
    }
}

fn natural_key_attr(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::ApiVersion => "version",
        ResourceKind::ApiDocument => "slug",
        ResourceKind::ApiPublication => "portal_id",
        _ => "name",
    }
}

fn labels_from_body(body: &JsonMap<String, JsonValue>) -> BTreeMap<String, String> {
    body.get("labels")
        .and_then(JsonValue::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_managed(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        namespaces: &NamespaceFilter,
    ) -> StoreResult<Vec<RemoteResource>> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("list:{kind}"));
        Ok(inner
            .resources
            .get(&(kind, parent.map(String::from)))
            .map(|items| {
                items
                    .iter()
                    .filter(|r| {
                        r.is_managed() && r.namespace().is_some_and(|ns| namespaces.matches(ns))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_adoptable(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        name: &str,
    ) -> StoreResult<Option<RemoteResource>> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("find:{kind}:{name}"));
        Ok(inner
            .resources
            .get(&(kind, parent.map(String::from)))
            .and_then(|items| {
                items
                    .iter()
                    .find(|r| r.name == name && r.is_legacy_managed())
                    .cloned()
            }))
    }

    async fn create(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource> {
        let mut inner = self.inner.lock().unwrap();
        let name = body
            .get(natural_key_attr(kind))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        inner.log.push(format!("create:{kind}:{name}"));

        if inner.fail_create_named.contains(&name) {
            return Err(StoreError::Api {
                status: 400,
                operation: "create".to_string(),
                resource: format!("{kind} {name}"),
                message: "injected failure".to_string(),
            });
        }

        inner.counter += 1;
        let id = if kind == ResourceKind::ApiPublication {
            // Publications are identified by their portal id.
            name.clone()
        } else {
            format!("{kind}-{}", inner.counter)
        };

        let mut attributes = body.clone();
        attributes.remove("labels");
        let resource = RemoteResource {
            id,
            name,
            labels: labels_from_body(body),
            attributes: JsonValue::Object(attributes),
            parent_id: parent.map(String::from),
        };
        inner
            .resources
            .entry((kind, parent.map(String::from)))
            .or_default()
            .push(resource.clone());
        Ok(resource)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("update:{kind}:{id}"));

        let items = inner
            .resources
            .entry((kind, parent.map(String::from)))
            .or_default();
        let resource = items.iter_mut().find(|r| r.id == id).ok_or_else(|| {
            StoreError::Api {
                status: 404,
                operation: "update".to_string(),
                resource: format!("{kind} {id}"),
                message: "not found".to_string(),
            }
        })?;

        for (field, value) in body {
            if field == "labels" {
                // Three-valued patch: null removes, value asserts.
                if let Some(patch) = value.as_object() {
                    for (key, label) in patch {
                        match label.as_str() {
                            Some(v) => {
                                resource.labels.insert(key.clone(), v.to_string());
                            }
                            None => {
                                resource.labels.remove(key);
                            }
                        }
                    }
                }
            } else {
                if field == natural_key_attr(kind)
                    && let Some(name) = value.as_str()
                {
                    resource.name = name.to_string();
                }
                resource.attributes[field] = value.clone();
            }
        }
        Ok(resource.clone())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        id: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("delete:{kind}:{id}"));
        if let Some(items) = inner.resources.get_mut(&(kind, parent.map(String::from))) {
            items.retain(|r| r.id != id);
        }
        Ok(())
    }
}
