//! The typed resource graph produced by the loader
//!
//! Per-kind ordered sequences plus a cross-ref index from `(kind, ref)` to
//! position. Declaration order is preserved; within a namespace the planner
//! emits creates in this order.

use std::collections::{BTreeSet, HashMap};

use crate::error::{CoreError, Result};
use crate::resource::{
    Api, ApiDocument, ApiImplementation, ApiPublication, ApiVersion, ApplicationAuthStrategy,
    ControlPlane, Portal, Resource, ResourceEntry, ResourceKind,
};

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    pub control_planes: Vec<ControlPlane>,
    pub auth_strategies: Vec<ApplicationAuthStrategy>,
    pub portals: Vec<Portal>,
    pub apis: Vec<Api>,
    pub api_versions: Vec<ApiVersion>,
    pub api_publications: Vec<ApiPublication>,
    pub api_implementations: Vec<ApiImplementation>,
    pub api_documents: Vec<ApiDocument>,
    index: HashMap<(ResourceKind, String), usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, kind: ResourceKind, r#ref: &str, position: usize) -> Result<()> {
        let key = (kind, r#ref.to_string());
        if self.index.contains_key(&key) {
            return Err(CoreError::DuplicateRef {
                kind,
                r#ref: r#ref.to_string(),
            });
        }
        self.index.insert(key, position);
        Ok(())
    }

    pub fn add_control_plane(&mut self, r: ControlPlane) -> Result<()> {
        self.register(ResourceKind::ControlPlane, &r.ref_, self.control_planes.len())?;
        self.control_planes.push(r);
        Ok(())
    }

    pub fn add_auth_strategy(&mut self, r: ApplicationAuthStrategy) -> Result<()> {
        self.register(
            ResourceKind::ApplicationAuthStrategy,
            &r.ref_,
            self.auth_strategies.len(),
        )?;
        self.auth_strategies.push(r);
        Ok(())
    }

    pub fn add_portal(&mut self, r: Portal) -> Result<()> {
        self.register(ResourceKind::Portal, &r.ref_, self.portals.len())?;
        self.portals.push(r);
        Ok(())
    }

    pub fn add_api(&mut self, r: Api) -> Result<()> {
        self.register(ResourceKind::Api, &r.ref_, self.apis.len())?;
        self.apis.push(r);
        Ok(())
    }

    pub fn add_api_version(&mut self, r: ApiVersion) -> Result<()> {
        self.register(ResourceKind::ApiVersion, &r.ref_, self.api_versions.len())?;
        self.api_versions.push(r);
        Ok(())
    }

    pub fn add_api_publication(&mut self, r: ApiPublication) -> Result<()> {
        self.register(
            ResourceKind::ApiPublication,
            &r.ref_,
            self.api_publications.len(),
        )?;
        self.api_publications.push(r);
        Ok(())
    }

    pub fn add_api_implementation(&mut self, r: ApiImplementation) -> Result<()> {
        self.register(
            ResourceKind::ApiImplementation,
            &r.ref_,
            self.api_implementations.len(),
        )?;
        self.api_implementations.push(r);
        Ok(())
    }

    pub fn add_api_document(&mut self, r: ApiDocument) -> Result<()> {
        self.register(ResourceKind::ApiDocument, &r.ref_, self.api_documents.len())?;
        self.api_documents.push(r);
        Ok(())
    }

    /// All resources of a kind, in declaration order.
    pub fn entries(&self, kind: ResourceKind) -> Vec<ResourceEntry<'_>> {
        match kind {
            ResourceKind::ControlPlane => self
                .control_planes
                .iter()
                .map(ResourceEntry::ControlPlane)
                .collect(),
            ResourceKind::ApplicationAuthStrategy => self
                .auth_strategies
                .iter()
                .map(ResourceEntry::ApplicationAuthStrategy)
                .collect(),
            ResourceKind::Portal => self.portals.iter().map(ResourceEntry::Portal).collect(),
            ResourceKind::Api => self.apis.iter().map(ResourceEntry::Api).collect(),
            ResourceKind::ApiVersion => self
                .api_versions
                .iter()
                .map(ResourceEntry::ApiVersion)
                .collect(),
            ResourceKind::ApiPublication => self
                .api_publications
                .iter()
                .map(ResourceEntry::ApiPublication)
                .collect(),
            ResourceKind::ApiImplementation => self
                .api_implementations
                .iter()
                .map(ResourceEntry::ApiImplementation)
                .collect(),
            ResourceKind::ApiDocument => self
                .api_documents
                .iter()
                .map(ResourceEntry::ApiDocument)
                .collect(),
        }
    }

    /// Look up a resource by kind and ref.
    pub fn get(&self, kind: ResourceKind, r#ref: &str) -> Option<ResourceEntry<'_>> {
        let position = *self.index.get(&(kind, r#ref.to_string()))?;
        self.entries(kind).into_iter().nth(position)
    }

    pub fn contains(&self, kind: ResourceKind, r#ref: &str) -> bool {
        self.index.contains_key(&(kind, r#ref.to_string()))
    }

    /// All refs declared for a kind, in declaration order.
    pub fn refs_of(&self, kind: ResourceKind) -> Vec<&str> {
        self.entries(kind).into_iter().map(|e| e.ref_()).collect()
    }

    /// Every namespace named by a resource in the graph.
    pub fn namespaces(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for kind in ResourceKind::all() {
            for entry in self.entries(kind) {
                set.insert(entry.as_resource().namespace().to_string());
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::KongctlMeta;

    fn portal(r#ref: &str, namespace: Option<&str>) -> Portal {
        Portal {
            ref_: r#ref.to_string(),
            name: r#ref.to_uppercase(),
            kongctl: namespace.map(|ns| KongctlMeta {
                namespace: Some(ns.to_string()),
                protected: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_ref_within_kind_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", None)).unwrap();
        let err = graph.add_portal(portal("p1", None)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRef { kind: ResourceKind::Portal, .. }));
    }

    #[test]
    fn same_ref_across_kinds_allowed() {
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("shared", None)).unwrap();
        graph
            .add_api(Api {
                ref_: "shared".into(),
                name: "Shared".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn lookup_by_kind_and_ref() {
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", None)).unwrap();
        graph.add_portal(portal("p2", None)).unwrap();

        let entry = graph.get(ResourceKind::Portal, "p2").unwrap();
        assert_eq!(entry.ref_(), "p2");
        assert!(graph.get(ResourceKind::Portal, "p3").is_none());
        assert!(graph.get(ResourceKind::Api, "p1").is_none());
    }

    #[test]
    fn namespaces_collects_defaults_and_explicit() {
        let mut graph = ResourceGraph::new();
        graph.add_portal(portal("p1", None)).unwrap();
        graph.add_portal(portal("p2", Some("team-a"))).unwrap();

        let namespaces = graph.namespaces();
        assert!(namespaces.contains("default"));
        assert!(namespaces.contains("team-a"));
        assert_eq!(namespaces.len(), 2);
    }
}
