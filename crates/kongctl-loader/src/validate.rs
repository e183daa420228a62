//! Graph validation
//!
//! Runs after every source document has been merged: namespace and label
//! grammar per resource, parent back-references for child kinds, and every
//! cross-resource ref resolving to the expected kind. Unknown refs carry a
//! fuzzy-matched suggestion when a declared ref is close enough.

use kongctl_core::graph::ResourceGraph;
use kongctl_core::namespace::validate_namespace;
use kongctl_core::resource::{Resource, ResourceKind};
use kongctl_core::{CoreError, labels};
use uuid::Uuid;

use crate::error::{LoadError, Result};

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.85;

pub fn validate_graph(graph: &ResourceGraph) -> Result<()> {
    for kind in ResourceKind::all() {
        for entry in graph.entries(kind) {
            let resource = entry.as_resource();
            validate_meta(resource)?;

            if kind.is_api_child() {
                let api_ref = entry.api_ref().filter(|r| !r.is_empty()).ok_or_else(|| {
                    LoadError::MissingParentRef {
                        kind,
                        r#ref: entry.ref_().to_string(),
                    }
                })?;
                check_ref(graph, ResourceKind::Api, api_ref, resource)?;
            }
        }
    }

    for publication in &graph.api_publications {
        check_ref(graph, ResourceKind::Portal, &publication.portal, publication)?;
        for strategy in &publication.auth_strategy_ids {
            check_ref(
                graph,
                ResourceKind::ApplicationAuthStrategy,
                strategy,
                publication,
            )?;
        }
    }

    for implementation in &graph.api_implementations {
        // The control plane is either a declared ref or an external UUID; the
        // UUID form is opaque and skips cross-resource validation.
        let cp = &implementation.service.control_plane_id;
        if !graph.contains(ResourceKind::ControlPlane, cp) && Uuid::parse_str(cp).is_err() {
            check_ref(graph, ResourceKind::ControlPlane, cp, implementation)?;
        }
        if Uuid::parse_str(&implementation.service.id).is_err() {
            return Err(LoadError::InvalidServiceId {
                r#ref: implementation.ref_.clone(),
                field: "id".to_string(),
                value: implementation.service.id.clone(),
            });
        }
    }

    for document in &graph.api_documents {
        if let Some(parent) = &document.parent_document_ref {
            check_ref(graph, ResourceKind::ApiDocument, parent, document)?;
            // Parent pages live under the same API.
            if let Some(entry) = graph.get(ResourceKind::ApiDocument, parent)
                && entry.api_ref() != document.api.as_deref()
            {
                return Err(LoadError::UnknownRef {
                    kind: ResourceKind::ApiDocument,
                    r#ref: parent.clone(),
                    referrer: describe(document),
                    suggestion: None,
                });
            }
        }
    }

    Ok(())
}

fn validate_meta(resource: &dyn Resource) -> Result<()> {
    if let Err(CoreError::InvalidNamespace { namespace, message }) =
        validate_namespace(resource.namespace())
    {
        return Err(LoadError::InvalidNamespace {
            namespace,
            message,
            resource: describe(resource),
        });
    }
    for key in resource.labels().keys() {
        if let Err(CoreError::InvalidLabel { key, message }) = labels::validate_user_label_key(key)
        {
            return Err(LoadError::InvalidLabel {
                key,
                message,
                resource: describe(resource),
            });
        }
    }
    Ok(())
}

fn check_ref(
    graph: &ResourceGraph,
    expected: ResourceKind,
    r#ref: &str,
    referrer: &dyn Resource,
) -> Result<()> {
    if graph.contains(expected, r#ref) {
        return Ok(());
    }
    Err(LoadError::UnknownRef {
        kind: expected,
        r#ref: r#ref.to_string(),
        referrer: describe(referrer),
        suggestion: suggest(r#ref, &graph.refs_of(expected)),
    })
}

fn describe(resource: &dyn Resource) -> String {
    match resource.origin() {
        Some(origin) => format!("{}: {} '{}'", origin.display(), resource.kind(), resource.ref_()),
        None => format!("{} '{}'", resource.kind(), resource.ref_()),
    }
}

fn suggest(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kongctl_core::resource::{
        Api, ApiImplementation, ApiPublication, ApiVersion, ImplementationService, KongctlMeta,
        Portal,
    };

    fn graph_with_portal_and_api() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph
            .add_portal(Portal {
                ref_: "dev-portal".into(),
                name: "Dev".into(),
                ..Default::default()
            })
            .unwrap();
        graph
            .add_api(Api {
                ref_: "users".into(),
                name: "Users API".into(),
                ..Default::default()
            })
            .unwrap();
        graph
    }

    #[test]
    fn valid_graph_passes() {
        let mut graph = graph_with_portal_and_api();
        graph
            .add_api_publication(ApiPublication {
                ref_: "users-pub".into(),
                api: Some("users".into()),
                portal: "dev-portal".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn unknown_portal_ref_suggests_closest() {
        let mut graph = graph_with_portal_and_api();
        graph
            .add_api_publication(ApiPublication {
                ref_: "users-pub".into(),
                api: Some("users".into()),
                portal: "dev-portl".into(),
                ..Default::default()
            })
            .unwrap();

        let err = validate_graph(&graph).unwrap_err();
        match err {
            LoadError::UnknownRef {
                kind, suggestion, ..
            } => {
                assert_eq!(kind, ResourceKind::Portal);
                assert_eq!(suggestion.as_deref(), Some("dev-portal"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn child_without_parent_ref_rejected() {
        let mut graph = ResourceGraph::new();
        graph
            .add_api_version(ApiVersion {
                ref_: "orphan".into(),
                version: "1.0.0".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            validate_graph(&graph),
            Err(LoadError::MissingParentRef { .. })
        ));
    }

    #[test]
    fn implementation_uuid_escape_hatch() {
        let mut graph = graph_with_portal_and_api();
        graph
            .add_api_implementation(ApiImplementation {
                ref_: "users-impl".into(),
                api: Some("users".into()),
                service: ImplementationService {
                    control_plane_id: "9a1e33cd-f72d-4fd7-9660-37c6a5b0c9a1".into(),
                    id: "5f0b24c2-94be-42f7-92ba-16a2b0c9e001".into(),
                },
                ..Default::default()
            })
            .unwrap();
        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn implementation_unknown_control_plane_rejected() {
        let mut graph = graph_with_portal_and_api();
        graph
            .add_api_implementation(ApiImplementation {
                ref_: "users-impl".into(),
                api: Some("users".into()),
                service: ImplementationService {
                    control_plane_id: "not-a-cp-and-not-a-uuid".into(),
                    id: "5f0b24c2-94be-42f7-92ba-16a2b0c9e001".into(),
                },
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            validate_graph(&graph),
            Err(LoadError::UnknownRef {
                kind: ResourceKind::ControlPlane,
                ..
            })
        ));
    }

    #[test]
    fn implementation_service_id_must_be_uuid() {
        let mut graph = graph_with_portal_and_api();
        graph
            .add_api_implementation(ApiImplementation {
                ref_: "users-impl".into(),
                api: Some("users".into()),
                service: ImplementationService {
                    control_plane_id: "9a1e33cd-f72d-4fd7-9660-37c6a5b0c9a1".into(),
                    id: "service-one".into(),
                },
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            validate_graph(&graph),
            Err(LoadError::InvalidServiceId { .. })
        ));
    }

    #[test]
    fn invalid_namespace_and_label_rejected() {
        let mut graph = ResourceGraph::new();
        graph
            .add_portal(Portal {
                ref_: "p1".into(),
                name: "One".into(),
                kongctl: Some(KongctlMeta {
                    namespace: Some("Bad_NS".into()),
                    protected: None,
                }),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            validate_graph(&graph),
            Err(LoadError::InvalidNamespace { .. })
        ));

        let mut graph = ResourceGraph::new();
        graph
            .add_portal(Portal {
                ref_: "p1".into(),
                name: "One".into(),
                labels: [("kong-tier".to_string(), "gold".to_string())].into(),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            validate_graph(&graph),
            Err(LoadError::InvalidLabel { .. })
        ));
    }
}
