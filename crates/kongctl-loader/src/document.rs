//! One parsed source document
//!
//! Top-level keys carry the per-kind resource lists plus an optional
//! `_defaults` block. Unknown top-level keys are tolerated only when empty.
//! Child resources declared nested inside an API (or inside a document tree)
//! are lifted into the top-level lists with their parent back-reference
//! filled in; lifting emits parents before their children.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use kongctl_core::resource::{
    Api, ApiDocument, ApiImplementation, ApiPublication, ApiVersion, ApplicationAuthStrategy,
    ControlPlane, KongctlMeta, Portal,
};

use crate::error::{LoadError, Result};

/// The `_defaults` block. Only the `kongctl` sub-block is meaningful.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub kongctl: KongctlMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Document {
    #[serde(default, rename = "_defaults")]
    pub defaults: Option<Defaults>,
    #[serde(default)]
    pub portals: Vec<Portal>,
    #[serde(default)]
    pub apis: Vec<Api>,
    #[serde(default)]
    pub api_versions: Vec<ApiVersion>,
    #[serde(default)]
    pub api_publications: Vec<ApiPublication>,
    #[serde(default)]
    pub api_implementations: Vec<ApiImplementation>,
    #[serde(default)]
    pub api_documents: Vec<ApiDocument>,
    #[serde(default)]
    pub application_auth_strategies: Vec<ApplicationAuthStrategy>,
    #[serde(default)]
    pub control_planes: Vec<ControlPlane>,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

impl Document {
    /// Deserialize an expanded document value, then lift nested children and
    /// apply `_defaults` and origins.
    pub fn from_value(value: Value, path: &Path) -> Result<Document> {
        let mut doc: Document =
            serde_yaml::from_value(value).map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        doc.check_unknown_keys(path)?;
        doc.lift_children();
        doc.apply_defaults();
        doc.set_origin(path);
        Ok(doc)
    }

    fn check_unknown_keys(&self, path: &Path) -> Result<()> {
        for (key, value) in &self.unknown {
            let empty = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Sequence(s) => s.is_empty(),
                Value::Mapping(m) => m.is_empty(),
                _ => false,
            };
            if !empty {
                return Err(LoadError::UnknownKey {
                    key: key.clone(),
                    path: path.to_path_buf(),
                });
            }
            tracing::debug!(key, path = %path.display(), "ignoring empty unknown top-level key");
        }
        Ok(())
    }

    /// Move children declared inside APIs (and inside document trees) into
    /// the top-level lists, filling in parent back-references.
    fn lift_children(&mut self) {
        for api in &mut self.apis {
            let api_ref = api.ref_.clone();

            for mut version in api.versions.drain(..) {
                version.api = Some(api_ref.clone());
                self.api_versions.push(version);
            }
            for mut publication in api.publications.drain(..) {
                publication.api = Some(api_ref.clone());
                self.api_publications.push(publication);
            }
            for mut implementation in api.implementations.drain(..) {
                implementation.api = Some(api_ref.clone());
                self.api_implementations.push(implementation);
            }

            let documents = std::mem::take(&mut api.documents);
            for document in documents {
                lift_document(document, &api_ref, None, &mut self.api_documents);
            }
        }

        // Top-level documents may also nest children.
        let documents = std::mem::take(&mut self.api_documents);
        for document in documents {
            let api_ref = document.api.clone().unwrap_or_default();
            let parent = document.parent_document_ref.clone();
            lift_document(document, &api_ref, parent, &mut self.api_documents);
        }
    }

    fn apply_defaults(&mut self) {
        let Some(defaults) = self.defaults.clone() else {
            return;
        };
        let inherited = defaults.kongctl;

        fn merge(slot: &mut Option<KongctlMeta>, inherited: &KongctlMeta) {
            let mut meta = slot.take().unwrap_or_default();
            meta.inherit(inherited);
            *slot = Some(meta);
        }

        for r in &mut self.portals {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.apis {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.api_versions {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.api_publications {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.api_implementations {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.api_documents {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.application_auth_strategies {
            merge(&mut r.kongctl, &inherited);
        }
        for r in &mut self.control_planes {
            merge(&mut r.kongctl, &inherited);
        }
    }

    fn set_origin(&mut self, path: &Path) {
        let origin = Some(path.to_path_buf());

        fn set<T>(items: &mut [T], origin: &Option<PathBuf>, f: impl Fn(&mut T) -> &mut Option<PathBuf>) {
            for item in items {
                *f(item) = origin.clone();
            }
        }

        set(&mut self.portals, &origin, |r| &mut r.origin);
        set(&mut self.apis, &origin, |r| &mut r.origin);
        set(&mut self.api_versions, &origin, |r| &mut r.origin);
        set(&mut self.api_publications, &origin, |r| &mut r.origin);
        set(&mut self.api_implementations, &origin, |r| &mut r.origin);
        set(&mut self.api_documents, &origin, |r| &mut r.origin);
        set(&mut self.application_auth_strategies, &origin, |r| &mut r.origin);
        set(&mut self.control_planes, &origin, |r| &mut r.origin);
    }
}

/// Push a document and then its nested children, parent first, so creates in
/// declaration order always see the parent page already emitted.
fn lift_document(
    mut document: ApiDocument,
    api_ref: &str,
    parent_ref: Option<String>,
    out: &mut Vec<ApiDocument>,
) {
    if !api_ref.is_empty() {
        document.api = Some(api_ref.to_string());
    }
    if document.parent_document_ref.is_none() {
        document.parent_document_ref = parent_ref;
    }
    let children = std::mem::take(&mut document.children);
    let own_ref = document.ref_.clone();
    out.push(document);
    for child in children {
        lift_document(child, api_ref, Some(own_ref.clone()), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kongctl_core::resource::Resource;

    fn parse(doc: &str) -> Result<Document> {
        let value: Value = serde_yaml::from_str(doc).unwrap();
        Document::from_value(value, Path::new("test.yaml"))
    }

    #[test]
    fn unknown_empty_keys_ignored_nonempty_rejected() {
        assert!(parse("portals: []\nextras:\n").is_ok());
        assert!(parse("portals: []\nextras: []\n").is_ok());
        assert!(parse("portals: []\nextras: {}\n").is_ok());

        let err = parse("portals: []\nextras:\n  - x\n").unwrap_err();
        assert!(matches!(err, LoadError::UnknownKey { ref key, .. } if key == "extras"));
    }

    #[test]
    fn nested_children_are_lifted_with_backrefs() {
        let doc = parse(
            r#"
apis:
  - ref: users
    name: Users API
    versions:
      - ref: users-v1
        version: "1.0.0"
    publications:
      - ref: users-pub
        portal: dev
    implementations:
      - ref: users-impl
        service:
          control_plane_id: prod-cp
          id: 9a1e33cd-f72d-4fd7-9660-37c6a5b0c9a1
"#,
        )
        .unwrap();

        assert!(doc.apis[0].versions.is_empty());
        assert_eq!(doc.api_versions[0].api.as_deref(), Some("users"));
        assert_eq!(doc.api_publications[0].api.as_deref(), Some("users"));
        assert_eq!(doc.api_implementations[0].api.as_deref(), Some("users"));
    }

    #[test]
    fn document_trees_lift_parent_first() {
        let doc = parse(
            r##"
apis:
  - ref: users
    name: Users API
    documents:
      - ref: guide
        title: Guide
        content: "# Guide"
        children:
          - ref: guide-auth
            title: Auth
            content: "# Auth"
            children:
              - ref: guide-auth-keys
                title: Keys
                content: "# Keys"
"##,
        )
        .unwrap();

        let refs: Vec<&str> = doc.api_documents.iter().map(|d| d.ref_.as_str()).collect();
        assert_eq!(refs, vec!["guide", "guide-auth", "guide-auth-keys"]);
        assert_eq!(doc.api_documents[1].parent_document_ref.as_deref(), Some("guide"));
        assert_eq!(
            doc.api_documents[2].parent_document_ref.as_deref(),
            Some("guide-auth")
        );
        assert!(doc.api_documents.iter().all(|d| d.api.as_deref() == Some("users")));
    }

    #[test]
    fn defaults_fill_missing_kongctl_fields() {
        let doc = parse(
            r#"
_defaults:
  kongctl:
    namespace: team-a
    protected: true
portals:
  - ref: p1
    name: One
  - ref: p2
    name: Two
    kongctl:
      namespace: team-b
  - ref: p3
    name: Three
    kongctl:
      protected: false
"#,
        )
        .unwrap();

        assert_eq!(doc.portals[0].namespace(), "team-a");
        assert!(doc.portals[0].protected());
        // Explicit namespace wins, protection still inherited.
        assert_eq!(doc.portals[1].namespace(), "team-b");
        assert!(doc.portals[1].protected());
        // Explicit protection wins, namespace inherited.
        assert_eq!(doc.portals[2].namespace(), "team-a");
        assert!(!doc.portals[2].protected());
    }

    #[test]
    fn defaults_apply_to_lifted_children() {
        let doc = parse(
            r#"
_defaults:
  kongctl:
    namespace: team-a
apis:
  - ref: users
    name: Users API
    versions:
      - ref: users-v1
        version: "1.0.0"
"#,
        )
        .unwrap();

        assert_eq!(doc.api_versions[0].namespace(), "team-a");
    }

    #[test]
    fn origin_recorded_on_every_resource() {
        let doc = parse("portals:\n  - ref: p1\n    name: One\n").unwrap();
        assert_eq!(
            doc.portals[0].origin.as_deref(),
            Some(Path::new("test.yaml"))
        );
    }
}
