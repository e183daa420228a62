//! Load orchestration
//!
//! Parse every document under every source in order, expand file tags, merge
//! into one graph (duplicate refs across sources are fatal), then validate.

use std::path::Path;

use serde_yaml::Value;

use kongctl_core::CoreError;
use kongctl_core::graph::ResourceGraph;

use crate::document::Document;
use crate::error::{LoadError, Result};
use crate::source::Source;
use crate::tags::{CacheStats, FileCache};
use crate::validate::validate_graph;

#[derive(Debug, Default)]
pub struct Loader {
    sources: Vec<Source>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn add_source(&mut self, source: Source) {
        self.sources.push(source);
    }

    /// Load and validate the full source set into a resource graph.
    pub fn load(&self) -> Result<ResourceGraph> {
        let (graph, _) = self.load_with_stats()?;
        Ok(graph)
    }

    /// As `load`, additionally reporting file-embedding cache counters. The
    /// cache lives exactly as long as this call.
    pub fn load_with_stats(&self) -> Result<(ResourceGraph, CacheStats)> {
        let mut cache = FileCache::new();
        let mut graph = ResourceGraph::new();

        for source in &self.sources {
            for file in source.discover()? {
                tracing::debug!(path = %file.display(), "loading document");
                let document = load_document(&file, &mut cache)?;
                merge_document(&mut graph, document, &file)?;
            }
        }

        validate_graph(&graph)?;
        Ok((graph, cache.stats()))
    }
}

fn load_document(path: &Path, cache: &mut FileCache) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let expanded = crate::tags::expand_tags(value, path, cache)?;
    Document::from_value(expanded, path)
}

fn merge_document(graph: &mut ResourceGraph, document: Document, path: &Path) -> Result<()> {
    let dup = |e: CoreError| match e {
        CoreError::DuplicateRef { kind, r#ref } => LoadError::DuplicateRef {
            kind,
            r#ref,
            path: path.to_path_buf(),
        },
        other => LoadError::Parse {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    };

    for r in document.control_planes {
        graph.add_control_plane(r).map_err(dup)?;
    }
    for r in document.application_auth_strategies {
        graph.add_auth_strategy(r).map_err(dup)?;
    }
    for r in document.portals {
        graph.add_portal(r).map_err(dup)?;
    }
    for r in document.apis {
        graph.add_api(r).map_err(dup)?;
    }
    for r in document.api_versions {
        graph.add_api_version(r).map_err(dup)?;
    }
    for r in document.api_publications {
        graph.add_api_publication(r).map_err(dup)?;
    }
    for r in document.api_implementations {
        graph.add_api_implementation(r).map_err(dup)?;
    }
    for r in document.api_documents {
        graph.add_api_document(r).map_err(dup)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use kongctl_core::resource::Resource;

    fn write(dir: &TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn load_merges_sources_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "10-portals.yaml",
            "portals:\n  - ref: dev\n    name: Dev Portal\n",
        );
        write(
            &dir,
            "20-apis.yaml",
            r#"
apis:
  - ref: users
    name: Users API
    publications:
      - ref: users-pub
        portal: dev
"#,
        );

        let graph = Loader::new()
            .with_source(Source::new(dir.path()))
            .load()
            .unwrap();

        assert_eq!(graph.portals.len(), 1);
        assert_eq!(graph.apis.len(), 1);
        assert_eq!(graph.api_publications.len(), 1);
        assert_eq!(graph.api_publications[0].api.as_deref(), Some("users"));
    }

    #[test]
    fn duplicate_ref_across_sources_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", "portals:\n  - ref: dev\n    name: One\n");
        write(&dir, "b.yaml", "portals:\n  - ref: dev\n    name: Two\n");

        let err = Loader::new()
            .with_source(Source::new(dir.path()))
            .load()
            .unwrap_err();
        match err {
            LoadError::DuplicateRef { r#ref, path, .. } => {
                assert_eq!(r#ref, "dev");
                assert!(path.ends_with("b.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_embedding_resolves_relative_to_document() {
        let dir = TempDir::new().unwrap();
        write(&dir, "specs/openapi.yaml", "info:\n  description: \"X\"\n");
        write(
            &dir,
            "specs/main.yaml",
            r#"
apis:
  - ref: users
    name: Users API
    description: !file ./openapi.yaml#info.description
"#,
        );

        let graph = Loader::new()
            .with_source(Source::new(dir.path().join("specs/main.yaml")))
            .load()
            .unwrap();
        assert_eq!(graph.apis[0].description.as_deref(), Some("X"));
    }

    #[test]
    fn embedding_cache_counts_one_miss_one_hit() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "info:\n  description: \"X\"\n");
        write(
            &dir,
            "main.yaml",
            r#"
portals:
  - ref: p1
    name: One
    description: !file ./m.yaml#info.description
apis:
  - ref: users
    name: Users API
    description: !file ./m.yaml#info.description
"#,
        );

        let (graph, stats) = Loader::new()
            .with_source(Source::new(dir.path().join("main.yaml")))
            .load_with_stats()
            .unwrap();
        assert_eq!(graph.portals[0].description.as_deref(), Some("X"));
        assert_eq!(graph.apis[0].description.as_deref(), Some("X"));
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn json_documents_are_accepted() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "doc.json",
            r#"{"portals": [{"ref": "dev", "name": "Dev Portal"}]}"#,
        );

        let graph = Loader::new()
            .with_source(Source::new(dir.path().join("doc.json")))
            .load()
            .unwrap();
        assert_eq!(graph.portals[0].name, "Dev Portal");
    }

    #[test]
    fn parse_error_carries_path() {
        let dir = TempDir::new().unwrap();
        write(&dir, "bad.yaml", "portals: [\n");

        let err = Loader::new()
            .with_source(Source::new(dir.path().join("bad.yaml")))
            .load()
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn defaults_reach_resources_across_kinds() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "main.yaml",
            r#"
_defaults:
  kongctl:
    namespace: team-a
portals:
  - ref: dev
    name: Dev Portal
control_planes:
  - ref: prod-cp
    name: prod
"#,
        );

        let graph = Loader::new()
            .with_source(Source::new(dir.path().join("main.yaml")))
            .load()
            .unwrap();
        assert_eq!(graph.portals[0].namespace(), "team-a");
        assert_eq!(graph.control_planes[0].namespace(), "team-a");
        assert_eq!(graph.namespaces().into_iter().collect::<Vec<_>>(), ["team-a"]);
    }
}
