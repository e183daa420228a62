//! File-embedding tag expansion
//!
//! A scalar tagged `!file` pulls content from another file into the document
//! before it is deserialized:
//!
//! ```yaml
//! spec: !file ./openapi.yaml
//! description: !file ./meta.yaml#info.description
//! content: !file { path: ./guide.md }
//! ```
//!
//! Paths are relative to the referencing document's directory; absolute paths
//! and parent traversal are rejected. With an `extract` path the referenced
//! file is parsed as structured data and the dotted path selects a sub-node,
//! numeric segments indexing into sequences. Without one the raw file content
//! becomes a string. Embedded values are never re-scanned for nested tags,
//! and identical `(path, extract)` requests within one load are memoised.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

use crate::error::{LoadError, Result};

/// Per-load memo for embedded files. Owned by one loader invocation and
/// dropped with it.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<(PathBuf, Option<String>), Value>,
    misses: usize,
    hits: usize,
}

/// Cache counters, exposed for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub misses: usize,
    pub hits: usize,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses,
            hits: self.hits,
        }
    }
}

/// One parsed file tag.
#[derive(Debug, PartialEq)]
struct FileTag {
    path: String,
    extract: Option<String>,
}

/// Walk a parsed document and replace every `!file` tag with the embedded
/// content. `doc_path` is the referencing document, used for error context
/// and to anchor relative paths.
pub fn expand_tags(value: Value, doc_path: &Path, cache: &mut FileCache) -> Result<Value> {
    let base_dir = doc_path.parent().unwrap_or_else(|| Path::new("."));
    expand(value, base_dir, doc_path, cache)
}

fn expand(value: Value, base_dir: &Path, doc_path: &Path, cache: &mut FileCache) -> Result<Value> {
    match value {
        Value::Tagged(tagged) if tagged.tag == "file" => {
            let tag = parse_tag(&tagged.value, doc_path)?;
            resolve(&tag, base_dir, doc_path, cache)
        }
        Value::Mapping(mapping) => {
            let mut out = serde_yaml::Mapping::with_capacity(mapping.len());
            for (k, v) in mapping {
                out.insert(k, expand(v, base_dir, doc_path, cache)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(|v| expand(v, base_dir, doc_path, cache))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        other => Ok(other),
    }
}

fn parse_tag(payload: &Value, doc_path: &Path) -> Result<FileTag> {
    match payload {
        Value::String(s) => {
            let (path, extract) = match s.split_once('#') {
                Some((p, e)) => (p.to_string(), Some(e.to_string())),
                None => (s.clone(), None),
            };
            Ok(FileTag { path, extract })
        }
        Value::Mapping(map) => {
            let get = |key: &str| map.get(&Value::String(key.to_string()));
            let path = get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| LoadError::InvalidFileTag {
                    message: "mapping form requires a string 'path'".to_string(),
                    referenced_from: doc_path.to_path_buf(),
                })?
                .to_string();
            let extract = get("extract").and_then(Value::as_str).map(String::from);
            Ok(FileTag { path, extract })
        }
        _ => Err(LoadError::InvalidFileTag {
            message: "expected a path string or { path, extract } mapping".to_string(),
            referenced_from: doc_path.to_path_buf(),
        }),
    }
}

fn resolve(
    tag: &FileTag,
    base_dir: &Path,
    doc_path: &Path,
    cache: &mut FileCache,
) -> Result<Value> {
    let rel = Path::new(&tag.path);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(LoadError::PathTraversal {
            path: tag.path.clone(),
            referenced_from: doc_path.to_path_buf(),
        });
    }

    let full = base_dir.join(rel);
    let key = (full.clone(), tag.extract.clone());
    if let Some(cached) = cache.entries.get(&key) {
        cache.hits += 1;
        return Ok(cached.clone());
    }

    let content = std::fs::read_to_string(&full).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: full.clone(),
                referenced_from: doc_path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: full.clone(),
                source: e,
            }
        }
    })?;

    let value = match &tag.extract {
        Some(extract) => {
            let parsed: Value = serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
                path: full.clone(),
                message: e.to_string(),
            })?;
            select(&parsed, extract).ok_or_else(|| LoadError::ExtractPathMissing {
                path: full.clone(),
                extract: extract.clone(),
            })?
        }
        None => Value::String(content),
    };

    cache.misses += 1;
    cache.entries.insert(key, value.clone());
    Ok(value)
}

/// Select a sub-node by dotted path. Numeric segments index sequences.
fn select(value: &Value, extract: &str) -> Option<Value> {
    let mut current = value;
    for segment in extract.split('.') {
        current = match current {
            Value::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Mapping(map) => map.get(&Value::String(segment.to_string()))?,
            _ => return None,
        };
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn expand_str(doc: &str, doc_path: &Path, cache: &mut FileCache) -> Result<Value> {
        let value: Value = serde_yaml::from_str(doc).unwrap();
        expand_tags(value, doc_path, cache)
    }

    #[test]
    fn raw_embedding_yields_file_content() {
        let dir = TempDir::new().unwrap();
        write(&dir, "guide.md", "# Guide\nHello.\n");
        let doc_path = write(&dir, "main.yaml", "");

        let out = expand_str("content: !file ./guide.md", &doc_path, &mut FileCache::new()).unwrap();
        assert_eq!(
            out.get("content").and_then(Value::as_str),
            Some("# Guide\nHello.\n")
        );
    }

    #[test]
    fn extract_selects_sub_node() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "info:\n  description: \"X\"\n");
        let doc_path = write(&dir, "main.yaml", "");

        let out = expand_str(
            "description: !file ./m.yaml#info.description",
            &doc_path,
            &mut FileCache::new(),
        )
        .unwrap();
        assert_eq!(out.get("description").and_then(Value::as_str), Some("X"));
    }

    #[test]
    fn extract_numeric_segments_index_sequences() {
        let dir = TempDir::new().unwrap();
        write(&dir, "servers.yaml", "servers:\n  - url: one\n  - url: two\n");
        let doc_path = write(&dir, "main.yaml", "");

        let out = expand_str(
            "url: !file ./servers.yaml#servers.1.url",
            &doc_path,
            &mut FileCache::new(),
        )
        .unwrap();
        assert_eq!(out.get("url").and_then(Value::as_str), Some("two"));
    }

    #[test]
    fn mapping_form_parses_path_and_extract() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "a:\n  b: 7\n");
        let doc_path = write(&dir, "main.yaml", "");

        let out = expand_str(
            "n: !file { path: ./m.yaml, extract: a.b }",
            &doc_path,
            &mut FileCache::new(),
        )
        .unwrap();
        assert_eq!(out.get("n").and_then(Value::as_u64), Some(7));
    }

    #[test]
    fn identical_requests_are_memoised() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "info:\n  description: \"X\"\n");
        let doc_path = write(&dir, "main.yaml", "");

        let mut cache = FileCache::new();
        let doc = "a: !file ./m.yaml#info.description\nb: !file ./m.yaml#info.description";
        let out = expand_str(doc, &doc_path, &mut cache).unwrap();
        assert_eq!(out.get("a"), out.get("b"));
        assert_eq!(cache.stats(), CacheStats { misses: 1, hits: 1 });
    }

    #[test]
    fn different_extracts_are_cached_separately() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "a: 1\nb: 2\n");
        let doc_path = write(&dir, "main.yaml", "");

        let mut cache = FileCache::new();
        expand_str(
            "x: !file ./m.yaml#a\ny: !file ./m.yaml#b",
            &doc_path,
            &mut cache,
        )
        .unwrap();
        assert_eq!(cache.stats(), CacheStats { misses: 2, hits: 0 });
    }

    #[test]
    fn absolute_and_parent_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let doc_path = write(&dir, "main.yaml", "");

        let abs = expand_str("x: !file /etc/passwd", &doc_path, &mut FileCache::new());
        assert!(matches!(abs, Err(LoadError::PathTraversal { .. })));

        let up = expand_str("x: !file ../outside.yaml", &doc_path, &mut FileCache::new());
        assert!(matches!(up, Err(LoadError::PathTraversal { .. })));
    }

    #[test]
    fn missing_file_and_missing_extract() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "info: {}\n");
        let doc_path = write(&dir, "main.yaml", "");

        let missing = expand_str("x: !file ./nope.yaml", &doc_path, &mut FileCache::new());
        assert!(matches!(missing, Err(LoadError::FileNotFound { .. })));

        let bad_extract = expand_str(
            "x: !file ./m.yaml#info.description",
            &doc_path,
            &mut FileCache::new(),
        );
        assert!(matches!(
            bad_extract,
            Err(LoadError::ExtractPathMissing { .. })
        ));
    }

    #[test]
    fn embedded_content_is_not_rescanned() {
        let dir = TempDir::new().unwrap();
        write(&dir, "inner.md", "literal: !file ./other.yaml\n");
        let doc_path = write(&dir, "main.yaml", "");

        // The embedded text contains tag syntax; it must land verbatim.
        let out = expand_str("x: !file ./inner.md", &doc_path, &mut FileCache::new()).unwrap();
        assert_eq!(
            out.get("x").and_then(Value::as_str),
            Some("literal: !file ./other.yaml\n")
        );
    }

    #[test]
    fn nested_tags_in_sequences_expand() {
        let dir = TempDir::new().unwrap();
        write(&dir, "m.yaml", "v: 1\n");
        let doc_path = write(&dir, "main.yaml", "");

        let out = expand_str(
            "items:\n  - !file ./m.yaml#v\n  - plain",
            &doc_path,
            &mut FileCache::new(),
        )
        .unwrap();
        let items = out.get("items").and_then(Value::as_sequence).unwrap();
        assert_eq!(items[0].as_u64(), Some(1));
        assert_eq!(items[1].as_str(), Some("plain"));
    }
}
