//! Source discovery
//!
//! A source is a file path or a directory. Directories yield every
//! `.yaml`/`.yml`/`.json` file, sorted for a deterministic merge order;
//! the recursive flag walks subdirectories too.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{LoadError, Result};

#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    pub recursive: bool,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
        }
    }

    pub fn recursive(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
        }
    }

    /// The document files this source contributes, in merge order.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let meta = std::fs::metadata(&self.path).map_err(|e| LoadError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        if meta.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path)
            .max_depth(max_depth)
            .follow_links(true)
        {
            let entry = entry.map_err(|e| LoadError::Io {
                path: self.path.clone(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && is_document(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directory_discovery_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.yaml"), "").unwrap();
        fs::write(dir.path().join("a.yml"), "").unwrap();
        fs::write(dir.path().join("c.json"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/d.yaml"), "").unwrap();

        let flat = Source::new(dir.path()).discover().unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml", "c.json"]);

        let deep = Source::recursive(dir.path()).discover().unwrap();
        assert_eq!(deep.len(), 4);
    }

    #[test]
    fn single_file_source() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("one.yaml");
        fs::write(&file, "").unwrap();

        let found = Source::new(&file).discover().unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn missing_source_errors() {
        assert!(Source::new("/does/not/exist.yaml").discover().is_err());
    }
}
