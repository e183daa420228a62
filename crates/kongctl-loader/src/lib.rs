//! Source loading for kongctl
//!
//! Ingests one or more document sources (files or directories), expands
//! `!file` embedding tags, applies `_defaults.kongctl` inheritance, lifts
//! nested child resources, and validates the assembled resource graph.

pub mod document;
pub mod error;
pub mod loader;
pub mod source;
pub mod tags;
pub mod validate;

pub use error::{LoadError, Result};
pub use loader::Loader;
pub use source::Source;
pub use tags::{CacheStats, FileCache};
