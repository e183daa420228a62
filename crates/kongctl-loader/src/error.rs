//! Loader error types
//!
//! Every variant carries the source path it arose from where one exists. The
//! loader fails fast: the first error terminates the load.

use std::path::PathBuf;

use thiserror::Error;

use kongctl_core::resource::ResourceKind;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{referenced_from}: embedded file not found: {path}")]
    FileNotFound {
        path: PathBuf,
        referenced_from: PathBuf,
    },

    #[error("{referenced_from}: embedded file path '{path}' escapes the document directory")]
    PathTraversal {
        path: String,
        referenced_from: PathBuf,
    },

    #[error("{path}: extract path '{extract}' not found in embedded document")]
    ExtractPathMissing { path: PathBuf, extract: String },

    #[error("{referenced_from}: malformed file tag: {message}")]
    InvalidFileTag {
        message: String,
        referenced_from: PathBuf,
    },

    #[error("{path}: duplicate {kind} ref '{ref}'")]
    DuplicateRef {
        kind: ResourceKind,
        r#ref: String,
        path: PathBuf,
    },

    #[error(
        "{referrer}: unknown {kind} ref '{ref}'{}",
        .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default()
    )]
    UnknownRef {
        kind: ResourceKind,
        r#ref: String,
        referrer: String,
        suggestion: Option<String>,
    },

    #[error("{resource}: invalid namespace '{namespace}': {message}")]
    InvalidNamespace {
        namespace: String,
        message: String,
        resource: String,
    },

    #[error("{resource}: invalid label key '{key}': {message}")]
    InvalidLabel {
        key: String,
        message: String,
        resource: String,
    },

    #[error("{path}: unknown top-level key '{key}' is not empty")]
    UnknownKey { key: String, path: PathBuf },

    #[error("{kind} '{ref}' declares no parent api ref")]
    MissingParentRef { kind: ResourceKind, r#ref: String },

    #[error("api_implementation '{ref}': service {field} '{value}' is not a UUID")]
    InvalidServiceId {
        r#ref: String,
        field: String,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
