//! Core error types

use thiserror::Error;

use crate::resource::ResourceKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("duplicate {kind} ref '{ref}'")]
    DuplicateRef { kind: ResourceKind, r#ref: String },

    #[error("invalid namespace '{namespace}': {message}")]
    InvalidNamespace { namespace: String, message: String },

    #[error("invalid label key '{key}': {message}")]
    InvalidLabel { key: String, message: String },

    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),

    #[error("failed to serialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
