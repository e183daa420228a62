//! CLI error type with exit code mapping

use miette::Diagnostic;
use thiserror::Error;

use kongctl_konnect::ConfigError;
use kongctl_loader::LoadError;
use kongctl_plan::{ExecuteError, PlanError};

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Malformed sources, bad refs, bad labels - nothing touched.
    #[error("{message}")]
    #[diagnostic(code(kongctl::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A protection invariant would be violated - nothing touched.
    #[error("{message}")]
    #[diagnostic(code(kongctl::protection))]
    Protection { message: String },

    /// The executor proceeded but some changes failed.
    #[error("{message}")]
    #[diagnostic(code(kongctl::partial))]
    Partial { message: String },

    #[error("{message}")]
    #[diagnostic(code(kongctl::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(kongctl::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } | CliError::Protection { .. } => {
                exit_codes::VALIDATION_ERROR
            }
            CliError::Partial { .. } => exit_codes::PARTIAL_EXECUTION,
            CliError::Io { .. } | CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        CliError::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        CliError::Other {
            message: message.into(),
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match &err {
            LoadError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
            _ => CliError::validation(err.to_string()),
        }
    }
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        match &err {
            PlanError::ProtectedResourceChange { .. }
            | PlanError::ProtectedResourceDeletion { .. } => CliError::Protection {
                message: err.to_string(),
            },
            PlanError::InvalidPlan(_) | PlanError::Serialization(_) => {
                CliError::validation(err.to_string())
            }
            _ => CliError::other(err.to_string()),
        }
    }
}

impl From<ExecuteError> for CliError {
    fn from(err: ExecuteError) -> Self {
        match &err {
            ExecuteError::DeletesNotAllowed { .. } => CliError::validation_with_help(
                err.to_string(),
                "use `kongctl sync` to execute plans that delete resources",
            ),
            ExecuteError::ApprovalRequired | ExecuteError::InvalidPlan(_) => {
                CliError::validation(err.to_string())
            }
            ExecuteError::ProtectionViolation { .. } | ExecuteError::UnresolvedRef { .. } => {
                CliError::Protection {
                    message: err.to_string(),
                }
            }
            ExecuteError::Partial { .. } => CliError::Partial {
                message: err.to_string(),
            },
            _ => CliError::other(err.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
