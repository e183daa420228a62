//! Planner and executor error types

use thiserror::Error;

use kongctl_core::StoreError;
use kongctl_core::resource::ResourceKind;

use crate::report::Report;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot modify protected {kind} '{name}' in namespace '{namespace}'")]
    ProtectedResourceChange {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },

    #[error("cannot delete protected {kind} '{name}' in namespace '{namespace}'")]
    ProtectedResourceDeletion {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("failed to serialize plan: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("plan contains {count} delete(s); apply refuses deletes")]
    DeletesNotAllowed { count: usize },

    #[error("refusing to execute without approval; pass auto-approve or run a dry-run")]
    ApprovalRequired,

    #[error("protection violation: {kind} '{name}' is protected on the remote")]
    ProtectionViolation { kind: ResourceKind, name: String },

    #[error("change {change_id}: unresolved reference '{reference}'")]
    UnresolvedRef {
        change_id: String,
        reference: String,
    },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("{} of {} change(s) failed", .report.failure_count, .report.outcomes.len())]
    Partial { report: Box<Report> },

    #[error("execution cancelled after {} applied change(s)", .report.success_count)]
    Cancelled { report: Box<Report> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExecuteError {
    /// The partial report attached to composite failures, if any.
    pub fn report(&self) -> Option<&Report> {
        match self {
            ExecuteError::Partial { report } | ExecuteError::Cancelled { report } => Some(report),
            _ => None,
        }
    }
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
pub type ExecuteResult<T> = std::result::Result<T, ExecuteError>;
