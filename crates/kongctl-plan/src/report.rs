//! Execution report

use serde::{Deserialize, Serialize};

use kongctl_core::resource::ResourceKind;

use crate::change::{Action, ChangeState};
use crate::plan::Mode;

/// Outcome of one change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeOutcome {
    pub change_id: String,
    pub resource_type: ResourceKind,
    pub resource_ref: String,
    pub action: Action,
    pub state: ChangeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the executor did with a plan: per-change outcomes plus aggregate
/// counts. Returned even when execution was partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub mode: Mode,
    pub dry_run: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub outcomes: Vec<ChangeOutcome>,
    pub errors: Vec<String>,
}

impl Report {
    pub fn new(mode: Mode, dry_run: bool) -> Self {
        Report {
            mode,
            dry_run,
            success_count: 0,
            failure_count: 0,
            skipped_count: 0,
            outcomes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_applied(&mut self, mut outcome: ChangeOutcome) {
        outcome.state = ChangeState::Applied;
        self.success_count += 1;
        self.outcomes.push(outcome);
    }

    pub fn record_failed(&mut self, mut outcome: ChangeOutcome, error: String) {
        outcome.state = ChangeState::Failed;
        outcome.error = Some(error.clone());
        self.failure_count += 1;
        self.errors.push(error);
        self.outcomes.push(outcome);
    }

    pub fn record_skipped(&mut self, mut outcome: ChangeOutcome, reason: String) {
        outcome.state = ChangeState::Skipped;
        outcome.error = Some(reason);
        self.skipped_count += 1;
        self.outcomes.push(outcome);
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count == 0 && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str) -> ChangeOutcome {
        ChangeOutcome {
            change_id: id.to_string(),
            resource_type: ResourceKind::Portal,
            resource_ref: "dev".to_string(),
            action: Action::Create,
            state: ChangeState::Planned,
            remote_id: None,
            error: None,
        }
    }

    #[test]
    fn counts_track_outcomes() {
        let mut report = Report::new(Mode::Apply, false);
        report.record_applied(outcome("1:c:portal:dev"));
        report.record_failed(outcome("2:c:portal:dev2"), "boom".to_string());
        report.record_skipped(outcome("3:c:api:users"), "parent failed".to_string());

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.skipped_count, 1);
        assert!(!report.is_clean());
        assert_eq!(report.outcomes[1].state, ChangeState::Failed);
        assert_eq!(report.outcomes[2].state, ChangeState::Skipped);
    }
}
