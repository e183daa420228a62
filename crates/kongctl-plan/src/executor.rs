//! Plan execution
//!
//! Walks the execution order serially, resolving `ref:` placeholders against
//! the running id map, injecting managed labels, and recording per-change
//! outcomes. A failed create blocks every descendant that references it;
//! unrelated changes continue. Nothing is rolled back - the remote API is
//! non-transactional - so a cancelled or partially failed run still returns
//! the partial report.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::{Map as JsonMap, Value as JsonValue, json};
use tokio_util::sync::CancellationToken;

use kongctl_core::labels::{
    NAMESPACE_KEY, PROTECTED_KEY, build_create_labels, build_update_labels, user_labels,
};
use kongctl_core::namespace::NamespaceFilter;
use kongctl_core::resource::ResourceKind;
use kongctl_core::{RemoteResource, RemoteStore, StoreError};

use crate::change::{Action, ChangeState, PlannedChange, Protection};
use crate::error::{ExecuteError, ExecuteResult};
use crate::kinds;
use crate::plan::{Mode, Plan};
use crate::report::{ChangeOutcome, Report};

#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// The containing command. Apply refuses plans that carry deletes, even
    /// ones generated in sync mode.
    pub mode: Mode,
    pub dry_run: bool,
    pub auto_approve: bool,
}

pub struct Executor<'a> {
    store: &'a dyn RemoteStore,
    cancel: CancellationToken,
}

type SnapshotKey = (ResourceKind, Option<String>, String);

impl<'a> Executor<'a> {
    pub fn new(store: &'a dyn RemoteStore, cancel: CancellationToken) -> Self {
        Self { store, cancel }
    }

    pub async fn execute(&self, plan: &Plan, options: &ExecuteOptions) -> ExecuteResult<Report> {
        plan.validate()
            .map_err(|e| ExecuteError::InvalidPlan(e.to_string()))?;

        if options.mode == Mode::Apply && plan.contains_deletes() {
            return Err(ExecuteError::DeletesNotAllowed {
                count: plan.delete_count(),
            });
        }
        if !options.dry_run && !options.auto_approve {
            return Err(ExecuteError::ApprovalRequired);
        }

        // The plan may be stale; re-read the protection state of every
        // mutation target before touching anything.
        let snapshot = self.snapshot_mutation_targets(plan).await?;
        verify_protection(plan, &snapshot)?;

        let mut report = Report::new(options.mode, options.dry_run);
        let mut id_map: HashMap<(ResourceKind, String), String> = HashMap::new();
        let mut blocked: HashSet<(ResourceKind, String)> = HashSet::new();
        let mut synthetic = 0usize;

        for change_id in &plan.execution_order {
            if self.cancel.is_cancelled() {
                return Err(ExecuteError::Cancelled {
                    report: Box::new(report),
                });
            }

            let change = plan
                .change(change_id)
                .expect("validated plan has every ordered change");
            let outcome = outcome_of(change);

            let dependencies = kinds::placeholder_targets(change.resource_type, &change.fields);
            if let Some((kind, r#ref)) = dependencies.iter().find(|d| blocked.contains(*d)) {
                if change.action == Action::Create {
                    blocked.insert((change.resource_type, change.resource_ref.clone()));
                }
                report.record_skipped(
                    outcome,
                    format!("dependency {} '{}' was not created", kind, r#ref),
                );
                continue;
            }

            match self
                .apply_change(change, options, &id_map, &snapshot, &mut synthetic)
                .await
            {
                Ok(remote_id) => {
                    let mut outcome = outcome;
                    outcome.remote_id = remote_id.clone();
                    if change.action == Action::Create
                        && let Some(id) = remote_id
                    {
                        id_map.insert((change.resource_type, change.resource_ref.clone()), id);
                    }
                    report.record_applied(outcome);
                }
                Err(ApplyError::Cancelled) => {
                    return Err(ExecuteError::Cancelled {
                        report: Box::new(report),
                    });
                }
                Err(ApplyError::Fatal(error)) => return Err(error),
                Err(ApplyError::Change(error)) => {
                    if change.action == Action::Create {
                        blocked.insert((change.resource_type, change.resource_ref.clone()));
                    }
                    report.record_failed(outcome, error.to_string());
                }
            }
        }

        if report.failure_count > 0 {
            return Err(ExecuteError::Partial {
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Current remote state of every update/delete target, keyed by
    /// (kind, parent, id).
    async fn snapshot_mutation_targets(
        &self,
        plan: &Plan,
    ) -> ExecuteResult<HashMap<SnapshotKey, RemoteResource>> {
        let mut scopes: HashSet<(ResourceKind, Option<String>)> = HashSet::new();
        for change in &plan.changes {
            if change.action != Action::Create {
                scopes.insert((change.resource_type, parent_of(change)));
            }
        }

        let mut snapshot = HashMap::new();
        for (kind, parent) in scopes {
            let resources = self
                .store
                .list_managed(kind, parent.as_deref(), &NamespaceFilter::All)
                .await?;
            for resource in resources {
                snapshot.insert((kind, parent.clone(), resource.id.clone()), resource);
            }
        }
        Ok(snapshot)
    }

    async fn apply_change(
        &self,
        change: &PlannedChange,
        options: &ExecuteOptions,
        id_map: &HashMap<(ResourceKind, String), String>,
        snapshot: &HashMap<SnapshotKey, RemoteResource>,
        synthetic: &mut usize,
    ) -> Result<Option<String>, ApplyError> {
        let kind = change.resource_type;
        let lookup =
            |kind: ResourceKind, r#ref: &str| id_map.get(&(kind, r#ref.to_string())).cloned();

        match change.action {
            Action::Create => {
                let mut fields = change.fields.clone();
                kinds::resolve_refs(kind, &mut fields, &lookup).map_err(|reference| {
                    ApplyError::Fatal(ExecuteError::UnresolvedRef {
                        change_id: change.id.clone(),
                        reference,
                    })
                })?;

                let parent = extract_parent(kind, &mut fields);
                let user = take_labels(&mut fields);
                fields.insert(
                    "labels".to_string(),
                    json!(build_create_labels(
                        &user,
                        &change.namespace,
                        change.desired_protection()
                    )),
                );

                if options.dry_run {
                    *synthetic += 1;
                    return Ok(Some(format!("dry-run-{synthetic}")));
                }
                let created = self
                    .store
                    .create(kind, parent.as_deref(), &fields)
                    .await
                    .map_err(ApplyError::from_store)?;
                Ok(Some(created.id))
            }

            Action::Update => {
                let id = change
                    .resource_id
                    .clone()
                    .ok_or_else(|| invalid(change, "update without resource_id"))?;
                let mut fields = change.fields.clone();
                let parent = extract_parent(kind, &mut fields);
                let label_diff = fields.remove("labels");

                // Each remaining field is an {old, new} pair; send the new side.
                let mut body: JsonMap<String, JsonValue> = fields
                    .into_iter()
                    .map(|(field, diff)| {
                        let new = diff.get("new").cloned().unwrap_or(diff);
                        (field, new)
                    })
                    .collect();
                kinds::resolve_refs(kind, &mut body, &lookup).map_err(|reference| {
                    ApplyError::Fatal(ExecuteError::UnresolvedRef {
                        change_id: change.id.clone(),
                        reference,
                    })
                })?;

                let current_labels = snapshot
                    .get(&(kind, parent.clone(), id.clone()))
                    .map(|r| r.labels.clone())
                    .unwrap_or_else(|| reconstruct_labels(change, label_diff.as_ref()));
                let desired_user = label_diff
                    .as_ref()
                    .and_then(|diff| diff.get("new"))
                    .and_then(JsonValue::as_object)
                    .map(|map| {
                        map.iter()
                            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                            .collect::<BTreeMap<_, _>>()
                    })
                    .unwrap_or_else(|| user_labels(&current_labels));

                let patch = build_update_labels(
                    &desired_user,
                    &current_labels,
                    &change.namespace,
                    change.protection.and_then(Protection::transition),
                );
                body.insert(
                    "labels".to_string(),
                    serde_json::to_value(patch).expect("label patch serializes"),
                );

                if options.dry_run {
                    return Ok(Some(id));
                }
                let updated = self
                    .store
                    .update(kind, parent.as_deref(), &id, &body)
                    .await
                    .map_err(ApplyError::from_store)?;
                Ok(Some(updated.id))
            }

            Action::Delete => {
                let id = change
                    .resource_id
                    .clone()
                    .ok_or_else(|| invalid(change, "delete without resource_id"))?;
                let mut fields = change.fields.clone();
                let parent = extract_parent(kind, &mut fields);

                if options.dry_run {
                    return Ok(Some(id));
                }
                self.store
                    .delete(kind, parent.as_deref(), &id)
                    .await
                    .map_err(ApplyError::from_store)?;
                Ok(Some(id))
            }
        }
    }
}

enum ApplyError {
    /// Per-change failure; the loop continues.
    Change(StoreError),
    /// Aborts the loop with the partial report.
    Cancelled,
    /// Aborts the loop outright.
    Fatal(ExecuteError),
}

impl ApplyError {
    fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::Cancelled => ApplyError::Cancelled,
            other => ApplyError::Change(other),
        }
    }
}

fn invalid(change: &PlannedChange, message: &str) -> ApplyError {
    ApplyError::Fatal(ExecuteError::InvalidPlan(format!(
        "change {}: {message}",
        change.id
    )))
}

fn outcome_of(change: &PlannedChange) -> ChangeOutcome {
    ChangeOutcome {
        change_id: change.id.clone(),
        resource_type: change.resource_type,
        resource_ref: change.resource_ref.clone(),
        action: change.action,
        state: ChangeState::Planned,
        remote_id: None,
        error: None,
    }
}

fn parent_of(change: &PlannedChange) -> Option<String> {
    change
        .fields
        .get("api_id")
        .and_then(JsonValue::as_str)
        .map(String::from)
}

fn extract_parent(
    kind: ResourceKind,
    fields: &mut JsonMap<String, JsonValue>,
) -> Option<String> {
    if !kind.is_api_child() {
        return None;
    }
    fields
        .remove("api_id")
        .and_then(|v| v.as_str().map(String::from))
}

fn take_labels(fields: &mut JsonMap<String, JsonValue>) -> BTreeMap<String, String> {
    fields
        .remove("labels")
        .and_then(|v| {
            v.as_object().map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
        })
        .unwrap_or_default()
}

/// Fallback label reconstruction for targets missing from the snapshot
/// (freshly adopted legacy resources): the planned old user labels plus the
/// system labels implied by the change itself.
fn reconstruct_labels(
    change: &PlannedChange,
    label_diff: Option<&JsonValue>,
) -> BTreeMap<String, String> {
    let mut labels: BTreeMap<String, String> = label_diff
        .and_then(|diff| diff.get("old"))
        .and_then(JsonValue::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();
    labels.insert(NAMESPACE_KEY.to_string(), change.namespace.clone());
    if change
        .protection
        .and_then(Protection::transition)
        .is_some_and(|t| t.old)
    {
        labels.insert(PROTECTED_KEY.to_string(), "true".to_string());
    }
    labels
}

/// The stale-plan gate: a mutation of a resource that is protected on the
/// remote right now is fatal unless the change only lifts protection.
fn verify_protection(
    plan: &Plan,
    snapshot: &HashMap<SnapshotKey, RemoteResource>,
) -> ExecuteResult<()> {
    for change in &plan.changes {
        if change.action == Action::Create {
            continue;
        }
        let Some(id) = &change.resource_id else {
            continue;
        };
        let key = (change.resource_type, parent_of(change), id.clone());
        let Some(remote) = snapshot.get(&key) else {
            continue;
        };
        if !remote.is_protected() {
            continue;
        }
        let unprotect_only = change.action == Action::Update
            && change
                .protection
                .and_then(Protection::transition)
                .is_some_and(|t| t.is_unprotect())
            && change.fields.keys().all(|k| k == "api_id");
        if !unprotect_only {
            return Err(ExecuteError::ProtectionViolation {
                kind: change.resource_type,
                name: remote.name.clone(),
            });
        }
    }
    Ok(())
}
