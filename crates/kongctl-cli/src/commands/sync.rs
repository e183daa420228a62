//! `kongctl sync` - full reconciliation, including deletes
//!
//! Also hosts the shared execute pipeline `apply` delegates to; the two
//! commands differ only in mode, and the executor enforces that apply-mode
//! plans carry no deletes.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use kongctl_plan::{ExecuteOptions, Executor, Mode, Plan, PlanOptions, Planner};

use super::{KonnectArgs, NamespaceArgs, SourceArgs};
use crate::display;
use crate::error::{CliError, Result};
use crate::util;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    plan_file: Option<&Path>,
    sources: &SourceArgs,
    konnect: &KonnectArgs,
    namespaces: &NamespaceArgs,
    dry_run: bool,
    auto_approve: bool,
    cancel: CancellationToken,
) -> Result<()> {
    execute_command(
        Mode::Sync,
        plan_file,
        sources,
        konnect,
        namespaces,
        dry_run,
        auto_approve,
        cancel,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn execute_command(
    mode: Mode,
    plan_file: Option<&Path>,
    sources: &SourceArgs,
    konnect: &KonnectArgs,
    namespaces: &NamespaceArgs,
    dry_run: bool,
    auto_approve: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let client = konnect.client(cancel.clone())?;

    let plan = match plan_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Plan::from_json(&json).map_err(CliError::from)?
        }
        None => {
            let graph = sources.load()?;
            let options = PlanOptions {
                mode,
                namespaces: namespaces.option(),
            };
            Planner::new(&client).plan(&graph, &options).await?
        }
    };

    if plan.is_empty() {
        println!("No changes. Desired state matches the remote.");
        return Ok(());
    }

    print!("{}", display::render_plan(&plan));

    let approved = auto_approve
        || dry_run
        || util::confirm(&format!("Execute {} change(s)?", plan.changes.len()))?;
    if !approved {
        return Err(CliError::other("aborted, no changes applied"));
    }

    let executor = Executor::new(&client, cancel);
    let options = ExecuteOptions {
        mode,
        dry_run,
        auto_approve: approved,
    };
    match executor.execute(&plan, &options).await {
        Ok(report) => {
            print!("{}", display::render_report(&report));
            Ok(())
        }
        Err(err) => {
            if let Some(report) = err.report() {
                print!("{}", display::render_report(report));
            }
            Err(err.into())
        }
    }
}
