//! `kongctl diff` - human-readable rendering of a plan

use std::path::Path;

use tokio_util::sync::CancellationToken;

use kongctl_plan::{Plan, PlanOptions, Planner};

use super::{KonnectArgs, NamespaceArgs, PlanMode, SourceArgs};
use crate::display;
use crate::error::{CliError, Result};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    plan_file: Option<&Path>,
    sources: &SourceArgs,
    konnect: &KonnectArgs,
    namespaces: &NamespaceArgs,
    mode: PlanMode,
    cancel: CancellationToken,
) -> Result<()> {
    let plan = match plan_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Plan::from_json(&json).map_err(CliError::from)?
        }
        None => {
            let graph = sources.load()?;
            let client = konnect.client(cancel)?;
            let options = PlanOptions {
                mode: mode.into(),
                namespaces: namespaces.option(),
            };
            Planner::new(&client).plan(&graph, &options).await?
        }
    };

    print!("{}", display::render_plan(&plan));
    Ok(())
}
