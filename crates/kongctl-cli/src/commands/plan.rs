//! `kongctl plan` - generate a plan and write it out

use std::path::Path;

use tokio_util::sync::CancellationToken;

use kongctl_plan::{PlanOptions, Planner};

use super::{KonnectArgs, NamespaceArgs, PlanMode, SourceArgs};
use crate::display;
use crate::error::Result;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    sources: &SourceArgs,
    konnect: &KonnectArgs,
    namespaces: &NamespaceArgs,
    mode: PlanMode,
    output: Option<&Path>,
    cancel: CancellationToken,
) -> Result<()> {
    let graph = sources.load()?;
    let client = konnect.client(cancel)?;

    let options = PlanOptions {
        mode: mode.into(),
        namespaces: namespaces.option(),
    };
    let plan = Planner::new(&client).plan(&graph, &options).await?;
    let json = plan.to_json().map_err(crate::error::CliError::from)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Wrote plan to {}: {}", path.display(), display::summary(&plan));
        }
        None => println!("{json}"),
    }
    Ok(())
}
