//! `kongctl apply` - execute creates and updates, never deletes

use std::path::Path;

use tokio_util::sync::CancellationToken;

use kongctl_plan::Mode;

use super::{KonnectArgs, NamespaceArgs, SourceArgs, sync::execute_command};
use crate::error::Result;

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
        Mode::Apply,
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
