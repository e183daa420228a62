//! kongctl - declarative configuration for Kong Konnect

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use commands::{KonnectArgs, NamespaceArgs, PlanMode, SourceArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "kongctl")]
#[command(version)]
#[command(about = "Declarative configuration for Kong Konnect", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate sources without touching the network
    Validate {
        #[command(flatten)]
        sources: SourceArgs,

        /// Emit a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate an execution plan against the remote state
    Plan {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        konnect: KonnectArgs,

        #[command(flatten)]
        namespaces: NamespaceArgs,

        /// Plan mode; sync additionally plans deletes
        #[arg(long, value_enum, default_value = "sync")]
        mode: PlanMode,

        /// Write the plan to a file instead of stdout
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show a plan in human-readable form
    Diff {
        /// Read a previously generated plan file instead of planning
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        konnect: KonnectArgs,

        #[command(flatten)]
        namespaces: NamespaceArgs,

        /// Plan mode; sync additionally plans deletes
        #[arg(long, value_enum, default_value = "sync")]
        mode: PlanMode,
    },

    /// Create and update resources; never deletes
    Apply {
        /// Execute a previously generated plan file
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        konnect: KonnectArgs,

        #[command(flatten)]
        namespaces: NamespaceArgs,

        /// Show what would happen without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the interactive confirmation
        #[arg(long)]
        auto_approve: bool,
    },

    /// Full reconciliation: create, update, and delete managed resources
    Sync {
        /// Execute a previously generated plan file
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        konnect: KonnectArgs,

        #[command(flatten)]
        namespaces: NamespaceArgs,

        /// Show what would happen without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the interactive confirmation
        #[arg(long)]
        auto_approve: bool,
    },
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "kongctl=debug" } else { "kongctl=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Ctrl-C cancels the in-flight remote call and stops the executor loop
    // at its next scheduling point; applied changes stay applied.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if let Err(err) = run(cli, cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    match cli.command {
        Commands::Validate { sources, json } => commands::validate::run(&sources, json),

        Commands::Plan {
            sources,
            konnect,
            namespaces,
            mode,
            output,
        } => {
            commands::plan::run(
                &sources,
                &konnect,
                &namespaces,
                mode,
                output.as_deref(),
                cancel,
            )
            .await
        }

        Commands::Diff {
            plan,
            sources,
            konnect,
            namespaces,
            mode,
        } => {
            commands::diff::run(
                plan.as_deref(),
                &sources,
                &konnect,
                &namespaces,
                mode,
                cancel,
            )
            .await
        }

        Commands::Apply {
            plan,
            sources,
            konnect,
            namespaces,
            dry_run,
            auto_approve,
        } => {
            commands::apply::run(
                plan.as_deref(),
                &sources,
                &konnect,
                &namespaces,
                dry_run,
                auto_approve,
                cancel,
            )
            .await
        }

        Commands::Sync {
            plan,
            sources,
            konnect,
            namespaces,
            dry_run,
            auto_approve,
        } => {
            commands::sync::run(
                plan.as_deref(),
                &sources,
                &konnect,
                &namespaces,
                dry_run,
                auto_approve,
                cancel,
            )
            .await
        }
    }
}
