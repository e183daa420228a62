//! Command implementations and shared argument groups

pub mod apply;
pub mod diff;
pub mod plan;
pub mod sync;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;

use kongctl_core::graph::ResourceGraph;
use kongctl_konnect::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, KonnectClient, KonnectConfig};
use kongctl_loader::{Loader, Source};
use kongctl_plan::Mode;

use crate::error::{CliError, Result};

/// Desired-state sources shared by every command that loads configuration.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Source file or directory; repeatable, merged in order
    #[arg(short = 'f', long = "filename", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Recurse into subdirectories of directory sources
    #[arg(short = 'R', long)]
    pub recursive: bool,
}

impl SourceArgs {
    pub fn load(&self) -> Result<ResourceGraph> {
        if self.files.is_empty() {
            return Err(CliError::validation_with_help(
                "no sources given",
                "pass one or more -f <file-or-directory>",
            ));
        }
        let mut loader = Loader::new();
        for file in &self.files {
            loader.add_source(if self.recursive {
                Source::recursive(file)
            } else {
                Source::new(file)
            });
        }
        Ok(loader.load()?)
    }
}

/// Konnect connection settings.
#[derive(Debug, Args)]
pub struct KonnectArgs {
    /// Personal access token for the Konnect API
    #[arg(long, env = "KONNECT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Konnect API base URL
    #[arg(long, env = "KONNECT_ADDR", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Page size for list requests
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
}

impl KonnectArgs {
    pub fn client(&self, cancel: CancellationToken) -> Result<KonnectClient> {
        let token = self.token.clone().ok_or_else(|| {
            CliError::validation_with_help(
                "no Konnect token configured",
                "set KONNECT_TOKEN or pass --token",
            )
        })?;
        Ok(KonnectClient::new(
            KonnectConfig {
                base_url: self.base_url.clone(),
                token,
                page_size: self.page_size,
            },
            cancel,
        )?)
    }
}

/// Plan generation mode exposed on `plan` and `diff`; `apply` and `sync`
/// imply their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanMode {
    Apply,
    Sync,
}

impl From<PlanMode> for Mode {
    fn from(mode: PlanMode) -> Mode {
        match mode {
            PlanMode::Apply => Mode::Apply,
            PlanMode::Sync => Mode::Sync,
        }
    }
}

/// Namespaces to target; empty means every namespace present in the sources.
#[derive(Debug, Args)]
pub struct NamespaceArgs {
    #[arg(short = 'n', long = "namespace", value_name = "NAMESPACE")]
    pub namespaces: Vec<String>,
}

impl NamespaceArgs {
    pub fn option(&self) -> Option<Vec<String>> {
        (!self.namespaces.is_empty()).then(|| self.namespaces.clone())
    }
}
