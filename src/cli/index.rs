//! `paddle index-args` and `paddle search`.

use super::{CliConfig, shutdown};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Print package installer arguments, one token per line.
///
/// The primary repository becomes `--index-url`, every other repository an
/// `--extra-index-url`.
#[derive(Args, Debug)]
pub struct IndexArgsCommand {}

impl IndexArgsCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.open_project().await?;
        let repositories = project.repositories().await;
        let args = repositories.map(|repositories| repositories.installer_args());
        shutdown(&project).await;

        for arg in args? {
            println!("{arg}");
        }
        Ok(())
    }
}

/// Search packages by name prefix across repositories.
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Case-insensitive package name prefix
    prefix: String,
}

impl SearchCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.open_project().await?;
        let found = match project.repositories().await {
            Ok(repositories) => Ok(repositories.find_packages_by_prefix(&self.prefix).await),
            Err(e) => Err(e),
        };
        shutdown(&project).await;

        let found = found?;
        if found.is_empty() && !config.quiet {
            println!("No packages start with '{}'", self.prefix);
        }
        for (name, repository) in found {
            println!("{} {}", name.bold(), format!("({})", repository.name()).dimmed());
        }
        Ok(())
    }
}
