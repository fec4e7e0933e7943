//! Command-line interface for Paddle.
//!
//! # Available Commands
//!
//! - `run <TASK>...` - execute tasks and their dependencies
//! - `tasks` - list the project's tasks
//! - `index-args` - print the package installer arguments for the repositories
//! - `search <PREFIX>` - find packages across the repositories
//!
//! # Global Options
//!
//! | Option              | Effect                                              |
//! |---------------------|-----------------------------------------------------|
//! | `-v`, `--verbose`   | debug logging                                       |
//! | `-q`, `--quiet`     | errors only, no task progress                       |
//! | `--project-dir DIR` | search `paddle.toml` from `DIR` instead of the cwd  |
//! | `--refresh-index`   | re-fetch repository indexes instead of their caches |
//!
//! ```bash
//! paddle run resolveRequirements test
//! paddle --refresh-index search req
//! paddle index-args | xargs pip install -r requirements.txt
//! ```

mod index;
mod run;

use crate::config::{GlobalConfig, get_index_dir};
use crate::project::{Project, ProjectSettings};
use crate::repository::HttpIndexClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps `RUST_LOG` (or `warn`)
    pub log_level: Option<String>,
    /// Suppress task progress output
    pub quiet: bool,
    /// Directory to search the project file from
    pub project_dir: Option<PathBuf>,
    /// Re-fetch repository indexes
    pub refresh_index: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the global `tracing` subscriber.
    ///
    /// Only the first call in a process has an effect.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Loads the project with the HTTP index client and the user's cache.
    pub(crate) async fn open_project(&self) -> Result<Arc<Project>> {
        let start = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Cannot determine current directory")?,
        };
        let global = GlobalConfig::load().await?;
        let settings = ProjectSettings::new(get_index_dir()?).with_refresh(self.refresh_index);
        let client = Arc::new(HttpIndexClient::new()?);
        Ok(Project::open(&start, global, client, settings)?)
    }
}

/// Stops background work of `project`, logging instead of failing.
pub(crate) async fn shutdown(project: &Project) {
    if let Err(e) = project.shutdown().await {
        warn!("Failed to persist repository indexes: {}", e);
    }
}

/// Paddle - incremental tasks and package repositories for Python projects.
#[derive(Parser, Debug)]
#[command(
    name = "paddle",
    about = "Incremental build tasks and package repositories for Python projects",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory to look for paddle.toml in (and its parents)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Re-fetch repository indexes instead of using the cached copies
    #[arg(long, global = true)]
    refresh_index: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run tasks and their dependencies
    Run(run::RunCommand),

    /// List the project's tasks
    Tasks(run::TasksCommand),

    /// Print package installer arguments for the configured repositories
    IndexArgs(index::IndexArgsCommand),

    /// Search packages by name prefix across repositories
    Search(index::SearchCommand),
}

impl Cli {
    /// Builds the [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            project_dir: self.project_dir.clone(),
            refresh_index: self.refresh_index,
        }
    }

    /// Initializes logging and runs the selected command.
    ///
    /// # Errors
    ///
    /// Any error of the command; failed tasks are reported as one error after
    /// every requested task has been attempted.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Runs the selected command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute(&config).await,
            Commands::Tasks(cmd) => cmd.execute(&config).await,
            Commands::IndexArgs(cmd) => cmd.execute(&config).await,
            Commands::Search(cmd) => cmd.execute(&config).await,
        }
    }
}
