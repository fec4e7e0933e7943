//! `paddle run` and `paddle tasks`.

use super::{CliConfig, shutdown};
use crate::tasks::{ConsoleReporter, IncrementalCache, TaskExecutor, TaskStatus};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

/// Run tasks and their dependencies.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Tasks to run, in order
    #[arg(required = true, value_name = "TASK")]
    tasks: Vec<String>,
}

impl RunCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.open_project().await?;
        let registry = Arc::new(project.task_registry()?);
        let mut executor = TaskExecutor::new(
            registry,
            IncrementalCache::open(project.incremental_state_path()),
            Arc::new(ConsoleReporter::new(config.quiet)),
        );

        let results = executor.execute_all(&self.tasks).await;
        shutdown(&project).await;

        let mut failed = Vec::new();
        for (id, result) in &results {
            match result {
                Ok(status) if !config.quiet => {
                    let note = match status {
                        TaskStatus::UpToDate => " (up to date)",
                        TaskStatus::Done => "",
                    };
                    println!("{} {}{}", "✓".green(), id, note);
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), id, e);
                    failed.push(id.as_str());
                }
            }
        }

        if !failed.is_empty() {
            bail!("{} of {} tasks failed: {}", failed.len(), results.len(), failed.join(", "));
        }
        if !config.quiet {
            println!("{}", "BUILD SUCCESSFUL".green().bold());
        }
        Ok(())
    }
}

/// List the project's tasks.
#[derive(Args, Debug)]
pub struct TasksCommand {}

impl TasksCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.open_project().await?;
        let registry = project.task_registry()?;

        let order = match registry.graph().topological_order() {
            Ok(order) => order,
            Err(e) => {
                warn!("{}", e);
                registry.tasks().iter().map(|t| t.id().to_string()).collect()
            }
        };

        for id in order {
            let Some(task) = registry.get(&id) else {
                println!("{} {}", id.yellow(), "(not defined)".dimmed());
                continue;
            };
            match task.description() {
                Some(description) => println!("{} - {}", id.bold(), description),
                None => println!("{}", id.bold()),
            }
            if !task.dependencies().is_empty() {
                println!("    depends on: {}", task.dependencies().join(", "));
            }
        }
        Ok(())
    }
}
