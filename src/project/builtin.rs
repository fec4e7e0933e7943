//! Tasks every project has, and command tasks declared in `paddle.toml`.
//!
//! | Task                  | Depends on            | Inputs                                  |
//! |-----------------------|-----------------------|-----------------------------------------|
//! | `resolveRepositories` |                       | repository declarations                 |
//! | `resolveRequirements` | `resolveRepositories` | requirements, repositories, environment |
//!
//! Built-in actions hold the project through a [`Weak`] reference, so the
//! registry does not keep the project alive.

use super::Project;
use crate::config::TaskConfig;
use crate::core::PaddleError;
use crate::hash::{FileInput, Hashable, Serialized};
use crate::repository::RepositoryDescriptor;
use crate::tasks::{Task, TaskFailure, TaskRegistry, action_fn};
use std::sync::{Arc, Weak};
use tokio::process::Command;
use tracing::{debug, info};

/// Resolves the repository set and loads its indexes.
pub const RESOLVE_REPOSITORIES: &str = "resolveRepositories";

/// Resolves every project requirement to a distribution.
pub const RESOLVE_REQUIREMENTS: &str = "resolveRequirements";

fn upgrade(project: &Weak<Project>) -> Result<Arc<Project>, TaskFailure> {
    project.upgrade().ok_or_else(|| TaskFailure::new("project is no longer loaded"))
}

/// Repository declarations of both configuration layers.
fn repository_input(project: &Project) -> Arc<dyn Hashable> {
    let declared: (Vec<RepositoryDescriptor>, Vec<RepositoryDescriptor>) = (
        project.config().repositories.clone(),
        project.global_config().repositories.clone(),
    );
    Arc::new(Serialized(declared))
}

/// Registers `resolveRepositories` and `resolveRequirements`.
///
/// # Errors
///
/// Only fails if the ids are already taken in `registry`.
pub fn register_builtin_tasks(
    project: &Arc<Project>,
    registry: &mut TaskRegistry,
) -> Result<(), PaddleError> {
    let weak = Arc::downgrade(project);
    let resolve_repositories = action_fn(move || {
        let project = weak.clone();
        async move {
            let project = upgrade(&project)?;
            let repositories = project.repositories().await?;
            for repository in repositories.all() {
                let role = if repository.url() == repositories.primary().url() {
                    "primary"
                } else {
                    "extra"
                };
                info!("Repository {} ({}) at {}", repository.name(), role, repository.url());
            }
            Ok(())
        }
    });
    registry.register(
        Task::new(RESOLVE_REPOSITORIES, resolve_repositories)
            .with_description("Resolves the configured package repositories")
            .with_input(repository_input(project)),
    )?;

    let weak = Arc::downgrade(project);
    let resolve_requirements = action_fn(move || {
        let project = weak.clone();
        async move {
            let project = upgrade(&project)?;
            let resolution = project.resolve_requirements().await?;
            for distribution in &resolution.resolved {
                println!("  {distribution}");
            }
            if resolution.is_complete() {
                Ok(())
            } else {
                let names: Vec<String> =
                    resolution.unresolved.iter().map(ToString::to_string).collect();
                Err(TaskFailure::new(format!(
                    "Could not resolve requirements: {}",
                    names.join(", ")
                )))
            }
        }
    });
    let config = project.config();
    registry.register(
        Task::new(RESOLVE_REQUIREMENTS, resolve_requirements)
            .with_description("Resolves project requirements against the repositories")
            .depends_on(RESOLVE_REPOSITORIES)
            .with_input(Arc::new(Serialized(config.requirements.clone())))
            .with_input(repository_input(project))
            .with_input(Arc::new(Serialized(config.environment.clone()))),
    )?;
    Ok(())
}

/// Builds a task running `config.command` in the project root.
///
/// Declared inputs and outputs are paths relative to the project root.
pub fn command_task(project: &Arc<Project>, id: &str, config: &TaskConfig) -> Task {
    let root = project.root().to_path_buf();
    let command = config.command.clone();
    let task_id = id.to_string();

    let action = action_fn(move || {
        let root = root.clone();
        let command = command.clone();
        let task_id = task_id.clone();
        async move {
            let (program, args) = command
                .split_first()
                .ok_or_else(|| TaskFailure::new("command is empty"))?;
            debug!("Task {} runs {:?} in {}", task_id, command, root.display());

            let status = Command::new(program)
                .args(args)
                .current_dir(&root)
                .status()
                .await
                .map_err(|e| TaskFailure::new(format!("Failed to start '{program}': {e}")))?;

            if status.success() {
                Ok(())
            } else {
                Err(TaskFailure::new(match status.code() {
                    Some(code) => format!("'{program}' exited with status {code}"),
                    None => format!("'{program}' was terminated by a signal"),
                }))
            }
        }
    });

    let mut task = Task::new(id, action);
    if let Some(description) = &config.description {
        task = task.with_description(description.clone());
    }
    for dependency in &config.depends_on {
        task = task.depends_on(dependency.clone());
    }
    for input in &config.inputs {
        task = task.with_input(Arc::new(FileInput::new(project.root().join(input))));
    }
    for output in &config.outputs {
        task = task.with_output(Arc::new(FileInput::new(project.root().join(output))));
    }
    task
}
