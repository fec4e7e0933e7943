//! Tasks: named units of work with dependencies and incremental inputs.
//!
//! A [`Task`] couples an id with an asynchronous [`TaskAction`], the ids of
//! the tasks that must run before it, and optional inputs and outputs. Inputs
//! and outputs are [`Hashable`] values; a task declaring any of them is
//! *incremental* and is skipped when their digests match the last successful
//! run (see [`incremental`]).
//!
//! Tasks are registered once, when the project is loaded, in a
//! [`TaskRegistry`]. The [`executor::TaskExecutor`] then runs requested tasks
//! and their transitive dependencies, each at most once per run.
//!
//! # Module Organization
//!
//! - [`graph`] - dependency graph, cycle detection and execution order
//! - [`incremental`] - persisted digests of the last successful runs
//! - [`executor`] - runs a task and its dependencies
//! - [`reporter`] - task lifecycle events and the console reporter
//!
//! # Example
//!
//! ```rust
//! use paddle_cli::tasks::{Task, TaskFailure, TaskRegistry, action_fn};
//!
//! let mut registry = TaskRegistry::new();
//! registry.register(Task::new("compile", action_fn(|| async { Ok(()) })))?;
//! registry.register(
//!     Task::new("test", action_fn(|| async { Err(TaskFailure::new("1 test failed")) }))
//!         .depends_on("compile"),
//! )?;
//! assert_eq!(registry.get("test").unwrap().dependencies(), ["compile"]);
//! # Ok::<(), paddle_cli::core::PaddleError>(())
//! ```

pub mod executor;
pub mod graph;
pub mod incremental;
pub mod reporter;

pub use executor::{TaskExecutor, TaskStatus};
pub use graph::TaskGraph;
pub use incremental::IncrementalCache;
pub use reporter::{ConsoleReporter, TaskEvent, TaskReporter};

use crate::core::PaddleError;
use crate::hash::Hashable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a task action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct TaskFailure {
    /// Human readable reason
    pub reason: String,
}

impl TaskFailure {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<PaddleError> for TaskFailure {
    fn from(error: PaddleError) -> Self {
        Self::new(error.to_string())
    }
}

impl From<anyhow::Error> for TaskFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{error:#}"))
    }
}

/// The work a task performs.
#[async_trait]
pub trait TaskAction: Send + Sync {
    /// Runs the action once.
    async fn act(&self) -> Result<(), TaskFailure>;
}

/// A [`TaskAction`] backed by a closure returning a future.
pub struct FnAction<F> {
    run: F,
}

#[async_trait]
impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskFailure>> + Send,
{
    async fn act(&self) -> Result<(), TaskFailure> {
        (self.run)().await
    }
}

/// Wraps a closure as a shareable [`TaskAction`].
pub fn action_fn<F, Fut>(run: F) -> Arc<dyn TaskAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
{
    Arc::new(FnAction {
        run,
    })
}

/// A named unit of work.
#[derive(Clone)]
pub struct Task {
    id: String,
    description: Option<String>,
    dependencies: Vec<String>,
    inputs: Vec<Arc<dyn Hashable>>,
    outputs: Vec<Arc<dyn Hashable>>,
    action: Arc<dyn TaskAction>,
}

impl Task {
    /// Creates a task with no dependencies, inputs or outputs.
    pub fn new(id: impl Into<String>, action: Arc<dyn TaskAction>) -> Self {
        Self {
            id: id.into(),
            description: None,
            dependencies: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            action,
        }
    }

    /// Sets the description shown in task listings.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a dependency; dependencies run in the order they are added.
    #[must_use]
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Adds an input.
    #[must_use]
    pub fn with_input(mut self, input: Arc<dyn Hashable>) -> Self {
        self.inputs.push(input);
        self
    }

    /// Adds an output.
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn Hashable>) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn inputs(&self) -> &[Arc<dyn Hashable>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<dyn Hashable>] {
        &self.outputs
    }

    /// Whether the task can be skipped based on its inputs and outputs.
    pub fn is_incremental(&self) -> bool {
        !self.inputs.is_empty() || !self.outputs.is_empty()
    }

    pub(crate) fn action(&self) -> &Arc<dyn TaskAction> {
        &self.action
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish_non_exhaustive()
    }
}

/// All tasks of a project, in registration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Arc<Task>>,
    by_id: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::ConfigError`] if a task with the same id exists.
    pub fn register(&mut self, task: Task) -> Result<(), PaddleError> {
        if self.by_id.contains_key(task.id()) {
            return Err(PaddleError::ConfigError {
                message: format!("task '{}' is defined more than once", task.id()),
            });
        }
        self.by_id.insert(task.id().to_string(), self.tasks.len());
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Task>> {
        self.by_id.get(id).map(|&index| &self.tasks[index])
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The dependency graph of every registered task.
    pub fn graph(&self) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for task in &self.tasks {
            graph.add_task(task.id());
            for dependency in task.dependencies() {
                graph.add_dependency(task.id(), dependency);
            }
        }
        graph
    }
}
