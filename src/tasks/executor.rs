//! Runs tasks and their dependencies.
//!
//! Executing a task first computes its execution order (dependencies first,
//! in declared order) and then walks it sequentially:
//!
//! 1. A task already finished in this run is skipped; one that already failed
//!    fails the request again without re-running.
//! 2. An incremental task whose inputs and outputs match the last successful
//!    run is reported `UP-TO-DATE` and skipped.
//! 3. Otherwise the action runs. On success the new digests are recorded
//!    (outputs are re-hashed after the action, since the action produced them).
//! 4. The first failure stops the walk: dependents of a failed task never run.
//!
//! State is kept per executor, so one executor corresponds to one run of the
//! tool.

use super::incremental::IncrementalCache;
use super::reporter::{TaskEvent, TaskReporter};
use super::{Task, TaskGraph, TaskRegistry};
use crate::core::PaddleError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Successful outcome of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Skipped because inputs and outputs were unchanged
    UpToDate,
    /// The action ran and succeeded
    Done,
}

#[derive(Debug, Clone)]
enum TaskState {
    Finished(TaskStatus),
    Failed(String),
}

/// Executes tasks of a [`TaskRegistry`] with incremental skipping.
pub struct TaskExecutor {
    registry: Arc<TaskRegistry>,
    graph: TaskGraph,
    cache: IncrementalCache,
    reporter: Arc<dyn TaskReporter>,
    states: HashMap<String, TaskState>,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        cache: IncrementalCache,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        let graph = registry.graph();
        Self {
            registry,
            graph,
            cache,
            reporter,
            states: HashMap::new(),
        }
    }

    /// Status of a task in this run, `None` if it has not run (or failed).
    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        match self.states.get(id) {
            Some(TaskState::Finished(status)) => Some(*status),
            _ => None,
        }
    }

    /// Runs `id` after its transitive dependencies.
    ///
    /// # Errors
    ///
    /// - [`PaddleError::TaskNotFound`] if `id`, or a task it depends on, is not
    ///   registered
    /// - [`PaddleError::CircularDependency`] if its dependencies form a cycle
    /// - [`PaddleError::TaskActionFailure`] naming the task that failed, which
    ///   may be a dependency of `id`
    pub async fn execute(&mut self, id: &str) -> Result<TaskStatus, PaddleError> {
        if self.registry.get(id).is_none() {
            return Err(PaddleError::TaskNotFound {
                id: id.to_string(),
            });
        }
        let order = self.graph.execution_order(id)?;
        debug!("Execution order for {}: {:?}", id, order);

        let mut last = TaskStatus::UpToDate;
        for task_id in order {
            match self.states.get(&task_id) {
                Some(TaskState::Finished(status)) => {
                    last = *status;
                    continue;
                }
                Some(TaskState::Failed(reason)) => {
                    return Err(PaddleError::TaskActionFailure {
                        task: task_id,
                        reason: reason.clone(),
                    });
                }
                None => {}
            }

            let task = Arc::clone(self.registry.get(&task_id).ok_or_else(|| {
                PaddleError::TaskNotFound {
                    id: task_id.clone(),
                }
            })?);

            match self.run_task(&task).await {
                Ok(status) => {
                    self.states.insert(task_id, TaskState::Finished(status));
                    last = status;
                }
                Err(reason) => {
                    self.reporter.report(TaskEvent::Failed {
                        task: task_id.clone(),
                        reason: reason.clone(),
                    });
                    self.states.insert(task_id.clone(), TaskState::Failed(reason.clone()));
                    return Err(PaddleError::TaskActionFailure {
                        task: task_id,
                        reason,
                    });
                }
            }
        }
        Ok(last)
    }

    /// Runs each requested task independently.
    ///
    /// A failing request does not prevent later ones, although tasks shared
    /// with a failed request are not retried.
    pub async fn execute_all(
        &mut self,
        ids: &[String],
    ) -> Vec<(String, Result<TaskStatus, PaddleError>)> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.execute(id).await;
            results.push((id.clone(), result));
        }
        results
    }

    async fn run_task(&self, task: &Task) -> Result<TaskStatus, String> {
        let id = task.id();

        if task.is_incremental() {
            let up_to_date = self
                .cache
                .is_up_to_date(id, task.inputs(), task.outputs())
                .map_err(|e| format!("{e:#}"))?;
            if up_to_date {
                debug!("Task {} is up to date", id);
                self.reporter.report(TaskEvent::UpToDate(id.to_string()));
                return Ok(TaskStatus::UpToDate);
            }
        }

        self.reporter.report(TaskEvent::Started(id.to_string()));
        task.action().act().await.map_err(|failure| failure.reason)?;

        if task.is_incremental() {
            if let Err(e) = self.cache.update(id, task.inputs(), task.outputs()) {
                warn!("Failed to record incremental state for {}: {:#}", id, e);
            }
        }

        self.reporter.report(TaskEvent::Done(id.to_string()));
        Ok(TaskStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{FileInput, Hashable};
    use crate::tasks::{TaskAction, TaskFailure, action_fn};
    use crate::test_utils::RecordingReporter;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Action that appends its task id to a shared log.
    fn logging(log: &Arc<Mutex<Vec<String>>>, id: &str) -> Arc<dyn TaskAction> {
        let log = Arc::clone(log);
        let id = id.to_string();
        action_fn(move || {
            let log = Arc::clone(&log);
            let id = id.clone();
            async move {
                log.lock().unwrap().push(id);
                Ok(())
            }
        })
    }

    fn failing(reason: &'static str) -> Arc<dyn TaskAction> {
        action_fn(move || async move { Err(TaskFailure::new(reason)) })
    }

    fn executor(registry: TaskRegistry, dir: &Path) -> (TaskExecutor, RecordingReporter) {
        crate::test_utils::init_test_logging(None);
        let reporter = RecordingReporter::new();
        let executor = TaskExecutor::new(
            Arc::new(registry),
            IncrementalCache::open(dir.join("incremental.json")),
            Arc::new(reporter.clone()),
        );
        (executor, reporter)
    }

    #[tokio::test]
    async fn test_dependencies_run_first_and_once() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("base", logging(&log, "base"))).unwrap();
        registry.register(Task::new("left", logging(&log, "left")).depends_on("base")).unwrap();
        registry.register(Task::new("right", logging(&log, "right")).depends_on("base")).unwrap();
        let app = Task::new("app", logging(&log, "app")).depends_on("left").depends_on("right");
        registry.register(app).unwrap();

        let (mut executor, _) = executor(registry, temp.path());
        assert_eq!(executor.execute("app").await.unwrap(), TaskStatus::Done);
        assert_eq!(*log.lock().unwrap(), vec!["base", "left", "right", "app"]);

        // Memoized within the run
        assert_eq!(executor.execute("app").await.unwrap(), TaskStatus::Done);
        assert_eq!(executor.execute("left").await.unwrap(), TaskStatus::Done);
        assert_eq!(log.lock().unwrap().len(), 4);
        assert_eq!(executor.status("base"), Some(TaskStatus::Done));
    }

    #[tokio::test]
    async fn test_failing_dependency_stops_dependents() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("a", logging(&log, "a")).depends_on("b")).unwrap();
        registry.register(Task::new("b", logging(&log, "b")).depends_on("c")).unwrap();
        registry.register(Task::new("c", failing("compiler exploded"))).unwrap();

        let (mut executor, reporter) = executor(registry, temp.path());
        match executor.execute("a").await {
            Err(PaddleError::TaskActionFailure {
                task,
                reason,
            }) => {
                assert_eq!(task, "c");
                assert_eq!(reason, "compiler exploded");
            }
            other => panic!("expected failure of c, got {other:?}"),
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(reporter.started(), vec!["c"]);
        assert!(reporter.events().contains(&TaskEvent::Failed {
            task: "c".to_string(),
            reason: "compiler exploded".to_string(),
        }));

        // A later request through the failed task reports it again without re-running
        reporter.clear();
        assert!(matches!(
            executor.execute("b").await,
            Err(PaddleError::TaskActionFailure { task, .. }) if task == "c"
        ));
        assert!(reporter.started().is_empty());
    }

    #[tokio::test]
    async fn test_incremental_task_skipped_until_input_changes() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.py");
        std::fs::write(&source, "v1").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let build_registry = || {
            let mut registry = TaskRegistry::new();
            let input: Arc<dyn Hashable> = Arc::new(FileInput::new(&source));
            let task = Task::new("compile", logging(&log, "compile")).with_input(input);
            registry.register(task).unwrap();
            registry
        };

        let (mut first, _) = executor(build_registry(), temp.path());
        assert_eq!(first.execute("compile").await.unwrap(), TaskStatus::Done);

        let (mut second, reporter) = executor(build_registry(), temp.path());
        assert_eq!(second.execute("compile").await.unwrap(), TaskStatus::UpToDate);
        assert_eq!(reporter.up_to_date(), vec!["compile"]);
        assert_eq!(log.lock().unwrap().len(), 1);

        std::fs::write(&source, "v2").unwrap();
        let (mut third, _) = executor(build_registry(), temp.path());
        assert_eq!(third.execute("compile").await.unwrap(), TaskStatus::Done);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_task_without_inputs_always_runs() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let mut registry = TaskRegistry::new();
            registry.register(Task::new("clean", logging(&log, "clean"))).unwrap();
            let (mut executor, _) = executor(registry, temp.path());
            assert_eq!(executor.execute("clean").await.unwrap(), TaskStatus::Done);
        }
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_task_is_not_recorded() {
        let temp = TempDir::new().unwrap();
        for _ in 0..2 {
            let mut registry = TaskRegistry::new();
            let input: Arc<dyn Hashable> = Arc::new("same".to_string());
            registry.register(Task::new("flaky", failing("nope")).with_input(input)).unwrap();
            let (mut executor, reporter) = executor(registry, temp.path());
            assert!(executor.execute("flaky").await.is_err());
            assert_eq!(reporter.started(), vec!["flaky"]);
        }
    }

    #[tokio::test]
    async fn test_unknown_task_and_dependency() {
        let temp = TempDir::new().unwrap();
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("a", failing("unused")).depends_on("ghost")).unwrap();
        let (mut executor, reporter) = executor(registry, temp.path());

        assert!(matches!(
            executor.execute("zzz").await,
            Err(PaddleError::TaskNotFound { id }) if id == "zzz"
        ));
        assert!(matches!(
            executor.execute("a").await,
            Err(PaddleError::TaskNotFound { id }) if id == "ghost"
        ));
        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_is_reported_before_running() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("a", logging(&log, "a")).depends_on("b")).unwrap();
        registry.register(Task::new("b", logging(&log, "b")).depends_on("a")).unwrap();

        let (mut executor, _) = executor(registry, temp.path());
        match executor.execute("a").await {
            Err(PaddleError::CircularDependency {
                chain,
            }) => assert_eq!(chain, "a -> b -> a"),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_all_runs_requests_independently() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("broken", failing("bad"))).unwrap();
        registry.register(Task::new("fine", logging(&log, "fine"))).unwrap();

        let (mut executor, _) = executor(registry, temp.path());
        let results = executor.execute_all(&["broken".to_string(), "fine".to_string()]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "broken");
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, "fine");
        assert_eq!(*results[1].1.as_ref().unwrap(), TaskStatus::Done);
        assert_eq!(*log.lock().unwrap(), vec!["fine"]);
    }
}
