//! A loaded Paddle project.
//!
//! [`Project`] ties together the project file, the global configuration, the
//! repository indexes and the task registry. Repositories are resolved lazily:
//! nothing touches the network (or the index caches) until a task needs the
//! repository set, and concurrent tasks share that single resolution. Once
//! resolved, a [`CacheSynchronizer`] keeps the index caches on disk current
//! until [`Project::shutdown`].

pub mod builtin;

use crate::config::{GlobalConfig, ProjectConfig, find_project_file};
use crate::constants::{CACHE_SYNC_PERIOD, PROJECT_STATE_DIR};
use crate::core::PaddleError;
use crate::repository::{
    CacheSynchronizer, IndexClient, LoadOptions, PackageRepositories, RepositorySource,
};
use crate::resolver::{Resolution, resolve_requirements};
use crate::tasks::TaskRegistry;
use crate::utils::Deferred;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Label of the global configuration in repository conflict messages.
const GLOBAL_SOURCE_LABEL: &str = "global configuration";

/// Runtime settings that do not come from the project file.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// Directory holding the repository index caches
    pub index_dir: PathBuf,
    /// How repository indexes are loaded
    pub load_options: LoadOptions,
    /// Period of the background index cache persistence
    pub sync_period: Duration,
}

impl ProjectSettings {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            load_options: LoadOptions::default(),
            sync_period: CACHE_SYNC_PERIOD,
        }
    }

    /// Re-fetch repository indexes instead of using their caches.
    #[must_use]
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.load_options.refresh = refresh;
        self
    }
}

/// A project and its lazily resolved repositories.
pub struct Project {
    root: PathBuf,
    file: PathBuf,
    config: ProjectConfig,
    global: GlobalConfig,
    settings: ProjectSettings,
    client: Arc<dyn IndexClient>,
    repositories: Deferred<Arc<PackageRepositories>>,
    synchronizer: Mutex<Option<CacheSynchronizer>>,
}

impl Project {
    /// Finds `paddle.toml` in `start` or a parent directory and loads it.
    ///
    /// # Errors
    ///
    /// - [`PaddleError::ManifestNotFound`] if there is no project file
    /// - any error of [`ProjectConfig::load`]
    pub fn open(
        start: &Path,
        global: GlobalConfig,
        client: Arc<dyn IndexClient>,
        settings: ProjectSettings,
    ) -> Result<Arc<Self>, PaddleError> {
        let file = find_project_file(start)?;
        let config = ProjectConfig::load(&file)?;
        let root = file.parent().map_or_else(|| start.to_path_buf(), Path::to_path_buf);
        debug!("Loaded project '{}' from {}", config.project.name, file.display());

        Ok(Arc::new(Self {
            root,
            file,
            config,
            global,
            settings,
            client,
            repositories: Deferred::new(),
            synchronizer: Mutex::new(None),
        }))
    }

    /// Directory containing `paddle.toml`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn global_config(&self) -> &GlobalConfig {
        &self.global
    }

    pub fn client(&self) -> &Arc<dyn IndexClient> {
        &self.client
    }

    /// Per-project state directory (`.paddle`).
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(PROJECT_STATE_DIR)
    }

    /// The incremental task store.
    pub fn incremental_state_path(&self) -> PathBuf {
        self.state_dir().join("incremental.json")
    }

    /// Whether the repositories have been resolved in this run.
    pub fn repositories_resolved(&self) -> bool {
        self.repositories.is_resolved()
    }

    /// The project's repository set, resolved and loaded on first demand.
    ///
    /// The first call merges the repository declarations, loads every index
    /// (from cache or network) and starts persisting the caches in the
    /// background.
    ///
    /// # Errors
    ///
    /// Configuration conflicts, invalid URLs and index fetch failures. A failed
    /// resolution is retried by the next call.
    pub async fn repositories(&self) -> Result<&Arc<PackageRepositories>, PaddleError> {
        self.repositories.get_or_try_resolve(|| self.resolve_repositories()).await
    }

    async fn resolve_repositories(&self) -> Result<Arc<PackageRepositories>, PaddleError> {
        let local_label = self.file.display().to_string();
        let repositories = PackageRepositories::resolve(
            RepositorySource {
                label: &local_label,
                descriptors: &self.config.repositories,
            },
            RepositorySource {
                label: GLOBAL_SOURCE_LABEL,
                descriptors: &self.global.repositories,
            },
        )?;
        repositories
            .load(self.client.as_ref(), &self.settings.index_dir, self.settings.load_options)
            .await?;
        info!(
            "Resolved {} repositories, primary source {}",
            repositories.all().len(),
            repositories.primary().name()
        );

        let repositories = Arc::new(repositories);
        let synchronizer = repositories
            .start_cache_sync(self.settings.index_dir.clone(), self.settings.sync_period);
        *self.synchronizer.lock().await = Some(synchronizer);
        Ok(repositories)
    }

    /// Resolves every requirement of the project file.
    ///
    /// # Errors
    ///
    /// Invalid requirement specifiers and repository resolution failures.
    /// Unsatisfiable requirements are reported in the returned [`Resolution`].
    pub async fn resolve_requirements(&self) -> Result<Resolution, PaddleError> {
        let requirements = self.config.parsed_requirements()?;
        let repositories = self.repositories().await?;
        Ok(resolve_requirements(repositories, self.client.as_ref(), &requirements).await)
    }

    /// Builds the task registry: built-in tasks followed by the project's
    /// `[tasks.*]` in id order.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::ConfigError`] if a project task reuses a
    /// built-in id.
    pub fn task_registry(self: &Arc<Self>) -> Result<TaskRegistry, PaddleError> {
        let mut registry = TaskRegistry::new();
        builtin::register_builtin_tasks(self, &mut registry)?;
        for (id, task) in &self.config.tasks {
            registry.register(builtin::command_task(self, id, task))?;
        }
        Ok(registry)
    }

    /// Stops background index persistence, writing the caches a final time.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the final save.
    pub async fn shutdown(&self) -> Result<(), PaddleError> {
        let synchronizer = self.synchronizer.lock().await.take();
        match synchronizer {
            Some(synchronizer) => synchronizer.stop().await,
            None => Ok(()),
        }
    }
}
