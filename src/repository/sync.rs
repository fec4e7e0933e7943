//! Periodic background persistence of repository caches.
//!
//! Indexes change while a run lazily fetches package versions. A
//! [`CacheSynchronizer`] writes every repository cache on a fixed period so
//! the work survives an abrupt exit, and once more when it is stopped.

use crate::core::PaddleError;
use crate::repository::PackageRepositories;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle to the background persister.
///
/// Call [`CacheSynchronizer::stop`] at shutdown; dropping the handle aborts
/// the background task without a final save.
#[derive(Debug)]
pub struct CacheSynchronizer {
    repositories: Arc<PackageRepositories>,
    index_dir: PathBuf,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSynchronizer {
    /// Starts persisting every repository cache into `index_dir` each `period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        repositories: Arc<PackageRepositories>,
        index_dir: PathBuf,
        period: Duration,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task_repositories = Arc::clone(&repositories);
        let task_dir = index_dir.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Persisting repository index caches");
                        if let Err(e) = task_repositories.save_all(&task_dir).await {
                            warn!("Periodic index cache save failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Self {
            repositories,
            index_dir,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Stops the background task, waits for it, and saves every cache once more.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the final save.
    pub async fn stop(mut self) -> Result<(), PaddleError> {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Index cache synchronizer terminated abnormally: {}", e);
            }
        }
        self.repositories.save_all(&self.index_dir).await
    }
}

impl Drop for CacheSynchronizer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
