//! Persisted digests of the last successful task runs.
//!
//! The store is a JSON object keyed by task id, written atomically after every
//! successful incremental task:
//!
//! ```json
//! {
//!   "resolveRequirements": { "inputs": "9f86d0…", "outputs": "e3b0c4…" }
//! }
//! ```
//!
//! A task is up to date when the digests of its current inputs and outputs
//! both equal the stored ones. Digests are per task, so a change to one task's
//! inputs never invalidates another task.

use crate::hash::{Digest, Hashable, composite_digest};
use crate::utils::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Fingerprint {
    inputs: Digest,
    outputs: Digest,
}

/// Digest store backing incremental execution.
#[derive(Debug)]
pub struct IncrementalCache {
    path: PathBuf,
    records: Mutex<BTreeMap<String, Fingerprint>>,
}

impl IncrementalCache {
    /// Opens the store at `path`.
    ///
    /// A missing store is empty. An unreadable or corrupt one is treated as
    /// empty as well, so every incremental task runs once and the store is
    /// rewritten.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match Self::read(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring incremental state at {}: {:#}", path.display(), e);
                BTreeMap::new()
            }
        };
        debug!("Loaded {} incremental records from {}", records.len(), path.display());
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, Fingerprint>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Location of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Fingerprint>>> {
        self.records.lock().map_err(|_| anyhow::anyhow!("Incremental state lock poisoned"))
    }

    fn fingerprint(
        inputs: &[Arc<dyn Hashable>],
        outputs: &[Arc<dyn Hashable>],
    ) -> Result<Fingerprint> {
        Ok(Fingerprint {
            inputs: composite_digest(inputs).context("Failed to hash task inputs")?,
            outputs: composite_digest(outputs).context("Failed to hash task outputs")?,
        })
    }

    /// Whether `task_id` last succeeded with exactly these inputs and outputs.
    ///
    /// A task declaring neither inputs nor outputs is never up to date.
    ///
    /// # Errors
    ///
    /// Fails when an input or output cannot be hashed.
    pub fn is_up_to_date(
        &self,
        task_id: &str,
        inputs: &[Arc<dyn Hashable>],
        outputs: &[Arc<dyn Hashable>],
    ) -> Result<bool> {
        if inputs.is_empty() && outputs.is_empty() {
            return Ok(false);
        }
        let current = Self::fingerprint(inputs, outputs)?;
        Ok(self.lock()?.get(task_id) == Some(&current))
    }

    /// Records the current digests of `task_id` and persists the store.
    ///
    /// # Errors
    ///
    /// Fails when hashing or writing the store fails. The in-memory record is
    /// updated even if the write fails.
    pub fn update(
        &self,
        task_id: &str,
        inputs: &[Arc<dyn Hashable>],
        outputs: &[Arc<dyn Hashable>],
    ) -> Result<()> {
        let fingerprint = Self::fingerprint(inputs, outputs)?;
        let mut records = self.lock()?;
        records.insert(task_id.to_string(), fingerprint);

        let json = serde_json::to_string_pretty(&*records)
            .context("Failed to serialize incremental state")?;
        atomic_write(&self.path, json.as_bytes()).with_context(|| {
            format!("Failed to write incremental state to {}", self.path.display())
        })
    }
}
