//! Global constants used throughout the Paddle codebase.
//!
//! Timeouts, retry parameters and other numeric constants shared by several
//! modules live here so magic numbers stay discoverable.

use std::time::Duration;

/// Interval at which repository index caches are persisted in the background.
pub const CACHE_SYNC_PERIOD: Duration = Duration::from_secs(60);

/// Timeout for a single request against a package index (30 seconds).
///
/// Prevents a hung connection from blocking index resolution indefinitely.
pub const INDEX_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of attempts for a single index request before giving up.
pub const INDEX_REQUEST_ATTEMPTS: usize = 3;

/// Starting delay for exponential backoff between index request attempts (100ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 100;

/// Maximum backoff delay between index request attempts (2s).
pub const MAX_BACKOFF_DELAY_MS: u64 = 2000;

/// Maximum number of per-package distribution pages fetched concurrently
/// from one repository.
pub const MAX_CONCURRENT_PACKAGE_FETCHES: usize = 16;

/// Base URL of the Python Package Index, the default primary repository.
pub const PYPI_URL: &str = "https://pypi.org";

/// Display name of the default primary repository.
pub const PYPI_NAME: &str = "pypi";

/// Project configuration file name.
pub const PROJECT_FILE: &str = "paddle.toml";

/// Per-project state directory (incremental cache lives here).
pub const PROJECT_STATE_DIR: &str = ".paddle";

/// Python version assumed when `environment.python` is not configured.
pub const DEFAULT_PYTHON_VERSION: &str = "3.8";
