//! Configuration management for Paddle
//!
//! Paddle reads configuration from two layers:
//!
//! 1. **Project file** (`paddle.toml`) - project name, target environment,
//!    repositories, requirements and user tasks; see [`project`]
//! 2. **Global configuration** (`~/.paddle/config.toml`) - repositories shared
//!    by every project on the machine; see [`global`]
//!
//! Both are plain TOML deserialized with `serde` into typed schemas.
//!
//! # Directories
//!
//! | Purpose              | Default              | Override             |
//! |----------------------|----------------------|----------------------|
//! | Global configuration | `~/.paddle/config.toml` | `PADDLE_CONFIG_PATH` |
//! | Cache root           | `~/.paddle/cache`    | `PADDLE_CACHE_DIR`   |
//! | Repository indexes   | `<cache>/index`      |                      |
//! | Incremental state    | `<project>/.paddle`  |                      |

pub mod global;
pub mod project;

pub use global::GlobalConfig;
pub use project::{ProjectConfig, Requirement, TaskConfig, find_project_file};

use crate::utils::ensure_dir;
use anyhow::Result;
use std::path::PathBuf;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PADDLE_CACHE_DIR";

/// Get the cache root directory for Paddle.
///
/// # Location Priority
///
/// 1. `PADDLE_CACHE_DIR` environment variable (if set)
/// 2. Platform-specific cache directory:
///    - Windows: `%LOCALAPPDATA%\paddle\cache`
///    - macOS/Linux: `~/.paddle/cache`
///
/// The directory is created if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or the
/// directory cannot be created.
pub fn get_cache_dir() -> Result<PathBuf> {
    let cache_dir = if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        PathBuf::from(dir)
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("paddle")
            .join("cache")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".paddle")
            .join("cache")
    };

    ensure_dir(&cache_dir)?;
    Ok(cache_dir)
}

/// Directory holding one cache file per package repository.
///
/// # Errors
///
/// Same as [`get_cache_dir`].
pub fn get_index_dir() -> Result<PathBuf> {
    let index_dir = get_cache_dir()?.join("index");
    ensure_dir(&index_dir)?;
    Ok(index_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_cache_dir_override() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("custom-cache");
        unsafe {
            std::env::set_var(CACHE_DIR_ENV, &cache);
        }

        assert_eq!(get_cache_dir().unwrap(), cache);
        let index = get_index_dir().unwrap();
        assert_eq!(index, cache.join("index"));
        assert!(index.is_dir());

        unsafe {
            std::env::remove_var(CACHE_DIR_ENV);
        }
    }
}
