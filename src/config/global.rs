//! Global configuration management for Paddle.
//!
//! This module handles the user-wide configuration file (`~/.paddle/config.toml`)
//! which declares package repositories shared by every project on the machine,
//! typically a company mirror.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.paddle/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\paddle\config.toml`
//!
//! The location can be overridden using the `PADDLE_CONFIG_PATH` environment
//! variable. A missing file is an empty configuration.
//!
//! # File Format
//!
//! ```toml
//! [[repositories]]
//! name = "mirror"
//! url = "https://pypi.mirror.example/simple"
//! # Repositories declared here are extra indexes unless they opt in:
//! # secondary = false   # become the primary index
//! # default = true      # become the primary index and drop PyPI
//! ```

use crate::core::PaddleError;
use crate::repository::RepositoryDescriptor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable overriding the global configuration path.
pub const CONFIG_PATH_ENV: &str = "PADDLE_CONFIG_PATH";

/// The user-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Repositories available to every project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryDescriptor>,
}

impl GlobalConfig {
    /// Load global configuration from the default location.
    ///
    /// Returns an empty configuration if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML or does not match the schema
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str::<Self>(&content)
            .map_err(PaddleError::TomlError)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Get the default path of the global configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory (or the local data directory on
    /// Windows) cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("paddle")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".paddle")
        };

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[repositories]]
name = "mirror"
url = "https://mirror.example/simple"
secondary = false
"#,
        )
        .unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].name, "mirror");
        assert_eq!(config.repositories[0].secondary, Some(false));
        assert_eq!(config.repositories[0].default, None);
    }

    #[tokio::test]
    async fn test_invalid_schema_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[[repositories]]\nname = 42\n").unwrap();

        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse global config"));
        assert!(matches!(err.downcast_ref::<PaddleError>(), Some(PaddleError::TomlError(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_override_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &path);
        }

        assert_eq!(GlobalConfig::default_path().unwrap(), path);
        let config = GlobalConfig::load().await.unwrap();
        assert!(config.repositories.is_empty());

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
    }
}
