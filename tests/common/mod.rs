//! Shared helpers for the integration tests.
//!
//! Every [`TestProject`] lives in its own temporary directory with a private
//! cache and global configuration, so tests never read the user's real
//! `~/.paddle` or reach the network unless they configure a repository.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory with isolated Paddle state.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
    cache_dir: PathBuf,
    config_path: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let cache_dir = temp_dir.path().join(".paddle").join("cache");
        let config_path = temp_dir.path().join(".paddle").join("config.toml");

        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
            cache_dir,
            config_path,
        })
    }

    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory holding repository index caches.
    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join("index")
    }

    /// Writes `paddle.toml`.
    pub fn write_project(&self, content: &str) -> Result<()> {
        let path = self.project_dir.join("paddle.toml");
        fs::write(&path, content)
            .with_context(|| format!("Failed to write project file to {}", path.display()))
    }

    /// Writes the isolated global configuration.
    pub fn write_global_config(&self, content: &str) -> Result<()> {
        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config to {}", self.config_path.display()))
    }

    /// Writes a file relative to the project root, creating parents.
    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, content)?;
        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.project_dir.join(path))
            .with_context(|| format!("Failed to read {path}"))
    }

    /// A `paddle` command running in the project directory.
    pub fn paddle(&self) -> Command {
        let mut cmd = Command::cargo_bin("paddle").expect("paddle binary is built");
        cmd.current_dir(&self.project_dir)
            .env("PADDLE_CACHE_DIR", &self.cache_dir)
            .env("PADDLE_CONFIG_PATH", &self.config_path)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// A minimal project file with the given extra TOML appended.
pub fn project_file(extra: &str) -> String {
    format!("[project]\nname = \"demo\"\n\n{extra}")
}
