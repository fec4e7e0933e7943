//! The `paddle.toml` project file.
//!
//! The file is deserialized into a typed schema: a value of the wrong type is
//! reported with its location instead of being silently replaced by a
//! default. For example `python = 3.8` (a float) is rejected, the version must
//! be written as the string `"3.8"`.
//!
//! ```toml
//! [project]
//! name = "demo"
//!
//! [environment]
//! python = "3.10"
//!
//! [[repositories]]
//! name = "internal"
//! url = "https://pypi.internal.example/simple"
//! secondary = true
//!
//! [requirements]
//! requests = ">=2.0, <3"
//! six = ""
//!
//! [tasks.test]
//! command = ["pytest", "-q"]
//! depends_on = ["resolveRequirements"]
//! inputs = ["src", "tests"]
//! ```

use crate::constants::{DEFAULT_PYTHON_VERSION, PROJECT_FILE};
use crate::core::PaddleError;
use crate::repository::RepositoryDescriptor;
use crate::version::VersionSpecifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root of `paddle.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// `[project]`
    pub project: ProjectSection,
    /// `[environment]`
    #[serde(default)]
    pub environment: EnvironmentSection,
    /// `[[repositories]]`
    #[serde(default)]
    pub repositories: Vec<RepositoryDescriptor>,
    /// `[requirements]`: package name to specifier; empty means any version
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,
    /// `[tasks.<id>]`
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

/// `[project]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Project name
    pub name: String,
}

/// `[environment]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSection {
    /// Target interpreter version, e.g. `"3.10"`
    #[serde(default = "default_python")]
    pub python: String,
    /// Virtual environment directory, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtualenv: Option<String>,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            python: default_python(),
            virtualenv: None,
        }
    }
}

fn default_python() -> String {
    DEFAULT_PYTHON_VERSION.to_string()
}

/// `[tasks.<id>]`: a user-declared command task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Program and arguments, run in the project root
    pub command: Vec<String>,
    /// Ids of tasks that must run first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Files or directories whose content gates re-execution
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Files or directories the command produces
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Shown by `paddle tasks`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A parsed `[requirements]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Package name
    pub name: String,
    /// Constraint, `None` for any version
    pub specifier: Option<VersionSpecifier>,
}

impl ProjectConfig {
    /// Reads and parses a project file.
    ///
    /// # Errors
    ///
    /// - [`PaddleError::IoError`] if the file cannot be read
    /// - [`PaddleError::ManifestParseError`] for invalid TOML or schema mismatches
    /// - [`PaddleError::ConfigError`] for an empty command
    pub fn load(path: &Path) -> Result<Self, PaddleError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| PaddleError::ManifestParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PaddleError> {
        for (id, task) in &self.tasks {
            if task.command.is_empty() {
                return Err(PaddleError::ConfigError {
                    message: format!("task '{id}' has an empty command"),
                });
            }
        }
        Ok(())
    }

    /// Parses every requirement specifier.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaddleError::SpecifierParseError`].
    pub fn parsed_requirements(&self) -> Result<Vec<Requirement>, PaddleError> {
        self.requirements
            .iter()
            .map(|(name, spec)| {
                let specifier = if spec.trim().is_empty() {
                    None
                } else {
                    Some(VersionSpecifier::parse(spec)?)
                };
                Ok(Requirement {
                    name: name.clone(),
                    specifier,
                })
            })
            .collect()
    }
}

/// Finds `paddle.toml` in `start` or its closest ancestor.
///
/// # Errors
///
/// Returns [`PaddleError::ManifestNotFound`] when no directory up to the
/// filesystem root contains one.
pub fn find_project_file(start: &Path) -> Result<PathBuf, PaddleError> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or(PaddleError::ManifestNotFound)
}
