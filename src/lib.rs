//! Paddle - incremental build tasks and package repositories for Python projects
//!
//! Paddle runs a project's tasks in dependency order, skipping any task whose
//! declared inputs and outputs are unchanged since its last successful run, and
//! resolves the project's requirements against a set of PEP 503 package
//! repositories whose indexes are cached locally.
//!
//! # Core Modules
//!
//! ## Versions
//! - [`version`] - PEP 440 version normalization, ordering and specifiers
//!
//! ## Repositories
//! - [`repository`] - package indexes, the repository set and its caches
//! - [`resolver`] - picking a distribution for each requirement
//!
//! ## Tasks
//! - [`tasks`] - task registry, dependency graph, incremental executor
//! - [`hash`] - content digests of task inputs and outputs
//! - [`project`] - a loaded project with its built-in and declared tasks
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - `paddle.toml` and the global configuration
//! - [`constants`] - timeouts, limits and well-known names
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - atomic file writes and deferred values
//!
//! # Project File (paddle.toml)
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
//!
//! [tasks.test]
//! command = ["pytest", "-q"]
//! depends_on = ["resolveRequirements"]
//! inputs = ["src", "tests"]
//! ```
//!
//! ```bash
//! paddle run test        # resolves repositories and requirements, then tests
//! paddle run test        # second time: every task UP-TO-DATE
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod hash;
pub mod project;
pub mod repository;
pub mod resolver;
pub mod tasks;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
