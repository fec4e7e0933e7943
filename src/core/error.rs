//! Error handling for Paddle
//!
//! This module provides the error types and user-friendly error reporting for
//! Paddle. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`PaddleError`] - Enumerated error types for every failure case
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # Error Categories
//!
//! - **Versions**: [`PaddleError::VersionParseError`], [`PaddleError::SpecifierParseError`]
//! - **Repositories**: [`PaddleError::RepositoryConfigConflict`],
//!   [`PaddleError::RepositoryNotFound`], [`PaddleError::InvalidRepositoryUrl`],
//!   [`PaddleError::NetworkError`], [`PaddleError::CacheIoError`]
//! - **Tasks**: [`PaddleError::TaskNotFound`], [`PaddleError::CircularDependency`],
//!   [`PaddleError::TaskActionFailure`]
//! - **Configuration**: [`PaddleError::ManifestNotFound`], [`PaddleError::ManifestParseError`],
//!   [`PaddleError::ConfigError`]
//!
//! Common library errors convert automatically:
//! - [`std::io::Error`] → [`PaddleError::IoError`]
//! - [`toml::de::Error`] → [`PaddleError::TomlError`]
//! - [`serde_json::Error`] → [`PaddleError::JsonError`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use paddle_cli::core::{PaddleError, user_friendly_error};
//!
//! fn parse() -> Result<(), PaddleError> {
//!     Err(PaddleError::VersionParseError {
//!         input: "1.0foo".to_string(),
//!         offending: "foo".to_string(),
//!     })
//! }
//!
//! if let Err(e) = parse() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Paddle operations.
///
/// Each variant carries the data needed to tell the user what was expected and
/// what was found. Parse and configuration errors are always fatal to the
/// operation that triggered them; [`PaddleError::CacheIoError`] is the only kind
/// callers are expected to recover from (by re-fetching).
#[derive(Error, Debug)]
pub enum PaddleError {
    /// A version string does not follow the PEP 440 grammar.
    ///
    /// `offending` is the part of the input that could not be parsed; it is the
    /// whole input when not even a release number could be read.
    #[error("Invalid version '{input}': cannot parse '{offending}'")]
    VersionParseError {
        /// The full version text as given
        input: String,
        /// The unparseable remainder
        offending: String,
    },

    /// A version specifier (e.g. `>=1.0, <2`) has an invalid clause.
    #[error("Failed to parse clause '{clause}' of version specifier '{specifier}': {reason}")]
    SpecifierParseError {
        /// The clause that failed
        clause: String,
        /// The whole specifier string
        specifier: String,
        /// Why the clause was rejected
        reason: String,
    },

    /// Two repositories both claim to be the primary package index.
    ///
    /// This is never resolved automatically: the user has to edit one of the
    /// configuration files.
    #[error(
        "Found at least 2 repositories specified as primary source indexes: \
         '{first}' from {first_source} and '{second}' from {second_source}"
    )]
    RepositoryConfigConflict {
        /// Name of the repository that was already primary
        first: String,
        /// Configuration file that declared `first`
        first_source: String,
        /// Name of the repository that tried to become primary
        second: String,
        /// Configuration file that declared `second`
        second_source: String,
    },

    /// No known repository serves the given URL.
    #[error("The repository with URL '{url}' was not found")]
    RepositoryNotFound {
        /// The URL that was looked up
        url: String,
    },

    /// A repository descriptor carries a malformed URL.
    #[error("The provided repository URL is invalid: {url}")]
    InvalidRepositoryUrl {
        /// The rejected URL
        url: String,
    },

    /// A persisted cache could not be read or written.
    #[error("Cache file '{path}' is unusable: {reason}")]
    CacheIoError {
        /// Path to the cache file
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Network error while talking to a package index.
    #[error("Network error: {operation}")]
    NetworkError {
        /// The network operation that failed
        operation: String,
        /// Reason for the network failure
        reason: String,
    },

    /// A task id that no registered task carries.
    #[error("Task '{id}' not found")]
    TaskNotFound {
        /// The requested id
        id: String,
    },

    /// Task dependencies form a cycle.
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// The cycle, rendered as `a -> b -> a`
        chain: String,
    },

    /// A task's action reported failure.
    #[error("Task '{task}' failed: {reason}")]
    TaskActionFailure {
        /// Id of the task whose action failed
        task: String,
        /// Failure reason reported by the action
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// `paddle.toml` was not found in the project directory or any parent.
    #[error("Project file paddle.toml not found in current directory or any parent directory")]
    ManifestNotFound,

    /// `paddle.toml` could not be parsed or does not match the schema.
    #[error("Invalid project file {file}: {reason}")]
    ManifestParseError {
        /// Path to the project file
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// Displayed as:
/// 1. **error**: the main message in red
/// 2. **details**: additional context in yellow (optional)
/// 3. **suggestion**: actionable steps in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying Paddle error
    pub error: PaddleError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: PaddleError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] for CLI display.
///
/// Looks through the `anyhow` chain for a [`PaddleError`] (or an already built
/// [`ErrorContext`]) and attaches suggestions for the known kinds. Anything else
/// is wrapped in [`PaddleError::Other`] with the full context chain as message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(ctx) = cause.downcast_ref::<ErrorContext>() {
            return ErrorContext {
                error: PaddleError::Other {
                    message: ctx.error.to_string(),
                },
                suggestion: ctx.suggestion.clone(),
                details: ctx.details.clone(),
            };
        }
    }

    match error.downcast::<PaddleError>() {
        Ok(paddle_error) => create_error_context(paddle_error),
        Err(error) => {
            if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
                if io_error.kind() == std::io::ErrorKind::PermissionDenied {
                    return ErrorContext::new(PaddleError::Other {
                        message: format!("{error:#}"),
                    })
                    .with_suggestion(
                        "Check file permissions and ownership of the project directory",
                    );
                }
            }
            ErrorContext::new(PaddleError::Other {
                message: format!("{error:#}"),
            })
        }
    }
}

fn create_error_context(error: PaddleError) -> ErrorContext {
    match &error {
        PaddleError::VersionParseError { .. } | PaddleError::SpecifierParseError { .. } => {
            ErrorContext::new(error)
                .with_details("Versions must follow PEP 440, e.g. '1.2.3', '2.0rc1', '1.0.post2'")
                .with_suggestion("Fix the version string in paddle.toml and re-run the task")
        }
        PaddleError::RepositoryConfigConflict { .. } => ErrorContext::new(error).with_suggestion(
            "Resolve this conflict manually by marking one repository 'secondary = true' \
             in one of the configuration files, then re-run the task",
        ),
        PaddleError::RepositoryNotFound { .. } => ErrorContext::new(error).with_suggestion(
            "Add a [[repositories]] entry whose URL is a prefix of the package URL",
        ),
        PaddleError::InvalidRepositoryUrl { .. } => ErrorContext::new(error)
            .with_suggestion("Use an absolute http(s) URL, e.g. 'https://pypi.org/simple'"),
        PaddleError::NetworkError { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the repository URL"),
        PaddleError::ManifestNotFound => ErrorContext::new(error)
            .with_details(
                "Paddle searches for paddle.toml in the project directory and its parents",
            )
            .with_suggestion("Create a paddle.toml file or pass --project-dir"),
        PaddleError::ManifestParseError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax and value types in paddle.toml"),
        PaddleError::TomlError(_) => ErrorContext::new(error).with_suggestion(
            "Check the TOML syntax of the global configuration (~/.paddle/config.toml \
             or $PADDLE_CONFIG_PATH)",
        ),
        PaddleError::CircularDependency { .. } => ErrorContext::new(error)
            .with_suggestion("Remove one of the 'depends_on' entries forming the cycle"),
        PaddleError::TaskNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'paddle tasks' to list the available tasks"),
        _ => ErrorContext::new(error),
    }
}
