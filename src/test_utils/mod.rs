//! Test utilities for Paddle
//!
//! This module provides utilities for writing tests without touching the
//! network or the user's real configuration:
//! - Logging initialization that plays well with the test harness
//! - [`StaticIndexClient`], an in-memory package index
//! - [`RecordingReporter`], a task reporter that remembers every event
//!
//! # Example
//!
//! ```rust,no_run
//! use paddle_cli::test_utils::StaticIndexClient;
//!
//! let client = StaticIndexClient::new()
//!     .with_package("https://pypi.org/simple", "six", &["1.16.0"]);
//! ```

pub mod index;
pub mod reporter;

pub use index::StaticIndexClient;
pub use reporter::RecordingReporter;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Respects `RUST_LOG` when no level is
/// given; without either, tests run silently.
///
/// ```bash
/// RUST_LOG=paddle_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
