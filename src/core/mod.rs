//! Core types shared across Paddle.
//!
//! Currently this is the error system:
//! - [`PaddleError`] - enumerated error types covering every failure mode
//! - [`ErrorContext`] - user-friendly wrapper with details and suggestions
//! - [`user_friendly_error`] - convert any `anyhow::Error` for CLI display

pub mod error;

pub use error::{ErrorContext, PaddleError, user_friendly_error};
