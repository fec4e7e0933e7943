//! Supporting utilities
//!
//! - [`fs`] - directory creation and atomic file writes for caches
//! - [`deferred`] - values resolved once, on first demand

pub mod deferred;
pub mod fs;

pub use deferred::Deferred;
pub use fs::{atomic_write, ensure_dir};
