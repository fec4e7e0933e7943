//! Integration test suite for Paddle
//!
//! End-to-end tests driving the `paddle` binary plus library-level workflows
//! that span several modules. None of them touch the network: repositories are
//! either absent, served by an in-memory index client, or restored from seeded
//! caches.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: Task listing and execution through the binary
//! - **offline_index**: Repository commands served from seeded caches
//! - **repositories**: Index caching and requirement resolution across runs
//! - **versions**: Version normalization and specifier matching

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod offline_index;
mod repositories;
mod versions;
