//! Two-phase values resolved on first demand.
//!
//! A [`Deferred`] starts unresolved and is resolved exactly once, by the first
//! caller that needs it. Concurrent callers wait for that single resolution
//! instead of racing to resolve the value twice. A failed resolution leaves the
//! holder unresolved so a later caller can try again.

use std::future::Future;
use tokio::sync::OnceCell;

/// A value that is resolved lazily, at most once.
#[derive(Debug)]
pub struct Deferred<T> {
    cell: OnceCell<T>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// Creates an unresolved holder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Returns the value if it has been resolved already.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether the value has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the value, resolving it with `resolve` if this is the first demand.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error; the holder stays unresolved.
    pub async fn get_or_try_resolve<F, Fut, E>(&self, resolve: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(resolve).await
    }
}
