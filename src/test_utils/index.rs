//! In-memory package index for network-free tests.

use crate::core::PaddleError;
use crate::repository::{IndexClient, normalize_name};
use crate::version::Version;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
struct StaticPackage {
    name: String,
    versions: Vec<String>,
}

/// An [`IndexClient`] serving fixed package listings.
///
/// Indexes are keyed by their simple API URL (e.g. `https://pypi.org/simple`).
/// Clones share their request counters.
#[derive(Debug, Clone, Default)]
pub struct StaticIndexClient {
    indexes: BTreeMap<String, BTreeMap<String, StaticPackage>>,
    failing_packages: BTreeSet<String>,
    unreachable: BTreeSet<String>,
    listing_requests: Arc<AtomicUsize>,
    version_requests: Arc<AtomicUsize>,
}

impl StaticIndexClient {
    /// A client that knows no index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an index with no packages.
    pub fn with_index(mut self, simple_url: &str) -> Self {
        self.indexes.entry(simple_url.to_string()).or_default();
        self
    }

    /// Adds `versions` of `name` to the index at `simple_url`.
    pub fn with_package(mut self, simple_url: &str, name: &str, versions: &[&str]) -> Self {
        let package = self
            .indexes
            .entry(simple_url.to_string())
            .or_default()
            .entry(normalize_name(name))
            .or_insert_with(|| StaticPackage {
                name: name.to_string(),
                versions: Vec::new(),
            });
        package.versions.extend(versions.iter().map(ToString::to_string));
        self
    }

    /// Makes every version request for `name` fail.
    pub fn failing_package(mut self, name: &str) -> Self {
        self.failing_packages.insert(normalize_name(name));
        self
    }

    /// Makes every request against `simple_url` fail.
    pub fn unreachable(mut self, simple_url: &str) -> Self {
        self.unreachable.insert(simple_url.to_string());
        self
    }

    /// Number of package listing requests served so far.
    pub fn listing_requests(&self) -> usize {
        self.listing_requests.load(Ordering::SeqCst)
    }

    /// Number of version requests served so far.
    pub fn version_requests(&self) -> usize {
        self.version_requests.load(Ordering::SeqCst)
    }

    fn index(&self, simple_url: &str) -> Result<&BTreeMap<String, StaticPackage>, PaddleError> {
        if self.unreachable.contains(simple_url) {
            return Err(PaddleError::NetworkError {
                operation: format!("GET {simple_url}/"),
                reason: "connection refused".to_string(),
            });
        }
        self.indexes.get(simple_url).ok_or_else(|| PaddleError::RepositoryNotFound {
            url: simple_url.to_string(),
        })
    }
}

#[async_trait]
impl IndexClient for StaticIndexClient {
    async fn fetch_package_names(&self, simple_url: &str) -> Result<Vec<String>, PaddleError> {
        self.listing_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.index(simple_url)?.values().map(|p| p.name.clone()).collect())
    }

    async fn fetch_versions(
        &self,
        simple_url: &str,
        package: &str,
    ) -> Result<Vec<Version>, PaddleError> {
        self.version_requests.fetch_add(1, Ordering::SeqCst);
        let key = normalize_name(package);
        if self.failing_packages.contains(&key) {
            return Err(PaddleError::NetworkError {
                operation: format!("GET {simple_url}/{key}/"),
                reason: "HTTP 500 Internal Server Error".to_string(),
            });
        }

        let Some(found) = self.index(simple_url)?.get(&key) else {
            return Ok(Vec::new());
        };
        found.versions.iter().map(|v| Version::parse(v)).collect()
    }
}
