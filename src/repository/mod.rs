//! Package repositories and their cached indexes.
//!
//! A [`PackageRepository`] is one package index (PyPI or a private mirror).
//! It keeps an in-memory map from package name to the versions published for
//! it, backed by a JSON cache file so that later runs start without touching
//! the network.
//!
//! # Index lifecycle
//!
//! 1. [`PackageRepository::load_cache`] restores the index from disk, or
//!    [`PackageRepository::fetch_index`] lists the package names from the network
//! 2. [`PackageRepository::fetch_distributions`] lazily loads versions for the
//!    packages that are actually requested
//! 3. [`PackageRepository::save_cache`] persists a consistent snapshot
//!
//! The index sits behind a `RwLock<Arc<PackageIndex>>`: readers clone the
//! `Arc` and release the lock immediately, writers fetch off-lock and then
//! swap in a complete new index. A snapshot is never a mix of two states.
//!
//! # Module Organization
//!
//! - [`client`] - the network seam ([`IndexClient`]) and its HTTP implementation
//! - [`aggregator`] - the set of configured repositories and the primary rules
//! - [`sync`] - periodic background persistence of every repository cache

pub mod aggregator;
pub mod client;
pub mod sync;

pub use aggregator::{LoadOptions, PackageRepositories, RepositoryDescriptor, RepositorySource};
pub use client::{HttpIndexClient, IndexClient};
pub use sync::CacheSynchronizer;

use crate::constants::MAX_CONCURRENT_PACKAGE_FETCHES;
use crate::core::PaddleError;
use crate::utils::atomic_write;
use crate::version::Version;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Normalizes a package name for comparison: lowercase, with every run of
/// `-`, `_` and `.` collapsed into a single `-`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    normalized
}

/// The identity of one artifact inside an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DistributionInfo {
    /// Package name as the index lists it
    pub name: String,
    /// Normalized version
    pub version: Version,
}

/// A distribution together with the repository it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Distribution {
    /// Name and version
    pub info: DistributionInfo,
    /// Display name of the source repository
    pub repository_name: String,
    /// Base URL of the source repository
    pub repository_url: String,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={} ({})", self.info.name, self.info.version, self.repository_name)
    }
}

/// One package in an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name as the index lists it
    pub name: String,
    /// Published versions, `None` until they have been fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeSet<Version>>,
}

/// The package index of one repository, keyed by normalized package name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Packages by normalized name
    #[serde(default)]
    pub packages: BTreeMap<String, PackageEntry>,
}

impl PackageIndex {
    /// Builds an index listing `names`, keeping already loaded versions of
    /// packages that `previous` knew.
    fn from_names(names: Vec<String>, previous: &Self) -> Self {
        let packages = names
            .into_iter()
            .map(|name| {
                let key = normalize_name(&name);
                let versions = previous.packages.get(&key).and_then(|e| e.versions.clone());
                (
                    key,
                    PackageEntry {
                        name,
                        versions,
                    },
                )
            })
            .collect();
        Self {
            packages,
        }
    }

    fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.get(&normalize_name(name))
    }
}

/// On-disk form of a repository cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    url: String,
    name: String,
    index: PackageIndex,
}

/// One package index.
#[derive(Debug)]
pub struct PackageRepository {
    url: String,
    name: String,
    index: RwLock<Arc<PackageIndex>>,
    loaded: AtomicBool,
}

impl PackageRepository {
    /// Creates a repository with an empty, not yet loaded index.
    ///
    /// A trailing `/` and `/simple` are stripped from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::InvalidRepositoryUrl`] unless `url` is an
    /// absolute `http` or `https` URL with a host.
    pub fn new(url: &str, name: &str) -> Result<Self, PaddleError> {
        let url = base_url(url)?;
        Ok(Self {
            url,
            name: name.to_string(),
            index: RwLock::new(Arc::new(PackageIndex::default())),
            loaded: AtomicBool::new(false),
        })
    }

    /// Base URL, without `/simple`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL of the simple API root.
    pub fn url_simple(&self) -> String {
        format!("{}/simple", self.url)
    }

    /// Whether the index has been loaded from cache or fetched.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Deterministic cache file name derived from the repository identity.
    pub fn cache_file_name(&self) -> String {
        let sanitized: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        let url_hash = hex::encode(hasher.finalize());
        format!("{sanitized}-{}.json", &url_hash[..16])
    }

    /// Path of the cache file inside `index_dir`.
    pub fn cache_path(&self, index_dir: &Path) -> PathBuf {
        index_dir.join(self.cache_file_name())
    }

    /// A consistent snapshot of the current index.
    pub async fn snapshot(&self) -> Arc<PackageIndex> {
        Arc::clone(&*self.index.read().await)
    }

    async fn replace_index(&self, index: PackageIndex) {
        *self.index.write().await = Arc::new(index);
        self.loaded.store(true, Ordering::Release);
    }

    /// Fetches the list of package names from the network.
    ///
    /// Versions already loaded for packages that are still listed are kept.
    ///
    /// # Errors
    ///
    /// Returns the client's error; the current index is left untouched.
    pub async fn fetch_index(&self, client: &dyn IndexClient) -> Result<(), PaddleError> {
        let names = client.fetch_package_names(&self.url_simple()).await?;
        info!("Fetched {} package names from repository {}", names.len(), self.name);

        let mut guard = self.index.write().await;
        let index = PackageIndex::from_names(names, &guard);
        *guard = Arc::new(index);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Fetches the versions of `names` with bounded concurrency.
    ///
    /// A package whose fetch fails is logged and skipped. Returns how many
    /// packages were loaded.
    pub async fn fetch_distributions(&self, client: &dyn IndexClient, names: &[String]) -> usize {
        let simple_url = self.url_simple();
        let simple_url = simple_url.as_str();
        let fetches: Vec<_> = names
            .iter()
            .map(|name| async move {
                (name.clone(), client.fetch_versions(simple_url, name).await)
            })
            .collect();
        let results: Vec<(String, Result<Vec<Version>, PaddleError>)> = stream::iter(fetches)
            .buffer_unordered(MAX_CONCURRENT_PACKAGE_FETCHES)
            .collect()
            .await;

        let mut fetched = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(versions) => fetched.push((name, versions)),
                Err(e) => {
                    warn!("Failed to fetch distributions of {} from {}: {}", name, self.name, e);
                }
            }
        }
        let count = fetched.len();

        let mut guard = self.index.write().await;
        let mut index = PackageIndex::clone(&guard);
        for (name, versions) in fetched {
            debug!("Loaded {} versions of {} from {}", versions.len(), name, self.name);
            let entry = index.packages.entry(normalize_name(&name)).or_insert_with(|| PackageEntry {
                name: name.clone(),
                versions: None,
            });
            entry.versions = Some(versions.into_iter().collect());
        }
        *guard = Arc::new(index);
        count
    }

    /// Re-fetches the package listing and the versions of every package that
    /// had versions loaded.
    ///
    /// # Errors
    ///
    /// Fails if the package listing cannot be fetched.
    pub async fn refresh(&self, client: &dyn IndexClient) -> Result<(), PaddleError> {
        let loaded: Vec<String> = self
            .snapshot()
            .await
            .packages
            .values()
            .filter(|entry| entry.versions.is_some())
            .map(|entry| entry.name.clone())
            .collect();

        self.fetch_index(client).await?;
        if !loaded.is_empty() {
            self.fetch_distributions(client, &loaded).await;
        }
        Ok(())
    }

    /// Restores the index from its cache file in `index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::CacheIoError`] when the file is missing,
    /// unreadable, corrupt, or belongs to another repository.
    pub async fn load_cache(&self, index_dir: &Path) -> Result<(), PaddleError> {
        let path = self.cache_path(index_dir);
        let cache_error = |reason: String| PaddleError::CacheIoError {
            path: path.display().to_string(),
            reason,
        };

        let content = tokio::fs::read(&path).await.map_err(|e| cache_error(e.to_string()))?;
        let cache: CacheFile =
            serde_json::from_slice(&content).map_err(|e| cache_error(e.to_string()))?;
        if cache.url != self.url {
            return Err(cache_error(format!("cache belongs to {}", cache.url)));
        }

        debug!("Loaded index of {} from {}", self.name, path.display());
        self.replace_index(cache.index).await;
        Ok(())
    }

    /// Persists a snapshot of the index to its cache file in `index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::CacheIoError`] if the file cannot be written.
    pub async fn save_cache(&self, index_dir: &Path) -> Result<(), PaddleError> {
        let path = self.cache_path(index_dir);
        let snapshot = self.snapshot().await;
        let cache = CacheFile {
            url: self.url.clone(),
            name: self.name.clone(),
            index: PackageIndex::clone(&snapshot),
        };

        let content = serde_json::to_vec(&cache)?;
        atomic_write(&path, &content).map_err(|e| PaddleError::CacheIoError {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        })?;
        debug!("Saved index of {} to {}", self.name, path.display());
        Ok(())
    }

    /// Names of listed packages whose normalized name starts with the
    /// normalized `prefix`.
    pub async fn find_packages_by_prefix(&self, prefix: &str) -> BTreeSet<String> {
        let prefix = normalize_name(prefix);
        self.snapshot()
            .await
            .packages
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, entry)| entry.name.clone())
            .collect()
    }

    /// Loaded distributions of `name`; empty when the package is unknown or its
    /// versions have not been fetched.
    pub async fn find_distributions(&self, name: &str) -> BTreeSet<DistributionInfo> {
        let snapshot = self.snapshot().await;
        let Some(entry) = snapshot.entry(name) else {
            return BTreeSet::new();
        };
        entry
            .versions
            .iter()
            .flatten()
            .map(|version| DistributionInfo {
                name: entry.name.clone(),
                version: version.clone(),
            })
            .collect()
    }

    /// Whether `name` is listed but its versions have not been fetched yet.
    pub async fn needs_distributions(&self, name: &str) -> bool {
        self.snapshot().await.entry(name).is_some_and(|entry| entry.versions.is_none())
    }

    /// Attributes `info` to this repository.
    pub fn distribution(&self, info: DistributionInfo) -> Distribution {
        Distribution {
            info,
            repository_name: self.name.clone(),
            repository_url: self.url.clone(),
        }
    }
}

/// Validates `url` and strips a trailing `/` and `/simple`.
fn base_url(url: &str) -> Result<String, PaddleError> {
    let invalid = || PaddleError::InvalidRepositoryUrl {
        url: url.to_string(),
    };
    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    let mut base = url.trim().trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix("/simple") {
        base = stripped;
    }
    Ok(base.trim_end_matches('/').to_string())
}
