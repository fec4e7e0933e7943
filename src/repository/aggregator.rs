//! The set of package repositories a project resolves against.
//!
//! Repositories come from two configuration sources: the project's
//! `paddle.toml` and the user's global configuration. PyPI is always present
//! unless a repository is declared `default`, and exactly one repository is the
//! primary source: the index installers use as `--index-url`.
//!
//! # Primary source rules
//!
//! A descriptor claims the primary role when it sets `default = true` or
//! `secondary = false`. An unset `secondary` counts as `false` in the project
//! file and as `true` in the global configuration, so a bare repository entry
//! in `paddle.toml` becomes primary while the same entry in the global file
//! only adds an extra index.
//!
//! Only one non-PyPI repository may claim the role across both sources. A
//! second claim is reported as [`PaddleError::RepositoryConfigConflict`] naming
//! both repositories and the files that declared them.

use crate::constants::{PYPI_NAME, PYPI_URL};
use crate::core::PaddleError;
use crate::hash::{Digest, Hashable, composite_digest};
use crate::repository::client::IndexClient;
use crate::repository::{CacheSynchronizer, Distribution, PackageRepository, normalize_name};
use crate::version::Version;
use anyhow::Result as AnyResult;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A repository entry in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Display name
    pub name: String,
    /// Index URL, with or without the trailing `/simple`
    pub url: String,
    /// Replace PyPI entirely and act as primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    /// Only use as an extra index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<bool>,
}

impl RepositoryDescriptor {
    /// Creates a descriptor with both flags unset.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            default: None,
            secondary: None,
        }
    }

    /// Sets the `default` flag.
    #[must_use]
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the `secondary` flag.
    #[must_use]
    pub fn with_secondary(mut self, secondary: bool) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// Options for [`PackageRepositories::load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Re-fetch every repository even when a cache file exists
    pub refresh: bool,
}

/// A configuration file and the repositories it declares.
#[derive(Debug, Clone, Copy)]
pub struct RepositorySource<'a> {
    /// Human readable origin, usually a file path
    pub label: &'a str,
    /// Declared repositories in file order
    pub descriptors: &'a [RepositoryDescriptor],
}

/// The resolved repository set with its primary source.
#[derive(Debug)]
pub struct PackageRepositories {
    repositories: Vec<Arc<PackageRepository>>,
    primary_url: String,
}

impl PackageRepositories {
    /// Merges the project's and the global repository declarations.
    ///
    /// # Errors
    ///
    /// - [`PaddleError::InvalidRepositoryUrl`] for a malformed URL
    /// - [`PaddleError::RepositoryConfigConflict`] for a second primary claim
    pub fn resolve(
        local: RepositorySource<'_>,
        global: RepositorySource<'_>,
    ) -> Result<Self, PaddleError> {
        let pypi = Arc::new(PackageRepository::new(PYPI_URL, PYPI_NAME)?);
        let mut repositories = vec![Arc::clone(&pypi)];
        let mut primary = pypi;
        let mut primary_source = "built-in defaults".to_string();
        let mut drop_pypi = false;

        for (source, secondary_by_default) in [(local, false), (global, true)] {
            for descriptor in source.descriptors {
                let candidate = PackageRepository::new(&descriptor.url, &descriptor.name)?;
                let repo = match repositories.iter().find(|r| r.url() == candidate.url()) {
                    Some(existing) => Arc::clone(existing),
                    None => {
                        let repo = Arc::new(candidate);
                        repositories.push(Arc::clone(&repo));
                        repo
                    }
                };

                let is_default = descriptor.default == Some(true);
                let claims_primary =
                    is_default || !descriptor.secondary.unwrap_or(secondary_by_default);
                if !claims_primary {
                    continue;
                }

                if primary.url() != PYPI_URL && primary.url() != repo.url() {
                    return Err(PaddleError::RepositoryConfigConflict {
                        first: primary.name().to_string(),
                        first_source: primary_source,
                        second: descriptor.name.clone(),
                        second_source: source.label.to_string(),
                    });
                }
                debug!("Repository {} claims primary from {}", repo.name(), source.label);
                primary = repo;
                primary_source = source.label.to_string();
                drop_pypi |= is_default;
            }
        }

        if drop_pypi {
            repositories.retain(|r| r.url() != PYPI_URL || r.url() == primary.url());
        }

        Ok(Self {
            primary_url: primary.url().to_string(),
            repositories,
        })
    }

    /// Loads every repository index before first use.
    ///
    /// Repositories with a usable cache file in `index_dir` are restored from
    /// it; the others are fetched concurrently and persisted immediately. With
    /// `refresh` set, every repository is re-fetched.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error after every fetch has finished.
    pub async fn load(
        &self,
        client: &dyn IndexClient,
        index_dir: &Path,
        options: LoadOptions,
    ) -> Result<(), PaddleError> {
        let mut pending = Vec::new();
        for repo in &self.repositories {
            if options.refresh {
                pending.push(repo);
                continue;
            }
            if repo.is_loaded() {
                continue;
            }
            match repo.load_cache(index_dir).await {
                Ok(()) => info!("Using cached index of {}", repo.name()),
                Err(e) => {
                    if repo.cache_path(index_dir).exists() {
                        warn!("Ignoring unusable index cache: {}", e);
                    } else {
                        debug!("No index cache for {}", repo.name());
                    }
                    pending.push(repo);
                }
            }
        }

        let results = join_all(pending.into_iter().map(|repo| async move {
            let result = if options.refresh && repo.is_loaded() {
                repo.refresh(client).await
            } else {
                repo.fetch_index(client).await
            };
            (repo, result)
        }))
        .await;

        let mut first_error = None;
        for (repo, result) in results {
            match result {
                Ok(()) => {
                    if let Err(e) = repo.save_cache(index_dir).await {
                        warn!("Failed to persist index of {}: {}", repo.name(), e);
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch index of {}: {}", repo.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Persists every repository cache.
    ///
    /// # Errors
    ///
    /// Returns the first failure after attempting every repository.
    pub async fn save_all(&self, index_dir: &Path) -> Result<(), PaddleError> {
        let mut first_error = None;
        for repo in &self.repositories {
            if let Err(e) = repo.save_cache(index_dir).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Starts persisting every repository cache into `index_dir` each `period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cache_sync(
        self: &Arc<Self>,
        index_dir: PathBuf,
        period: Duration,
    ) -> CacheSynchronizer {
        CacheSynchronizer::start(Arc::clone(self), index_dir, period)
    }

    /// All repositories in insertion order.
    pub fn all(&self) -> &[Arc<PackageRepository>] {
        &self.repositories
    }

    /// The primary source.
    pub fn primary(&self) -> &Arc<PackageRepository> {
        self.repositories
            .iter()
            .find(|r| self.is_primary(r))
            .unwrap_or(&self.repositories[0])
    }

    /// Every repository except the primary source.
    pub fn extra_sources(&self) -> Vec<&Arc<PackageRepository>> {
        self.repositories.iter().filter(|r| !self.is_primary(r)).collect()
    }

    fn is_primary(&self, repo: &PackageRepository) -> bool {
        repo.url() == self.primary_url
    }

    /// Installer arguments: the primary as `--index-url`, then one
    /// `--extra-index-url` per other repository.
    pub fn installer_args(&self) -> Vec<String> {
        let mut args = vec!["--index-url".to_string(), self.primary().url_simple()];
        for repo in self.extra_sources() {
            args.push("--extra-index-url".to_string());
            args.push(repo.url_simple());
        }
        args
    }

    /// The repository serving `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::RepositoryNotFound`] when no repository's base URL
    /// prefixes `url`.
    pub fn repository_for_url(&self, url: &str) -> Result<&Arc<PackageRepository>, PaddleError> {
        self.repositories
            .iter()
            .filter(|r| url.starts_with(r.url()))
            .max_by_key(|r| r.url().len())
            .ok_or_else(|| PaddleError::RepositoryNotFound {
                url: url.to_string(),
            })
    }

    /// Packages whose name starts with `prefix`, each attributed to one
    /// repository: the primary when it lists the package, otherwise the first
    /// repository in order that does.
    pub async fn find_packages_by_prefix(
        &self,
        prefix: &str,
    ) -> BTreeMap<String, Arc<PackageRepository>> {
        let lookups = self
            .repositories
            .iter()
            .map(|r| async move { (r, r.find_packages_by_prefix(prefix).await) });
        let per_repository = join_all(lookups).await;

        let mut merged: BTreeMap<String, (String, &Arc<PackageRepository>)> = BTreeMap::new();
        for (repo, names) in per_repository {
            for name in names {
                self.merge(&mut merged, normalize_name(&name), (name, repo), repo);
            }
        }
        merged.into_values().map(|(name, repo)| (name, Arc::clone(repo))).collect()
    }

    /// Distributions of `name` across every repository, sorted by version.
    ///
    /// A distribution listed by several repositories is attributed to the
    /// primary when it is among them, otherwise to the first in order.
    pub async fn find_distributions(&self, name: &str) -> Vec<Distribution> {
        let lookups =
            self.repositories.iter().map(|r| async move { (r, r.find_distributions(name).await) });
        let per_repository = join_all(lookups).await;

        let mut merged: BTreeMap<(Version, String), Distribution> = BTreeMap::new();
        for (repo, infos) in per_repository {
            for info in infos {
                let key = (info.version.clone(), normalize_name(&info.name));
                self.merge(&mut merged, key, repo.distribution(info), repo);
            }
        }
        merged.into_values().collect()
    }

    fn merge<K: Ord, V>(
        &self,
        merged: &mut BTreeMap<K, V>,
        key: K,
        value: V,
        source: &PackageRepository,
    ) {
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                if self.is_primary(source) {
                    slot.insert(value);
                }
            }
        }
    }

    /// Fetches the versions of `name` from every repository that lists the
    /// package but has not loaded its versions yet. Returns the number of
    /// repositories that were queried.
    pub async fn ensure_distributions(&self, client: &dyn IndexClient, name: &str) -> usize {
        let mut pending = Vec::new();
        for repo in &self.repositories {
            if repo.needs_distributions(name).await {
                pending.push(repo);
            }
        }

        let names = [name.to_string()];
        join_all(pending.iter().map(|repo| repo.fetch_distributions(client, &names))).await;
        pending.len()
    }
}

impl Hashable for PackageRepositories {
    fn digest(&self) -> AnyResult<Digest> {
        let mut parts: Vec<String> =
            self.repositories.iter().map(|r| format!("{} {}", r.name(), r.url())).collect();
        parts.push(format!("primary {}", self.primary_url));
        composite_digest(&parts)
    }
}
