//! Network access to "simple" package indexes.
//!
//! [`IndexClient`] is the seam between repositories and the network. The
//! production implementation, [`HttpIndexClient`], speaks both flavours of the
//! simple repository API: the JSON form (PEP 691) is requested first and the
//! HTML form (PEP 503) is accepted as a fallback.
//!
//! Distribution versions are not published as such; they are recovered from
//! the wheel and source distribution file names each package page lists.

use crate::constants::{
    INDEX_REQUEST_ATTEMPTS, INDEX_REQUEST_TIMEOUT, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS,
};
use crate::core::PaddleError;
use crate::repository::normalize_name;
use crate::version::Version;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// `Accept` header preferring the JSON API.
const SIMPLE_API_ACCEPT: &str = "application/vnd.pypi.simple.v1+json, text/html;q=0.1";

static ANCHOR_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b[^>]*>([^<]*)</a>").expect("anchor pattern is valid")
});

const SDIST_EXTENSIONS: [&str; 6] = [".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".zip", ".tar"];

/// Reads package listings from a package index.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Lists every package name the index at `simple_url` serves.
    async fn fetch_package_names(&self, simple_url: &str) -> Result<Vec<String>, PaddleError>;

    /// Lists the versions published for `package`. A package the index does
    /// not know yields an empty list.
    async fn fetch_versions(
        &self,
        simple_url: &str,
        package: &str,
    ) -> Result<Vec<Version>, PaddleError>;
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    filename: String,
}

/// Outcome of one request attempt that did not succeed.
enum Attempt {
    Retry(PaddleError),
    Fail(PaddleError),
}

impl Attempt {
    fn into_error(self) -> PaddleError {
        match self {
            Self::Retry(e) | Self::Fail(e) => e,
        }
    }
}

/// A successfully fetched index page.
struct Page {
    is_json: bool,
    body: String,
}

/// [`IndexClient`] over HTTP with per-request timeouts and bounded retries.
#[derive(Debug, Clone)]
pub struct HttpIndexClient {
    client: reqwest::Client,
}

impl HttpIndexClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be initialized (e.g. no TLS backend).
    pub fn new() -> Result<Self, PaddleError> {
        let client = reqwest::Client::builder()
            .timeout(INDEX_REQUEST_TIMEOUT)
            .user_agent(concat!("paddle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaddleError::NetworkError {
                operation: "initialize HTTP client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
        })
    }

    async fn get(&self, url: &str) -> Result<Option<Page>, PaddleError> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(INDEX_REQUEST_ATTEMPTS.saturating_sub(1));

        let retryable = |e: &Attempt| matches!(e, Attempt::Retry(_));
        RetryIf::spawn(strategy, || self.get_once(url), retryable)
            .await
            .map_err(Attempt::into_error)
    }

    async fn get_once(&self, url: &str) -> Result<Option<Page>, Attempt> {
        debug!("GET {}", url);
        let network_error = |reason: String| PaddleError::NetworkError {
            operation: format!("GET {url}"),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, SIMPLE_API_ACCEPT)
            .send()
            .await
            .map_err(|e| Attempt::Retry(network_error(e.to_string())))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error = network_error(format!("HTTP {status}"));
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                Attempt::Retry(error)
            } else {
                Attempt::Fail(error)
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        let body =
            response.text().await.map_err(|e| Attempt::Retry(network_error(e.to_string())))?;

        Ok(Some(Page {
            is_json,
            body,
        }))
    }
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn fetch_package_names(&self, simple_url: &str) -> Result<Vec<String>, PaddleError> {
        let url = format!("{simple_url}/");
        let page = self.get(&url).await?.ok_or_else(|| PaddleError::RepositoryNotFound {
            url: simple_url.to_string(),
        })?;

        if page.is_json {
            let list: ProjectList = serde_json::from_str(&page.body)?;
            Ok(list.projects.into_iter().map(|p| p.name).collect())
        } else {
            Ok(anchor_texts(&page.body))
        }
    }

    async fn fetch_versions(
        &self,
        simple_url: &str,
        package: &str,
    ) -> Result<Vec<Version>, PaddleError> {
        let url = format!("{simple_url}/{}/", normalize_name(package));
        let Some(page) = self.get(&url).await? else {
            debug!("Package {} is not listed at {}", package, simple_url);
            return Ok(Vec::new());
        };

        let filenames = if page.is_json {
            let list: FileList = serde_json::from_str(&page.body)?;
            list.files.into_iter().map(|f| f.filename).collect()
        } else {
            anchor_texts(&page.body)
        };

        Ok(versions_from_filenames(package, &filenames))
    }
}

/// Text content of every anchor in an HTML page.
fn anchor_texts(html: &str) -> Vec<String> {
    ANCHOR_TEXT
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Versions recoverable from distribution file names, deduplicated and sorted.
pub(crate) fn versions_from_filenames(package: &str, filenames: &[String]) -> Vec<Version> {
    let mut versions: Vec<Version> = filenames
        .iter()
        .filter_map(|filename| version_from_filename(package, filename))
        .collect();
    versions.sort();
    versions.dedup();
    versions
}

/// Extracts the version from a wheel or source distribution file name.
///
/// Returns `None` for other artifact kinds and for versions that do not
/// normalize.
pub(crate) fn version_from_filename(package: &str, filename: &str) -> Option<Version> {
    if let Some(stem) = filename.strip_suffix(".whl") {
        // {name}-{version}(-{build})?-{python}-{abi}-{platform}; the name never
        // contains '-' in a wheel
        return stem.split('-').nth(1).and_then(|v| Version::parse(v).ok());
    }

    let lower = filename.to_ascii_lowercase();
    let extension = SDIST_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext))?;
    let stem = &filename[..filename.len() - extension.len()];

    let wanted = normalize_name(package);
    let split_at = stem
        .match_indices('-')
        .map(|(i, _)| i)
        .find(|&i| normalize_name(&stem[..i]) == wanted)
        .or_else(|| stem.rfind('-'))?;

    Version::parse(&stem[split_at + 1..]).ok()
}
