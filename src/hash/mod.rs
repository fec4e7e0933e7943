//! Content digests for incremental task execution.
//!
//! Anything a task declares as an input or output implements [`Hashable`]. The
//! digest of a single value is a SHA-256 over its content; the digest of a list
//! ([`composite_digest`]) hashes the concatenation of every element's hex
//! digest followed by a newline, so both the order of the elements and each
//! individual element affect the result.
//!
//! # Provided implementations
//!
//! - `str` / `String` - the UTF-8 bytes
//! - [`FileInput`] - file contents; directories are walked recursively in
//!   sorted order (relative path and content both count); a missing path
//!   hashes to a fixed marker so that creating it later changes the digest
//! - [`Serialized`] - any `serde::Serialize` value via its JSON form
//!   ([`hash_serialized`]), used for configuration sections

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker hashed in place of a path that does not exist.
const MISSING_PATH_MARKER: &[u8] = b"\0paddle:missing\0";

/// A hex encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Digest of raw bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value with a stable content digest.
pub trait Hashable: Send + Sync {
    /// Computes the digest of the current content.
    ///
    /// # Errors
    ///
    /// Returns an error when the content cannot be read (e.g. an unreadable file).
    fn digest(&self) -> Result<Digest>;
}

impl Hashable for str {
    fn digest(&self) -> Result<Digest> {
        Ok(Digest::of_bytes(self.as_bytes()))
    }
}

impl Hashable for String {
    fn digest(&self) -> Result<Digest> {
        self.as_str().digest()
    }
}

impl<T: Hashable + ?Sized> Hashable for std::sync::Arc<T> {
    fn digest(&self) -> Result<Digest> {
        (**self).digest()
    }
}

/// Order-sensitive digest over a list of hashables.
///
/// # Errors
///
/// Fails if any element fails to produce its digest.
pub fn composite_digest<H>(items: &[H]) -> Result<Digest>
where
    H: Hashable,
{
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item.digest()?.as_str().as_bytes());
        hasher.update(b"\n");
    }
    Ok(Digest(hex::encode(hasher.finalize())))
}

/// Digest of a serializable value through its JSON representation.
///
/// # Errors
///
/// Fails if the value cannot be serialized.
pub fn hash_serialized<T: Serialize + ?Sized>(value: &T) -> Result<Digest> {
    let json = serde_json::to_vec(value).context("Failed to serialize value for hashing")?;
    Ok(Digest::of_bytes(&json))
}

/// A serializable value used as a task input, hashed through
/// [`hash_serialized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized<T>(pub T);

impl<T: Serialize + Send + Sync> Hashable for Serialized<T> {
    fn digest(&self) -> Result<Digest> {
        hash_serialized(&self.0)
    }
}

/// A file or directory declared as a task input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    path: PathBuf,
}

impl FileInput {
    /// Wraps a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// The wrapped path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Hashable for FileInput {
    fn digest(&self) -> Result<Digest> {
        let path = &self.path;
        if !path.exists() {
            return Ok(Digest::of_bytes(MISSING_PATH_MARKER));
        }

        if path.is_file() {
            let content = std::fs::read(path)
                .with_context(|| format!("Cannot read file for hashing: {}", path.display()))?;
            return Ok(Digest::of_bytes(&content));
        }

        let mut hasher = Sha256::new();
        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to read directory entry in: {}", path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            let content = std::fs::read(entry.path()).with_context(|| {
                format!("Cannot read file for hashing: {}", entry.path().display())
            })?;
            hasher.update(relative.to_string_lossy().replace('\\', "/").as_bytes());
            hasher.update(b"\0");
            hasher.update(Digest::of_bytes(&content).as_str().as_bytes());
            hasher.update(b"\n");
        }
        Ok(Digest(hex::encode(hasher.finalize())))
    }
}
