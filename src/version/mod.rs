//! PEP 440 version handling for package requirements.
//!
//! This module replaces plain semantic versioning with the Python packaging
//! version scheme, which is what package indexes publish.
//!
//! # Module Organization
//!
//! - [`normalizer`] - parse raw strings into canonical [`Version`]s
//! - [`specifier`] - parse and evaluate constraint strings such as `>=1.0, <2`
//! - this module - the [`Version`] type, its canonical rendering and ordering
//!
//! # Canonical form
//!
//! Versions render as `[E!]R[{a|b|rc}N][.postN][.devN][+local]`, e.g.
//! `1!2.0rc1.post3.dev4+ubuntu.1`. Normalization is idempotent: parsing the
//! rendering of a parsed version yields an equal version.
//!
//! # Ordering
//!
//! Versions compare by epoch, then by zero-padded release, then by the suffix
//! segments, so that `1.0.dev1 < 1.0a1 < 1.0 < 1.0.post1`. Local labels sort
//! after the same public version.
//!
//! # Examples
//!
//! ```rust
//! use paddle_cli::version::{Version, VersionSpecifier};
//!
//! let version = Version::parse("v1.0-BETA.2")?;
//! assert_eq!(version.to_string(), "1.0b2");
//!
//! let spec = VersionSpecifier::parse("~=1.0, !=1.3")?;
//! assert!(spec.matches(&Version::parse("1.4")?));
//! # Ok::<(), paddle_cli::core::PaddleError>(())
//! ```

pub mod normalizer;
pub mod specifier;

pub use normalizer::normalize;
pub use specifier::{Relation, VersionClause, VersionSpecifier};

use crate::core::PaddleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An arbitrary precision non-negative integer.
///
/// Stored as its canonical decimal digits (no leading zeros), which is all the
/// version grammar needs: comparison and rendering. Inputs longer than any
/// machine word are handled without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Parses a run of ASCII digits, stripping leading zeros.
    ///
    /// Returns `None` for empty input or input containing non-digits.
    #[must_use]
    pub fn parse(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        Some(Self(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }))
    }

    /// Zero.
    #[must_use]
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    /// Whether this number is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    /// The canonical decimal digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        // Canonical digits: a longer number is always larger
        self.0.len().cmp(&other.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-release kind, canonicalized to the three PEP 440 spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreKind {
    /// Alpha (`a`, `alpha`)
    Alpha,
    /// Beta (`b`, `beta`)
    Beta,
    /// Release candidate (`rc`, `c`, `pre`, `preview`)
    Rc,
}

impl PreKind {
    /// Canonical spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a local version label (`+ubuntu.1` has two).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalSegment {
    /// All-digit segment, compared numerically
    Numeric(Number),
    /// Alphanumeric segment, compared lexically (lowercase)
    Text(String),
}

impl Ord for LocalSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Text(_)) => Ordering::Greater,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A normalized PEP 440 version.
///
/// Instances are obtained from [`Version::parse`] (or [`normalize`]). Equality,
/// ordering and hashing follow PEP 440 semantics, so `1.0 == 1.0.0`; the text
/// the version was parsed from is kept for `===` comparisons only.
#[derive(Debug, Clone)]
pub struct Version {
    pub(crate) epoch: Option<Number>,
    pub(crate) release: Vec<Number>,
    pub(crate) wildcard: bool,
    pub(crate) pre: Option<(PreKind, Number)>,
    pub(crate) post: Option<Number>,
    pub(crate) dev: Option<Number>,
    pub(crate) local: Option<Vec<LocalSegment>>,
    pub(crate) text: String,
}

impl Version {
    /// Parses and normalizes a version string.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::VersionParseError`] naming the offending substring.
    pub fn parse(raw: &str) -> Result<Self, PaddleError> {
        normalize(raw)
    }

    /// Epoch, if one was given.
    #[must_use]
    pub fn epoch(&self) -> Option<&Number> {
        self.epoch.as_ref()
    }

    /// Release components (without the wildcard marker).
    #[must_use]
    pub fn release(&self) -> &[Number] {
        &self.release
    }

    /// Whether the release ends in `.*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Pre-release segment.
    #[must_use]
    pub fn pre(&self) -> Option<(PreKind, &Number)> {
        self.pre.as_ref().map(|(kind, n)| (*kind, n))
    }

    /// Post-release number.
    #[must_use]
    pub fn post(&self) -> Option<&Number> {
        self.post.as_ref()
    }

    /// Development release number.
    #[must_use]
    pub fn dev(&self) -> Option<&Number> {
        self.dev.as_ref()
    }

    /// Local version label segments.
    #[must_use]
    pub fn local(&self) -> Option<&[LocalSegment]> {
        self.local.as_deref()
    }

    /// The text this version was parsed from (trimmed).
    #[must_use]
    pub fn original(&self) -> &str {
        &self.text
    }

    /// Whether this is a pre-release or development release.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// The same version without its local label.
    #[must_use]
    pub fn public(&self) -> Self {
        let mut public = Self {
            local: None,
            ..self.clone()
        };
        public.text = public.to_string();
        public
    }

    /// Release padded with zeros (or truncated) to `len` components.
    pub(crate) fn release_padded(&self, len: usize) -> Vec<Number> {
        let mut release: Vec<Number> = self.release.iter().take(len).cloned().collect();
        while release.len() < len {
            release.push(Number::zero());
        }
        release
    }

    /// Release with trailing zeros removed; equal releases compare equal here.
    fn release_key(&self) -> &[Number] {
        let significant = self.release.iter().rposition(|n| !n.is_zero()).map_or(0, |i| i + 1);
        &self.release[..significant]
    }

    fn epoch_key(&self) -> Number {
        self.epoch.clone().unwrap_or_else(Number::zero)
    }

    fn pre_key(&self) -> SuffixKey<(PreKind, Number)> {
        match (&self.pre, &self.post, &self.dev) {
            // Dev-only releases sort before any pre-release of the same release
            (None, None, Some(_)) => SuffixKey::Below,
            (None, _, _) => SuffixKey::Above,
            (Some(pre), _, _) => SuffixKey::Value(pre.clone()),
        }
    }

    fn post_key(&self) -> SuffixKey<Number> {
        self.post.clone().map_or(SuffixKey::Below, SuffixKey::Value)
    }

    fn dev_key(&self) -> SuffixKey<Number> {
        self.dev.clone().map_or(SuffixKey::Above, SuffixKey::Value)
    }

    /// Compares public versions only, ignoring local labels.
    pub(crate) fn cmp_public(&self, other: &Self) -> Ordering {
        self.epoch_key()
            .cmp(&other.epoch_key())
            .then_with(|| self.release_key().cmp(other.release_key()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post_key().cmp(&other.post_key()))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }
}

/// Sort key for an optional suffix segment: absent segments sort either below
/// or above every present value depending on the segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SuffixKey<T> {
    Below,
    Value(T),
    Above,
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_public(other).then_with(|| match (&self.local, &other.local) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `Ord`: hash exactly the comparison keys
        self.epoch_key().hash(state);
        self.release_key().hash(state);
        self.pre_key().hash(state);
        self.post_key().hash(state);
        self.dev_key().hash(state);
        self.local.hash(state);
    }
}

impl<T: Hash> Hash for SuffixKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Below => 0u8.hash(state),
            Self::Value(value) => {
                1u8.hash(state);
                value.hash(state);
            }
            Self::Above => 2u8.hash(state),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = &self.epoch {
            write!(f, "{epoch}!")?;
        }
        let release: Vec<&str> = self.release.iter().map(Number::as_str).collect();
        f.write_str(&release.join("."))?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        if let Some((kind, number)) = &self.pre {
            write!(f, "{kind}{number}")?;
        }
        if let Some(post) = &self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = &self.dev {
            write!(f, ".dev{dev}")?;
        }
        if let Some(local) = &self.local {
            let segments: Vec<String> = local.iter().map(ToString::to_string).collect();
            write!(f, "+{}", segments.join("."))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = PaddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serialized as the text it was parsed from, so `===` clauses keep matching
/// versions restored from a cache.
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.original())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
