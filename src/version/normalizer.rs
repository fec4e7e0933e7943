//! Parsing raw version strings into canonical [`Version`]s.
//!
//! Accepts the permissive spellings PEP 440 allows (`v1.0`, `1.0-BETA.2`,
//! `1.0_rev3`, `1.0-5`, ...) and folds them into one canonical value.

use super::{LocalSegment, Number, PreKind, Version};
use crate::core::PaddleError;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Full version grammar. A trailing `.*` excludes every suffix segment.
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?:
            (?P<wildcard>\.\*)
            |
            (?:
                [-_.]?
                (?P<pre_l>alpha|a|beta|b|preview|pre|rc|c)
                [-_.]?
                (?P<pre_n>[0-9]+)?
            )?
            (?:
                -(?P<post_n1>[0-9]+)
                |
                [-_.]?
                (?P<post_l>post|rev|r)
                [-_.]?
                (?P<post_n2>[0-9]+)?
            )?
            (?:
                [-_.]?
                (?P<dev_l>dev)
                [-_.]?
                (?P<dev_n>[0-9]+)?
            )?
            (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        )
        $",
    )
    .expect("version pattern is valid")
});

/// Normalizes a raw version string.
///
/// # Errors
///
/// Returns [`PaddleError::VersionParseError`] when the trimmed input does not
/// follow the grammar. The error names the remainder of the input following
/// its longest grammar-conforming prefix.
///
/// # Examples
///
/// ```rust
/// use paddle_cli::version::normalize;
///
/// assert_eq!(normalize("1.0-5")?.to_string(), "1.0.post5");
/// assert_eq!(normalize("1.0preview")?.to_string(), "1.0rc0");
/// assert!(normalize("1.0.x").is_err());
/// # Ok::<(), paddle_cli::core::PaddleError>(())
/// ```
pub fn normalize(raw: &str) -> Result<Version, PaddleError> {
    let text = raw.trim();
    let Some(captures) = VERSION_PATTERN.captures(text) else {
        return Err(PaddleError::VersionParseError {
            input: raw.to_string(),
            offending: offending_part(text).to_string(),
        });
    };

    // Every group below is digits-only by construction
    let number = |name: &str| captures.name(name).and_then(|m| Number::parse(m.as_str()));

    let epoch = number("epoch").filter(|n| !n.is_zero());
    let release = captures
        .name("release")
        .map(|m| m.as_str().split('.').filter_map(Number::parse).collect())
        .unwrap_or_default();

    Ok(Version {
        epoch,
        release,
        wildcard: captures.name("wildcard").is_some(),
        pre: pre_segment(&captures),
        post: post_segment(&captures),
        dev: captures
            .name("dev_l")
            .map(|_| number("dev_n").unwrap_or_else(Number::zero)),
        local: captures.name("local").map(|m| local_segments(m.as_str())),
        text: text.to_string(),
    })
}

fn pre_segment(captures: &Captures<'_>) -> Option<(PreKind, Number)> {
    let label = captures.name("pre_l")?.as_str().to_ascii_lowercase();
    let kind = match label.as_str() {
        "a" | "alpha" => PreKind::Alpha,
        "b" | "beta" => PreKind::Beta,
        _ => PreKind::Rc,
    };
    let number = captures
        .name("pre_n")
        .and_then(|m| Number::parse(m.as_str()))
        .unwrap_or_else(Number::zero);
    Some((kind, number))
}

fn post_segment(captures: &Captures<'_>) -> Option<Number> {
    if let Some(implicit) = captures.name("post_n1") {
        return Number::parse(implicit.as_str());
    }
    captures.name("post_l")?;
    Some(
        captures
            .name("post_n2")
            .and_then(|m| Number::parse(m.as_str()))
            .unwrap_or_else(Number::zero),
    )
}

fn local_segments(local: &str) -> Vec<LocalSegment> {
    local
        .split(['-', '_', '.'])
        .map(|segment| match Number::parse(segment) {
            Some(number) => LocalSegment::Numeric(number),
            None => LocalSegment::Text(segment.to_ascii_lowercase()),
        })
        .collect()
}

/// Longest prefix, in bytes, tried when locating the offending part.
const MAX_SCANNED_PREFIX: usize = 128;

/// The remainder of `text` after its longest prefix that is a valid version.
///
/// Only prefixes up to [`MAX_SCANNED_PREFIX`] bytes are tried.
fn offending_part(text: &str) -> &str {
    let valid_prefix_end = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .filter(|&end| end > 0 && end <= MAX_SCANNED_PREFIX)
        .rev()
        .find(|&end| VERSION_PATTERN.is_match(&text[..end]));

    match valid_prefix_end {
        Some(end) => &text[end..],
        None => text,
    }
}
