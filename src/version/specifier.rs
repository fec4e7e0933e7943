//! Version specifiers: comma separated clauses that are ANDed together.
//!
//! ```text
//! >=1.0, <2.0, !=1.5.*
//! ~=2.2
//! ===1.0-custom
//! ```

use super::{Number, Version, normalize};
use crate::core::PaddleError;
use std::fmt;

/// A clause relation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `~=`
    Compatible,
    /// `===`
    Arbitrary,
}

impl Relation {
    /// Operator tokens in match order: a token that is a prefix of another
    /// token comes after it.
    const TOKENS: [(&'static str, Self); 8] = [
        ("<=", Self::LessOrEqual),
        (">=", Self::GreaterOrEqual),
        ("===", Self::Arbitrary),
        ("==", Self::Equal),
        ("!=", Self::NotEqual),
        ("~=", Self::Compatible),
        ("<", Self::Less),
        (">", Self::Greater),
    ];

    /// The operator token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
        }
    }

    /// Splits a leading operator off `clause`; no operator means `==`.
    fn split(clause: &str) -> (Self, &str) {
        Self::TOKENS
            .iter()
            .find_map(|(token, relation)| clause.strip_prefix(token).map(|rest| (*relation, rest)))
            .unwrap_or((Self::Equal, clause))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `relation version` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionClause {
    /// The relation operator
    pub relation: Relation,
    /// The normalized operand
    pub version: Version,
    /// The clause as written, trimmed
    pub text: String,
}

impl VersionClause {
    /// Whether `candidate` satisfies this clause.
    #[must_use]
    pub fn matches(&self, candidate: &Version) -> bool {
        let version = &self.version;
        match self.relation {
            Relation::Equal => equals(version, candidate),
            Relation::NotEqual => !equals(version, candidate),
            Relation::Less => candidate < version,
            Relation::LessOrEqual => candidate <= version,
            Relation::Greater => candidate > version,
            Relation::GreaterOrEqual => candidate >= version,
            Relation::Compatible => compatible(version, candidate),
            Relation::Arbitrary => {
                self.operand_text().eq_ignore_ascii_case(candidate.original())
            }
        }
    }

    /// The operand text, without the operator.
    fn operand_text(&self) -> &str {
        Relation::split(&self.text).1.trim()
    }
}

impl fmt::Display for VersionClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relation {
            Relation::Arbitrary => write!(f, "==={}", self.operand_text()),
            relation => write!(f, "{relation}{}", self.version),
        }
    }
}

/// `==V`, or a release prefix match for `==V.*`.
fn equals(version: &Version, candidate: &Version) -> bool {
    if version.is_wildcard() {
        return matches_prefix(version, candidate);
    }
    if version.local().is_none() {
        candidate.cmp_public(version).is_eq()
    } else {
        candidate == version
    }
}

/// Whether `candidate` has `version`'s epoch and starts with its release.
fn matches_prefix(version: &Version, candidate: &Version) -> bool {
    let epoch = |v: &Version| v.epoch().cloned().unwrap_or_else(Number::zero);
    let prefix = version.release();
    epoch(version) == epoch(candidate) && candidate.release_padded(prefix.len()) == prefix
}

/// `~=V`: `>= V` and same release lineage as `V` minus its last component.
fn compatible(version: &Version, candidate: &Version) -> bool {
    if version.is_wildcard() {
        return matches_prefix(version, candidate);
    }
    let release = version.release();
    let lineage = if release.len() > 1 { &release[..release.len() - 1] } else { release };
    let mut prefix = version.clone();
    prefix.release = lineage.to_vec();
    candidate >= version && matches_prefix(&prefix, candidate)
}

/// An ordered, non-empty list of clauses that must all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    clauses: Vec<VersionClause>,
}

impl VersionSpecifier {
    /// Parses a comma separated specifier.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::SpecifierParseError`] when the input is empty, a
    /// clause is empty, or a clause's version does not normalize.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use paddle_cli::version::{Version, VersionSpecifier};
    ///
    /// let spec = VersionSpecifier::parse(">=1.0, <2")?;
    /// assert!(spec.matches(&Version::parse("1.9")?));
    /// assert!(!spec.matches(&Version::parse("2.0")?));
    /// # Ok::<(), paddle_cli::core::PaddleError>(())
    /// ```
    pub fn parse(specifier: &str) -> Result<Self, PaddleError> {
        let error = |clause: &str, reason: String| PaddleError::SpecifierParseError {
            clause: clause.to_string(),
            specifier: specifier.to_string(),
            reason,
        };

        if specifier.trim().is_empty() {
            return Err(error("", "specifier is empty".to_string()));
        }

        let mut clauses = Vec::new();
        for raw in specifier.split(',') {
            let text = raw.trim();
            if text.is_empty() {
                return Err(error(text, "clause is empty".to_string()));
            }

            let (relation, operand) = Relation::split(text);
            let operand = operand.trim();
            if operand.is_empty() {
                return Err(error(text, format!("missing version after '{relation}'")));
            }

            let version = match relation {
                // Arbitrary equality compares text only; a normalizable operand
                // is still parsed for display, anything else is kept verbatim
                Relation::Arbitrary => {
                    normalize(operand).unwrap_or_else(|_| Version::opaque(operand))
                }
                _ => normalize(operand).map_err(|e| error(text, e.to_string()))?,
            };

            let allows_wildcard =
                matches!(relation, Relation::Equal | Relation::NotEqual | Relation::Compatible);
            if version.is_wildcard() && !allows_wildcard {
                return Err(error(text, format!("wildcards are not allowed with '{relation}'")));
            }

            clauses.push(VersionClause {
                relation,
                version,
                text: text.to_string(),
            });
        }

        Ok(Self {
            clauses,
        })
    }

    /// Whether `version` satisfies every clause.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }

    /// The clauses in written order.
    #[must_use]
    pub fn clauses(&self) -> &[VersionClause] {
        &self.clauses
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        f.write_str(&clauses.join(", "))
    }
}

impl std::str::FromStr for VersionSpecifier {
    type Err = PaddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Version {
    /// A placeholder carrying only text, for `===` operands that are not
    /// valid versions.
    fn opaque(text: &str) -> Self {
        Self {
            epoch: None,
            release: vec![Number::zero()],
            wildcard: false,
            pre: None,
            post: None,
            dev: None,
            local: None,
            text: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn spec(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    #[test]
    fn test_plain_version_is_exact_match() {
        let exact = spec("1.2.3");
        assert_eq!(exact.clauses()[0].relation, Relation::Equal);
        assert!(exact.matches(&v("1.2.3")));
        assert!(exact.matches(&v("1.2.3.0")));
        assert!(!exact.matches(&v("1.2.4")));
        assert!(!exact.matches(&v("1.2.3.post1")));
        assert!(!exact.matches(&v("1.2.3rc1")));
    }

    #[test]
    fn test_compatible_release() {
        let compat = spec("~=2.2");
        assert!(compat.matches(&v("2.2")));
        assert!(compat.matches(&v("2.2.1")));
        assert!(compat.matches(&v("2.3.0")));
        assert!(!compat.matches(&v("2.1")));
        assert!(!compat.matches(&v("3.0")));

        let patch = spec("~=1.4.5");
        assert!(patch.matches(&v("1.4.9")));
        assert!(!patch.matches(&v("1.5.0")));

        let single = spec("~=2");
        assert!(single.matches(&v("2.5")));
        assert!(!single.matches(&v("3.0")));
        assert!(!single.matches(&v("1.9")));
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(spec("===1.0").clauses()[0].relation, Relation::Arbitrary);
        assert_eq!(spec("==1.0").clauses()[0].relation, Relation::Equal);
        assert_eq!(spec("<=1.0").clauses()[0].relation, Relation::LessOrEqual);
        assert_eq!(spec(">=1.0").clauses()[0].relation, Relation::GreaterOrEqual);
        assert_eq!(spec("<1.0").clauses()[0].relation, Relation::Less);
        assert_eq!(spec(">1.0").clauses()[0].relation, Relation::Greater);
        assert_eq!(spec("!=1.0").clauses()[0].relation, Relation::NotEqual);
        assert_eq!(spec("~=1.0").clauses()[0].relation, Relation::Compatible);
    }

    #[test]
    fn test_clauses_are_anded() {
        let range = spec(">=1.0, <2.0, !=1.5");
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("1.9.9")));
        assert!(!range.matches(&v("1.5")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("0.9")));
    }

    #[test]
    fn test_wildcards() {
        let prefix = spec("==1.2.*");
        assert!(prefix.matches(&v("1.2")));
        assert!(prefix.matches(&v("1.2.7")));
        assert!(prefix.matches(&v("1.2.0rc1")));
        assert!(!prefix.matches(&v("1.3")));

        let excluded = spec("!=1.2.*");
        assert!(!excluded.matches(&v("1.2.7")));
        assert!(excluded.matches(&v("1.3")));

        assert!(spec("~=1.*").matches(&v("1.8")));
        assert!(VersionSpecifier::parse(">=1.*").is_err());
    }

    #[test]
    fn test_equality_ignores_candidate_local_label() {
        assert!(spec("==1.0").matches(&v("1.0+build.5")));
        assert!(!spec("==1.0+build.4").matches(&v("1.0+build.5")));
        assert!(spec("==1.0+build.5").matches(&v("1.0+build.5")));
    }

    #[test]
    fn test_arbitrary_equality_uses_original_text() {
        let literal = spec("===1.0-Custom");
        assert!(literal.matches(&Version::opaque("1.0-custom")));
        assert!(!literal.matches(&v("1.0")));

        let normal = spec("===1.0");
        assert!(normal.matches(&v("1.0")));
        assert!(!normal.matches(&v("1.0.0")));
    }

    #[test]
    fn test_rendering() {
        assert_eq!(spec(" >= 1.0 ,<2,~=1.4.post1 ").to_string(), ">=1.0, <2, ~=1.4.post1");
        assert_eq!(spec("1.0-BETA").to_string(), "==1.0b0");
    }

    #[test]
    fn test_parse_errors_name_clause_and_specifier() {
        match VersionSpecifier::parse(">=1.0, <2.x") {
            Err(PaddleError::SpecifierParseError {
                clause,
                specifier,
                reason,
            }) => {
                assert_eq!(clause, "<2.x");
                assert_eq!(specifier, ">=1.0, <2.x");
                assert!(reason.contains(".x"));
            }
            other => panic!("expected specifier error, got {other:?}"),
        }

        assert!(VersionSpecifier::parse("").is_err());
        assert!(VersionSpecifier::parse(">=1.0,").is_err());
        assert!(VersionSpecifier::parse(">=").is_err());
    }
}
