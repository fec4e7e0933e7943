//! Version normalization and specifier matching through the public API.

use paddle_cli::core::PaddleError;
use paddle_cli::version::{Version, VersionSpecifier, normalize};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

#[test]
fn test_release_lifecycle_ordering() {
    let chain = [
        "1.0.dev1",
        "1.0a1.dev1",
        "1.0a1",
        "1.0a2",
        "1.0b1",
        "1.0rc1",
        "1.0",
        "1.0+local",
        "1.0.post1.dev1",
        "1.0.post1",
        "1.1",
        "1!0.1",
    ];
    for pair in chain.windows(2) {
        assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
    }
}

#[test]
fn test_permissive_spellings_normalize() {
    let cases = [
        ("v1.0", "1.0"),
        ("1.0-5", "1.0.post5"),
        ("1.0_rev3", "1.0.post3"),
        ("1.0-BETA.2", "1.0b2"),
        ("1.0preview", "1.0rc0"),
        ("1.0c1", "1.0rc1"),
        ("1.0.dev", "1.0.dev0"),
        ("0!01.002", "1.2"),
        ("1.0+Ubuntu-1", "1.0+ubuntu.1"),
    ];
    for (raw, canonical) in cases {
        assert_eq!(normalize(raw).unwrap().to_string(), canonical, "{raw}");
    }
}

#[test]
fn test_equal_versions_with_different_spellings() {
    assert_eq!(v("1.0-5"), v("1.0.post5"));
    assert_eq!(v("1.0"), v("1.0.0.0"));
    assert_eq!(v("1.0"), v("0!1.0"));
}

#[test]
fn test_invalid_version_names_offending_part() {
    let err = normalize("1.0.x").unwrap_err();
    match err {
        PaddleError::VersionParseError {
            input,
            offending,
        } => {
            assert_eq!(input, "1.0.x");
            assert!(offending.contains('x'), "offending part was {offending:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_compatible_release_bounds() {
    let spec = VersionSpecifier::parse("~=2.2").unwrap();
    assert!(spec.matches(&v("2.2")));
    assert!(spec.matches(&v("2.9.1")));
    assert!(!spec.matches(&v("3.0")));
    assert!(!spec.matches(&v("2.1")));

    let patch = VersionSpecifier::parse("~=1.4.5").unwrap();
    assert!(patch.matches(&v("1.4.9")));
    assert!(!patch.matches(&v("1.5.0")));
}

#[test]
fn test_range_and_exclusion() {
    let spec = VersionSpecifier::parse(">=1.0, <2, !=1.5.*").unwrap();
    assert!(spec.matches(&v("1.0")));
    assert!(spec.matches(&v("1.4.9")));
    assert!(!spec.matches(&v("1.5.2")));
    assert!(spec.matches(&v("1.6")));
    assert!(!spec.matches(&v("2.0")));
    assert_eq!(spec.to_string(), ">=1.0, <2, !=1.5.*");
}

#[test]
fn test_malformed_specifiers_are_rejected() {
    for bad in ["", ">=1.0,", ">=", ">=1.*", "==banana"] {
        assert!(VersionSpecifier::parse(bad).is_err(), "{bad:?} should not parse");
    }
}
