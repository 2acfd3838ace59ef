//! Version parsing, loose and strict.
//!
//! The loose grammar is the one npm applies to dependency specifiers: it
//! tolerates a `v`/`=` prefix, surrounding whitespace and a prerelease
//! without its leading dash (`4.2.3rc0`). The strict grammar is plain
//! SemVer 2.0.0 with an optional `v` prefix.

use crate::error::ParseSemverError;
use node_semver::{Identifier, Version};
use once_cell::sync::Lazy;
use regex::Regex;
use specsrv_core::{SemverVersion, prerelease_id};

/// Longest version string npm accepts.
pub const MAX_LENGTH: usize = 256;

pub(crate) const PRERELEASE_ID_LOOSE: &str = r"(?:\d+|\d*[a-zA-Z-][a-zA-Z0-9-]*)";
pub(crate) const BUILD: &str = r"(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))";

/// Loose prerelease, one capture group.
pub(crate) fn prerelease_loose() -> String {
    format!(r"(?:-?({id}(?:\.{id})*))", id = PRERELEASE_ID_LOOSE)
}

/// Parses a version with npm's loose grammar.
///
/// Returns `None` for anything that is not a single full version, including
/// partial versions (`1.2`) and ranges.
///
/// # Examples
///
/// ```
/// use specsrv_npm::parse_loose;
///
/// let v = parse_loose("v4.2.3rc0").unwrap();
/// assert_eq!((v.major, v.minor, v.patch), (4, 2, 3));
/// assert!(parse_loose("1.2").is_none());
/// ```
pub fn parse_loose(input: &str) -> Option<Version> {
    static LOOSE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"^[v=\s]*(\d+)\.(\d+)\.(\d+){}?{}?$",
            prerelease_loose(),
            BUILD
        ))
        .unwrap()
    });

    if input.len() > MAX_LENGTH {
        return None;
    }

    let caps = LOOSE.captures(input.trim())?;
    Some(Version {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
        patch: caps[3].parse().ok()?,
        pre_release: caps.get(4).map(|m| identifiers(m.as_str())).unwrap_or_default(),
        build: caps.get(5).map(|m| identifiers(m.as_str())).unwrap_or_default(),
    })
}

/// Splits a dotted identifier list.
pub(crate) fn identifiers(s: &str) -> Vec<Identifier> {
    s.split('.')
        .map(|token| {
            if token.bytes().all(|b| b.is_ascii_digit())
                && let Ok(n) = token.parse::<u64>()
            {
                Identifier::Numeric(n)
            } else {
                Identifier::AlphaNumeric(token.to_string())
            }
        })
        .collect()
}

/// Parses a single, complete SemVer 2.0.0 version.
///
/// Leading zeros in numeric parts are rejected, as are empty prerelease or
/// build sections. Surrounding whitespace and a `v` prefix are allowed.
///
/// # Errors
///
/// [`ParseSemverError::Malformed`] when the input does not match the grammar,
/// [`ParseSemverError::Overflow`] when a numeric part does not fit in `u64`.
///
/// # Examples
///
/// ```
/// use specsrv_core::PrereleaseId;
/// use specsrv_npm::parse_semver;
///
/// let v = parse_semver("1.2.3-7.alpha1+9.beta3").unwrap();
/// assert_eq!(v.prerelease, vec![PrereleaseId::Int(7), PrereleaseId::String("alpha1".into())]);
/// assert_eq!(v.build, vec!["9".to_string(), "beta3".to_string()]);
/// assert!(parse_semver("1.2..3").is_err());
/// ```
pub fn parse_semver(input: &str) -> Result<SemverVersion, ParseSemverError> {
    static STRICT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^v?(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][a-zA-Z0-9-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][a-zA-Z0-9-]*))*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
        )
        .unwrap()
    });

    let caps = STRICT
        .captures(input.trim())
        .ok_or_else(|| ParseSemverError::Malformed(input.to_string()))?;

    let number = |i: usize| {
        caps[i]
            .parse::<u64>()
            .map_err(|_| ParseSemverError::Overflow(input.to_string()))
    };

    Ok(SemverVersion {
        major: number(1)?,
        minor: number(2)?,
        patch: number(3)?,
        prerelease: caps
            .get(4)
            .map(|m| m.as_str().split('.').map(prerelease_id).collect())
            .unwrap_or_default(),
        build: caps
            .get(5)
            .map(|m| m.as_str().split('.').map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsrv_core::PrereleaseId;

    fn with(prerelease: Vec<PrereleaseId>, build: Vec<&str>) -> SemverVersion {
        SemverVersion {
            prerelease,
            build: build.into_iter().map(String::from).collect(),
            ..SemverVersion::new(1, 2, 3)
        }
    }

    #[test]
    fn test_parse_semver_plain() {
        assert_eq!(parse_semver("1.2.3").unwrap(), SemverVersion::new(1, 2, 3));
        assert_eq!(parse_semver("0.0.0").unwrap(), SemverVersion::new(0, 0, 0));
        assert_eq!(parse_semver("83.12.0").unwrap(), SemverVersion::new(83, 12, 0));
        assert_eq!(parse_semver("v0.2.0").unwrap(), SemverVersion::new(0, 2, 0));
    }

    #[test]
    fn test_parse_semver_prerelease_and_build() {
        assert_eq!(
            parse_semver("1.2.3-alpha1.6").unwrap(),
            with(vec![PrereleaseId::String("alpha1".into()), PrereleaseId::Int(6)], vec![])
        );
        assert_eq!(
            parse_semver("1.2.3+9.beta3-7.alpha1").unwrap(),
            with(vec![], vec!["9", "beta3-7", "alpha1"])
        );
        assert_eq!(parse_semver("1.2.3+-").unwrap(), with(vec![], vec!["-"]));
        assert_eq!(
            parse_semver("1.2.3-beta-1-2-3").unwrap(),
            with(vec![PrereleaseId::String("beta-1-2-3".into())], vec![])
        );
    }

    #[test]
    fn test_parse_semver_rejects() {
        for input in [
            "1.a.3", "1.3", "1.3.4.5", "1", "1.2..3", "-2.2.3", "2.-3.3", "3.2.-3", "4.2.3-",
            "4.2.6+", "+", "-", "", "1.2.3-+", "1.2.3-.", "1.2.3+.", "01.2.3", "1.2.3-01",
        ] {
            assert!(
                matches!(parse_semver(input), Err(ParseSemverError::Malformed(_))),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_semver_overflow() {
        assert!(matches!(
            parse_semver("99999999999999999999.0.0"),
            Err(ParseSemverError::Overflow(_))
        ));
    }

    #[test]
    fn test_loose_accepts_npm_forms() {
        let v = parse_loose(" =v1.2.3 ").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));

        let v = parse_loose("4.2.3-").unwrap();
        assert_eq!(v.pre_release, vec![Identifier::AlphaNumeric("-".into())]);

        let v = parse_loose("1.2.3-alpha.5+sha").unwrap();
        assert_eq!(
            v.pre_release,
            vec![Identifier::AlphaNumeric("alpha".into()), Identifier::Numeric(5)]
        );
        assert_eq!(v.build, vec![Identifier::AlphaNumeric("sha".into())]);
    }

    #[test]
    fn test_loose_rejects_ranges_and_partials() {
        for input in ["1.2", "^1.2.3", "1.x", "latest", "", "1.2.3 - 2.0.0"] {
            assert!(parse_loose(input).is_none(), "{:?}", input);
        }
        assert!(parse_loose(&"1".repeat(MAX_LENGTH + 1)).is_none());
    }
}
