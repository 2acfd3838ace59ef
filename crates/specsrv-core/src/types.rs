//! Canonical wire types.
//!
//! Everything here serializes with serde's externally tagged enum layout,
//! which is the JSON shape the peer process decodes:
//!
//! ```json
//! {"Range": [[{"Gte": {"major": 1, "minor": 2, "patch": 3, "prerelease": [], "build": []}}]]}
//! {"Alias": ["bar", null, {"Tag": "next"}]}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A classified dependency specifier.
///
/// # Examples
///
/// ```
/// use specsrv_core::{AliasSubspec, PackageSpecifier};
///
/// let spec = PackageSpecifier::Alias("bar".into(), None, AliasSubspec::Tag("next".into()));
/// let json = serde_json::to_string(&spec).unwrap();
/// assert_eq!(json, r#"{"Alias":["bar",null,{"Tag":"next"}]}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageSpecifier {
    Git(String),
    Range(VersionConstraint),
    Tag(String),
    File(String),
    Directory(String),
    Remote(String),
    /// `(name, registry, inner)`. The inner specifier can only be a tag or a
    /// range, so aliases never nest.
    Alias(String, Option<String>, AliasSubspec),
}

impl PackageSpecifier {
    /// Name of the active variant, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Git(_) => "Git",
            Self::Range(_) => "Range",
            Self::Tag(_) => "Tag",
            Self::File(_) => "File",
            Self::Directory(_) => "Directory",
            Self::Remote(_) => "Remote",
            Self::Alias(..) => "Alias",
        }
    }
}

/// The specifier an alias points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasSubspec {
    Range(VersionConstraint),
    Tag(String),
}

impl From<AliasSubspec> for PackageSpecifier {
    fn from(sub: AliasSubspec) -> Self {
        match sub {
            AliasSubspec::Range(range) => Self::Range(range),
            AliasSubspec::Tag(tag) => Self::Tag(tag),
        }
    }
}

/// A range in disjunctive normal form: OR of AND-groups of comparators.
///
/// Both levels keep the order produced by the range parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionConstraint(pub Vec<Vec<Comparator>>);

impl VersionConstraint {
    /// Number of OR branches.
    pub fn branches(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<Comparator>> {
        self.0.iter()
    }
}

/// One bound of an AND-group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Any,
    Eq(SemverVersion),
    Gt(SemverVersion),
    Gte(SemverVersion),
    Lt(SemverVersion),
    Lte(SemverVersion),
}

impl Comparator {
    /// The bound version, `None` for [`Comparator::Any`].
    pub fn version(&self) -> Option<&SemverVersion> {
        match self {
            Self::Any => None,
            Self::Eq(v) | Self::Gt(v) | Self::Gte(v) | Self::Lt(v) | Self::Lte(v) => Some(v),
        }
    }
}

/// Wire record of a single semantic version.
///
/// # Examples
///
/// ```
/// use specsrv_core::{PrereleaseId, SemverVersion};
///
/// let v = SemverVersion {
///     prerelease: vec![PrereleaseId::String("rc".into()), PrereleaseId::Int(1)],
///     build: vec!["sha".into()],
///     ..SemverVersion::new(1, 2, 3)
/// };
/// assert_eq!(v.to_string(), "1.2.3-rc.1+sha");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SemverVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Vec<PrereleaseId>,
    pub build: Vec<String>,
}

impl SemverVersion {
    /// A release version without prerelease or build identifiers.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: Vec::new(),
        }
    }
}

impl fmt::Display for SemverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, id) in self.prerelease.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            write!(f, "{}", id)?;
        }
        for (i, id) in self.build.iter().enumerate() {
            f.write_str(if i == 0 { "+" } else { "." })?;
            f.write_str(id)?;
        }
        Ok(())
    }
}

/// Prerelease identifier.
///
/// Numeric identifiers order numerically and before alphanumeric ones, so
/// the kind is recorded rather than re-derived by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrereleaseId {
    String(String),
    Int(u64),
}

impl fmt::Display for PrereleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_any_is_bare_string() {
        let json = serde_json::to_string(&Comparator::Any).unwrap();
        assert_eq!(json, r#""Any""#);
    }

    #[test]
    fn test_range_wire_shape() {
        let spec = PackageSpecifier::Range(VersionConstraint(vec![vec![
            Comparator::Gte(SemverVersion::new(1, 2, 3)),
            Comparator::Lt(SemverVersion::new(2, 0, 0)),
        ]]));
        insta::assert_snapshot!(
            serde_json::to_string(&spec).unwrap(),
            @r#"{"Range":[[{"Gte":{"major":1,"minor":2,"patch":3,"prerelease":[],"build":[]}},{"Lt":{"major":2,"minor":0,"patch":0,"prerelease":[],"build":[]}}]]}"#
        );
    }

    #[test]
    fn test_prerelease_wire_shape() {
        let v = SemverVersion {
            prerelease: vec![PrereleaseId::String("alpha".into()), PrereleaseId::Int(5)],
            ..SemverVersion::new(1, 0, 0)
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(
            json["prerelease"],
            serde_json::json!([{"String": "alpha"}, {"Int": 5}])
        );
    }

    #[test]
    fn test_alias_decodes() {
        let json = r#"{"Alias":["@bar/baz",null,{"Range":[["Any"]]}]}"#;
        let spec: PackageSpecifier = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec,
            PackageSpecifier::Alias(
                "@bar/baz".into(),
                None,
                AliasSubspec::Range(VersionConstraint(vec![vec![Comparator::Any]]))
            )
        );
    }

    #[test]
    fn test_version_display() {
        assert_eq!(SemverVersion::new(0, 0, 0).to_string(), "0.0.0");
        let v = SemverVersion {
            prerelease: vec![PrereleaseId::Int(7), PrereleaseId::String("alpha1".into())],
            build: vec!["9".into(), "beta3".into()],
            ..SemverVersion::new(1, 2, 3)
        };
        assert_eq!(v.to_string(), "1.2.3-7.alpha1+9.beta3");
    }

    #[test]
    fn test_comparator_version_accessor() {
        assert!(Comparator::Any.version().is_none());
        let v = SemverVersion::new(1, 0, 0);
        assert_eq!(Comparator::Lte(v.clone()).version(), Some(&v));
    }

    #[test]
    fn test_subspec_promotion() {
        let spec: PackageSpecifier = AliasSubspec::Tag("next".into()).into();
        assert_eq!(spec, PackageSpecifier::Tag("next".into()));
        assert_eq!(spec.kind(), "Tag");
    }
}
