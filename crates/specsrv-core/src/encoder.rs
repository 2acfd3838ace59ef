//! Version to wire record conversion.

use crate::types::{PrereleaseId, SemverVersion};
use node_semver::{Identifier, Version};

/// Encodes a parsed version as a [`SemverVersion`] wire record.
///
/// Total over every version the range parser can produce. A prerelease
/// identifier becomes [`PrereleaseId::Int`] exactly when its token is all
/// ASCII digits (and fits in a `u64`), whatever kind the parser tagged it as.
///
/// # Examples
///
/// ```
/// use node_semver::{Identifier, Version};
/// use specsrv_core::{PrereleaseId, encode};
///
/// let version = Version {
///     major: 1,
///     minor: 2,
///     patch: 3,
///     build: vec![],
///     pre_release: vec![Identifier::AlphaNumeric("alpha".into()), Identifier::Numeric(5)],
/// };
/// let record = encode(&version);
/// assert_eq!(record.prerelease, vec![PrereleaseId::String("alpha".into()), PrereleaseId::Int(5)]);
/// ```
pub fn encode(version: &Version) -> SemverVersion {
    SemverVersion {
        major: version.major,
        minor: version.minor,
        patch: version.patch,
        prerelease: version.pre_release.iter().map(encode_prerelease).collect(),
        build: version.build.iter().map(identifier_text).collect(),
    }
}

/// Encodes a single prerelease token.
pub fn prerelease_id(token: &str) -> PrereleaseId {
    if !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && let Ok(n) = token.parse::<u64>()
    {
        return PrereleaseId::Int(n);
    }
    PrereleaseId::String(token.to_string())
}

fn encode_prerelease(id: &Identifier) -> PrereleaseId {
    match id {
        Identifier::Numeric(n) => PrereleaseId::Int(*n),
        Identifier::AlphaNumeric(s) => prerelease_id(s),
    }
}

fn identifier_text(id: &Identifier) -> String {
    match id {
        Identifier::Numeric(n) => n.to_string(),
        Identifier::AlphaNumeric(s) => s.clone(),
    }
}
