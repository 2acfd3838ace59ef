//! Errors raised while resolving npm specifiers.
//!
//! Every variant maps to an npm style error code (`EINVALIDTAGNAME`,
//! `EUNSUPPORTEDPROTOCOL`, ...) so callers on the other side of the wire can
//! match on the code rather than the message.

use specsrv_core::ResolveError;
use thiserror::Error;

/// Errors from [`NpmSpecResolver`](crate::NpmSpecResolver) and
/// [`NpmRangeParser`](crate::NpmRangeParser).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NpmSpecError {
    /// Tag contains characters URI-component encoding would escape
    #[error(
        "Invalid tag name \"{tag}\" of package \"{spec}\": Tags may not have any characters that encodeURIComponent encodes."
    )]
    InvalidTagName { tag: String, spec: String },

    /// URL scheme npm cannot install from
    #[error("Unsupported URL Type \"{protocol}\": {spec}")]
    UnsupportedProtocol { protocol: String, spec: String },

    /// `npm:` alias pointing somewhere an alias cannot point
    #[error("{reason}: {spec}")]
    InvalidAlias { spec: String, reason: String },

    /// Range with no usable comparator
    #[error("Invalid SemVer Range: {range}")]
    InvalidRange { range: String },

    /// Package name rejected by npm naming rules
    #[error("Invalid package name \"{name}\": {reason}")]
    InvalidPackageName { name: String, reason: String },
}

/// Result type alias for npm specifier operations.
pub type Result<T> = std::result::Result<T, NpmSpecError>;

impl NpmSpecError {
    /// npm error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTagName { .. } => "EINVALIDTAGNAME",
            Self::UnsupportedProtocol { .. } => "EUNSUPPORTEDPROTOCOL",
            Self::InvalidAlias { .. } => "EINVALIDALIAS",
            Self::InvalidRange { .. } => "EINVALIDRANGE",
            Self::InvalidPackageName { .. } => "EINVALIDPACKAGENAME",
        }
    }

    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.into(),
        }
    }

    pub fn invalid_alias(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAlias {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

impl From<NpmSpecError> for ResolveError {
    fn from(err: NpmSpecError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// Failure of the strict [`parse_semver`](crate::parse_semver) parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSemverError {
    #[error("invalid semver: {0:?}")]
    Malformed(String),

    #[error("version component out of range: {0:?}")]
    Overflow(String),
}
