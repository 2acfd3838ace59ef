use thiserror::Error;

/// Error reported by a [`SpecifierResolver`](crate::SpecifierResolver) or
/// [`RangeParser`](crate::RangeParser).
///
/// Carries the capability's native error code and message. The classifier
/// forwards both verbatim; it never reinterprets them.
///
/// # Examples
///
/// ```
/// use specsrv_core::ResolveError;
///
/// let err = ResolveError::new("EINVALIDTAGNAME", "Invalid tag name \"a b\"");
/// assert_eq!(err.to_string(), "EINVALIDTAGNAME: Invalid tag name \"a b\"");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ResolveError {
    pub code: String,
    pub message: String,
}

impl ResolveError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Classification failures.
///
/// `Invalid` is an ordinary, per-request outcome: the resolver rejected the
/// input. `UnknownType` and `UnknownAliasSubtype` mean the resolver produced
/// a shape this adapter does not know. `UnrecognizedComparatorOperator`
/// means the range grammar has drifted away from the comparator vocabulary
/// understood here and is always fatal.
///
/// # Examples
///
/// ```
/// use specsrv_core::ClassifyError;
///
/// let err = ClassifyError::UnknownType("workspace".into());
/// assert_eq!(err.code(), "EUNKNOWNTYPE");
/// assert!(!err.is_fatal());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("{code}: {message}")]
    Invalid { code: String, message: String },

    #[error("unknown spec type '{0}'")]
    UnknownType(String),

    #[error("unknown alias sub spec type '{0}'")]
    UnknownAliasSubtype(String),

    #[error("unrecognized comparator operator '{operator}'")]
    UnrecognizedComparatorOperator { operator: String },
}

impl ClassifyError {
    /// Stable error code, either the resolver's own or one of ours.
    pub fn code(&self) -> &str {
        match self {
            Self::Invalid { code, .. } => code,
            Self::UnknownType(_) => "EUNKNOWNTYPE",
            Self::UnknownAliasSubtype(_) => "EUNKNOWNALIASSUBTYPE",
            Self::UnrecognizedComparatorOperator { .. } => "EUNRECOGNIZEDCOMPARATOR",
        }
    }

    /// Human readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Invalid { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// `"<code>: <message>"`, the form written into error responses.
    pub fn wire_message(&self) -> String {
        format!("{}: {}", self.code(), self.message())
    }

    /// True when the resolver rejected the input itself.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    /// True when the process serving this request must not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnrecognizedComparatorOperator { .. })
    }
}

impl From<ResolveError> for ClassifyError {
    fn from(err: ResolveError) -> Self {
        Self::Invalid {
            code: err.code,
            message: err.message,
        }
    }
}

/// Convenience type alias for `Result<T, ClassifyError>`.
pub type Result<T> = std::result::Result<T, ClassifyError>;
