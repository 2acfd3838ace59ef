//! Capability traits for the external specifier and range grammars.
//!
//! The classifier never looks at raw specifier syntax. It asks a
//! [`SpecifierResolver`] what kind of specifier a string is, and a
//! [`RangeParser`] how a range desugars into comparator sets, then adapts
//! their answers into the wire types.

use crate::error::ResolveError;

/// Result of resolving a `name@spec` pair.
///
/// Field names follow the npm package-argument model. `spec_type` is left
/// open so that shapes the classifier does not know can still be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub name: Option<String>,
    pub spec_type: String,
    pub raw_spec: String,
    pub save_spec: Option<String>,
    pub fetch_spec: Option<String>,
    /// Target of an alias.
    pub sub_spec: Option<Box<ResolvedSpec>>,
}

impl ResolvedSpec {
    pub fn new(spec_type: impl Into<String>, raw_spec: impl Into<String>) -> Self {
        Self {
            spec_type: spec_type.into(),
            raw_spec: raw_spec.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_save_spec(mut self, save_spec: impl Into<String>) -> Self {
        self.save_spec = Some(save_spec.into());
        self
    }

    pub fn with_fetch_spec(mut self, fetch_spec: impl Into<String>) -> Self {
        self.fetch_spec = Some(fetch_spec.into());
        self
    }

    pub fn with_sub_spec(mut self, sub_spec: ResolvedSpec) -> Self {
        self.sub_spec = Some(Box::new(sub_spec));
        self
    }

    /// Tags, versions, ranges and aliases of those are looked up in a registry.
    pub fn is_registry(&self) -> bool {
        matches!(self.spec_type.as_str(), "tag" | "version" | "range" | "alias")
    }
}

/// Version bound of a parsed comparator.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// The parser's "any version" sentinel.
    Any,
    Version(node_semver::Version),
}

/// One comparator exactly as the range parser produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawComparator {
    /// Operator token: `""`, `">"`, `">="`, `"<"` or `"<="`.
    pub operator: String,
    pub bound: Bound,
}

impl RawComparator {
    pub fn new(operator: impl Into<String>, bound: Bound) -> Self {
        Self {
            operator: operator.into(),
            bound,
        }
    }

    pub fn any() -> Self {
        Self::new("", Bound::Any)
    }
}

/// Range parser output: OR of AND-groups.
pub type ParsedRange = Vec<Vec<RawComparator>>;

/// Classifies raw specifier strings.
///
/// # Examples
///
/// ```
/// use specsrv_core::{ResolveError, ResolvedSpec, SpecifierResolver};
///
/// struct TagsOnly;
///
/// impl SpecifierResolver for TagsOnly {
///     fn resolve(&self, name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError> {
///         Ok(ResolvedSpec::new("tag", spec).with_name(name).with_fetch_spec(spec))
///     }
/// }
///
/// let resolved = TagsOnly.resolve("foo", "next").unwrap();
/// assert_eq!(resolved.spec_type, "tag");
/// ```
pub trait SpecifierResolver: Send + Sync {
    fn resolve(&self, name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError>;
}

/// Desugars range strings into comparator sets.
pub trait RangeParser: Send + Sync {
    fn parse_range(&self, range: &str) -> Result<ParsedRange, ResolveError>;
}

impl<T: SpecifierResolver + ?Sized> SpecifierResolver for &T {
    fn resolve(&self, name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError> {
        (**self).resolve(name, spec)
    }
}

impl<T: RangeParser + ?Sized> RangeParser for &T {
    fn parse_range(&self, range: &str) -> Result<ParsedRange, ResolveError> {
        (**self).parse_range(range)
    }
}

impl<T: SpecifierResolver + ?Sized> SpecifierResolver for std::sync::Arc<T> {
    fn resolve(&self, name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError> {
        (**self).resolve(name, spec)
    }
}

impl<T: RangeParser + ?Sized> RangeParser for std::sync::Arc<T> {
    fn parse_range(&self, range: &str) -> Result<ParsedRange, ResolveError> {
        (**self).parse_range(range)
    }
}
