//! Specifier classification.
//!
//! [`SpecClassifier`] turns a raw specifier string into a
//! [`PackageSpecifier`] by way of the injected resolver and range parser.

use crate::error::{ClassifyError, Result};
use crate::range::serialize_range;
use crate::resolver::{RangeParser, ResolvedSpec, SpecifierResolver};
use crate::types::{AliasSubspec, PackageSpecifier, VersionConstraint};

/// Package name handed to the resolver. Classification only consumes the
/// specifier half of the result, so any fixed name works.
pub const PLACEHOLDER_NAME: &str = "foo";

const FILE_PREFIX: &str = "file:";

/// Classifies raw specifiers using a resolver and a range parser.
///
/// # Examples
///
/// ```
/// use specsrv_core::{
///     Bound, PackageSpecifier, ParsedRange, RangeParser, RawComparator, ResolveError,
///     ResolvedSpec, SpecClassifier, SpecifierResolver,
/// };
///
/// struct Fake;
///
/// impl SpecifierResolver for Fake {
///     fn resolve(&self, _name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError> {
///         Ok(ResolvedSpec::new("range", spec).with_fetch_spec(spec))
///     }
/// }
///
/// impl RangeParser for Fake {
///     fn parse_range(&self, _range: &str) -> Result<ParsedRange, ResolveError> {
///         Ok(vec![vec![RawComparator::new("", Bound::Any)]])
///     }
/// }
///
/// let classifier = SpecClassifier::new(Fake, Fake);
/// let spec = classifier.classify("*").unwrap();
/// assert!(matches!(spec, PackageSpecifier::Range(_)));
/// ```
#[derive(Debug, Clone)]
pub struct SpecClassifier<S, P> {
    resolver: S,
    ranges: P,
}

impl<S, P> SpecClassifier<S, P>
where
    S: SpecifierResolver,
    P: RangeParser,
{
    pub fn new(resolver: S, ranges: P) -> Self {
        Self { resolver, ranges }
    }

    /// Classifies one raw specifier.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// - [`ClassifyError::Invalid`] when the resolver or range parser rejects
    ///   the input; code and message are passed through unchanged
    /// - [`ClassifyError::UnknownType`] / [`ClassifyError::UnknownAliasSubtype`]
    ///   when the resolver reports a shape this adapter does not handle
    /// - [`ClassifyError::UnrecognizedComparatorOperator`] when range
    ///   serialization meets an unknown operator
    pub fn classify(&self, raw: &str) -> Result<PackageSpecifier> {
        let raw = raw.trim();
        let resolved = self.resolver.resolve(PLACEHOLDER_NAME, raw)?;

        tracing::trace!(raw, spec_type = %resolved.spec_type, "resolved specifier");

        match resolved.spec_type.as_str() {
            "git" => Ok(PackageSpecifier::Git(
                required(&resolved, resolved.save_spec.as_deref(), "saveSpec")?.to_string(),
            )),
            "version" | "range" => Ok(PackageSpecifier::Range(self.range_of(&resolved)?)),
            "tag" => Ok(PackageSpecifier::Tag(
                required(&resolved, resolved.fetch_spec.as_deref(), "fetchSpec")?.to_string(),
            )),
            "file" => Ok(PackageSpecifier::File(strip_file_prefix(&resolved.raw_spec))),
            "directory" => Ok(PackageSpecifier::Directory(strip_file_prefix(
                &resolved.raw_spec,
            ))),
            "remote" => Ok(PackageSpecifier::Remote(resolved.raw_spec.clone())),
            "alias" => self.classify_alias(&resolved),
            other => Err(ClassifyError::UnknownType(other.to_string())),
        }
    }

    /// Resolves the single level of indirection an alias allows.
    ///
    /// An alias whose target carries no package name collapses to the
    /// target itself.
    fn classify_alias(&self, resolved: &ResolvedSpec) -> Result<PackageSpecifier> {
        let Some(sub) = resolved.sub_spec.as_deref() else {
            return Err(ClassifyError::UnknownType("alias (missing subSpec)".into()));
        };

        let inner = match sub.spec_type.as_str() {
            "tag" => AliasSubspec::Tag(
                required(sub, sub.fetch_spec.as_deref(), "fetchSpec")?.to_string(),
            ),
            "version" | "range" => AliasSubspec::Range(self.range_of(sub)?),
            other => return Err(ClassifyError::UnknownAliasSubtype(other.to_string())),
        };

        match &sub.name {
            Some(name) => Ok(PackageSpecifier::Alias(name.clone(), None, inner)),
            None => Ok(inner.into()),
        }
    }

    fn range_of(&self, resolved: &ResolvedSpec) -> Result<VersionConstraint> {
        let range = required(resolved, resolved.fetch_spec.as_deref(), "fetchSpec")?;
        let parsed = self.ranges.parse_range(range)?;
        serialize_range(&parsed)
    }
}

fn required<'a>(resolved: &ResolvedSpec, field: Option<&'a str>, name: &str) -> Result<&'a str> {
    field.ok_or_else(|| {
        ClassifyError::UnknownType(format!("{} (missing {})", resolved.spec_type, name))
    })
}

fn strip_file_prefix(raw: &str) -> String {
    raw.strip_prefix(FILE_PREFIX).unwrap_or(raw).to_string()
}
