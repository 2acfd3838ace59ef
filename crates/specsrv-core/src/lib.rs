//! Core abstractions for specsrv.
//!
//! This crate turns raw dependency specifier strings into the canonical
//! [`PackageSpecifier`] wire value. It knows nothing about specifier syntax:
//! grammar questions are delegated to a [`SpecifierResolver`] and a
//! [`RangeParser`], and their answers are adapted into the wire types.
//!
//! # Architecture
//!
//! specsrv-core defines:
//! - **Wire types**: `PackageSpecifier`, `VersionConstraint`, `Comparator`, `SemverVersion`
//! - **Capability traits**: `SpecifierResolver`, `RangeParser`
//! - **Conversion**: version encoding, range serialization, classification
//! - **Error types**: `ResolveError` from capabilities, `ClassifyError` from classification
//!
//! # Examples
//!
//! ```
//! use specsrv_core::{
//!     PackageSpecifier, ParsedRange, RangeParser, ResolveError, ResolvedSpec,
//!     SpecClassifier, SpecifierResolver,
//! };
//!
//! struct Tags;
//!
//! impl SpecifierResolver for Tags {
//!     fn resolve(&self, name: &str, spec: &str) -> Result<ResolvedSpec, ResolveError> {
//!         Ok(ResolvedSpec::new("tag", spec).with_name(name).with_fetch_spec(spec))
//!     }
//! }
//!
//! impl RangeParser for Tags {
//!     fn parse_range(&self, range: &str) -> Result<ParsedRange, ResolveError> {
//!         Err(ResolveError::new("EINVALIDRANGE", range))
//!     }
//! }
//!
//! let classifier = SpecClassifier::new(Tags, Tags);
//! assert_eq!(classifier.classify("next").unwrap(), PackageSpecifier::Tag("next".into()));
//! ```

pub mod classifier;
pub mod encoder;
pub mod error;
pub mod range;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use classifier::{PLACEHOLDER_NAME, SpecClassifier};
pub use encoder::{encode, prerelease_id};
pub use error::{ClassifyError, ResolveError, Result};
pub use range::{serialize_comparator, serialize_range};
pub use resolver::{Bound, ParsedRange, RangeParser, RawComparator, ResolvedSpec, SpecifierResolver};
pub use types::{
    AliasSubspec, Comparator, PackageSpecifier, PrereleaseId, SemverVersion, VersionConstraint,
};
