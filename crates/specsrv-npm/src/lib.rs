//! npm specifier support for specsrv.
//!
//! Provides the default [`SpecifierResolver`](specsrv_core::SpecifierResolver)
//! and [`RangeParser`](specsrv_core::RangeParser) implementations, following
//! npm's package-argument and loose semver range rules, plus a strict SemVer
//! parser for full version strings.

pub mod error;
pub mod hosted;
pub mod range;
pub mod resolver;
pub mod version;

pub use error::{NpmSpecError, ParseSemverError, Result};
pub use hosted::{GitHost, HostedGit, Representation};
pub use range::NpmRangeParser;
pub use resolver::{NpmSpecResolver, validate_package_name};
pub use version::{MAX_LENGTH, parse_loose, parse_semver};
