//! Dependency specifier classification daemon.
//!
//! Serves [`specsrv_core::SpecClassifier`] over a Unix domain socket. A
//! client writes raw specifier strings; the server answers each with one
//! JSON line describing the canonical [`PackageSpecifier`]. The server
//! watches a peer process and exits when it goes away.
//!
//! # Architecture
//!
//! - [`config`]: server configuration file and framing/envelope choices
//! - [`protocol`]: request framing and response encoding
//! - [`server`]: socket lifecycle, accept loop, per-connection tasks
//! - [`liveness`] and [`shutdown`]: when and why the server stops
//! - [`client`]: async client with an optional answer cache

pub mod client;
pub mod config;
pub mod error;
pub mod liveness;
pub mod protocol;
pub mod server;
pub mod shutdown;

pub use client::{CachedSpecClient, Classification, SpecCache, SpecClient};
pub use config::{Envelope, Framing, ServerConfig};
pub use error::{ClientError, Result, ServerError};
pub use server::{ServerState, SpecServer};
pub use shutdown::{ShutdownReason, ShutdownToken};

use specsrv_core::SpecClassifier;
use specsrv_npm::NpmSpecResolver;

pub use specsrv_core::PackageSpecifier;

/// Classifier backed by the bundled npm grammar.
pub fn npm_classifier() -> SpecClassifier<NpmSpecResolver, NpmSpecResolver> {
    let resolver = NpmSpecResolver::new();
    SpecClassifier::new(resolver, resolver)
}
