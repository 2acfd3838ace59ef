use crate::error::{Result, ServerError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
///
/// Read from an optional JSON file. Every field has a default, so an empty
/// object is a complete configuration.
///
/// # Defaults
///
/// - `liveness_interval_ms`: `3000`
/// - `framing`: `"newline"`
/// - `envelope`: `"result"`
/// - `max_request_bytes`: `65536`
///
/// # Examples
///
/// ```
/// use specsrv::config::{Envelope, Framing, ServerConfig};
///
/// let config: ServerConfig = serde_json::from_str(r#"{"framing": "chunk"}"#).unwrap();
/// assert_eq!(config.framing, Framing::Chunk);
/// assert_eq!(config.envelope, Envelope::Result);
/// assert_eq!(config.liveness_interval_ms, 3000);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// How often the peer process is checked
    #[serde(default = "default_liveness_interval_ms")]
    pub liveness_interval_ms: u64,
    #[serde(default)]
    pub framing: Framing,
    #[serde(default)]
    pub envelope: Envelope,
    /// Upper bound on a buffered, not yet terminated request
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            liveness_interval_ms: default_liveness_interval_ms(),
            framing: Framing::default(),
            envelope: Envelope::default(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl ServerConfig {
    /// Loads a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms.max(1))
    }
}

/// Request framing on a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One request per `\n`-terminated line, buffered across reads
    #[default]
    Newline,
    /// One request per read, for peers that predate line framing
    Chunk,
}

/// Shape of response lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `{"Ok": <specifier>}` or `{"Err": "<code>: <message>"}`
    #[default]
    Result,
    /// Bare `<specifier>` or `{"Invalid": "<code>: <message>"}`
    Legacy,
}

fn default_liveness_interval_ms() -> u64 {
    3000
}

fn default_max_request_bytes() -> usize {
    64 * 1024
}
