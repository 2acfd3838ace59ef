//! Async client for a running specsrv daemon.

use crate::error::ClientError;
use crate::protocol::decode_response;
use dashmap::DashMap;
use specsrv_core::PackageSpecifier;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Delay between connection attempts while the daemon starts up.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// A server answer: the specifier, or the `"<code>: <message>"` error text.
pub type Classification = Result<PackageSpecifier, String>;

/// One connection speaking newline framing and the `result` envelope.
///
/// # Examples
///
/// ```no_run
/// use specsrv::client::SpecClient;
///
/// # async fn example() -> Result<(), specsrv::error::ClientError> {
/// let mut client = SpecClient::connect("/tmp/specsrv.sock").await?;
/// let answer = client.classify("^1.2.3").await?;
/// println!("{:?}", answer);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SpecClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl SpecClient {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| ClientError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
        })
    }

    /// Connects, retrying while the socket is missing or refusing.
    ///
    /// Other errors are returned immediately.
    pub async fn connect_with_retry(
        path: impl AsRef<Path>,
        attempts: usize,
        delay: Duration,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let mut attempt = 1;
        loop {
            match Self::connect(path).await {
                Err(ClientError::Connect { source, .. })
                    if attempt < attempts && is_not_ready(&source) =>
                {
                    tracing::debug!(
                        "socket {} not ready (attempt {}): {}",
                        path.display(),
                        attempt,
                        source
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Sends one specifier and waits for its answer.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MultilineRequest`] if `spec` contains a line break
    /// - [`ClientError::Closed`] if the server hung up without answering
    /// - [`ClientError::Decode`] if the answer is not a `result` envelope
    pub async fn classify(&mut self, spec: &str) -> Result<Classification, ClientError> {
        if spec.contains(['\n', '\r']) {
            return Err(ClientError::MultilineRequest(spec.to_string()));
        }

        let mut request = String::with_capacity(spec.len() + 1);
        request.push_str(spec);
        request.push('\n');
        self.writer.write_all(request.as_bytes()).await?;

        self.line.clear();
        if self.reader.read_line(&mut self.line).await? == 0 {
            return Err(ClientError::Closed);
        }

        decode_response(&self.line).map_err(|source| ClientError::Decode {
            line: self.line.trim_end().to_string(),
            source,
        })
    }
}

fn is_not_ready(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
    )
}

/// Maximum number of memoised answers before eviction kicks in.
pub const DEFAULT_CACHE_CAPACITY: usize = 500_000;

#[derive(Debug, Clone)]
struct CachedAnswer {
    answer: Classification,
    inserted_at: Instant,
}

/// Bounded, shareable memo of server answers keyed by raw specifier.
///
/// When full, roughly the oldest tenth of the entries is dropped.
///
/// The capacity is a soft bound: the size check and the insert are separate
/// map operations, so clones inserting at the same moment can overshoot it
/// by a few entries or evict twice.
#[derive(Debug, Clone)]
pub struct SpecCache {
    entries: Arc<DashMap<String, CachedAnswer>>,
    capacity: usize,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, spec: &str) -> Option<Classification> {
        self.entries.get(spec).map(|entry| entry.answer.clone())
    }

    pub fn insert(&self, spec: &str, answer: Classification) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(spec) {
            self.evict_entries();
        }
        self.entries.insert(
            spec.to_string(),
            CachedAnswer {
                answer,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_entries(&self) {
        let target_removals = (self.capacity / 10).max(1);

        let mut by_age: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().inserted_at))
            .collect();
        by_age.sort_by_key(|(_, time)| *time);

        for (spec, _) in by_age.iter().take(target_removals) {
            self.entries.remove(spec);
        }

        tracing::debug!("evicted {} cached answers", target_removals.min(by_age.len()));
    }
}

impl Default for SpecCache {
    fn default() -> Self {
        Self::new()
    }
}

/// [`SpecClient`] that answers repeated specifiers from a [`SpecCache`].
///
/// Server answers are cached whichever way they went; transport errors
/// are not.
#[derive(Debug)]
pub struct CachedSpecClient {
    client: SpecClient,
    cache: SpecCache,
}

impl CachedSpecClient {
    pub fn new(client: SpecClient, cache: SpecCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &SpecCache {
        &self.cache
    }

    pub async fn classify(&mut self, spec: &str) -> Result<Classification, ClientError> {
        if let Some(answer) = self.cache.get(spec) {
            return Ok(answer);
        }
        let answer = self.client.classify(spec).await?;
        self.cache.insert(spec, answer.clone());
        Ok(answer)
    }
}
