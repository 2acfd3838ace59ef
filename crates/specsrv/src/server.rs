//! Unix socket classification server.

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::liveness::watch_peer;
use crate::protocol::{Frame, RequestFramer, encode_response, too_large};
use crate::shutdown::{ShutdownReason, ShutdownToken};
use bytes::BytesMut;
use specsrv_core::{RangeParser, SpecClassifier, SpecifierResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

const READ_BUFFER_SIZE: usize = 4096;

/// Lifecycle of a [`SpecServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Serves specifier classification over a Unix domain socket.
///
/// Every accepted connection gets its own task. Requests on a connection
/// are answered in order, one response line each. The server runs until
/// its [`ShutdownToken`] is cancelled: by the peer liveness watcher, by a
/// signal, or by a fatal classification error. The socket file is removed
/// on the way out.
///
/// # Examples
///
/// ```no_run
/// use specsrv::config::ServerConfig;
/// use specsrv::server::SpecServer;
/// use specsrv_core::SpecClassifier;
/// use specsrv_npm::NpmSpecResolver;
///
/// # async fn example() -> specsrv::error::Result<()> {
/// let resolver = NpmSpecResolver::new();
/// let server = SpecServer::new(
///     SpecClassifier::new(resolver, resolver),
///     "/tmp/specsrv.sock",
///     ServerConfig::default(),
/// )
/// .with_peer(std::process::id());
///
/// let reason = server.run().await?;
/// std::process::exit(reason.exit_code());
/// # }
/// ```
pub struct SpecServer<S, P> {
    classifier: Arc<SpecClassifier<S, P>>,
    config: ServerConfig,
    socket_path: PathBuf,
    peer_pid: Option<u32>,
    token: ShutdownToken,
    state: watch::Sender<ServerState>,
}

impl<S, P> SpecServer<S, P>
where
    S: SpecifierResolver + 'static,
    P: RangeParser + 'static,
{
    pub fn new(
        classifier: SpecClassifier<S, P>,
        socket_path: impl Into<PathBuf>,
        config: ServerConfig,
    ) -> Self {
        let (state, _) = watch::channel(ServerState::Starting);
        Self {
            classifier: Arc::new(classifier),
            config,
            socket_path: socket_path.into(),
            peer_pid: None,
            token: ShutdownToken::new(),
            state,
        }
    }

    /// Stops the server once process `pid` has exited.
    pub fn with_peer(mut self, pid: u32) -> Self {
        self.peer_pid = Some(pid);
        self
    }

    /// Shares an existing token, e.g. one a signal listener also holds.
    pub fn with_shutdown_token(mut self, token: ShutdownToken) -> Self {
        self.token = token;
        self
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.token.clone()
    }

    pub fn state_watcher(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn set_state(&self, state: ServerState) {
        tracing::debug!("server state: {:?}", state);
        self.state.send_replace(state);
    }

    /// Binds the socket and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be created. Errors
    /// on individual connections are logged and do not stop the server.
    pub async fn run(self) -> Result<ShutdownReason> {
        let bind_error = |source| ServerError::Bind {
            path: self.socket_path.clone(),
            source,
        };
        clear_stale_socket(&self.socket_path).await.map_err(bind_error)?;
        let listener = UnixListener::bind(&self.socket_path).map_err(bind_error)?;
        let guard = SocketGuard::new(self.socket_path.clone());

        tracing::info!("listening on {}", self.socket_path.display());
        self.set_state(ServerState::Listening);

        let liveness = self.peer_pid.map(|pid| {
            tokio::spawn(watch_peer(
                pid,
                self.config.liveness_interval(),
                self.token.clone(),
            ))
        });

        let mut connections = JoinSet::new();
        let reason = loop {
            tokio::select! {
                reason = self.token.cancelled() => break reason,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        tracing::debug!("accepted connection ({} open)", connections.len() + 1);
                        connections.spawn(handle_connection(
                            stream,
                            Arc::clone(&self.classifier),
                            self.config.clone(),
                            self.token.clone(),
                        ));
                    }
                    Err(e) => tracing::warn!("accept failed: {}", e),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!("connection failed: {}", e),
                        Err(e) => tracing::error!("connection task failed: {}", e),
                    }
                }
            }
        };

        self.set_state(ServerState::ShuttingDown);
        drop(listener);
        drop(guard);
        connections.shutdown().await;
        if let Some(handle) = liveness {
            handle.abort();
        }

        tracing::info!("server stopped: {:?}", reason);
        self.set_state(ServerState::Stopped);
        Ok(reason)
    }
}

/// Removes the socket file when dropped, as long as the path still names
/// the socket this server bound.
struct SocketGuard {
    path: PathBuf,
    /// `(dev, ino)` of the bound socket
    identity: Option<(u64, u64)>,
}

impl SocketGuard {
    fn new(path: PathBuf) -> Self {
        let identity = socket_identity(&path);
        Self { path, identity }
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if self.identity.is_none() || socket_identity(&self.path) != self.identity {
            tracing::debug!("socket {} replaced, leaving it", self.path.display());
            return;
        }
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                tracing::warn!("failed to remove socket {}: {}", self.path.display(), e);
            }
            _ => {}
        }
    }
}

fn socket_identity(path: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let metadata = std::fs::symlink_metadata(path).ok()?;
    metadata
        .file_type()
        .is_socket()
        .then(|| (metadata.dev(), metadata.ino()))
}

/// Unlinks a socket left behind by a server that is gone.
///
/// Anything else at `path` is left alone: a non-socket file makes the
/// following bind fail with `AddrInUse`, and a socket somebody still
/// accepts on is reported as `AddrInUse` directly.
async fn clear_stale_socket(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.file_type().is_socket() {
        return Ok(());
    }
    if UnixStream::connect(path).await.is_ok() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "another server is listening on this socket",
        ));
    }

    tracing::debug!("removing stale socket {}", path.display());
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn handle_connection<S, P>(
    stream: UnixStream,
    classifier: Arc<SpecClassifier<S, P>>,
    config: ServerConfig,
    token: ShutdownToken,
) -> Result<()>
where
    S: SpecifierResolver,
    P: RangeParser,
{
    let (mut reader, mut writer) = stream.into_split();
    let mut framer = RequestFramer::new(config.framing, config.max_request_bytes);
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        buf.clear();
        let n = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            read = reader.read_buf(&mut buf) => read?,
        };

        let frames = if n == 0 {
            framer.finish().into_iter().collect()
        } else {
            framer.push(&buf)
        };

        for frame in frames {
            if !respond(&classifier, &config, frame, &mut writer, &token).await? {
                return Ok(());
            }
        }

        if n == 0 {
            return Ok(());
        }
    }
}

/// Answers one frame. Returns `false` when the connection must stop.
async fn respond<S, P>(
    classifier: &SpecClassifier<S, P>,
    config: &ServerConfig,
    frame: Frame,
    writer: &mut OwnedWriteHalf,
    token: &ShutdownToken,
) -> Result<bool>
where
    S: SpecifierResolver,
    P: RangeParser,
{
    let outcome = match frame {
        Frame::Request(raw) => {
            let outcome = classifier.classify(&raw);
            tracing::debug!(raw = %raw, ok = outcome.is_ok(), "classified");
            outcome
        }
        Frame::TooLarge => {
            tracing::warn!("request exceeds {} bytes", config.max_request_bytes);
            Err(too_large(config.max_request_bytes))
        }
    };

    let line = encode_response(&outcome, config.envelope)?;
    writer.write_all(line.as_bytes()).await?;

    if let Err(e) = &outcome
        && e.is_fatal()
    {
        tracing::error!("fatal classification error: {}", e);
        token.cancel(ShutdownReason::Fatal);
        return Ok(false);
    }
    Ok(true)
}
