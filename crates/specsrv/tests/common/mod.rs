//! Shared helpers for server integration tests.

#![allow(dead_code)]

use specsrv::config::ServerConfig;
use specsrv::server::{ServerState, SpecServer};
use specsrv::shutdown::{ShutdownReason, ShutdownToken};
use specsrv_core::{RangeParser, SpecClassifier, SpecifierResolver};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

/// A server running on a socket in its own temp directory.
pub(crate) struct TestServer {
    pub(crate) socket: PathBuf,
    pub(crate) token: ShutdownToken,
    pub(crate) state: watch::Receiver<ServerState>,
    pub(crate) handle: JoinHandle<specsrv::Result<ShutdownReason>>,
    _dir: TempDir,
}

impl TestServer {
    pub(crate) async fn start(config: ServerConfig) -> Self {
        Self::start_with(specsrv::npm_classifier(), config, None).await
    }

    pub(crate) async fn start_with<S, P>(
        classifier: SpecClassifier<S, P>,
        config: ServerConfig,
        peer: Option<u32>,
    ) -> Self
    where
        S: SpecifierResolver + 'static,
        P: RangeParser + 'static,
    {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("specsrv.sock");

        let mut server = SpecServer::new(classifier, &socket, config);
        if let Some(pid) = peer {
            server = server.with_peer(pid);
        }
        let token = server.shutdown_token();
        let mut state = server.state_watcher();
        let handle = tokio::spawn(server.run());

        tokio::time::timeout(TIMEOUT, state.wait_for(|s| *s == ServerState::Listening))
            .await
            .unwrap()
            .unwrap();

        Self {
            socket,
            token,
            state,
            handle,
            _dir: dir,
        }
    }

    pub(crate) async fn connect(&self) -> Connection {
        Connection::open(&self.socket).await
    }

    /// Waits for the server task and returns why it stopped.
    pub(crate) async fn join(self) -> ShutdownReason {
        tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }
}

/// Raw client connection for exercising framing directly.
pub(crate) struct Connection {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl Connection {
    pub(crate) async fn open(path: &std::path::Path) -> Self {
        let stream = UnixStream::connect(path).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub(crate) async fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    /// Half-closes the write side so the server sees end of stream.
    pub(crate) async fn close_write(&mut self) {
        self.writer.shutdown().await.unwrap();
    }

    /// Reads one response line without its terminator; `None` at EOF.
    pub(crate) async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = tokio::time::timeout(TIMEOUT, self.reader.read_line(&mut line))
            .await
            .unwrap()
            .unwrap();
        if n == 0 {
            return None;
        }
        assert!(line.ends_with('\n'), "unterminated response {:?}", line);
        line.pop();
        Some(line)
    }

    pub(crate) async fn roundtrip(&mut self, request: &str) -> String {
        self.send(format!("{}\n", request).as_bytes()).await;
        self.recv().await.unwrap()
    }
}
