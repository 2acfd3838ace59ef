//! Process-wide shutdown signalling.

use std::sync::Arc;
use tokio::sync::watch;

/// Why the server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The peer process is gone
    PeerExited,
    /// SIGINT or SIGTERM
    Signal,
    /// A request hit an error the process cannot recover from
    Fatal,
}

impl ShutdownReason {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::PeerExited | Self::Signal => 0,
            Self::Fatal => 1,
        }
    }
}

/// Cloneable cancellation handle shared by every task of one server.
///
/// The first [`cancel`](Self::cancel) wins; later reasons are ignored so
/// the exit code reflects what actually started the shutdown.
///
/// # Examples
///
/// ```
/// use specsrv::shutdown::{ShutdownReason, ShutdownToken};
///
/// let token = ShutdownToken::new();
/// let other = token.clone();
/// assert!(other.cancel(ShutdownReason::Fatal));
/// assert!(!token.cancel(ShutdownReason::Signal));
/// assert_eq!(token.reason(), Some(ShutdownReason::Fatal));
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown. Returns `false` if it was already requested.
    pub fn cancel(&self, reason: ShutdownReason) -> bool {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::info!("shutdown requested: {:?}", reason);
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Completes once shutdown has been requested.
    pub async fn cancelled(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives as long as `self`, so this only fails if it
            // was dropped underneath us.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels `token` with [`ShutdownReason::Signal`] on SIGINT or SIGTERM.
pub async fn listen_for_signals(token: ShutdownToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {}", e);
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel(ShutdownReason::Signal);
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
        _ = token.cancelled() => return,
    }
    token.cancel(ShutdownReason::Signal);
}
