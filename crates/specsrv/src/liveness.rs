//! Peer process liveness probing.

use crate::shutdown::{ShutdownReason, ShutdownToken};
use std::time::Duration;

/// Returns `true` while a process with `pid` exists.
///
/// Sends signal 0, which checks existence and permissions without
/// delivering anything. `EPERM` means the process exists but belongs to
/// someone else, so it counts as alive. Pid 0 would address our own process
/// group and is always reported dead.
pub fn peer_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }

    // SAFETY: kill(2) with signal 0 sends nothing and touches no memory.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Polls `pid` every `interval` and cancels `token` once it has exited.
///
/// Returns when the peer is gone or when shutdown was requested elsewhere.
pub async fn watch_peer(pid: u32, interval: Duration, token: ShutdownToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                if !peer_alive(pid) {
                    tracing::info!("peer process {} exited", pid);
                    token.cancel(ShutdownReason::PeerExited);
                    return;
                }
                tracing::trace!("peer process {} alive", pid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pid of a process that has already been reaped.
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn test_self_is_alive() {
        assert!(peer_alive(std::process::id()));
    }

    #[test]
    fn test_init_is_alive() {
        assert!(peer_alive(1));
    }

    #[test]
    fn test_invalid_pids() {
        assert!(!peer_alive(0));
        assert!(!peer_alive(u32::MAX));
    }

    #[test]
    fn test_reaped_child_is_dead() {
        assert!(!peer_alive(dead_pid()));
    }

    #[tokio::test]
    async fn test_watch_cancels_on_exit() {
        let token = ShutdownToken::new();
        tokio::time::timeout(
            Duration::from_secs(2),
            watch_peer(dead_pid(), Duration::from_millis(5), token.clone()),
        )
        .await
        .unwrap();
        assert_eq!(token.reason(), Some(ShutdownReason::PeerExited));
    }

    #[tokio::test]
    async fn test_watch_returns_on_external_cancel() {
        let token = ShutdownToken::new();
        token.cancel(ShutdownReason::Signal);
        tokio::time::timeout(
            Duration::from_secs(2),
            watch_peer(std::process::id(), Duration::from_millis(5), token.clone()),
        )
        .await
        .unwrap();
        assert_eq!(token.reason(), Some(ShutdownReason::Signal));
    }
}
