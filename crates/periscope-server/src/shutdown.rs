//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use periscope_relay::SessionRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default timeout for graceful shutdown before giving up on stragglers.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the drain loop re-checks the session registry.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Coordinates graceful shutdown across the HTTP server and relay sessions.
///
/// Every relay session holds a child of this token, so cancelling it gives
/// each session bounded notice to stop both forwarding loops.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Get a clone of the cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Perform a graceful shutdown.
    ///
    /// 1. Cancel the token (HTTP server and every session observe it)
    /// 2. Wait up to `timeout` for the session registry to drain
    ///
    /// Sessions are detached tasks owned by their sockets; a session that
    /// outlives the timeout is logged and abandoned to process exit.
    pub async fn graceful_shutdown(&self, sessions: &SessionRegistry, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(
            active_sessions = sessions.count(),
            timeout_secs = timeout.as_secs(),
            "waiting for sessions to drain"
        );

        let drain = async {
            while !sessions.is_empty() {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                remaining = sessions.count(),
                "shutdown timed out after {timeout:?}, abandoning remaining sessions"
            );
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
