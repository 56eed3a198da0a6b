//! Relay session lifecycle: connect, forward both directions, tear down.
//!
//! A session owns its websocket halves and its backend TCP socket
//! exclusively. Whichever leg stops first cancels the shared token; the
//! sibling observes it at its next suspension point, both legs close their
//! write side exactly once, and the session reports a single close reason.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use periscope_settings::RelaySettings;

use crate::channel::{FrameSink, FrameSource};
use crate::error::{LegEnd, RelayError};
use crate::forward::{backend_to_client, client_to_backend};
use crate::registry::{SessionEntry, SessionState};
use crate::watchdog::{WatchdogResult, run_idle_watchdog};

/// Connection parameters for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Backend address as `host:port`.
    pub backend_addr: String,
    /// Bounded wait for the backend to accept.
    pub connect_timeout: Duration,
    /// Idle watchdog window; `None` disables it.
    pub idle_timeout: Option<Duration>,
    /// Fixed read buffer for the backend→client leg.
    pub read_buffer_size: usize,
}

impl SessionConfig {
    /// Build a session config from relay settings.
    #[must_use]
    pub fn from_settings(relay: &RelaySettings) -> Self {
        Self {
            backend_addr: format!("{}:{}", relay.vnc_host, relay.vnc_port),
            connect_timeout: Duration::from_millis(relay.connect_timeout_ms),
            idle_timeout: (relay.idle_timeout_ms > 0)
                .then(|| Duration::from_millis(relay.idle_timeout_ms)),
            read_buffer_size: relay.read_buffer_size,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The browser closed or dropped its websocket.
    ClientClosed,
    /// The backend closed its side of the TCP connection.
    BackendClosed,
    /// The idle watchdog fired.
    IdleTimeout,
    /// A leg hit a terminal error (already logged with the failing leg).
    LegFailed,
    /// An outside cancellation (server shutdown) stopped the session.
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientClosed => f.write_str("client closed"),
            Self::BackendClosed => f.write_str("backend closed"),
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::LegFailed => f.write_str("error"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Final report of one session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The backend never accepted; nothing was forwarded.
    ConnectFailed(RelayError),
    /// The relay ran and then closed.
    Closed {
        /// Why the session ended.
        reason: CloseReason,
        /// Bytes forwarded client→backend.
        bytes_up: u64,
        /// Bytes forwarded backend→client.
        bytes_down: u64,
    },
}

/// Run one relay session to completion.
///
/// Connects to the backend (bounded), then runs both forwarding loops until
/// either ends, then joins both and closes both sides. Never returns an
/// error: every failure is terminal for the session and is reported through
/// logs, metrics, and the returned outcome.
#[instrument(skip_all, fields(session = %entry.id))]
pub async fn run_session<S, K>(
    mut source: S,
    mut sink: K,
    entry: Arc<SessionEntry>,
    config: SessionConfig,
    cancel: CancellationToken,
) -> SessionOutcome
where
    S: FrameSource + Send + 'static,
    K: FrameSink + Send + 'static,
{
    info!(
        client = %entry.client_addr,
        backend = %config.backend_addr,
        "session starting"
    );
    counter!("relay_sessions_total").increment(1);
    gauge!("relay_sessions_active").increment(1.0);

    let stream = match timeout(
        config.connect_timeout,
        TcpStream::connect(&config.backend_addr),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source_err)) => {
            let err = RelayError::Connect {
                addr: config.backend_addr.clone(),
                source: source_err,
            };
            return connect_failed(err, &entry, &mut sink).await;
        }
        Err(_elapsed) => {
            #[allow(clippy::cast_possible_truncation)]
            let err = RelayError::ConnectTimeout {
                addr: config.backend_addr.clone(),
                timeout_ms: config.connect_timeout.as_millis() as u64,
            };
            return connect_failed(err, &entry, &mut sink).await;
        }
    };

    // Interactive desktop traffic; don't batch small writes.
    if let Err(err) = stream.set_nodelay(true) {
        debug!(error = %err, "could not set TCP_NODELAY");
    }

    entry.set_state(SessionState::Forwarding);
    let (mut backend_read, mut backend_write) = stream.into_split();

    let up_cancel = cancel.clone();
    let up_stats = entry.stats.clone();
    let up = tokio::spawn(async move {
        let end = client_to_backend(&mut source, &mut backend_write, &up_cancel, &up_stats).await;
        up_cancel.cancel();
        if let Err(err) = tokio::io::AsyncWriteExt::shutdown(&mut backend_write).await {
            debug!(error = %err, "backend socket already closed");
        }
        end
    });

    let down_cancel = cancel.clone();
    let down_stats = entry.stats.clone();
    let buf_size = config.read_buffer_size;
    let down = tokio::spawn(async move {
        let end =
            backend_to_client(&mut backend_read, &mut sink, &down_cancel, &down_stats, buf_size)
                .await;
        down_cancel.cancel();
        sink.close().await;
        end
    });

    let watchdog = config.idle_timeout.map(|idle| {
        tokio::spawn(run_idle_watchdog(entry.stats.clone(), idle, cancel.clone()))
    });

    // Every exit path cancels the token, so this is "first leg stopped".
    cancel.cancelled().await;
    entry.set_state(SessionState::Closing);

    let up_end = join_leg(up, "client->backend").await;
    let down_end = join_leg(down, "backend->client").await;
    let idle_fired = match watchdog {
        Some(handle) => matches!(handle.await, Ok(WatchdogResult::IdleTimedOut)),
        None => false,
    };

    if let LegEnd::Failed(err) = &up_end {
        warn!(error = %err, "client->backend leg failed");
    }
    if let LegEnd::Failed(err) = &down_end {
        warn!(error = %err, "backend->client leg failed");
    }

    let reason = close_reason(&up_end, &down_end, idle_fired);
    let bytes_up = entry.stats.bytes_up();
    let bytes_down = entry.stats.bytes_down();
    counter!("relay_bytes_total", "direction" => "up").increment(bytes_up);
    counter!("relay_bytes_total", "direction" => "down").increment(bytes_down);
    gauge!("relay_sessions_active").decrement(1.0);
    entry.set_state(SessionState::Closed);

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = entry.age().as_millis() as u64;
    info!(
        reason = %reason,
        bytes_up,
        bytes_down,
        duration_ms,
        "session closed"
    );

    SessionOutcome::Closed {
        reason,
        bytes_up,
        bytes_down,
    }
}

/// Common exit path for both connect failure modes.
async fn connect_failed<K: FrameSink>(
    err: RelayError,
    entry: &SessionEntry,
    sink: &mut K,
) -> SessionOutcome {
    warn!(error = %err, "backend connect failed");
    counter!("relay_connect_failures_total").increment(1);
    gauge!("relay_sessions_active").decrement(1.0);
    sink.close().await;
    entry.set_state(SessionState::Closed);
    SessionOutcome::ConnectFailed(err)
}

/// Join a leg task. A join error means the task panicked or was aborted,
/// neither of which a leg does on its own; treat it as a cancelled leg so
/// teardown still completes.
async fn join_leg(handle: tokio::task::JoinHandle<LegEnd>, name: &str) -> LegEnd {
    match handle.await {
        Ok(end) => end,
        Err(err) => {
            error!(leg = name, error = %err, "leg task aborted");
            LegEnd::Cancelled
        }
    }
}

/// Reduce the two leg outcomes (and the watchdog) to one close reason.
fn close_reason(up: &LegEnd, down: &LegEnd, idle_fired: bool) -> CloseReason {
    if idle_fired {
        return CloseReason::IdleTimeout;
    }
    match (up, down) {
        (LegEnd::Failed(_), _) | (_, LegEnd::Failed(_)) => CloseReason::LegFailed,
        (LegEnd::StreamEnd, _) => CloseReason::ClientClosed,
        (_, LegEnd::StreamEnd) => CloseReason::BackendClosed,
        (LegEnd::Cancelled, LegEnd::Cancelled) => CloseReason::Shutdown,
    }
}
