//! Relay error types and leg outcomes.

use std::fmt;
use std::io;

use thiserror::Error;

/// One direction of the bidirectional relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    /// Browser websocket → VNC backend.
    ClientToBackend,
    /// VNC backend → browser websocket.
    BackendToClient,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToBackend => f.write_str("client->backend"),
            Self::BackendToClient => f.write_str("backend->client"),
        }
    }
}

/// Errors a relay session can hit.
///
/// All of these are terminal for the session; the relay never retries.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backend refused or was unreachable at session start.
    #[error("backend connect to {addr} failed: {source}")]
    Connect {
        /// The attempted backend address.
        addr: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// The backend did not accept within the connect timeout.
    #[error("backend connect to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// The attempted backend address.
        addr: String,
        /// The configured connect timeout.
        timeout_ms: u64,
    },

    /// A TCP read or write failed mid-session.
    #[error("{leg} socket error: {source}")]
    Io {
        /// Which leg failed.
        leg: Leg,
        /// Underlying socket error.
        source: io::Error,
    },

    /// The websocket layer reported a failure.
    #[error("{leg} websocket error: {message}")]
    Transport {
        /// Which leg failed.
        leg: Leg,
        /// Transport-level description.
        message: String,
    },
}

impl RelayError {
    /// Which leg this error occurred on, if it occurred mid-forwarding.
    #[must_use]
    pub fn leg(&self) -> Option<Leg> {
        match self {
            Self::Io { leg, .. } | Self::Transport { leg, .. } => Some(*leg),
            Self::Connect { .. } | Self::ConnectTimeout { .. } => None,
        }
    }
}

/// Why a forwarding loop stopped.
#[derive(Debug)]
pub enum LegEnd {
    /// The peer closed cleanly (close frame or zero-length read).
    StreamEnd,
    /// The session's termination signal fired first.
    Cancelled,
    /// The leg hit a terminal error.
    Failed(RelayError),
}

impl LegEnd {
    /// True for the clean end-of-stream outcome.
    #[must_use]
    pub fn is_stream_end(&self) -> bool {
        matches!(self, Self::StreamEnd)
    }

    /// True when the loop stopped because the termination signal was set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
