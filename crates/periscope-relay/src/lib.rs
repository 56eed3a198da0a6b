//! # periscope-relay
//!
//! Websocket-to-TCP relay sessions: the core of the Periscope gateway.
//!
//! For every accepted browser websocket, a session opens exactly one TCP
//! connection to the VNC backend and runs two concurrent forwarding loops —
//! client→backend and backend→client — until either side ends, then tears
//! both down together. Payloads are opaque bytes: no VNC protocol
//! inspection, no rewriting, no buffering beyond one chunk in flight.
//!
//! Sessions are fully independent. The only shared state inside one session
//! is a `CancellationToken` (the termination signal) and the byte/activity
//! counters; nothing is shared across sessions.

#![deny(unsafe_code)]

pub mod channel;
pub mod error;
pub mod forward;
pub mod ids;
pub mod registry;
pub mod session;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ClientFrame, FrameSink, FrameSource, text_frame_bytes};
pub use error::{Leg, LegEnd, RelayError};
pub use ids::SessionId;
pub use registry::{SessionEntry, SessionRegistry, SessionState, SessionStats};
pub use session::{CloseReason, SessionConfig, SessionOutcome, run_session};
pub use watchdog::{WatchdogResult, run_idle_watchdog};
