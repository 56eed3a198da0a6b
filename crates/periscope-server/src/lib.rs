//! # periscope-server
//!
//! Axum HTTP + WebSocket server for the Periscope gateway.
//!
//! Routes: `/` (branded landing page), `/health`, `/status` (with a live
//! backend probe), `/metrics` (Prometheus), and `/websockify` (websocket
//! upgrade into a relay session).

#![deny(unsafe_code)]

pub mod health;
pub mod metrics;
pub mod page;
pub mod server;
pub mod shutdown;
pub mod status;
pub mod ws;

pub use server::{AppState, ServerHandle, build_router, start};
pub use shutdown::ShutdownCoordinator;
