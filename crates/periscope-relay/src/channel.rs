//! The seam between the relay and the websocket layer.
//!
//! The relay never touches a websocket type directly. The server hands it
//! the two halves of the upgraded connection behind [`FrameSource`] and
//! [`FrameSink`], which keeps the copy loops testable against in-memory
//! channels and keeps VNC bytes opaque to this crate.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RelayError;

/// One frame received from the browser side of the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientFrame {
    /// Binary payload, forwarded verbatim.
    Binary(Bytes),
    /// Text payload, remapped byte-per-character before forwarding.
    Text(String),
}

/// Receiving half of the browser connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame from the client.
    ///
    /// `Ok(None)` means the client closed cleanly. Control frames
    /// (ping/pong) are the transport's concern and never surface here.
    async fn next_frame(&mut self) -> Result<Option<ClientFrame>, RelayError>;
}

/// Sending half of the browser connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one binary message to the client.
    async fn send_bytes(&mut self, bytes: Bytes) -> Result<(), RelayError>;

    /// Close the client side. Implementations swallow close errors; a
    /// connection that is already gone is an acceptable end state.
    async fn close(&mut self);
}

/// Reinterpret a text frame as raw bytes, one byte per character.
///
/// VNC payloads are binary; a client that sends text frames (some websocket
/// stacks do for handshake strings) must not have its bytes re-encoded as
/// multi-byte UTF-8. Each scalar value contributes its low eight bits.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn text_frame_bytes(text: &str) -> Bytes {
    text.chars()
        .map(|c| (c as u32) as u8)
        .collect::<Vec<u8>>()
        .into()
}
