//! `/websockify` — websocket upgrade into a relay session.
//!
//! This file is the only place that touches axum's websocket types; the
//! relay sees them through its `FrameSource`/`FrameSink` traits.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

use periscope_relay::{ClientFrame, FrameSink, FrameSource, Leg, RelayError, SessionConfig};

use crate::server::AppState;

/// Relay frame source over the read half of an upgraded socket.
pub struct WsFrameSource {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Result<Option<ClientFrame>, RelayError> {
        loop {
            match self.inner.next().await {
                None => return Ok(None),
                Some(Err(err)) => {
                    return Err(RelayError::Transport {
                        leg: Leg::ClientToBackend,
                        message: err.to_string(),
                    });
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(ClientFrame::Binary(data))),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(ClientFrame::Text(text.to_string())));
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                // axum answers pings itself; pongs just confirm liveness.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            }
        }
    }
}

/// Relay frame sink over the write half of an upgraded socket.
pub struct WsFrameSink {
    inner: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_bytes(&mut self, bytes: Bytes) -> Result<(), RelayError> {
        self.inner
            .send(Message::Binary(bytes))
            .await
            .map_err(|err| RelayError::Transport {
                leg: Leg::BackendToClient,
                message: err.to_string(),
            })
    }

    async fn close(&mut self) {
        if let Err(err) = self.inner.close().await {
            debug!(error = %err, "websocket already closed");
        }
    }
}

/// GET /websockify — upgrade and hand the connection to a relay session.
pub async fn websockify_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Drive one upgraded connection through a full relay session.
async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: AppState) {
    let entry = state.sessions.register(peer.to_string());
    let id = entry.id.clone();
    info!(session = %id, client = %peer, "websocket client connected");

    let (sink_half, stream_half) = socket.split();
    let source = WsFrameSource { inner: stream_half };
    let sink = WsFrameSink { inner: sink_half };

    let config = SessionConfig::from_settings(&state.settings.relay);
    let cancel = state.shutdown.token().child_token();

    let _outcome = periscope_relay::run_session(source, sink, entry, config, cancel).await;

    state.sessions.remove(&id);
}
