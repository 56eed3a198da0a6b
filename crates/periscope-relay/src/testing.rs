//! In-memory frame channel doubles shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::channel::{ClientFrame, FrameSink, FrameSource};
use crate::error::{Leg, RelayError};

/// Frame source fed from an mpsc channel. Dropping the sender is a clean
/// client close; an `Err` item simulates a websocket-layer failure.
pub(crate) struct ChannelSource {
    rx: mpsc::Receiver<Result<Option<ClientFrame>, RelayError>>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<Option<ClientFrame>, RelayError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Ok(None),
        }
    }
}

/// Frame sink that forwards into an mpsc channel. Dropping the receiver
/// makes sends fail like a dead websocket peer.
pub(crate) struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_bytes(&mut self, bytes: Bytes) -> Result<(), RelayError> {
        self.tx.send(bytes).await.map_err(|_| RelayError::Transport {
            leg: Leg::BackendToClient,
            message: "client channel closed".into(),
        })
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// Build a [`ChannelSource`] plus the sender that scripts its frames.
pub(crate) fn channel_source() -> (
    mpsc::Sender<Result<Option<ClientFrame>, RelayError>>,
    ChannelSource,
) {
    let (tx, rx) = mpsc::channel(64);
    (tx, ChannelSource { rx })
}

/// Build a [`ChannelSink`] plus the receiver observing sent messages and a
/// flag recording whether `close` was called.
pub(crate) fn channel_sink() -> (ChannelSink, mpsc::Receiver<Bytes>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel(1024);
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelSink {
            tx,
            closed: closed.clone(),
        },
        rx,
        closed,
    )
}
