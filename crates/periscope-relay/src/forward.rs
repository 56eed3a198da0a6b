//! The two forwarding loops of a session.
//!
//! Each loop is one direction of the bridge and runs as its own task. The
//! only thing the loops share is the session's `CancellationToken` and the
//! byte/activity counters. A loop never retries: any outcome other than
//! "keep copying" ends it, and the session tears the sibling down.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::channel::{ClientFrame, FrameSink, FrameSource, text_frame_bytes};
use crate::error::{Leg, LegEnd, RelayError};
use crate::registry::SessionStats;

/// Copy websocket frames from the client into the backend socket.
///
/// Bytes are written in arrival order; each chunk is fully written before
/// the next frame is read, so no reordering or coalescing can occur.
pub async fn client_to_backend<S, W>(
    source: &mut S,
    backend: &mut W,
    cancel: &CancellationToken,
    stats: &SessionStats,
) -> LegEnd
where
    S: FrameSource + ?Sized,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => return LegEnd::Cancelled,
            frame = source.next_frame() => frame,
        };

        let chunk = match frame {
            Ok(Some(ClientFrame::Binary(bytes))) => bytes,
            Ok(Some(ClientFrame::Text(text))) => text_frame_bytes(&text),
            Ok(None) => return LegEnd::StreamEnd,
            Err(err) => return LegEnd::Failed(err),
        };
        if chunk.is_empty() {
            continue;
        }

        if let Err(source) = backend.write_all(&chunk).await {
            return LegEnd::Failed(RelayError::Io {
                leg: Leg::ClientToBackend,
                source,
            });
        }
        stats.record_up(chunk.len() as u64);
        trace!(bytes = chunk.len(), "forwarded client->backend");
    }
}

/// Copy backend socket bytes into the client websocket.
///
/// Fixed-size reads; each nonempty read becomes exactly one binary message.
/// A zero-length read means the backend closed its write side.
pub async fn backend_to_client<R, K>(
    backend: &mut R,
    sink: &mut K,
    cancel: &CancellationToken,
    stats: &SessionStats,
    buf_size: usize,
) -> LegEnd
where
    R: AsyncRead + Unpin,
    K: FrameSink + ?Sized,
{
    let mut buf = vec![0u8; buf_size];
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => return LegEnd::Cancelled,
            read = backend.read(&mut buf) => read,
        };

        match read {
            Ok(0) => return LegEnd::StreamEnd,
            Ok(n) => {
                if let Err(err) = sink.send_bytes(Bytes::copy_from_slice(&buf[..n])).await {
                    return LegEnd::Failed(err);
                }
                stats.record_down(n as u64);
                trace!(bytes = n, "forwarded backend->client");
            }
            Err(source) => {
                return LegEnd::Failed(RelayError::Io {
                    leg: Leg::BackendToClient,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{channel_sink, channel_source};
    use std::time::Duration;

    // ── client→backend ──────────────────────────────────────────────

    #[tokio::test]
    async fn binary_frames_arrive_in_order() {
        let (frames, mut source) = channel_source();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        frames
            .send(Ok(Some(ClientFrame::Binary(Bytes::from_static(b"\x03\x01")))))
            .await
            .unwrap();
        frames
            .send(Ok(Some(ClientFrame::Binary(Bytes::from_static(b"\x00\x50")))))
            .await
            .unwrap();
        drop(frames);

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        assert!(end.is_stream_end());
        drop(backend_write);

        let mut received = Vec::new();
        let _ = backend_read.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"\x03\x01\x00\x50");
        assert_eq!(stats.bytes_up(), 4);
    }

    #[tokio::test]
    async fn text_frames_are_byte_mapped() {
        let (frames, mut source) = channel_source();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        frames
            .send(Ok(Some(ClientFrame::Text("RFB \u{00ff}".into()))))
            .await
            .unwrap();
        drop(frames);

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        assert!(end.is_stream_end());
        drop(backend_write);

        let mut received = Vec::new();
        let _ = backend_read.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, [b'R', b'F', b'B', b' ', 0xff]);
    }

    #[tokio::test]
    async fn empty_frames_are_skipped() {
        let (frames, mut source) = channel_source();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        frames
            .send(Ok(Some(ClientFrame::Binary(Bytes::new()))))
            .await
            .unwrap();
        frames
            .send(Ok(Some(ClientFrame::Binary(Bytes::from_static(b"x")))))
            .await
            .unwrap();
        drop(frames);

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        assert!(end.is_stream_end());
        drop(backend_write);

        let mut received = Vec::new();
        let _ = backend_read.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"x");
        assert_eq!(stats.bytes_up(), 1);
    }

    #[tokio::test]
    async fn websocket_error_fails_the_leg() {
        let (frames, mut source) = channel_source();
        let (mut backend_write, _backend_read) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        frames
            .send(Err(RelayError::Transport {
                leg: Leg::ClientToBackend,
                message: "protocol violation".into(),
            }))
            .await
            .unwrap();

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        assert!(matches!(end, LegEnd::Failed(RelayError::Transport { .. })));
    }

    #[tokio::test]
    async fn backend_write_failure_fails_the_leg() {
        let (frames, mut source) = channel_source();
        let (mut backend_write, backend_read) = tokio::io::duplex(16);
        drop(backend_read);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        frames
            .send(Ok(Some(ClientFrame::Binary(Bytes::from_static(b"data")))))
            .await
            .unwrap();

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        match end {
            LegEnd::Failed(RelayError::Io { leg, .. }) => {
                assert_eq!(leg, Leg::ClientToBackend);
            }
            other => panic!("expected Io failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_client_leg() {
        let (_frames, mut source) = channel_source();
        let (mut backend_write, _backend_read) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        cancel.cancel();
        let end = tokio::time::timeout(
            Duration::from_secs(1),
            client_to_backend(&mut source, &mut backend_write, &cancel, &stats),
        )
        .await
        .expect("leg must notice cancellation promptly");
        assert!(end.is_cancelled());
    }

    // ── backend→client ──────────────────────────────────────────────

    #[tokio::test]
    async fn backend_bytes_become_messages() {
        let (mut sink, mut out, _closed) = channel_sink();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(8192);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        backend_write.write_all(b"framebuffer").await.unwrap();
        backend_write.shutdown().await.unwrap();

        let end =
            backend_to_client(&mut backend_read, &mut sink, &cancel, &stats, 4096).await;
        assert!(end.is_stream_end());

        let msg = out.recv().await.unwrap();
        assert_eq!(&msg[..], b"framebuffer");
        assert_eq!(stats.bytes_down(), 11);
    }

    #[tokio::test]
    async fn large_payload_is_chunked_by_buffer_size() {
        let (mut sink, mut out, _closed) = channel_sink();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(65536);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        backend_write.write_all(&payload).await.unwrap();
        backend_write.shutdown().await.unwrap();

        let end =
            backend_to_client(&mut backend_read, &mut sink, &cancel, &stats, 4096).await;
        assert!(end.is_stream_end());
        drop(sink);

        let mut received = Vec::new();
        while let Some(msg) = out.recv().await {
            assert!(msg.len() <= 4096);
            received.extend_from_slice(&msg);
        }
        assert_eq!(received, payload);
        assert_eq!(stats.bytes_down(), 10_000);
    }

    #[tokio::test]
    async fn zero_length_read_ends_cleanly() {
        let (mut sink, _out, _closed) = channel_sink();
        let (backend_write, mut backend_read) = tokio::io::duplex(64);
        drop(backend_write);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        let end = backend_to_client(&mut backend_read, &mut sink, &cancel, &stats, 64).await;
        assert!(end.is_stream_end());
        assert_eq!(stats.bytes_down(), 0);
    }

    #[tokio::test]
    async fn sink_failure_fails_the_leg() {
        let (mut sink, out, _closed) = channel_sink();
        drop(out);
        let (mut backend_write, mut backend_read) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        backend_write.write_all(b"hi").await.unwrap();

        let end = backend_to_client(&mut backend_read, &mut sink, &cancel, &stats, 64).await;
        assert!(matches!(end, LegEnd::Failed(RelayError::Transport { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_backend_leg() {
        let (mut sink, _out, _closed) = channel_sink();
        let (_backend_write, mut backend_read) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        let cancel2 = cancel.clone();
        let waiter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel2.cancel();
        });

        let end = tokio::time::timeout(
            Duration::from_secs(1),
            backend_to_client(&mut backend_read, &mut sink, &cancel, &stats, 64),
        )
        .await
        .expect("leg must notice cancellation promptly");
        assert!(end.is_cancelled());
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn random_payload_roundtrip_is_byte_exact() {
        use rand::RngCore;

        let (frames, mut source) = channel_source();
        let (mut backend_write, mut backend_read) = tokio::io::duplex(1 << 20);
        let cancel = CancellationToken::new();
        let stats = SessionStats::new();

        let mut payload = vec![0u8; 64 * 1024];
        rand::rng().fill_bytes(&mut payload);
        // Deliver in uneven chunks, including ones holding zero bytes.
        for chunk in payload.chunks(1777) {
            frames
                .send(Ok(Some(ClientFrame::Binary(Bytes::copy_from_slice(chunk)))))
                .await
                .unwrap();
        }
        drop(frames);

        let end = client_to_backend(&mut source, &mut backend_write, &cancel, &stats).await;
        assert!(end.is_stream_end());
        drop(backend_write);

        let mut received = Vec::new();
        let _ = backend_read.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, payload);
    }
}
