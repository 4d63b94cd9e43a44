//! Audio pipeline: inbound media buffering and paced playback.
//!
//! Inbound media frames are buffered in arrival order for the life of the
//! stream, then concatenated into one linear PCM clip when the stream stops.
//! The playback path re-chunks a synthesized buffer into fixed-size frames
//! emitted at a fixed interval; sending everything at once would overflow
//! the downstream player's buffer or violate its real-time expectations.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::handlers::relay::messages::{FrameRoute, OutboundFrame};

/// Name of the marker frame emitted after a completed playback.
pub const PLAYBACK_DONE_MARK: &str = "done";

/// In-memory buffer of raw media frames, arrival order preserved.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    frames: Vec<Bytes>,
    total_bytes: usize,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one media frame.
    pub fn push(&mut self, payload: Bytes) {
        self.total_bytes += payload.len();
        self.frames.push(payload);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate everything buffered so far into one clip, emptying the
    /// buffer.
    pub fn take_clip(&mut self) -> Bytes {
        let mut clip = BytesMut::with_capacity(self.total_bytes);
        for frame in self.frames.drain(..) {
            clip.extend_from_slice(&frame);
        }
        self.total_bytes = 0;
        clip.freeze()
    }

    /// Drop everything buffered without producing a clip.
    pub fn discard(&mut self) {
        self.frames.clear();
        self.total_bytes = 0;
    }
}

/// Split a buffer into fixed-size chunks; the last chunk may be short.
///
/// Produces `ceil(len / chunk_size)` chunks whose concatenation equals the
/// input exactly.
pub fn rechunk(buffer: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    assert!(chunk_size > 0, "chunk_size must be nonzero");
    let mut chunks = Vec::with_capacity(buffer.len().div_ceil(chunk_size));
    let mut offset = 0;
    while offset < buffer.len() {
        let end = (offset + chunk_size).min(buffer.len());
        chunks.push(buffer.slice(offset..end));
        offset = end;
    }
    chunks
}

/// Pace a synthesized audio buffer out as media frames, then mark the end.
///
/// One frame per tick; stops silently if the session is cancelled or the
/// outbound channel is gone.
pub async fn stream_playback(
    clip: Bytes,
    chunk_size: usize,
    interval: Duration,
    tx: &mpsc::Sender<FrameRoute>,
    cancel: &CancellationToken,
) {
    let chunks = rechunk(&clip, chunk_size);
    debug!(
        clip_bytes = clip.len(),
        frames = chunks.len(),
        "Starting paced playback"
    );

    let mut ticker = tokio::time::interval(interval);
    for payload in chunks {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Playback cancelled");
                return;
            }
            _ = ticker.tick() => {
                let frame = OutboundFrame::MediaChunk { payload };
                if tx.send(FrameRoute::Frame(frame)).await.is_err() {
                    return;
                }
            }
        }
    }

    let mark = OutboundFrame::Mark {
        name: PLAYBACK_DONE_MARK.to_string(),
    };
    let _ = tx.send(FrameRoute::Frame(mark)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_concatenates_in_arrival_order() {
        let mut buffer = AudioBuffer::new();
        buffer.push(Bytes::from_static(b"one"));
        buffer.push(Bytes::from_static(b"two"));
        buffer.push(Bytes::from_static(b"three"));

        assert_eq!(buffer.total_bytes(), 11);
        let clip = buffer.take_clip();
        assert_eq!(clip.as_ref(), b"onetwothree");
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_bytes(), 0);
    }

    #[test]
    fn test_discard_empties_buffer() {
        let mut buffer = AudioBuffer::new();
        buffer.push(Bytes::from_static(b"data"));
        buffer.discard();
        assert!(buffer.is_empty());
        assert_eq!(buffer.take_clip().len(), 0);
    }

    #[test]
    fn test_rechunk_round_trip() {
        let original = Bytes::from((0u8..=255).cycle().take(10_000).collect::<Vec<u8>>());
        let chunk_size = 3200;
        let chunks = rechunk(&original, chunk_size);

        assert_eq!(chunks.len(), original.len().div_ceil(chunk_size));
        let rejoined: Vec<u8> = chunks.iter().flat_map(|c| c.to_vec()).collect();
        assert_eq!(rejoined, original.to_vec());
    }

    #[test]
    fn test_rechunk_exact_multiple_has_no_short_tail() {
        let original = Bytes::from(vec![7u8; 6400]);
        let chunks = rechunk(&original, 3200);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 3200));
    }

    #[test]
    fn test_rechunk_empty_buffer() {
        let chunks = rechunk(&Bytes::new(), 3200);
        assert!(chunks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_emits_all_frames_then_mark() {
        let clip = Bytes::from(vec![1u8; 7000]);
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        stream_playback(clip.clone(), 3200, Duration::from_millis(100), &tx, &cancel).await;
        drop(tx);

        let mut media = Vec::new();
        let mut marks = Vec::new();
        while let Some(route) = rx.recv().await {
            match route {
                FrameRoute::Frame(OutboundFrame::MediaChunk { payload }) => media.push(payload),
                FrameRoute::Frame(OutboundFrame::Mark { name }) => marks.push(name),
                other => panic!("Unexpected route {other:?}"),
            }
        }

        assert_eq!(media.len(), 3);
        let rejoined: Vec<u8> = media.iter().flat_map(|c| c.to_vec()).collect();
        assert_eq!(rejoined, clip.to_vec());
        assert_eq!(marks, vec![PLAYBACK_DONE_MARK.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_cancelled_early_emits_no_mark() {
        let clip = Bytes::from(vec![1u8; 64_000]);
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        cancel.cancel();

        stream_playback(clip, 3200, Duration::from_millis(100), &tx, &cancel).await;
        drop(tx);

        while let Some(route) = rx.recv().await {
            assert!(
                !matches!(route, FrameRoute::Frame(OutboundFrame::Mark { .. })),
                "mark must not follow a cancelled playback"
            );
        }
    }
}
