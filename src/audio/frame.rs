use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Frame size expected by the recognizer, in bytes
pub const DEFAULT_FRAME_SIZE: usize = 1024;

/// Lazy sequence of frames handed to a recognizer
pub type FrameStream = BoxStream<'static, Frame>;

/// A fixed-size slice of raw PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Re-chunks arbitrary inbound audio into fixed-size frames
///
/// Bytes that do not yet fill a whole frame stay buffered until the next
/// `ingest` call (or until `reset` throws them away).
#[derive(Debug)]
pub struct AudioFrameBuffer {
    frame_size: usize,
    pending: Vec<u8>,
}

impl AudioFrameBuffer {
    /// Create a buffer emitting frames of `frame_size` bytes.
    ///
    /// # Panics
    /// If `frame_size` is zero. `Config::validate` rejects that value upstream.
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be non-zero");
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Bytes buffered but not yet emitted (always shorter than one frame)
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Append a chunk and return every whole frame now available, in order
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);

        let whole = self.pending.len() - self.pending.len() % self.frame_size;
        if whole == 0 {
            return Vec::new();
        }

        let remainder = self.pending.split_off(whole);
        let ready = std::mem::replace(&mut self.pending, remainder);

        ready
            .chunks_exact(self.frame_size)
            .map(|slice| Frame {
                data: slice.to_vec(),
            })
            .collect()
    }

    /// Discard buffered bytes, returning how many were dropped
    pub fn reset(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!("Discarded {} stale buffered audio bytes", dropped);
        }
        dropped
    }
}

impl Default for AudioFrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIZE)
    }
}

/// Turn the receiving end of a frame queue into a lazy frame stream.
///
/// The stream checks `cancelled` before every pull and ends as soon as it is
/// set, or when every sender of the queue has been dropped.
pub fn frame_stream(queue: mpsc::Receiver<Frame>, cancelled: Arc<AtomicBool>) -> FrameStream {
    stream::unfold((queue, cancelled), |(mut queue, cancelled)| async move {
        if cancelled.load(Ordering::SeqCst) {
            return None;
        }
        let frame = queue.recv().await?;
        if cancelled.load(Ordering::SeqCst) {
            return None;
        }
        Some((frame, (queue, cancelled)))
    })
    .boxed()
}
