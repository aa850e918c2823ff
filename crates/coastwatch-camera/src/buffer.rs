//! Single-slot latest-wins frame exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use coastwatch_vision::Frame;

/// Shares the newest decoded frame between a camera's frame pump and its
/// analysis loop.
///
/// Publishing replaces the slot as a whole, so a reader sees either the
/// previous or the new complete frame. Intermediate frames may be skipped
/// and the same frame may be read more than once.
#[derive(Clone)]
pub struct FrameBuffer {
    slot: Arc<watch::Sender<Option<Frame>>>,
    published: Arc<AtomicU64>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            slot: Arc::new(tx),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the current frame.
    pub fn publish(&self, frame: Frame) {
        self.slot.send_replace(Some(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the newest frame, if any.
    pub fn latest(&self) -> Option<Frame> {
        self.slot.borrow().clone()
    }

    /// Drop the held frame.
    pub fn clear(&self) {
        self.slot.send_replace(None);
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<Frame>> {
        self.slot.subscribe()
    }

    /// Frames published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("has_frame", &self.slot.borrow().is_some())
            .field("published", &self.published())
            .finish()
    }
}
