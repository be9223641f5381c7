use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Frame;

/// Single-frame mailbox. A publish replaces whatever is pending, so the
/// consumer only ever sees the most recent frame.
#[derive(Debug, Default)]
pub struct FrameSlot {
    pending: Mutex<Option<Frame>>,
}

impl FrameSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stores `frame`, discarding any frame not yet taken.
    /// Returns `true` when an unconsumed frame was dropped.
    pub fn publish(&self, frame: Frame) -> bool {
        let dropped = self.lock().replace(frame);
        if let Some(old) = &dropped {
            tracing::trace!(
                width = old.width(),
                height = old.height(),
                "dropped unconsumed frame"
            );
        }
        dropped.is_some()
    }

    /// Removes and returns the pending frame, if any.
    pub fn take_latest(&self) -> Option<Frame> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    // A panic while holding the lock cannot leave a half-written Option behind,
    // so the poisoned guard is still valid.
    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
