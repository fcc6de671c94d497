// Save debouncer for the active document.
//
// Every local edit pushes its generation and resets the quiet period. Only
// the newest generation is kept, so N edits inside one window collapse into a
// single save of the last one.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSave {
    generation: u64,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct SaveDebouncer {
    window: Duration,
    pending: Option<PendingSave>,
}

impl SaveDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record an edit. Replaces any pending save and restarts the window.
    pub fn push(&mut self, generation: u64, now: Instant) {
        self.pending = Some(PendingSave { generation, last_seen: now });
    }

    /// Take the pending generation if its window has elapsed.
    pub fn due(&mut self, now: Instant) -> Option<u64> {
        let pending = self.pending?;
        if now.duration_since(pending.last_seen) >= self.window {
            self.pending = None;
            Some(pending.generation)
        } else {
            None
        }
    }

    /// Drop the pending save without firing it. Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Take the pending generation regardless of the window.
    pub fn take(&mut self) -> Option<u64> {
        self.pending.take().map(|p| p.generation)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending save becomes due, or None if nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.last_seen + self.window)
    }
}
