//! Duplicate-publish suppression
//!
//! Multiple triggers can observe the same spin: an SSE event and a stale
//! poll tick racing after a mode switch both fetch the latest spin. The
//! guard's atomic check-and-set guarantees at most one publish per observed
//! spin identifier, whichever trigger path wins.

use std::sync::Mutex;

/// Tracks the identifier of the last published spin
///
/// The slot starts empty on every process start, so a restart may republish
/// the spin that was active at shutdown. Downstream consumers are expected
/// to be idempotent on spin identifier.
#[derive(Debug, Default)]
pub struct DedupGuard {
    last_published: Mutex<Option<u64>>,
}

impl DedupGuard {
    /// Create a guard with an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a spin should be published
    ///
    /// Returns false iff `id` equals the last published identifier. When it
    /// returns true, the slot is updated in the same locked step, so two
    /// concurrent callers observing the same spin cannot both get true.
    pub fn should_publish(&self, id: u64) -> bool {
        let mut last = self.last_published.lock().unwrap();
        if *last == Some(id) {
            false
        } else {
            *last = Some(id);
            true
        }
    }

    /// Identifier of the last published spin, if any
    pub fn last_published(&self) -> Option<u64> {
        *self.last_published.lock().unwrap()
    }
}
