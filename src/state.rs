//! Shared color handoff between the capture and dispatch loops.
//!
//! One mutex guards one `(left, right)` pair. The capture loop overwrites it,
//! the dispatch loop snapshots it, and neither side ever sees a pair whose
//! halves came from different ticks. Unread pairs are simply lost; the
//! dispatch loop only ever wants the newest one.

use crate::types::Rgb;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to the latest sampled `(left, right)` color pair.
///
/// Cloning yields another handle to the same cell. Both accessors take the
/// lock for the duration of one pair copy and nothing else, so the critical
/// sections stay tiny.
#[derive(Clone)]
pub struct SharedColorState {
    inner: Arc<Mutex<(Rgb, Rgb)>>,
}

impl SharedColorState {
    /// Both sides start black
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new((Rgb::BLACK, Rgb::BLACK))),
        }
    }

    /// Replace both colors in one critical section
    pub fn store(&self, left: Rgb, right: Rgb) {
        *self.lock() = (left, right);
    }

    /// Snapshot both colors in one critical section
    pub fn load(&self) -> (Rgb, Rgb) {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, (Rgb, Rgb)> {
        // A poisoned lock means a panic elsewhere; the pair inside is still
        // a complete pair, so keep going with it.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Default for SharedColorState {
    fn default() -> Self {
        Self::new()
    }
}
