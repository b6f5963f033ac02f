//! Capture-side loop: poll frames, reduce regions, publish colors.
//!
//! The sampler owns the frame source and the reducer outright; nothing here
//! is shared except the [`SharedColorState`] handle it publishes into. All
//! per-tick work (frame copy, region extraction, reduction) happens outside
//! the lock, so the critical section is just the pair store.

use crate::capture::{FrameGrabber, FrameSource};
use crate::reducer::RegionReducer;
use crate::state::SharedColorState;
use crate::types::{CaptureError, PixelBuffer};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Periodic producer for the shared color pair.
///
/// One [`tick`](Self::tick) pulls the newest frame, reduces both sampling
/// regions, and stores the result. [`run`](Self::run) drives ticks on a fixed
/// period until the shutdown signal flips.
pub struct ScreenSampler<G: FrameGrabber> {
    source: FrameSource<G>,
    reducer: Box<dyn RegionReducer>,
    state: SharedColorState,
    left_pixels: PixelBuffer,
    right_pixels: PixelBuffer,
}

impl<G: FrameGrabber> ScreenSampler<G> {
    pub fn new(
        source: FrameSource<G>,
        reducer: Box<dyn RegionReducer>,
        state: SharedColorState,
    ) -> Self {
        let left_pixels = PixelBuffer::for_region(&source.left_region());
        let right_pixels = PixelBuffer::for_region(&source.right_region());
        Self {
            source,
            reducer,
            state,
            left_pixels,
            right_pixels,
        }
    }

    /// One capture tick.
    ///
    /// Returns `Ok(true)` when a new frame was reduced and published,
    /// `Ok(false)` when the backend had nothing newer (the previously
    /// published colors stand).
    pub fn tick(&mut self) -> Result<bool, CaptureError> {
        if !self.source.acquire_latest_frame()? {
            return Ok(false);
        }

        self.source
            .extract_region(self.source.left_region(), &mut self.left_pixels);
        self.source
            .extract_region(self.source.right_region(), &mut self.right_pixels);

        let left = self.reducer.reduce(&self.left_pixels);
        let right = self.reducer.reduce(&self.right_pixels);

        self.state.store(left, right);
        trace!(
            "Published colors: left=({},{},{}) right=({},{},{})",
            left.r,
            left.g,
            left.b,
            right.r,
            right.g,
            right.b
        );
        Ok(true)
    }

    /// Run ticks every `period` until `shutdown` fires.
    ///
    /// Backend hiccups are logged and skipped rather than ending the loop;
    /// the previously published pair simply stays current. The shutdown check
    /// shares the wait with the tick timer, so a signal lands within one
    /// period at worst.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticks = tokio::time::interval(period);
        // Overruns push the next tick out instead of bursting to catch up
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Capture loop started ({}ms period)", period.as_millis());
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticks.tick() => {
                    if let Err(e) = self.tick() {
                        warn!("Frame acquisition failed: {}; keeping previous colors", e);
                    }
                }
            }
        }
        debug!("Capture loop stopped");
    }
}
