//! Frame acquisition and region extraction.
//!
//! This module owns the seam to the platform capture backend. [`FrameGrabber`]
//! is the backend contract; [`FrameSource`] wraps one grabber, keeps the
//! full-frame staging copy, derives the two fixed sampling regions from the
//! frame dimensions, and enforces the acquire/copy/release protocol so the
//! rest of the pipeline never touches backend frame lifetimes.

use crate::types::{CaptureError, PixelBuffer, Region, BYTES_PER_PIXEL};
use tracing::{debug, trace};

/// Platform capture backend for one monitor.
///
/// Implementations bind to a monitor at construction time and hand out
/// frames one at a time:
/// - `acquire_next_frame` is non-blocking; `Ok(false)` means nothing newer
///   than the last acquisition exists yet
/// - `frame_bytes` is only valid between a successful acquire and its release
/// - every `Ok(true)` acquire must be paired with exactly one
///   `release_frame` before the next acquire
///
/// [`FrameSource`] upholds the pairing; backends may assume it.
pub trait FrameGrabber: Send {
    /// Full frame size in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Non-blocking poll for a frame newer than the last acquisition
    fn acquire_next_frame(&mut self) -> Result<bool, CaptureError>;

    /// Packed BGRA bytes of the currently acquired frame
    fn frame_bytes(&self) -> &[u8];

    /// Hand the current frame back to the backend
    fn release_frame(&mut self) -> Result<(), CaptureError>;
}

/// Open the configured capture backend; only "synthetic" is built in
pub fn open_backend(
    name: &str,
    monitor_index: usize,
) -> Result<synthetic::SyntheticGrabber, CaptureError> {
    match name {
        "synthetic" => synthetic::SyntheticGrabber::new(monitor_index),
        other => Err(CaptureError::BackendUnavailable(format!(
            "unknown capture backend '{}'",
            other
        ))),
    }
}

/// Derive the left and right sampling regions for a frame.
///
/// Both regions are `width_ratio` of the frame wide and `height_ratio` of
/// the frame tall, vertically centered, anchored flush against the left and
/// right edges. Fractional sizes truncate.
pub fn derive_regions(
    width: u32,
    height: u32,
    width_ratio: f64,
    height_ratio: f64,
) -> (Region, Region) {
    let region_width = (width as f64 * width_ratio) as u32;
    let region_height = (height as f64 * height_ratio) as u32;
    assert!(
        region_width > 0 && region_height > 0,
        "region ratios {}x{} collapse a {}x{} frame to zero pixels",
        width_ratio,
        height_ratio,
        width,
        height
    );

    let y = (height - region_height) / 2;
    let left = Region::new(0, y, region_width, region_height);
    let right = Region::new(width - region_width, y, region_width, region_height);
    (left, right)
}

/// Frame service over one capture backend.
///
/// Keeps a staging copy of the newest frame so region extraction never reads
/// backend-owned memory, and so a tick with no new frame still has the
/// previous pixels to fall back on.
pub struct FrameSource<G> {
    grabber: G,
    width: u32,
    height: u32,
    staging: Vec<u8>,
    left_region: Region,
    right_region: Region,
}

impl<G: FrameGrabber> FrameSource<G> {
    pub fn new(grabber: G, width_ratio: f64, height_ratio: f64) -> Self {
        let (width, height) = grabber.dimensions();
        let (left_region, right_region) = derive_regions(width, height, width_ratio, height_ratio);
        debug!(
            "Frame source bound: {}x{} frame, sampling {}x{} regions at y={}",
            width, height, left_region.width, left_region.height, left_region.y
        );

        Self {
            grabber,
            width,
            height,
            staging: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            left_region,
            right_region,
        }
    }

    pub fn left_region(&self) -> Region {
        self.left_region
    }

    pub fn right_region(&self) -> Region {
        self.right_region
    }

    /// Pull the newest frame into the staging buffer, without blocking.
    ///
    /// Returns `Ok(false)` when the backend has nothing newer; the staging
    /// buffer then still holds the previous frame.
    pub fn acquire_latest_frame(&mut self) -> Result<bool, CaptureError> {
        if !self.grabber.acquire_next_frame()? {
            trace!("No new frame from backend");
            return Ok(false);
        }

        let frame = self.grabber.frame_bytes();
        assert_eq!(
            frame.len(),
            self.staging.len(),
            "backend frame size changed mid-run"
        );
        self.staging.copy_from_slice(frame);

        // Exactly one release per successful acquire; skipping it starves
        // the backend of buffers.
        self.grabber.release_frame()?;
        Ok(true)
    }

    /// Copy `region` out of the staging buffer into `out`
    pub fn extract_region(&self, region: Region, out: &mut PixelBuffer) {
        let out_bytes = out.as_mut_bytes();
        assert_eq!(
            out_bytes.len(),
            region.byte_len(),
            "output buffer does not match region size"
        );
        assert!(
            region.x + region.width <= self.width && region.y + region.height <= self.height,
            "region {:?} exceeds {}x{} frame",
            region,
            self.width,
            self.height
        );

        let frame_stride = self.width as usize * BYTES_PER_PIXEL;
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        for row in 0..region.height as usize {
            let src_start =
                (region.y as usize + row) * frame_stride + region.x as usize * BYTES_PER_PIXEL;
            let dst_start = row * row_len;
            out_bytes[dst_start..dst_start + row_len]
                .copy_from_slice(&self.staging[src_start..src_start + row_len]);
        }
    }
}

/// Synthetic capture backend.
///
/// Stands in where no real capture API is wired up: paints solid left/right
/// halves that step through a small palette at a fixed frame cadence, so the
/// whole pipeline can run (and be watched via the dry-run controller) on any
/// machine.
pub mod synthetic {
    use super::FrameGrabber;
    use crate::types::{CaptureError, BYTES_PER_PIXEL};
    use std::time::{Duration, Instant};

    /// RGB triples the halves cycle through
    const PALETTE: [[u8; 3]; 4] = [
        [224, 32, 32],
        [32, 160, 224],
        [32, 192, 96],
        [224, 192, 32],
    ];

    /// Default virtual frame size
    const DEFAULT_WIDTH: u32 = 640;
    const DEFAULT_HEIGHT: u32 = 360;

    /// How often a "new" frame becomes available (roughly 30 fps)
    const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// One virtual monitor painting a stepping two-tone test pattern
    pub struct SyntheticGrabber {
        width: u32,
        height: u32,
        frame: Vec<u8>,
        frame_interval: Duration,
        last_frame: Option<Instant>,
        step: usize,
        acquired: bool,
    }

    impl SyntheticGrabber {
        /// Bind to a virtual monitor; only index 0 exists
        pub fn new(monitor_index: usize) -> Result<Self, CaptureError> {
            if monitor_index != 0 {
                return Err(CaptureError::MonitorOutOfRange {
                    index: monitor_index,
                    available: 1,
                });
            }
            Ok(Self::with_dimensions(DEFAULT_WIDTH, DEFAULT_HEIGHT))
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                frame: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
                frame_interval: DEFAULT_FRAME_INTERVAL,
                last_frame: None,
                step: 0,
                acquired: false,
            }
        }

        /// Override the simulated refresh cadence (zero means every poll
        /// yields a new frame)
        pub fn set_frame_interval(&mut self, interval: Duration) {
            self.frame_interval = interval;
        }

        /// Paint the current palette step: left half one color, right half
        /// the next one over
        fn paint(&mut self) {
            let left = PALETTE[self.step % PALETTE.len()];
            let right = PALETTE[(self.step + 1) % PALETTE.len()];
            let half = self.width / 2;

            for y in 0..self.height {
                for x in 0..self.width {
                    let [r, g, b] = if x < half { left } else { right };
                    let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
                    self.frame[offset] = b;
                    self.frame[offset + 1] = g;
                    self.frame[offset + 2] = r;
                    self.frame[offset + 3] = 255;
                }
            }
        }
    }

    impl FrameGrabber for SyntheticGrabber {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn acquire_next_frame(&mut self) -> Result<bool, CaptureError> {
            debug_assert!(!self.acquired, "previous frame was never released");

            let now = Instant::now();
            if let Some(last) = self.last_frame {
                if now.duration_since(last) < self.frame_interval {
                    return Ok(false);
                }
            }

            self.last_frame = Some(now);
            self.paint();
            self.step = self.step.wrapping_add(1);
            self.acquired = true;
            Ok(true)
        }

        fn frame_bytes(&self) -> &[u8] {
            debug_assert!(self.acquired, "frame_bytes outside acquire/release");
            &self.frame
        }

        fn release_frame(&mut self) -> Result<(), CaptureError> {
            if !self.acquired {
                return Err(CaptureError::Backend(
                    "release without a matching acquire".to_string(),
                ));
            }
            self.acquired = false;
            Ok(())
        }
    }
}
