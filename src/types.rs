//! Core types used throughout the lighting pipeline.
//!
//! This module defines the fundamental data structures for colors, sampling
//! regions, captured pixel data, and fixture addressing.

/// Unique identifier for a light fixture on the bridge
pub type FixtureId = String;

/// Bytes per packed pixel in a captured frame (B, G, R, A order)
pub const BYTES_PER_PIXEL: usize = 4;

/// An 8-bit-per-channel RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A byte-quantized HSL color.
///
/// Each channel is the canonical 0.0-1.0 fraction scaled by 255 and
/// truncated, so hue is NOT degrees and saturation/lightness are NOT
/// percentages. Lightness 255 means full white; hue 255 is just short of
/// wrapping back to red.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub h: u8,
    pub s: u8,
    pub l: u8,
}

impl Hsl {
    pub fn new(h: u8, s: u8, l: u8) -> Self {
        Self { h, s, l }
    }
}

/// Which edge of the screen a region or fixture group belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Axis-aligned sub-rectangle of a captured frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered by this region
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of bytes a packed BGRA copy of this region occupies
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }
}

/// Owned packed-BGRA pixel data for one region.
///
/// The buffer length is always a multiple of [`BYTES_PER_PIXEL`]; pixels are
/// only ever walked through [`bgra_pixels`](Self::bgra_pixels), which yields
/// bounds-checked 4-byte chunks.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer sized for `region`
    pub fn for_region(region: &Region) -> Self {
        Self {
            data: vec![0; region.byte_len()],
        }
    }

    /// Wrap existing packed BGRA bytes.
    ///
    /// Panics if the length is not a whole number of pixels.
    pub fn from_bgra(data: Vec<u8>) -> Self {
        assert!(
            data.len() % BYTES_PER_PIXEL == 0,
            "pixel data length {} is not a multiple of {}",
            data.len(),
            BYTES_PER_PIXEL
        );
        Self { data }
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Iterate over pixels as `[b, g, r, a]` slices
    pub fn bgra_pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(BYTES_PER_PIXEL)
    }
}

/// A group of fixtures that mirrors one side of the screen
#[derive(Debug, Clone)]
pub struct FixtureTarget {
    /// Which screen edge this group mirrors
    pub side: Side,
    /// Bridge-assigned fixture identifiers
    pub fixture_ids: Vec<FixtureId>,
}

impl FixtureTarget {
    pub fn new(side: Side, fixture_ids: Vec<FixtureId>) -> Self {
        Self { side, fixture_ids }
    }
}

/// Errors that can occur while acquiring frames
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Monitor index {index} out of range ({available} available)")]
    MonitorOutOfRange { index: usize, available: usize },

    #[error("Capture backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Capture backend error: {0}")]
    Backend(String),
}

/// Errors that can occur while dispatching light commands
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to send light command: {0}")]
    Send(String),

    #[error("Bridge rejected command: {0}")]
    Rejected(String),
}
