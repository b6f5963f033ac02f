//! Region color reduction strategies.
//!
//! A reducer collapses one region's pixel buffer into a single representative
//! color. Two interchangeable strategies are provided: a channel-wise average
//! and a dominant histogram bin. Which one runs is a configuration choice;
//! both decode the same packed BGRA layout.

use crate::types::{PixelBuffer, Rgb};
use serde::{Deserialize, Serialize};

/// Quantization width per channel for the dominant-bin strategy
const BIN_WIDTH: usize = 4;

/// Bins per channel (256 / BIN_WIDTH)
const BINS_PER_CHANNEL: usize = 256 / BIN_WIDTH;

/// Reduction strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReducerKind {
    /// Channel-wise arithmetic mean
    Average,
    /// Most common quantized color
    Dominant,
}

impl ReducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReducerKind::Average => "average",
            ReducerKind::Dominant => "dominant",
        }
    }
}

/// Maps a region's pixels to one representative color.
///
/// Takes `&mut self` so implementations can reuse scratch state between
/// ticks; `reduce` itself must not carry results over from one call to the
/// next.
pub trait RegionReducer: Send {
    fn reduce(&mut self, pixels: &PixelBuffer) -> Rgb;
}

/// Build the configured reduction strategy
pub fn make_reducer(kind: ReducerKind) -> Box<dyn RegionReducer> {
    match kind {
        ReducerKind::Average => Box::new(AverageReducer),
        ReducerKind::Dominant => Box::new(DominantBinReducer::new()),
    }
}

/// Channel-wise arithmetic mean of every pixel in the region.
///
/// Sums run in u64 so large regions cannot overflow; the division is a
/// reciprocal multiply with the result truncated to a byte.
pub struct AverageReducer;

impl RegionReducer for AverageReducer {
    fn reduce(&mut self, pixels: &PixelBuffer) -> Rgb {
        let count = pixels.pixel_count();
        if count == 0 {
            return Rgb::BLACK;
        }

        let mut sum_b: u64 = 0;
        let mut sum_g: u64 = 0;
        let mut sum_r: u64 = 0;
        for px in pixels.bgra_pixels() {
            sum_b += px[0] as u64;
            sum_g += px[1] as u64;
            sum_r += px[2] as u64;
        }

        let reciprocal = 1.0 / count as f64;
        Rgb::new(
            (sum_r as f64 * reciprocal) as u8,
            (sum_g as f64 * reciprocal) as u8,
            (sum_b as f64 * reciprocal) as u8,
        )
    }
}

/// Most-populated bin of a 64x64x64 color histogram.
///
/// Each channel is quantized to 4-count-wide bins. The winning bin is
/// reconstructed from its lower edge, biasing the output up to 3 counts
/// darker per channel. Ties keep the lowest flat index, which means darker
/// reds beat brighter blues at equal population.
pub struct DominantBinReducer {
    /// Flat r-major histogram, reused across ticks
    bins: Vec<u32>,
}

impl DominantBinReducer {
    pub fn new() -> Self {
        Self {
            bins: vec![0; BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL],
        }
    }
}

impl Default for DominantBinReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionReducer for DominantBinReducer {
    fn reduce(&mut self, pixels: &PixelBuffer) -> Rgb {
        self.bins.fill(0);

        for px in pixels.bgra_pixels() {
            let b = px[0] as usize / BIN_WIDTH;
            let g = px[1] as usize / BIN_WIDTH;
            let r = px[2] as usize / BIN_WIDTH;
            self.bins[(r * BINS_PER_CHANNEL + g) * BINS_PER_CHANNEL + b] += 1;
        }

        // Strict > keeps the first max, so ties resolve to the lowest index
        let mut max_count = 0u32;
        let mut dominant = 0usize;
        for (index, &count) in self.bins.iter().enumerate() {
            if count > max_count {
                max_count = count;
                dominant = index;
            }
        }

        let r = dominant / (BINS_PER_CHANNEL * BINS_PER_CHANNEL);
        let g = (dominant / BINS_PER_CHANNEL) % BINS_PER_CHANNEL;
        let b = dominant % BINS_PER_CHANNEL;
        Rgb::new(
            (r * BIN_WIDTH) as u8,
            (g * BIN_WIDTH) as u8,
            (b * BIN_WIDTH) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a buffer of `count` identical pixels from an RGB triple
    fn solid_buffer(r: u8, g: u8, b: u8, count: usize) -> PixelBuffer {
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&[b, g, r, 255]);
        }
        PixelBuffer::from_bgra(data)
    }

    /// Concatenate buffers into one region's worth of pixels
    fn concat(buffers: &[PixelBuffer]) -> PixelBuffer {
        let mut data = Vec::new();
        for buffer in buffers {
            data.extend_from_slice(buffer.as_bytes());
        }
        PixelBuffer::from_bgra(data)
    }

    #[test]
    fn test_average_uniform_region_is_exact() {
        let buffer = solid_buffer(10, 20, 30, 500);
        let mut reducer = AverageReducer;
        assert_eq!(reducer.reduce(&buffer), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_average_truncates_fractions() {
        // Half black, half white: mean 127.5 truncates to 127
        let buffer = concat(&[solid_buffer(0, 0, 0, 8), solid_buffer(255, 255, 255, 8)]);
        let mut reducer = AverageReducer;
        assert_eq!(reducer.reduce(&buffer), Rgb::new(127, 127, 127));
    }

    #[test]
    fn test_average_large_region_stays_exact() {
        // Well past u32-accumulator territory for a single channel
        let buffer = solid_buffer(255, 128, 1, 200_000);
        let mut reducer = AverageReducer;
        assert_eq!(reducer.reduce(&buffer), Rgb::new(255, 128, 1));
    }

    #[test]
    fn test_average_empty_region_is_black() {
        let buffer = PixelBuffer::from_bgra(Vec::new());
        let mut reducer = AverageReducer;
        assert_eq!(reducer.reduce(&buffer), Rgb::BLACK);
    }

    #[test]
    fn test_dominant_majority_wins() {
        // 60% one color, 40% another: majority bin wins even though the
        // average would land in between.
        let buffer = concat(&[
            solid_buffer(200, 100, 50, 60),
            solid_buffer(10, 20, 30, 40),
        ]);
        let mut reducer = DominantBinReducer::new();
        // (200, 100, 50) quantizes to bin lower edge (200, 100, 48)
        assert_eq!(reducer.reduce(&buffer), Rgb::new(200, 100, 48));
    }

    #[test]
    fn test_dominant_reconstructs_lower_edge() {
        let buffer = solid_buffer(7, 7, 7, 16);
        let mut reducer = DominantBinReducer::new();
        assert_eq!(reducer.reduce(&buffer), Rgb::new(4, 4, 4));
    }

    #[test]
    fn test_dominant_tie_keeps_lowest_index() {
        // (0, 0, 4) sits at flat index 1, (4, 0, 0) at 4096; equal counts
        // must resolve to the blue bin.
        let buffer = concat(&[solid_buffer(4, 0, 0, 10), solid_buffer(0, 0, 4, 10)]);
        let mut reducer = DominantBinReducer::new();
        assert_eq!(reducer.reduce(&buffer), Rgb::new(0, 0, 4));
    }

    #[test]
    fn test_dominant_empty_region_is_black() {
        let buffer = PixelBuffer::from_bgra(Vec::new());
        let mut reducer = DominantBinReducer::new();
        assert_eq!(reducer.reduce(&buffer), Rgb::BLACK);
    }

    #[test]
    fn test_dominant_scratch_state_resets_between_calls() {
        let mut reducer = DominantBinReducer::new();
        let red = solid_buffer(252, 0, 0, 100);
        let blue = solid_buffer(0, 0, 252, 4);

        assert_eq!(reducer.reduce(&red), Rgb::new(252, 0, 0));
        // A much smaller buffer must not lose to the previous call's counts
        assert_eq!(reducer.reduce(&blue), Rgb::new(0, 0, 252));
    }

    #[test]
    fn test_both_strategies_agree_on_channel_order() {
        // A channel-asymmetric color comes back with red and blue in the
        // right places from both strategies.
        let buffer = solid_buffer(10, 20, 30, 64);

        let mut average = make_reducer(ReducerKind::Average);
        assert_eq!(average.reduce(&buffer), Rgb::new(10, 20, 30));

        let mut dominant = make_reducer(ReducerKind::Dominant);
        assert_eq!(dominant.reduce(&buffer), Rgb::new(8, 20, 28));
    }
}
