//! RGB to HSL conversion, byte-quantized in both directions.
//!
//! All three HSL channels come back as bytes: the conversion works on
//! normalized 0.0-1.0 fractions internally and scales each one by 255 with
//! truncation on the way out. The quantization is lossy and deliberate; the
//! dispatch side only needs byte precision before rescaling hue onto the
//! bridge's 16-bit hue wheel.

use crate::types::{Hsl, Rgb};

/// Convert an RGB color to byte-quantized HSL.
///
/// Algorithm:
/// 1. Normalize channels to 0.0-1.0
/// 2. Lightness = midpoint of the max and min channel
/// 3. Achromatic (max == min): hue and saturation are 0
/// 4. Otherwise saturation from delta and lightness, hue from which
///    channel is the max, wrapped into 0.0-1.0
/// 5. Scale each fraction by 255 and truncate
pub fn rgb_to_hsl(color: Rgb) -> Hsl {
    let r = color.r as f64 / 255.0;
    let g = color.g as f64 / 255.0;
    let b = color.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let l = (max + min) / 2.0;
    let mut h = 0.0;
    let mut s = 0.0;

    if delta != 0.0 {
        s = if l < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        h = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        h /= 6.0;
    }

    Hsl::new((h * 255.0) as u8, (s * 255.0) as u8, (l * 255.0) as u8)
}

/// Convert a byte-quantized HSL color back to RGB.
///
/// Saturation 0 short-circuits to a pure gray built from lightness alone, so
/// grays survive the round trip exactly. Chromatic colors go through the
/// usual p/q helper evaluated at hue, hue + 1/3 and hue - 1/3.
pub fn hsl_to_rgb(color: Hsl) -> Rgb {
    let h = color.h as f64 / 255.0;
    let s = color.s as f64 / 255.0;
    let l = color.l as f64 / 255.0;

    let (r, g, b) = if color.s == 0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };

    Rgb::new((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Evaluate one RGB channel from the p/q intermediates at hue offset `t`
fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
