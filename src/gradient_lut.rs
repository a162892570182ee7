//! Gradient colour lookup table.
//!
//! Builds a 256-entry premultiplied ramp from colour stops. Entry `i`
//! holds the colour at ratio `i / 255`, so both ends of the ramp land
//! exactly on the first and last stop. Interpolation happens in
//! premultiplied space, which keeps colour from bleeding out of
//! transparent stops.

use crate::color::{PremulRgba8, Rgba8};

/// Number of entries in the ramp.
pub const GRADIENT_LUT_SIZE: usize = 256;

/// Premultiplied colour ramp sampled by gradient fillers.
#[derive(Debug, Clone)]
pub struct GradientLut {
    lut: Vec<PremulRgba8>,
}

impl GradientLut {
    pub fn new() -> Self {
        Self {
            lut: vec![PremulRgba8::TRANSPARENT; GRADIENT_LUT_SIZE],
        }
    }

    /// Rebuild the ramp from `(ratio, colour)` stops. Stops may be in any
    /// order; ratios are clamped to `[0, 1]` and equal ratios produce a
    /// hard transition. No stops gives a transparent ramp, one stop a
    /// constant one.
    pub fn set(&mut self, stops: &[(f64, Rgba8)]) {
        let mut sorted: Vec<(f64, [f64; 4])> = stops
            .iter()
            .filter(|(r, _)| r.is_finite())
            .map(|(r, c)| (r.clamp(0.0, 1.0), c.premultiplied().to_f64()))
            .collect();
        // Stable, so equal ratios keep insertion order.
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (Some(first), Some(last)) = (sorted.first().copied(), sorted.last().copied()) else {
            self.lut.fill(PremulRgba8::TRANSPARENT);
            return;
        };

        let mut seg = 0;
        for (i, slot) in self.lut.iter_mut().enumerate() {
            let t = i as f64 / (GRADIENT_LUT_SIZE - 1) as f64;
            let c = if t <= first.0 {
                first.1
            } else if t >= last.0 {
                last.1
            } else {
                while seg + 1 < sorted.len() && sorted[seg + 1].0 < t {
                    seg += 1;
                }
                let (r0, c0) = sorted[seg];
                let (r1, c1) = sorted[(seg + 1).min(sorted.len() - 1)];
                let k = if r1 > r0 { (t - r0) / (r1 - r0) } else { 1.0 };
                [0, 1, 2, 3].map(|j| c0[j] + (c1[j] - c0[j]) * k)
            };
            *slot = PremulRgba8::from_f64(c[0], c[1], c[2], c[3]);
        }
    }

    /// Colour at ratio `t`, clamped to `[0, 1]`.
    #[inline]
    pub fn get(&self, t: f64) -> PremulRgba8 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.lut[(t * (GRADIENT_LUT_SIZE - 1) as f64 + 0.5) as usize]
    }

    /// Entry by index.
    pub fn at(&self, index: usize) -> PremulRgba8 {
        self.lut[index.min(GRADIENT_LUT_SIZE - 1)]
    }

    pub fn size(&self) -> usize {
        GRADIENT_LUT_SIZE
    }
}

impl Default for GradientLut {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_stops_hit_endpoints() {
        let mut lut = GradientLut::new();
        lut.set(&[(0.0, Rgba8::RED), (1.0, Rgba8::BLUE)]);
        assert_eq!(lut.at(0), PremulRgba8::new(255, 0, 0, 255));
        assert_eq!(lut.at(255), PremulRgba8::new(0, 0, 255, 255));
        let mid = lut.get(0.5);
        assert!((mid.r as i32 - 128).abs() <= 1, "{mid:?}");
        assert!((mid.b as i32 - 128).abs() <= 1, "{mid:?}");
    }

    #[test]
    fn test_unsorted_stops_and_padding() {
        let mut lut = GradientLut::new();
        lut.set(&[(0.75, Rgba8::BLUE), (0.25, Rgba8::RED)]);
        assert_eq!(lut.get(0.0), PremulRgba8::new(255, 0, 0, 255));
        assert_eq!(lut.get(0.2), PremulRgba8::new(255, 0, 0, 255));
        assert_eq!(lut.get(1.0), PremulRgba8::new(0, 0, 255, 255));
    }

    #[test]
    fn test_hard_stop() {
        let mut lut = GradientLut::new();
        lut.set(&[
            (0.0, Rgba8::RED),
            (0.5, Rgba8::RED),
            (0.5, Rgba8::GREEN),
            (1.0, Rgba8::GREEN),
        ]);
        assert_eq!(lut.get(0.45).r, 255);
        assert_eq!(lut.get(0.55).g, 255);
    }

    #[test]
    fn test_transparent_stop_stays_premultiplied() {
        let mut lut = GradientLut::new();
        lut.set(&[(0.0, Rgba8::new(255, 0, 0, 0)), (1.0, Rgba8::new(0, 0, 255, 255))]);
        let mid = lut.get(0.5);
        assert_eq!(mid.r, 0);
        assert!(mid.b <= mid.a);
    }

    #[test]
    fn test_empty_and_single() {
        let mut lut = GradientLut::new();
        lut.set(&[]);
        assert_eq!(lut.get(0.3), PremulRgba8::TRANSPARENT);
        lut.set(&[(0.4, Rgba8::WHITE)]);
        assert_eq!(lut.get(0.0), PremulRgba8::new(255, 255, 255, 255));
        assert_eq!(lut.get(f64::NAN), PremulRgba8::new(255, 255, 255, 255));
    }
}
