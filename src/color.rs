//! Color types and operations.
//!
//! Two 8-bit RGBA types share one memory layout:
//! - `Rgba8`: straight (non-premultiplied) alpha
//! - `PremulRgba8`: RGB already scaled by alpha
//!
//! Both are `#[repr(C)]` and `Pod`, so pixel rows can be reinterpreted with
//! `bytemuck` at the bitmap I/O boundary without copying. All blending in the
//! crate happens in premultiplied space; conversions only happen when pixels
//! enter or leave a bitmap.

use bytemuck::{Pod, Zeroable};

use crate::basics::uround;

const BASE_SHIFT: u32 = 8;
const BASE_MASK: u32 = (1 << BASE_SHIFT) - 1;
const BASE_MSB: u32 = 1 << (BASE_SHIFT - 1);

/// Fixed-point multiply, exact over u8: `a * b / 255` rounded.
#[inline]
pub fn mul_u8(a: u8, b: u8) -> u8 {
    let t: u32 = a as u32 * b as u32 + BASE_MSB;
    (((t >> BASE_SHIFT) + t) >> BASE_SHIFT) as u8
}

/// Fixed-point demultiply: `a * 255 / b` rounded and clamped.
#[inline]
pub fn div_u8(a: u8, b: u8) -> u8 {
    if b == 0 {
        0
    } else if a >= b {
        BASE_MASK as u8
    } else {
        ((a as u32 * BASE_MASK + (b as u32 >> 1)) / b as u32) as u8
    }
}

/// Interpolate p to q by a (0..=255).
#[inline]
pub fn lerp_u8(p: u8, q: u8, a: u8) -> u8 {
    let t = (q as i32 - p as i32) * a as i32 + BASE_MSB as i32 - (p > q) as i32;
    (p as i32 + (((t >> BASE_SHIFT) + t) >> BASE_SHIFT)) as u8
}

#[inline]
fn to_unit(v: u8) -> f64 {
    v as f64 / BASE_MASK as f64
}

#[inline]
fn from_unit(v: f64) -> u8 {
    uround(v.clamp(0.0, 1.0) * BASE_MASK as f64) as u8
}

// ============================================================================
// Rgba8 (straight alpha)
// ============================================================================

/// 8-bit RGBA color with straight alpha.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);
    pub const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
    pub const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    pub const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);
    pub const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn new_opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Build from `[0, 1]` float components, clamping out-of-range input.
    pub fn from_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self::new(from_unit(r), from_unit(g), from_unit(b), from_unit(a))
    }

    /// Components as `[r, g, b, a]` in `[0, 1]`.
    pub fn to_f64(&self) -> [f64; 4] {
        [to_unit(self.r), to_unit(self.g), to_unit(self.b), to_unit(self.a)]
    }

    /// Interpolate every channel (alpha included) from `self` to `other`.
    pub fn mix(&self, other: &Rgba8, t: f64) -> Rgba8 {
        let k = from_unit(t);
        Rgba8::new(
            lerp_u8(self.r, other.r, k),
            lerp_u8(self.g, other.g, k),
            lerp_u8(self.b, other.b, k),
            lerp_u8(self.a, other.a, k),
        )
    }

    /// Scale RGB by alpha.
    #[inline]
    pub fn premultiplied(&self) -> PremulRgba8 {
        match self.a {
            255 => PremulRgba8::new(self.r, self.g, self.b, 255),
            0 => PremulRgba8::TRANSPARENT,
            a => PremulRgba8::new(mul_u8(self.r, a), mul_u8(self.g, a), mul_u8(self.b, a), a),
        }
    }
}

// ============================================================================
// PremulRgba8 (premultiplied alpha)
// ============================================================================

/// 8-bit RGBA color whose RGB channels are premultiplied by alpha.
///
/// Invariant for well-formed values: `r, g, b <= a`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct PremulRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PremulRgba8 {
    pub const TRANSPARENT: PremulRgba8 = PremulRgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from premultiplied `[0, 1]` float components.
    pub fn from_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        let a8 = from_unit(a);
        Self::new(
            from_unit(r).min(a8),
            from_unit(g).min(a8),
            from_unit(b).min(a8),
            a8,
        )
    }

    pub fn to_f64(&self) -> [f64; 4] {
        [to_unit(self.r), to_unit(self.g), to_unit(self.b), to_unit(self.a)]
    }

    /// Undo the alpha scaling.
    #[inline]
    pub fn depremultiplied(&self) -> Rgba8 {
        match self.a {
            255 => Rgba8::new(self.r, self.g, self.b, 255),
            0 => Rgba8::TRANSPARENT,
            a => Rgba8::new(div_u8(self.r, a), div_u8(self.g, a), div_u8(self.b, a), a),
        }
    }

    /// Multiply every channel by an 8-bit coverage.
    #[inline]
    pub fn scale(&self, cover: u8) -> PremulRgba8 {
        match cover {
            255 => *self,
            0 => PremulRgba8::TRANSPARENT,
            c => PremulRgba8::new(
                mul_u8(self.r, c),
                mul_u8(self.g, c),
                mul_u8(self.b, c),
                mul_u8(self.a, c),
            ),
        }
    }

    /// Multiply every channel by a `[0, 1]` coverage.
    #[inline]
    pub fn scale_alpha(&self, coverage: f64) -> PremulRgba8 {
        self.scale(from_unit(coverage))
    }

    /// Interpolate every channel from `self` to `other`.
    pub fn mix(&self, other: &PremulRgba8, t: f64) -> PremulRgba8 {
        let k = from_unit(t);
        PremulRgba8::new(
            lerp_u8(self.r, other.r, k),
            lerp_u8(self.g, other.g, k),
            lerp_u8(self.b, other.b, k),
            lerp_u8(self.a, other.a, k),
        )
    }
}

// ============================================================================
// Bulk conversion
// ============================================================================

/// Premultiply `src` into `dst`. Both slices must have equal length.
pub fn premultiply_slice(src: &[Rgba8], dst: &mut [PremulRgba8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s.premultiplied();
    }
}

/// Depremultiply `src` into `dst`. Both slices must have equal length.
pub fn depremultiply_slice(src: &[PremulRgba8], dst: &mut [Rgba8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s.depremultiplied();
    }
}

/// Premultiply a row of stored pixels in place.
pub fn premultiply_in_place(row: &mut [Rgba8]) {
    for px in row.iter_mut() {
        *px = bytemuck::cast(px.premultiplied());
    }
}

/// Depremultiply a row of stored pixels in place.
pub fn depremultiply_in_place(row: &mut [PremulRgba8]) {
    for px in row.iter_mut() {
        *px = bytemuck::cast(px.depremultiplied());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_u8_exact_bounds() {
        assert_eq!(mul_u8(255, 255), 255);
        assert_eq!(mul_u8(0, 255), 0);
        assert_eq!(mul_u8(255, 128), 128);
        assert_eq!(mul_u8(128, 128), 64);
    }

    #[test]
    fn test_premultiply_opaque_is_identity() {
        let c = Rgba8::new(12, 200, 99, 255);
        let p = c.premultiplied();
        assert_eq!((p.r, p.g, p.b, p.a), (12, 200, 99, 255));
    }

    #[test]
    fn test_premultiply_half_alpha() {
        let p = Rgba8::new(255, 100, 0, 128).premultiplied();
        assert_eq!(p, PremulRgba8::new(128, 50, 0, 128));
    }

    #[test]
    fn test_premultiply_transparent_zeroes_rgb() {
        let p = Rgba8::new(255, 255, 255, 0).premultiplied();
        assert_eq!(p, PremulRgba8::TRANSPARENT);
        assert_eq!(p.depremultiplied(), Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_round_trip_within_one_for_high_alpha() {
        for a in 128..=255u8 {
            for c in 0..=255u8 {
                let orig = Rgba8::new(c, 255 - c, c / 2, a);
                let back = orig.premultiplied().depremultiplied();
                assert!((back.r as i32 - orig.r as i32).abs() <= 1, "a={a} c={c}");
                assert!((back.g as i32 - orig.g as i32).abs() <= 1, "a={a} c={c}");
                assert!((back.b as i32 - orig.b as i32).abs() <= 1, "a={a} c={c}");
                assert_eq!(back.a, orig.a);
            }
        }
    }

    #[test]
    fn test_round_trip_error_bounded_by_quantization() {
        // Premultiplied storage keeps a channels-worth of levels; the loss is
        // at most half a level scaled back up.
        for a in 1..=255u8 {
            let bound = (255.0 / (2.0 * a as f64)).ceil() as i32 + 1;
            for c in (0..=255u8).step_by(5) {
                let back = Rgba8::new(c, c, c, a).premultiplied().depremultiplied();
                assert!((back.r as i32 - c as i32).abs() <= bound, "a={a} c={c}");
            }
        }
    }

    #[test]
    fn test_premul_invariant_holds() {
        for a in 0..=255u8 {
            let p = Rgba8::new(255, 17, 200, a).premultiplied();
            assert!(p.r <= p.a && p.g <= p.a && p.b <= p.a);
        }
    }

    #[test]
    fn test_scale_alpha() {
        let p = PremulRgba8::new(200, 100, 50, 200);
        assert_eq!(p.scale_alpha(1.0), p);
        assert_eq!(p.scale_alpha(0.0), PremulRgba8::TRANSPARENT);
        let half = p.scale_alpha(0.5);
        assert_eq!(half, PremulRgba8::new(100, 50, 25, 100));
    }

    #[test]
    fn test_mix_endpoints() {
        let a = Rgba8::RED;
        let b = Rgba8::BLUE;
        assert_eq!(a.mix(&b, 0.0), a);
        assert_eq!(a.mix(&b, 1.0), b);
        let m = a.mix(&b, 0.5);
        assert!((m.r as i32 - 128).abs() <= 1);
        assert!((m.b as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_f64_conversion_clamps() {
        let c = Rgba8::from_f64(1.5, -0.2, 0.5, 1.0);
        assert_eq!(c, Rgba8::new(255, 0, 128, 255));
        let p = PremulRgba8::from_f64(1.0, 1.0, 1.0, 0.5);
        assert_eq!(p, PremulRgba8::new(128, 128, 128, 128));
    }

    #[test]
    fn test_slice_conversion() {
        let src = [Rgba8::new(255, 0, 0, 128), Rgba8::WHITE];
        let mut dst = [PremulRgba8::TRANSPARENT; 2];
        premultiply_slice(&src, &mut dst);
        assert_eq!(dst[0], PremulRgba8::new(128, 0, 0, 128));
        assert_eq!(dst[1], PremulRgba8::new(255, 255, 255, 255));

        let mut back = [Rgba8::TRANSPARENT; 2];
        depremultiply_slice(&dst, &mut back);
        assert_eq!(back[1], Rgba8::WHITE);
        assert_eq!(back[0].a, 128);
    }

    #[test]
    fn test_in_place_conversion_shares_layout() {
        let mut row = [Rgba8::new(255, 255, 255, 128)];
        premultiply_in_place(&mut row);
        assert_eq!(row[0], Rgba8::new(128, 128, 128, 128));
    }
}
