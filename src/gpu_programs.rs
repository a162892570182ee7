//! Paint programs for the GPU path.
//!
//! The fragment stage of every GPU draw: sample the bound paint at the
//! pixel centre, then fade it by the distance-to-edge factor carried in the
//! interpolated `len` / `max_len` vertex attributes.

use crate::color::PremulRgba8;
use crate::filler::{Filler, SpanFiller};
use crate::gpu_commands::BIG_MAX_LEN;
use crate::paint::Paint;
use crate::trans_affine::TransAffine;

/// Hermite step between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Coverage of a fragment `max_dist - |dist|` shape units inside the edge,
/// with `scale` device pixels per unit.
#[inline]
pub fn aa_factor(dist: f32, max_dist: f32, scale: f32) -> f32 {
    if max_dist >= BIG_MAX_LEN {
        return 1.0;
    }
    smoothstep(-0.5, 0.5, (max_dist - dist.abs()) * scale)
}

/// A paint bound for per-fragment evaluation.
#[derive(Debug, Clone)]
pub struct PaintShader {
    filler: Filler,
    global_alpha: f32,
    aa_scale: f32,
    /// Stencil-only program; the colour output is discarded.
    pub solid: bool,
}

impl PaintShader {
    /// Program for stencil passes.
    pub fn stencil() -> Self {
        Self {
            filler: Filler::None,
            global_alpha: 1.0,
            aa_scale: 1.0,
            solid: true,
        }
    }

    /// Program drawing `paint` under `transform` (paint space is mapped
    /// through it to device space). `None` for `Paint::None`.
    pub fn for_paint(paint: &Paint, transform: &TransAffine, global_alpha: f64, aa_scale: f64) -> Option<Self> {
        if paint.is_none() {
            return None;
        }
        Some(Self {
            filler: Filler::for_paint(paint, transform),
            global_alpha: global_alpha.clamp(0.0, 1.0) as f32,
            aa_scale: aa_scale as f32,
            solid: false,
        })
    }

    pub fn aa_scale(&self) -> f32 {
        self.aa_scale
    }

    /// Premultiplied output for the device-space point `(px, py)`.
    pub fn fragment(&self, px: f64, py: f64, dist: f32, max_dist: f32) -> PremulRgba8 {
        if self.solid {
            return PremulRgba8::new(255, 255, 255, 255);
        }
        let alpha = self.global_alpha * aa_factor(dist, max_dist, self.aa_scale);
        if alpha <= 0.0 {
            return PremulRgba8::TRANSPARENT;
        }
        let c = self.filler.sample_at(px, py);
        if alpha >= 1.0 {
            c
        } else {
            c.scale_alpha(alpha as f64)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;

    #[test]
    fn test_smoothstep_ends_and_middle() {
        assert_eq!(smoothstep(-0.5, 0.5, -1.0), 0.0);
        assert_eq!(smoothstep(-0.5, 0.5, 1.0), 1.0);
        assert!((smoothstep(-0.5, 0.5, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_aa_factor() {
        assert_eq!(aa_factor(123.0, BIG_MAX_LEN, 1.0), 1.0);
        // On the edge: half coverage.
        assert!((aa_factor(2.0, 2.0, 1.0) - 0.5).abs() < 1e-6);
        // Two pixels inside: full.
        assert_eq!(aa_factor(0.0, 2.0, 1.0), 1.0);
        // Half a pixel outside: nothing.
        assert_eq!(aa_factor(0.5, 0.0, 1.0), 0.0);
        // Scale converts units to pixels.
        assert_eq!(aa_factor(0.0, 0.25, 4.0), 1.0);
        assert_eq!(aa_factor(-3.0, 2.0, 1.0), 0.0);
    }

    #[test]
    fn test_fragment_applies_alpha_and_aa() {
        let shader =
            PaintShader::for_paint(&Paint::Color(Rgba8::RED), &TransAffine::new(), 0.5, 1.0).unwrap();
        let c = shader.fragment(0.5, 0.5, 0.0, BIG_MAX_LEN);
        assert_eq!(c.a, 128);
        assert_eq!(c.r, 128);
        let edge = shader.fragment(0.5, 0.5, 1.0, 1.0);
        assert!((edge.a as i32 - 64).abs() <= 1, "{edge:?}");
        assert_eq!(shader.fragment(0.5, 0.5, 2.0, 0.0), PremulRgba8::TRANSPARENT);
    }

    #[test]
    fn test_none_paint_has_no_program() {
        assert!(PaintShader::for_paint(&Paint::None, &TransAffine::new(), 1.0, 1.0).is_none());
        assert!(PaintShader::stencil().solid);
    }
}
