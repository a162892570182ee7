//! Span fillers: produce premultiplied source colours for a run of pixels.
//!
//! A filler is bound to one paint and the canvas transform with `set`, then
//! asked for horizontal runs by the scanline writer. Pixel centres are
//! sampled: device pixel `(x, y)` evaluates the paint at `(x + 0.5, y + 0.5)`
//! mapped back through `paint.transform * state.transform`.

use std::sync::Arc;

use crate::bitmap32::Bitmap32;
use crate::color::PremulRgba8;
use crate::context2d::State;
use crate::gradient_lut::GradientLut;
use crate::paint::{BitmapPaint, GradientPaint, ImageWrap, Paint};
use crate::trans_affine::TransAffine;

// ============================================================================
// SpanFiller trait
// ============================================================================

/// Source colour generator for horizontal runs.
pub trait SpanFiller {
    /// Write `x1 - x0 + 1` colours for pixels `x0..=x1` of row `y` into
    /// `out[offset..]`.
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, y: i32);

    /// Colour at a continuous device-space point.
    fn sample_at(&self, x: f64, y: f64) -> PremulRgba8;
}

/// Device-to-paint mapping for a paint drawn under `state_transform`.
/// `None` when the combined matrix is singular.
fn device_to_paint(paint_transform: &TransAffine, state_transform: &TransAffine) -> Option<TransAffine> {
    (*paint_transform * *state_transform).inverted()
}

// ============================================================================
// NoneFiller
// ============================================================================

/// Writes transparent pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneFiller;

impl SpanFiller for NoneFiller {
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, _y: i32) {
        let n = (x1 - x0 + 1).max(0) as usize;
        out[offset..offset + n].fill(PremulRgba8::TRANSPARENT);
    }

    fn sample_at(&self, _x: f64, _y: f64) -> PremulRgba8 {
        PremulRgba8::TRANSPARENT
    }
}

// ============================================================================
// ColorFiller
// ============================================================================

/// Broadcasts a single premultiplied colour.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorFiller {
    color: PremulRgba8,
}

impl ColorFiller {
    pub fn new(color: PremulRgba8) -> Self {
        Self { color }
    }

    pub fn color(&self) -> PremulRgba8 {
        self.color
    }
}

impl SpanFiller for ColorFiller {
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, _y: i32) {
        let n = (x1 - x0 + 1).max(0) as usize;
        out[offset..offset + n].fill(self.color);
    }

    fn sample_at(&self, _x: f64, _y: f64) -> PremulRgba8 {
        self.color
    }
}

// ============================================================================
// GradientFiller
// ============================================================================

/// Evaluates a gradient per pixel through a 256-entry ramp.
#[derive(Debug, Clone)]
pub struct GradientFiller {
    paint: GradientPaint,
    lut: GradientLut,
    inverse: Option<TransAffine>,
}

impl GradientFiller {
    pub fn new(paint: &GradientPaint, state_transform: &TransAffine) -> Self {
        let mut lut = GradientLut::new();
        lut.set(&paint.stops);
        Self {
            paint: paint.clone(),
            lut,
            inverse: device_to_paint(&paint.transform, state_transform),
        }
    }

    #[inline]
    fn color_at_paint(&self, x: f64, y: f64) -> PremulRgba8 {
        match self.paint.ratio_in_paint_space(x, y) {
            Some(t) => self.lut.get(t),
            None => PremulRgba8::TRANSPARENT,
        }
    }
}

impl SpanFiller for GradientFiller {
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, y: i32) {
        let n = (x1 - x0 + 1).max(0) as usize;
        let out = &mut out[offset..offset + n];
        let Some(inv) = self.inverse else {
            out.fill(PremulRgba8::TRANSPARENT);
            return;
        };
        // Walk paint space linearly along the row.
        let (mut px, mut py) = (x0 as f64 + 0.5, y as f64 + 0.5);
        inv.transform(&mut px, &mut py);
        for (i, o) in out.iter_mut().enumerate() {
            let k = i as f64;
            *o = self.color_at_paint(px + inv.sx * k, py + inv.shy * k);
        }
    }

    fn sample_at(&self, x: f64, y: f64) -> PremulRgba8 {
        let Some(inv) = self.inverse else {
            return PremulRgba8::TRANSPARENT;
        };
        let (mut px, mut py) = (x, y);
        inv.transform(&mut px, &mut py);
        self.color_at_paint(px, py)
    }
}

// ============================================================================
// BitmapFiller
// ============================================================================

/// Resamples a bitmap pattern, nearest or bilinear.
#[derive(Debug, Clone)]
pub struct BitmapFiller {
    bitmap: Arc<Bitmap32>,
    inverse: Option<TransAffine>,
    repeat_x: ImageWrap,
    repeat_y: ImageWrap,
    smooth: bool,
}

impl BitmapFiller {
    pub fn new(paint: &BitmapPaint, state_transform: &TransAffine) -> Self {
        Self {
            bitmap: Arc::clone(&paint.bitmap),
            inverse: device_to_paint(&paint.transform, state_transform),
            repeat_x: paint.repeat_x,
            repeat_y: paint.repeat_y,
            smooth: paint.smooth,
        }
    }

    #[inline]
    fn color_at_paint(&self, x: f64, y: f64) -> PremulRgba8 {
        let x = self.repeat_x.apply(x, self.bitmap.width());
        let y = self.repeat_y.apply(y, self.bitmap.height());
        if self.smooth {
            self.bitmap.sample_bilinear(x, y)
        } else {
            self.bitmap.sample_nearest(x, y)
        }
    }
}

impl SpanFiller for BitmapFiller {
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, y: i32) {
        let n = (x1 - x0 + 1).max(0) as usize;
        let out = &mut out[offset..offset + n];
        let Some(inv) = self.inverse else {
            out.fill(PremulRgba8::TRANSPARENT);
            return;
        };
        let (mut px, mut py) = (x0 as f64 + 0.5, y as f64 + 0.5);
        inv.transform(&mut px, &mut py);
        for (i, o) in out.iter_mut().enumerate() {
            let k = i as f64;
            *o = self.color_at_paint(px + inv.sx * k, py + inv.shy * k);
        }
    }

    fn sample_at(&self, x: f64, y: f64) -> PremulRgba8 {
        let Some(inv) = self.inverse else {
            return PremulRgba8::TRANSPARENT;
        };
        let (mut px, mut py) = (x, y);
        inv.transform(&mut px, &mut py);
        self.color_at_paint(px, py)
    }
}

// ============================================================================
// Filler
// ============================================================================

/// A filler for any paint kind.
#[derive(Debug, Clone, Default)]
pub enum Filler {
    #[default]
    None,
    Color(ColorFiller),
    Gradient(GradientFiller),
    Bitmap(BitmapFiller),
}

impl Filler {
    /// Filler for `paint` drawn under `transform`.
    pub fn for_paint(paint: &Paint, transform: &TransAffine) -> Self {
        match paint {
            Paint::None => Filler::None,
            Paint::Color(c) => Filler::Color(ColorFiller::new(c.premultiplied())),
            Paint::Gradient(g) => Filler::Gradient(GradientFiller::new(g, transform)),
            Paint::Bitmap(b) => Filler::Bitmap(BitmapFiller::new(b, transform)),
        }
    }

    /// Bind to a paint under the canvas state's transform, rebuilding any
    /// lookup tables.
    pub fn set(&mut self, paint: &Paint, state: &State) {
        *self = Self::for_paint(paint, &state.transform);
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Filler::None)
    }
}

impl SpanFiller for Filler {
    #[inline]
    fn fill(&self, out: &mut [PremulRgba8], offset: usize, x0: i32, x1: i32, y: i32) {
        match self {
            Filler::None => NoneFiller.fill(out, offset, x0, x1, y),
            Filler::Color(f) => f.fill(out, offset, x0, x1, y),
            Filler::Gradient(f) => f.fill(out, offset, x0, x1, y),
            Filler::Bitmap(f) => f.fill(out, offset, x0, x1, y),
        }
    }

    #[inline]
    fn sample_at(&self, x: f64, y: f64) -> PremulRgba8 {
        match self {
            Filler::None => PremulRgba8::TRANSPARENT,
            Filler::Color(f) => f.sample_at(x, y),
            Filler::Gradient(f) => f.sample_at(x, y),
            Filler::Bitmap(f) => f.sample_at(x, y),
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
    fn test_color_filler_with_offset() {
        let f = Filler::for_paint(&Paint::Color(Rgba8::new(255, 0, 0, 128)), &TransAffine::new());
        let mut out = vec![PremulRgba8::TRANSPARENT; 6];
        f.fill(&mut out, 2, 10, 12, 0);
        assert_eq!(out[1], PremulRgba8::TRANSPARENT);
        assert_eq!(out[2], PremulRgba8::new(128, 0, 0, 128));
        assert_eq!(out[4], PremulRgba8::new(128, 0, 0, 128));
        assert_eq!(out[5], PremulRgba8::TRANSPARENT);
    }

    #[test]
    fn test_none_filler() {
        let f = Filler::for_paint(&Paint::None, &TransAffine::new());
        assert!(f.is_none());
        let mut out = vec![PremulRgba8::new(1, 1, 1, 1); 3];
        f.fill(&mut out, 0, 0, 2, 0);
        assert!(out.iter().all(|c| *c == PremulRgba8::TRANSPARENT));
    }

    #[test]
    fn test_linear_gradient_samples_pixel_centres() {
        let g = GradientPaint::linear(0.0, 0.0, 255.0, 0.0)
            .with_stop(0.0, Rgba8::BLACK)
            .with_stop(1.0, Rgba8::WHITE);
        let f = Filler::for_paint(&Paint::Gradient(g), &TransAffine::new());
        let mut out = vec![PremulRgba8::TRANSPARENT; 256];
        f.fill(&mut out, 0, 0, 255, 7);
        assert!(out[0].r <= 1);
        assert!(out[255].r >= 254);
        assert!(out.windows(2).all(|w| w[0].r <= w[1].r));
        assert_eq!(f.sample_at(100.5, 3.0), out[100]);
    }

    #[test]
    fn test_gradient_follows_state_transform() {
        let g = GradientPaint::linear(0.0, 0.0, 10.0, 0.0)
            .with_stop(0.0, Rgba8::BLACK)
            .with_stop(1.0, Rgba8::WHITE);
        let f = Filler::for_paint(&Paint::Gradient(g), &TransAffine::new_scaling(10.0, 10.0));
        // User x = 5 lands at device x = 50: half way.
        let c = f.sample_at(50.0, 0.0);
        assert!((c.r as i32 - 128).abs() <= 2, "{c:?}");
    }

    #[test]
    fn test_bitmap_filler_nearest_and_repeat() {
        let mut bmp = Bitmap32::new(2, 1, true);
        bmp.set_rgba(0, 0, Rgba8::RED);
        bmp.set_rgba(1, 0, Rgba8::BLUE);
        let paint = BitmapPaint::new(Arc::new(bmp))
            .with_smooth(false)
            .with_repeat(ImageWrap::Repeat, ImageWrap::Repeat);
        let f = Filler::for_paint(&Paint::Bitmap(paint), &TransAffine::new());
        let mut out = vec![PremulRgba8::TRANSPARENT; 4];
        f.fill(&mut out, 0, 0, 3, 0);
        assert_eq!(out[0], PremulRgba8::new(255, 0, 0, 255));
        assert_eq!(out[1], PremulRgba8::new(0, 0, 255, 255));
        assert_eq!(out[2], PremulRgba8::new(255, 0, 0, 255));
        assert_eq!(out[3], PremulRgba8::new(0, 0, 255, 255));
    }

    #[test]
    fn test_singular_transform_is_transparent() {
        let g = GradientPaint::linear(0.0, 0.0, 1.0, 0.0).with_stop(0.0, Rgba8::RED);
        let f = Filler::for_paint(&Paint::Gradient(g), &TransAffine::new_scaling(0.0, 1.0));
        assert_eq!(f.sample_at(1.0, 1.0), PremulRgba8::TRANSPARENT);
    }
}
