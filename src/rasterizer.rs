//! Span rasterizer with optional clip polygon and vertical super-sampling.
//!
//! Holds two polygon accumulators, the fill path and an optional clip, and
//! turns them into fixed-point spans `(x0, x1, y)`. Each integer pixel row
//! is sampled at `quality` evenly spaced sub-rows; the scanline writer
//! averages those sub-rows into vertical coverage while the fractional span
//! ends give horizontal coverage.
//!
//! Usage:
//! 1. `reset()`
//! 2. Feed points through `path_mut()` (and `clip_mut()` if clipping)
//! 3. `rasterize_fill(bounds, winding, |x0, x1, y| ..)`

use crate::basics::{ifloor, iceil, RectI, Winding, RAST_FIXED_SCALE};
use crate::polygon_scanline::PolygonScanline;
use crate::segment_set::IntSegmentSet;

/// Default sub-rows per pixel row with antialiasing on.
pub const DEFAULT_QUALITY: i32 = 4;

/// Polygon-to-span converter.
pub struct Rasterizer {
    path: PolygonScanline,
    clip: PolygonScanline,
    clip_enabled: bool,
    quality: i32,
    seg_path: IntSegmentSet,
    seg_clip: IntSegmentSet,
    seg_out: IntSegmentSet,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            path: PolygonScanline::new(),
            clip: PolygonScanline::new(),
            clip_enabled: false,
            quality: DEFAULT_QUALITY,
            seg_path: IntSegmentSet::new(),
            seg_clip: IntSegmentSet::new(),
            seg_out: IntSegmentSet::new(),
        }
    }

    /// Clear the path and drop the clip. Scratch storage is kept.
    pub fn reset(&mut self) {
        self.path.reset();
        self.clip.reset();
        self.clip_enabled = false;
    }

    pub fn path(&self) -> &PolygonScanline {
        &self.path
    }

    pub fn path_mut(&mut self) -> &mut PolygonScanline {
        &mut self.path
    }

    /// Access the clip accumulator. Touching it enables clipping, so an
    /// empty clip means nothing is drawn.
    pub fn clip_mut(&mut self) -> &mut PolygonScanline {
        self.clip_enabled = true;
        &mut self.clip
    }

    pub fn has_clip(&self) -> bool {
        self.clip_enabled
    }

    pub fn set_clip_winding(&mut self, winding: Winding) {
        self.clip.set_winding(winding);
    }

    /// Sub-rows per pixel row, clamped to `1..=RAST_FIXED_SCALE`.
    pub fn set_quality(&mut self, quality: i32) {
        self.quality = quality.clamp(1, RAST_FIXED_SCALE);
    }

    pub fn quality(&self) -> i32 {
        self.quality
    }

    /// Fixed-point y of sub-row `n` within pixel row `row`.
    #[inline]
    pub fn sub_row_y(&self, row: i32, n: i32) -> i32 {
        let step = RAST_FIXED_SCALE / self.quality;
        row * RAST_FIXED_SCALE + n * step + step / 2
    }

    /// Emit every span of the path (intersected with the clip, if any)
    /// inside the inclusive pixel rectangle `bounds`.
    ///
    /// Returns the number of spans emitted.
    pub fn rasterize_fill<F>(&mut self, bounds: RectI, winding: Winding, mut emit: F) -> usize
    where
        F: FnMut(i32, i32, i32),
    {
        let Some(pb) = self.path.bounds() else {
            return 0;
        };
        let mut area = RectI::new(ifloor(pb.x1), ifloor(pb.y1), iceil(pb.x2), iceil(pb.y2));
        if self.clip_enabled {
            let Some(cb) = self.clip.bounds() else {
                return 0;
            };
            let cb = RectI::new(ifloor(cb.x1), ifloor(cb.y1), iceil(cb.x2), iceil(cb.y2));
            if !area.clip(&cb) {
                return 0;
            }
        }
        if !area.clip(&bounds) {
            return 0;
        }

        let min_x = bounds.x1 * RAST_FIXED_SCALE;
        let max_x = (bounds.x2 + 1) * RAST_FIXED_SCALE;
        let clip_winding = self.clip.winding();
        let mut count = 0;

        for row in area.y1..=area.y2 {
            for n in 0..self.quality {
                let y = self.sub_row_y(row, n);
                self.path.scanline(y, winding, &mut self.seg_path);
                if self.seg_path.is_empty() {
                    continue;
                }
                let segs = if self.clip_enabled {
                    self.clip.scanline(y, clip_winding, &mut self.seg_clip);
                    self.seg_out.set_to_intersect(&self.seg_path, &self.seg_clip);
                    &self.seg_out
                } else {
                    &self.seg_path
                };
                for (a, b) in segs.iter() {
                    let x0 = a.max(min_x);
                    let x1 = b.min(max_x);
                    if x1 > x0 {
                        emit(x0, x1, y);
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Whether the device point is inside the path and the clip.
    pub fn hit_test(&mut self, x: f64, y: f64, winding: Winding) -> bool {
        if !self.path.contains_point(x, y, winding) {
            return false;
        }
        if self.clip_enabled {
            let w = self.clip.winding();
            return self.clip.contains_point(x, y, w);
        }
        true
    }
}

impl Default for Rasterizer {
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

    const S: i32 = RAST_FIXED_SCALE;

    fn rect(p: &mut PolygonScanline, x0: f64, y0: f64, x1: f64, y1: f64) {
        p.move_to(x0, y0);
        p.line_to(x1, y0);
        p.line_to(x1, y1);
        p.line_to(x0, y1);
        p.close();
    }

    fn spans(r: &mut Rasterizer, bounds: RectI) -> Vec<(i32, i32, i32)> {
        let mut out = Vec::new();
        r.rasterize_fill(bounds, Winding::NonZero, |a, b, y| out.push((a, b, y)));
        out
    }

    #[test]
    fn test_empty_path_emits_nothing() {
        let mut r = Rasterizer::new();
        assert!(spans(&mut r, RectI::new(0, 0, 9, 9)).is_empty());
    }

    #[test]
    fn test_quality_one_samples_row_centers() {
        let mut r = Rasterizer::new();
        r.set_quality(1);
        rect(r.path_mut(), 2.0, 2.0, 8.0, 8.0);
        let s = spans(&mut r, RectI::new(0, 0, 9, 9));
        assert_eq!(s.len(), 6);
        for (i, (a, b, y)) in s.iter().enumerate() {
            assert_eq!((*a, *b), (2 * S, 8 * S));
            assert_eq!(*y, (i as i32 + 2) * S + S / 2);
        }
    }

    #[test]
    fn test_sub_rows_and_order() {
        let mut r = Rasterizer::new();
        rect(r.path_mut(), 0.0, 0.0, 2.0, 2.0);
        let s = spans(&mut r, RectI::new(0, 0, 9, 9));
        assert_eq!(s.len(), 8);
        let ys: Vec<i32> = s.iter().map(|s| s.2).collect();
        assert_eq!(ys, vec![2, 7, 12, 17, 22, 27, 32, 37]);
    }

    #[test]
    fn test_spans_clamped_to_bounds() {
        let mut r = Rasterizer::new();
        r.set_quality(1);
        rect(r.path_mut(), -5.0, 0.0, 50.0, 1.0);
        let s = spans(&mut r, RectI::new(0, 0, 9, 9));
        assert_eq!(s, vec![(0, 10 * S, S / 2)]);
    }

    #[test]
    fn test_clip_intersection() {
        let mut r = Rasterizer::new();
        r.set_quality(1);
        rect(r.path_mut(), 0.0, 0.0, 10.0, 10.0);
        rect(r.clip_mut(), 4.0, 4.0, 20.0, 6.0);
        let s = spans(&mut r, RectI::new(0, 0, 19, 19));
        assert_eq!(s.len(), 2);
        assert!(s.iter().all(|&(a, b, _)| a == 4 * S && b == 10 * S));
        assert!(r.hit_test(5.0, 5.0, Winding::NonZero));
        assert!(!r.hit_test(2.0, 2.0, Winding::NonZero));
    }

    #[test]
    fn test_empty_clip_hides_everything() {
        let mut r = Rasterizer::new();
        rect(r.path_mut(), 0.0, 0.0, 10.0, 10.0);
        r.clip_mut();
        assert!(spans(&mut r, RectI::new(0, 0, 19, 19)).is_empty());
        r.reset();
        assert!(!r.has_clip());
    }

    #[test]
    fn test_quality_clamped() {
        let mut r = Rasterizer::new();
        r.set_quality(0);
        assert_eq!(r.quality(), 1);
        r.set_quality(100);
        assert_eq!(r.quality(), RAST_FIXED_SCALE);
    }
}
