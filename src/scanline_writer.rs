//! Coverage accumulation and row compositing.
//!
//! The rasterizer emits fixed-point spans one sub-row at a time. The writer
//! turns each span into per-pixel horizontal coverage (fractional at both
//! ends, full in between), sums the sub-rows of one pixel row, and when the
//! row changes composites the accumulated row onto the bitmap in a single
//! pass: fill source colours, scale by coverage, blend, write back.
//!
//! Buffers are sized to the bitmap width once and reset only over the
//! pixel ranges a row actually touched.

use crate::basics::RAST_FIXED_SCALE;
use crate::bitmap32::Bitmap32;
use crate::color::PremulRgba8;
use crate::comp_op::CompositeOperation;
use crate::filler::{Filler, SpanFiller};

// ============================================================================
// SegmentHandler
// ============================================================================

/// Union of inclusive pixel ranges touched during the current row.
#[derive(Debug, Clone, Default)]
pub struct SegmentHandler {
    segs: Vec<(i32, i32)>,
}

impl SegmentHandler {
    pub fn new() -> Self {
        Self { segs: Vec::new() }
    }

    /// Add `[min, max]`, merging with every range it overlaps or touches.
    pub fn add(&mut self, min: i32, max: i32) {
        let (mut lo, mut hi) = (min, max);
        // Greedy: absorb any range that meets the growing one.
        let mut i = 0;
        while i < self.segs.len() {
            let (a, b) = self.segs[i];
            if a <= hi + 1 && lo <= b + 1 {
                lo = lo.min(a);
                hi = hi.max(b);
                self.segs.swap_remove(i);
                i = 0;
            } else {
                i += 1;
            }
        }
        self.segs.push((lo, hi));
    }

    pub fn reset(&mut self) {
        self.segs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.segs.iter().copied()
    }
}

// ============================================================================
// ScanlineTarget
// ============================================================================

/// Everything a flush needs besides the writer's own buffers.
pub struct ScanlineTarget<'a> {
    pub bitmap: &'a mut Bitmap32,
    pub filler: &'a Filler,
    pub composite: CompositeOperation,
    pub global_alpha: f64,
}

// ============================================================================
// ScanlineWriter
// ============================================================================

/// Per-row coverage accumulator.
#[derive(Debug, Clone)]
pub struct ScanlineWriter {
    width: i32,
    sub_rows_per_pixel: i32,
    alpha: Vec<f32>,
    hitbits: Vec<u32>,
    origin: Vec<PremulRgba8>,
    color: Vec<PremulRgba8>,
    mixed: Vec<PremulRgba8>,
    segments: SegmentHandler,
    ny: i32,
    last_y0: i32,
    sub_row_count: u32,
}

impl ScanlineWriter {
    pub fn new(width: u32) -> Self {
        let w = width as usize;
        Self {
            width: width as i32,
            sub_rows_per_pixel: 1,
            alpha: vec![0.0; w],
            hitbits: vec![0; w],
            origin: vec![PremulRgba8::TRANSPARENT; w],
            color: vec![PremulRgba8::TRANSPARENT; w],
            mixed: vec![PremulRgba8::TRANSPARENT; w],
            segments: SegmentHandler::new(),
            ny: -1,
            last_y0: i32::MIN,
            sub_row_count: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    /// Number of sub-rows the rasterizer samples per pixel row; coverage
    /// is averaged over this many samples.
    pub fn set_sub_rows_per_pixel(&mut self, n: i32) {
        self.sub_rows_per_pixel = n.clamp(1, 32);
    }

    pub fn sub_rows_per_pixel(&self) -> i32 {
        self.sub_rows_per_pixel
    }

    /// Pixel row currently accumulating, or -1.
    pub fn current_row(&self) -> i32 {
        self.ny
    }

    /// Distinct sub-rows seen for the current row.
    pub fn sub_row_count(&self) -> u32 {
        self.sub_row_count
    }

    /// Accumulated (unnormalized) coverage of pixel `x` in the current row.
    pub fn coverage(&self, x: usize) -> f32 {
        self.alpha.get(x).copied().unwrap_or(0.0)
    }

    /// Accumulate one fixed-point span `[x0, x1)` at fixed-point row `y0`.
    /// A span on a new pixel row flushes the previous one into `target`.
    pub fn select(&mut self, x0: i32, x1: i32, y0: i32, target: &mut ScanlineTarget<'_>) {
        if self.width <= 0 {
            return;
        }
        let y = y0.div_euclid(RAST_FIXED_SCALE);
        if y != self.ny {
            self.flush(target);
            self.ny = y;
        }
        if y0 != self.last_y0 {
            self.last_y0 = y0;
            self.sub_row_count += 1;
        }

        let x0 = x0.clamp(0, self.width * RAST_FIXED_SCALE);
        let x1 = x1.clamp(0, self.width * RAST_FIXED_SCALE);
        if x1 <= x0 {
            return;
        }
        let i0 = x0 / RAST_FIXED_SCALE;
        let i1 = (x1 - 1) / RAST_FIXED_SCALE;
        let bit = 1u32 << ((self.sub_row_count - 1) & 31);
        let s = RAST_FIXED_SCALE as f32;

        if i0 == i1 {
            self.put(i0 as usize, (x1 - x0) as f32 / s, bit);
        } else {
            self.put(i0 as usize, ((i0 + 1) * RAST_FIXED_SCALE - x0) as f32 / s, bit);
            for i in i0 + 1..i1 {
                self.put(i as usize, 1.0, bit);
            }
            self.put(i1 as usize, (x1 - i1 * RAST_FIXED_SCALE) as f32 / s, bit);
        }
        self.segments.add(i0, i1);
    }

    #[inline]
    fn put(&mut self, i: usize, cov: f32, bit: u32) {
        let hits = &mut self.hitbits[i];
        if *hits & bit == 0 {
            *hits |= bit;
            self.alpha[i] += cov;
        } else {
            // Same sub-row again: a pixel cannot gain more than one sub-row
            // of coverage per sub-row.
            self.alpha[i] = (self.alpha[i] + cov).min(hits.count_ones() as f32);
        }
    }

    /// Composite the accumulated row into the target and reset.
    pub fn flush(&mut self, target: &mut ScanlineTarget<'_>) {
        let y = self.ny;
        if self.segments.is_empty() || y < 0 || y >= target.bitmap.height() as i32 {
            self.reset();
            return;
        }
        let norm = target.global_alpha.clamp(0.0, 1.0) as f32 / self.sub_rows_per_pixel as f32;
        let source_over = target.composite.is_source_over();

        for (xmin, xmax) in self.segments.iter() {
            let (a, b) = (xmin as usize, xmax as usize + 1);
            target.filler.fill(&mut self.color, a, xmin, xmax, y);
            target.bitmap.read_row_premul(y, xmin, &mut self.origin[a..b]);

            if source_over {
                for i in a..b {
                    let cov = (self.alpha[i] * norm).clamp(0.0, 1.0);
                    self.color[i] = self.color[i].scale_alpha(cov as f64);
                }
                target.composite.blend(&mut self.origin[a..b], &self.color[a..b]);
            } else {
                // Blend at full strength, then lerp towards it by coverage so
                // uncovered pixels are left alone by destructive modes.
                self.mixed[a..b].copy_from_slice(&self.origin[a..b]);
                target.composite.blend(&mut self.mixed[a..b], &self.color[a..b]);
                for i in a..b {
                    let cov = (self.alpha[i] * norm).clamp(0.0, 1.0);
                    self.origin[i] = self.origin[i].mix(&self.mixed[i], cov as f64);
                }
            }
            target.bitmap.write_row_premul(y, xmin, &self.origin[a..b]);
        }
        self.reset();
    }

    /// Clear coverage over the touched ranges only.
    pub fn reset(&mut self) {
        for (xmin, xmax) in self.segments.iter() {
            let (a, b) = (xmin as usize, xmax as usize + 1);
            self.alpha[a..b].fill(0.0);
            self.hitbits[a..b].fill(0);
        }
        self.segments.reset();
        self.sub_row_count = 0;
        self.last_y0 = i32::MIN;
    }

    /// Flush and forget the current row, ready for a new render call.
    pub fn finish(&mut self, target: &mut ScanlineTarget<'_>) {
        self.flush(target);
        self.ny = -1;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;
    use crate::comp_op::CompositeMode;

    const S: i32 = RAST_FIXED_SCALE;

    fn red() -> Filler {
        Filler::Color(crate::filler::ColorFiller::new(PremulRgba8::new(255, 0, 0, 255)))
    }

    #[test]
    fn test_segment_handler_merges() {
        let mut h = SegmentHandler::new();
        h.add(0, 2);
        h.add(6, 8);
        h.add(3, 5);
        let v: Vec<_> = h.iter().collect();
        assert_eq!(v, vec![(0, 8)]);
        h.add(20, 21);
        assert_eq!(h.iter().count(), 2);
        h.reset();
        assert!(h.is_empty());
    }

    #[test]
    fn test_edge_fractions() {
        let mut bmp = Bitmap32::new(4, 1, true);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::default(),
            global_alpha: 1.0,
        };
        let mut w = ScanlineWriter::new(4);
        w.select(S / 2, 2 * S + S / 2, S / 2, &mut target);
        assert_eq!(w.coverage(0), 0.5);
        assert_eq!(w.coverage(1), 1.0);
        assert_eq!(w.coverage(2), 0.5);
        assert_eq!(w.coverage(3), 0.0);
        w.finish(&mut target);
        assert_eq!(bmp.get_premul(0, 0).a, 128);
        assert_eq!(bmp.get_premul(1, 0).a, 255);
        assert_eq!(bmp.get_premul(2, 0).a, 128);
        assert_eq!(bmp.get_premul(3, 0).a, 0);
    }

    #[test]
    fn test_sub_rows_average() {
        let mut bmp = Bitmap32::new(2, 1, true);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::default(),
            global_alpha: 1.0,
        };
        let mut w = ScanlineWriter::new(2);
        w.set_sub_rows_per_pixel(4);
        // Only two of four sub-rows covered: half coverage.
        w.select(0, S, 2, &mut target);
        w.select(0, S, 7, &mut target);
        assert_eq!(w.sub_row_count(), 2);
        w.finish(&mut target);
        assert_eq!(bmp.get_premul(0, 0).a, 128);
    }

    #[test]
    fn test_duplicate_span_not_double_counted() {
        let mut bmp = Bitmap32::new(1, 1, true);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::default(),
            global_alpha: 1.0,
        };
        let mut w = ScanlineWriter::new(1);
        w.set_sub_rows_per_pixel(2);
        w.select(0, S, 5, &mut target);
        w.select(0, S, 5, &mut target);
        assert_eq!(w.coverage(0), 1.0);
    }

    #[test]
    fn test_row_change_flushes() {
        let mut bmp = Bitmap32::new(2, 2, false);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::default(),
            global_alpha: 1.0,
        };
        let mut w = ScanlineWriter::new(2);
        w.select(0, 2 * S, S / 2, &mut target);
        w.select(0, S, S + S / 2, &mut target);
        assert_eq!(w.current_row(), 1);
        assert_eq!(target.bitmap.get_rgba(1, 0), Rgba8::RED);
        w.finish(&mut target);
        assert_eq!(bmp.get_rgba(0, 1), Rgba8::RED);
        assert_eq!(bmp.get_rgba(1, 1), Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_destructive_mode_respects_coverage() {
        let mut bmp = Bitmap32::new(3, 1, true);
        bmp.fill(Rgba8::BLUE);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::Composite(CompositeMode::Source),
            global_alpha: 1.0,
        };
        let mut w = ScanlineWriter::new(3);
        w.select(S, 2 * S, S / 2, &mut target);
        w.finish(&mut target);
        assert_eq!(bmp.get_rgba(0, 0), Rgba8::BLUE);
        assert_eq!(bmp.get_rgba(1, 0), Rgba8::RED);
        assert_eq!(bmp.get_rgba(2, 0), Rgba8::BLUE);
    }

    #[test]
    fn test_global_alpha_scales() {
        let mut bmp = Bitmap32::new(1, 1, true);
        let filler = red();
        let mut target = ScanlineTarget {
            bitmap: &mut bmp,
            filler: &filler,
            composite: CompositeOperation::default(),
            global_alpha: 0.5,
        };
        let mut w = ScanlineWriter::new(1);
        w.select(0, S, S / 2, &mut target);
        w.finish(&mut target);
        assert_eq!(bmp.get_premul(0, 0), PremulRgba8::new(128, 0, 0, 128));
    }
}
