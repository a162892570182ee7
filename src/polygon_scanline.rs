//! Polygon edge accumulator with per-row inside-range queries.
//!
//! Points arrive in device pixels and are stored as fixed-point edges
//! (see [`RAST_FIXED_SCALE`]). Edges are indexed by the y range they cover so
//! a scanline query only visits edges that can cross it. Each edge falls into
//! one of three bucket granularities depending on its height, which keeps
//! long edges from being copied into hundreds of small buckets. Edges taller
//! than the biggest granularity sit in a list visited on every row.

use std::collections::HashMap;

use crate::basics::{to_fixed, PointD, RectD, Winding, RAST_FIXED_SCALE};
use crate::segment_set::IntSegmentSet;

// ============================================================================
// Edge
// ============================================================================

/// A non-horizontal polygon edge in fixed-point units, oriented so that
/// `ay < by`. `wind` records the original direction: `+1` when the edge
/// pointed down (increasing y), `-1` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub ax: i32,
    pub ay: i32,
    pub bx: i32,
    pub by: i32,
    pub wind: i32,
}

impl Edge {
    /// Build an edge, or `None` for horizontal and zero-length edges.
    pub fn new(ax: i32, ay: i32, bx: i32, by: i32) -> Option<Self> {
        if ay == by {
            return None;
        }
        Some(if ay < by {
            Self { ax, ay, bx, by, wind: 1 }
        } else {
            Self {
                ax: bx,
                ay: by,
                bx: ax,
                by: ay,
                wind: -1,
            }
        })
    }

    /// Half-open vertical extent: the top row is inside, the bottom is not.
    #[inline]
    pub fn contains_y(&self, y: i32) -> bool {
        y >= self.ay && y < self.by
    }

    /// X where this edge crosses row `y`, truncated toward the edge's start.
    #[inline]
    pub fn intersect_x(&self, y: i32) -> i32 {
        if self.ax == self.bx {
            return self.ax;
        }
        let dx = self.bx as i128 - self.ax as i128;
        let dy = self.by as i128 - self.ay as i128;
        let x = self.ax as i128 + (y as i128 - self.ay as i128) * dx / dy;
        x.clamp(i32::MIN as i128, i32::MAX as i128) as i32
    }
}

// ============================================================================
// Buckets
// ============================================================================

const SMALL_BUCKET: i32 = RAST_FIXED_SCALE * 4;
const MEDIUM_BUCKET: i32 = RAST_FIXED_SCALE * 16;
const BIG_BUCKET: i32 = RAST_FIXED_SCALE * 64;
/// Edges spanning more buckets than this move up one granularity.
const MAX_BUCKETS_PER_EDGE: i32 = 4;
/// Edges taller than this many big buckets are checked on every row.
const MAX_BIG_BUCKETS_PER_EDGE: i32 = 64;

#[derive(Debug, Clone)]
struct Buckets {
    size: i32,
    map: HashMap<i32, Vec<u32>>,
}

impl Buckets {
    fn new(size: i32) -> Self {
        Self {
            size,
            map: HashMap::new(),
        }
    }

    #[inline]
    fn index(&self, y: i32) -> i32 {
        y.div_euclid(self.size)
    }

    fn span(&self, edge: &Edge) -> i64 {
        self.index(edge.by - 1) as i64 - self.index(edge.ay) as i64 + 1
    }

    fn add(&mut self, edge: &Edge, id: u32) {
        for i in self.index(edge.ay)..=self.index(edge.by - 1) {
            self.map.entry(i).or_default().push(id);
        }
    }

    fn at(&self, y: i32) -> &[u32] {
        self.map.get(&self.index(y)).map_or(&[], |v| v.as_slice())
    }

    fn clear(&mut self) {
        // Keep the per-bucket allocations for the next path.
        for v in self.map.values_mut() {
            v.clear();
        }
    }
}

// ============================================================================
// PolygonScanline
// ============================================================================

/// Accumulates closed polygons and answers "which x ranges are inside at
/// row y" under a winding rule.
#[derive(Debug, Clone)]
pub struct PolygonScanline {
    edges: Vec<Edge>,
    small: Buckets,
    medium: Buckets,
    big: Buckets,
    tall: Vec<u32>,
    winding: Winding,
    bounds: RectD,
    start: Option<(i32, i32)>,
    last: Option<(i32, i32)>,
    point_count: usize,
    crossings: Vec<(i32, i32)>,
}

impl PolygonScanline {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            small: Buckets::new(SMALL_BUCKET),
            medium: Buckets::new(MEDIUM_BUCKET),
            big: Buckets::new(BIG_BUCKET),
            tall: Vec::new(),
            winding: Winding::NonZero,
            bounds: RectD::empty(),
            start: None,
            last: None,
            point_count: 0,
            crossings: Vec::new(),
        }
    }

    pub fn winding(&self) -> Winding {
        self.winding
    }

    pub fn set_winding(&mut self, winding: Winding) {
        self.winding = winding;
    }

    /// Forget all edges; scratch storage is kept.
    pub fn reset(&mut self) {
        self.edges.clear();
        self.small.clear();
        self.medium.clear();
        self.big.clear();
        self.tall.clear();
        self.bounds = RectD::empty();
        self.start = None;
        self.last = None;
        self.point_count = 0;
    }

    /// No edge has been added.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Bounding box of every point added since the last reset, in pixels.
    pub fn bounds(&self) -> Option<RectD> {
        if self.point_count == 0 {
            None
        } else {
            Some(self.bounds)
        }
    }

    /// Add a point. `move_to` closes the previous contour and starts a new
    /// one; otherwise an edge from the previous point is recorded.
    /// Non-finite points are dropped.
    pub fn add(&mut self, x: f64, y: f64, move_to: bool) {
        if !(x.is_finite() && y.is_finite()) {
            log::trace!("dropping non-finite polygon point ({x}, {y})");
            return;
        }
        self.bounds.add_point(x, y);
        self.point_count += 1;
        let p = (to_fixed(x), to_fixed(y));
        if move_to || self.last.is_none() {
            self.close();
            self.start = Some(p);
        } else if let Some(last) = self.last {
            self.add_edge(last, p);
        }
        self.last = Some(p);
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.add(x, y, true);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.add(x, y, false);
    }

    pub fn move_to_point(&mut self, p: PointD) {
        self.add(p.x, p.y, true);
    }

    pub fn line_to_point(&mut self, p: PointD) {
        self.add(p.x, p.y, false);
    }

    /// Connect the current point back to the contour start.
    pub fn close(&mut self) {
        if let (Some(start), Some(last)) = (self.start, self.last) {
            if start != last {
                self.add_edge(last, start);
            }
            self.last = Some(start);
        }
    }

    fn add_edge(&mut self, a: (i32, i32), b: (i32, i32)) {
        let Some(edge) = Edge::new(a.0, a.1, b.0, b.1) else {
            return;
        };
        let id = self.edges.len() as u32;
        if self.small.span(&edge) <= MAX_BUCKETS_PER_EDGE as i64 {
            self.small.add(&edge, id);
        } else if self.medium.span(&edge) <= MAX_BUCKETS_PER_EDGE as i64 {
            self.medium.add(&edge, id);
        } else if self.big.span(&edge) <= MAX_BIG_BUCKETS_PER_EDGE as i64 {
            self.big.add(&edge, id);
        } else {
            self.tall.push(id);
        }
        self.edges.push(edge);
    }

    /// Collect inside ranges of fixed-point row `y` into `out`.
    ///
    /// Ranges are half-open in fixed-point x. Crossing x positions come from
    /// every edge whose half-open y range contains `y`.
    pub fn scanline(&mut self, y: i32, winding: Winding, out: &mut IntSegmentSet) {
        out.clear();
        self.crossings.clear();
        let tall = self.tall.as_slice();
        for ids in [self.small.at(y), self.medium.at(y), self.big.at(y), tall] {
            for &id in ids {
                let e = &self.edges[id as usize];
                if e.contains_y(y) {
                    self.crossings.push((e.intersect_x(y), e.wind));
                }
            }
        }
        if self.crossings.len() < 2 {
            return;
        }
        self.crossings.sort_unstable_by_key(|c| c.0);

        match winding {
            Winding::EvenOdd => {
                for pair in self.crossings.chunks_exact(2) {
                    out.add(pair[0].0, pair[1].0);
                }
            }
            Winding::NonZero => {
                let mut count = 0;
                for w in self.crossings.windows(2) {
                    count += w[0].1;
                    if count != 0 {
                        out.add(w[0].0, w[1].0);
                    }
                }
            }
        }
    }

    /// Hit test a device-space point against the accumulated polygon.
    pub fn contains_point(&mut self, x: f64, y: f64, winding: Winding) -> bool {
        if !(x.is_finite() && y.is_finite()) {
            return false;
        }
        let mut seg = IntSegmentSet::new();
        self.scanline(to_fixed(y), winding, &mut seg);
        seg.contains(to_fixed(x))
    }
}

impl Default for PolygonScanline {
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

    fn ranges(p: &mut PolygonScanline, y: i32, w: Winding) -> Vec<(i32, i32)> {
        let mut out = IntSegmentSet::new();
        p.scanline(y, w, &mut out);
        out.iter().collect()
    }

    #[test]
    fn test_edge_orientation() {
        let e = Edge::new(0, 100, 10, 0).unwrap();
        assert_eq!((e.ay, e.by, e.wind), (0, 100, -1));
        assert!(Edge::new(0, 5, 10, 5).is_none());
        assert!(e.contains_y(0));
        assert!(!e.contains_y(100));
    }

    #[test]
    fn test_intersect_x() {
        let e = Edge::new(0, 0, 100, 100).unwrap();
        assert_eq!(e.intersect_x(50), 50);
        let v = Edge::new(30, 0, 30, 100).unwrap();
        assert_eq!(v.intersect_x(70), 30);
    }

    #[test]
    fn test_rect_scanline() {
        let mut p = PolygonScanline::new();
        rect(&mut p, 2.0, 2.0, 8.0, 8.0);
        assert_eq!(p.edge_count(), 2);
        assert_eq!(ranges(&mut p, 5 * S, Winding::NonZero), vec![(2 * S, 8 * S)]);
        assert!(ranges(&mut p, S, Winding::NonZero).is_empty());
        assert!(ranges(&mut p, 8 * S, Winding::NonZero).is_empty());
    }

    #[test]
    fn test_winding_rules() {
        // Two nested squares with the same orientation.
        let mut p = PolygonScanline::new();
        rect(&mut p, 0.0, 0.0, 10.0, 10.0);
        rect(&mut p, 3.0, 3.0, 7.0, 7.0);
        let y = 5 * S;
        assert_eq!(ranges(&mut p, y, Winding::NonZero), vec![(0, 10 * S)]);
        assert_eq!(
            ranges(&mut p, y, Winding::EvenOdd),
            vec![(0, 3 * S), (7 * S, 10 * S)]
        );
    }

    #[test]
    fn test_opposite_orientation_makes_hole() {
        let mut p = PolygonScanline::new();
        rect(&mut p, 0.0, 0.0, 10.0, 10.0);
        p.move_to(3.0, 3.0);
        p.line_to(3.0, 7.0);
        p.line_to(7.0, 7.0);
        p.line_to(7.0, 3.0);
        p.close();
        assert_eq!(
            ranges(&mut p, 5 * S, Winding::NonZero),
            vec![(0, 3 * S), (7 * S, 10 * S)]
        );
    }

    #[test]
    fn test_tall_edges_use_large_buckets() {
        let mut p = PolygonScanline::new();
        rect(&mut p, 0.0, 0.0, 4.0, 1000.0);
        for row in [0, 17, 500, 999] {
            assert_eq!(
                ranges(&mut p, row * S + S / 2, Winding::NonZero),
                vec![(0, 4 * S)]
            );
        }
    }

    #[test]
    fn test_far_off_canvas_vertex() {
        // -2e8 px saturates the fixed-point range.
        let mut p = PolygonScanline::new();
        p.move_to(0.0, -2e8);
        p.line_to(10.0, 10.0);
        p.line_to(0.0, 10.0);
        p.close();
        assert_eq!(p.tall.len(), 2);
        assert!(p.contains_point(5.0, 5.0, Winding::NonZero));
        assert!(p.contains_point(0.5, -1000.0, Winding::NonZero));
        assert!(!p.contains_point(11.0, 5.0, Winding::NonZero));

        let e = Edge::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX).unwrap();
        assert_eq!(e.intersect_x(0), 0);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut p = PolygonScanline::new();
        rect(&mut p, -10.0, -10.0, -2.0, -2.0);
        assert_eq!(
            ranges(&mut p, -5 * S, Winding::NonZero),
            vec![(-10 * S, -2 * S)]
        );
    }

    #[test]
    fn test_contains_point_and_bounds() {
        let mut p = PolygonScanline::new();
        assert!(p.bounds().is_none());
        rect(&mut p, 1.0, 1.0, 5.0, 3.0);
        assert!(p.contains_point(2.0, 2.0, Winding::NonZero));
        assert!(!p.contains_point(6.0, 2.0, Winding::NonZero));
        let b = p.bounds().unwrap();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (1.0, 1.0, 5.0, 3.0));
    }

    #[test]
    fn test_nan_points_dropped_and_reset() {
        let mut p = PolygonScanline::new();
        p.move_to(0.0, 0.0);
        p.line_to(f64::NAN, 3.0);
        p.line_to(4.0, 4.0);
        p.line_to(0.0, 4.0);
        p.close();
        assert!(!p.is_empty());
        p.reset();
        assert!(p.is_empty());
        assert!(p.bounds().is_none());
    }
}
