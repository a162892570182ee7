//! Stroke-to-fill conversion.
//!
//! Expands a path's flattened contours into filled outlines: open contours
//! become one closed polygon with caps on both ends, closed contours become
//! an outer and an inner ring of opposite orientation. The result is filled
//! with the non-zero rule, so overlaps inside a stroke never punch holes.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::basics::{PointD, Winding};
use crate::dash::dash_path;
use crate::vector_path::{Contour, VectorPath};

// ============================================================================
// Style enums
// ============================================================================

/// Shape of an open stroke end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Shape of the outside of a corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// Everything needed to expand a stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeInfo {
    pub thickness: f64,
    pub start_cap: LineCap,
    pub end_cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f64,
    pub dash: Option<Vec<f64>>,
    pub dash_offset: f64,
}

impl Default for StrokeInfo {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            start_cap: LineCap::Butt,
            end_cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: None,
            dash_offset: 0.0,
        }
    }
}

impl StrokeInfo {
    pub fn new(thickness: f64) -> Self {
        Self {
            thickness,
            ..Self::default()
        }
    }

    pub fn with_caps(mut self, cap: LineCap) -> Self {
        self.start_cap = cap;
        self.end_cap = cap;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }
}

// ============================================================================
// Geometry helpers
// ============================================================================

#[inline]
fn unit(a: PointD, b: PointD) -> PointD {
    let d = b - a;
    let len = d.x.hypot(d.y);
    PointD::new(d.x / len, d.y / len)
}

/// Left-hand normal of a unit direction.
#[inline]
fn normal(d: PointD) -> PointD {
    PointD::new(-d.y, d.x)
}

#[inline]
fn offset(p: PointD, n: PointD, w: f64) -> PointD {
    PointD::new(p.x + n.x * w, p.y + n.y * w)
}

struct Stroker {
    hw: f64,
    join: LineJoin,
    miter_limit: f64,
    /// Angular step for round joins and caps.
    da: f64,
}

impl Stroker {
    fn new(info: &StrokeInfo, scale: f64) -> Self {
        let hw = info.thickness.abs() * 0.5;
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let da = if hw > 0.0 {
            (hw / (hw + 0.125 / scale)).acos() * 2.0
        } else {
            PI
        };
        Self {
            hw,
            join: info.join,
            miter_limit: info.miter_limit.max(1.0),
            da: da.max(1e-3),
        }
    }

    /// Arc around `c` from angle `a0` sweeping by `sweep`, both ends
    /// included.
    fn arc(&self, c: PointD, a0: f64, sweep: f64, out: &mut Vec<PointD>) {
        let n = ((sweep.abs() / self.da).ceil() as usize).max(1);
        for k in 0..=n {
            let a = a0 + sweep * k as f64 / n as f64;
            out.push(PointD::new(c.x + a.cos() * self.hw, c.y + a.sin() * self.hw));
        }
    }

    /// Corner at `v` between unit directions `d1` (in) and `d2` (out),
    /// on side `s` (+1 left, -1 right).
    fn join(&self, v: PointD, d1: PointD, d2: PointD, s: f64, out: &mut Vec<PointD>) {
        let n1 = normal(d1);
        let n2 = normal(d2);
        let o1 = offset(v, n1, s * self.hw);
        let o2 = offset(v, n2, s * self.hw);
        let cross = d1.x * d2.y - d1.y * d2.x;
        let dot = d1.x * d2.x + d1.y * d2.y;

        if cross.abs() < 1e-12 && dot > 0.0 {
            out.push(o1);
            return;
        }
        let outer = s * cross < 0.0 || (cross.abs() < 1e-12 && dot < 0.0);
        if !outer {
            out.extend_from_slice(&[o1, v, o2]);
            return;
        }
        match self.join {
            LineJoin::Bevel => out.extend_from_slice(&[o1, o2]),
            LineJoin::Round => {
                let a0 = (o1.y - v.y).atan2(o1.x - v.x);
                let mut delta = cross.atan2(dot);
                if cross.abs() < 1e-12 {
                    delta = -s * PI;
                }
                self.arc(v, a0, delta, out);
            }
            LineJoin::Miter => {
                let half = cross.atan2(dot) * 0.5;
                let ratio = 1.0 / half.cos().abs();
                if !ratio.is_finite() || ratio > self.miter_limit {
                    out.extend_from_slice(&[o1, o2]);
                } else {
                    let m = PointD::new(n1.x + n2.x, n1.y + n2.y);
                    let len = m.x.hypot(m.y);
                    let k = s * self.hw * ratio / len;
                    out.push(PointD::new(v.x + m.x * k, v.y + m.y * k));
                }
            }
        }
    }

    /// Cap at `e`, travelling from `e + n*hw` to `e - n*hw` around the
    /// outward direction `d`.
    fn cap(&self, e: PointD, d: PointD, cap: LineCap, out: &mut Vec<PointD>) {
        let n = normal(d);
        match cap {
            LineCap::Butt => {
                out.push(offset(e, n, self.hw));
                out.push(offset(e, n, -self.hw));
            }
            LineCap::Square => {
                let f = offset(e, d, self.hw);
                out.push(offset(f, n, self.hw));
                out.push(offset(f, n, -self.hw));
            }
            LineCap::Round => {
                // Two quarter arcs so the tip at `e + d*hw` is a vertex.
                let a0 = n.y.atan2(n.x);
                self.arc(e, a0, -FRAC_PI_2, out);
                out.pop();
                self.arc(e, a0 - FRAC_PI_2, -FRAC_PI_2, out);
            }
        }
    }

    fn open(&self, pts: &[PointD], start_cap: LineCap, end_cap: LineCap, out: &mut VectorPath) {
        let last = pts.len() - 1;
        let mut left = Vec::with_capacity(pts.len() * 2);
        let mut right = Vec::with_capacity(pts.len() * 2);

        let d_first = unit(pts[0], pts[1]);
        let d_last = unit(pts[last - 1], pts[last]);
        left.push(offset(pts[0], normal(d_first), self.hw));
        right.push(offset(pts[0], normal(d_first), -self.hw));
        for i in 1..last {
            let d1 = unit(pts[i - 1], pts[i]);
            let d2 = unit(pts[i], pts[i + 1]);
            self.join(pts[i], d1, d2, 1.0, &mut left);
            self.join(pts[i], d1, d2, -1.0, &mut right);
        }

        let mut ring = left;
        self.cap(pts[last], d_last, end_cap, &mut ring);
        ring.extend(right.into_iter().rev());
        self.cap(pts[0], PointD::new(-d_first.x, -d_first.y), start_cap, &mut ring);
        emit_ring(&ring, out);
    }

    fn closed(&self, pts: &[PointD], out: &mut VectorPath) {
        let n = pts.len();
        let mut outer = Vec::with_capacity(n * 2);
        let mut inner = Vec::with_capacity(n * 2);
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            let d1 = unit(prev, pts[i]);
            let d2 = unit(pts[i], next);
            self.join(pts[i], d1, d2, 1.0, &mut outer);
            self.join(pts[i], d1, d2, -1.0, &mut inner);
        }
        inner.reverse();
        emit_ring(&outer, out);
        emit_ring(&inner, out);
    }

    /// Dot for a zero-length contour with round or square caps.
    fn dot(&self, p: PointD, cap: LineCap, out: &mut VectorPath) {
        let mut ring = Vec::new();
        match cap {
            LineCap::Butt => return,
            LineCap::Round => self.arc(p, 0.0, 2.0 * PI, &mut ring),
            LineCap::Square => {
                let h = self.hw;
                ring.extend_from_slice(&[
                    PointD::new(p.x - h, p.y - h),
                    PointD::new(p.x + h, p.y - h),
                    PointD::new(p.x + h, p.y + h),
                    PointD::new(p.x - h, p.y + h),
                ]);
            }
        }
        emit_ring(&ring, out);
    }
}

fn emit_ring(ring: &[PointD], out: &mut VectorPath) {
    let Some((first, rest)) = ring.split_first() else {
        return;
    };
    out.move_to(first.x, first.y);
    for p in rest {
        out.line_to(p.x, p.y);
    }
    out.close();
}

// ============================================================================
// Public API
// ============================================================================

/// Stroke already-flattened contours into a non-zero fill path.
pub fn stroke_contours(contours: &[Contour], info: &StrokeInfo, scale: f64) -> VectorPath {
    let mut out = VectorPath::with_winding(Winding::NonZero);
    if !(info.thickness.is_finite() && info.thickness > 0.0) {
        return out;
    }
    let stroker = Stroker::new(info, scale);

    let dashed;
    let contours = match info.dash.as_deref() {
        Some(pattern) => {
            dashed = dash_path(contours, pattern, info.dash_offset);
            &dashed[..]
        }
        None => contours,
    };

    let mut pts: Vec<PointD> = Vec::new();
    for c in contours {
        pts.clear();
        for &p in &c.points {
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        if c.closed && pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        match pts.len() {
            0 => {}
            1 => stroker.dot(pts[0], info.start_cap, &mut out),
            2 if c.closed => stroker.open(&pts, LineCap::Butt, LineCap::Butt, &mut out),
            _ if c.closed => stroker.closed(&pts, &mut out),
            _ => stroker.open(&pts, info.start_cap, info.end_cap, &mut out),
        }
    }
    out
}

/// Flatten `path` at `scale` and stroke it.
pub fn stroke_to_fill(path: &VectorPath, info: &StrokeInfo, scale: f64) -> VectorPath {
    let contours = path.flatten(scale);
    let out = stroke_contours(&contours, info, scale);
    log::trace!(
        "stroked {} contours into {} rings",
        contours.len(),
        out.contour_count()
    );
    out
}

// ============================================================================
// Tests
// ============================================================================
