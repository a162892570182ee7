//! Vector path storage.
//!
//! A `VectorPath` is an ordered list of drawing commands plus the winding rule
//! used when it is filled. Curves are kept symbolic until the path is
//! flattened for rasterization or stroking.

use crate::basics::{PointD, RectD, Winding, PI};
use crate::curves::CurveFlattener;
use crate::error::{RenderError, RenderResult};
use crate::trans_affine::TransAffine;

/// Magic constant for approximating a quarter circle with a cubic curve.
const KAPPA_90: f64 = 0.552_284_749_830_793_4;

// ============================================================================
// Commands and contours
// ============================================================================

/// A single path command. Coordinates are absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(PointD),
    LineTo(PointD),
    QuadTo(PointD, PointD),
    CubicTo(PointD, PointD, PointD),
    Close,
}

/// A flattened sub-path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<PointD>,
    pub closed: bool,
}

impl Contour {
    /// Signed area (shoelace); positive for clockwise in y-down space.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum * 0.5
    }
}

// ============================================================================
// VectorPath
// ============================================================================

/// Ordered drawing commands plus a fill winding rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorPath {
    commands: Vec<PathCommand>,
    winding: Winding,
    last_pos: PointD,
    last_move_pos: PointD,
}

impl VectorPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_winding(winding: Winding) -> Self {
        Self {
            winding,
            ..Self::default()
        }
    }

    pub fn winding(&self) -> Winding {
        self.winding
    }

    pub fn set_winding(&mut self, winding: Winding) {
        self.winding = winding;
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.last_pos = PointD::default();
        self.last_move_pos = PointD::default();
    }

    /// Current pen position.
    pub fn last_pos(&self) -> PointD {
        self.last_pos
    }

    // ------------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------------

    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = PointD::new(x, y);
        if let Some(PathCommand::MoveTo(last)) = self.commands.last_mut() {
            // Consecutive moves collapse into the latest one.
            *last = p;
        } else {
            self.commands.push(PathCommand::MoveTo(p));
        }
        self.last_pos = p;
        self.last_move_pos = p;
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.ensure_move_to(x, y) {
            return;
        }
        let p = PointD::new(x, y);
        self.commands.push(PathCommand::LineTo(p));
        self.last_pos = p;
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ensure_move_to(cx, cy);
        let p = PointD::new(x, y);
        self.commands.push(PathCommand::QuadTo(PointD::new(cx, cy), p));
        self.last_pos = p;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.ensure_move_to(c1x, c1y);
        let p = PointD::new(x, y);
        self.commands.push(PathCommand::CubicTo(
            PointD::new(c1x, c1y),
            PointD::new(c2x, c2y),
            p,
        ));
        self.last_pos = p;
    }

    pub fn close(&mut self) {
        if self.commands.is_empty() || matches!(self.commands.last(), Some(PathCommand::Close)) {
            return;
        }
        self.commands.push(PathCommand::Close);
        self.last_pos = self.last_move_pos;
    }

    fn ensure_move_to(&mut self, x: f64, y: f64) -> bool {
        if !self.commands.is_empty() {
            return false;
        }
        self.move_to(x, y);
        true
    }

    /// Append all commands of `other`, keeping this path's winding.
    pub fn append(&mut self, other: &VectorPath) {
        self.commands.extend_from_slice(&other.commands);
        self.last_pos = other.last_pos;
        self.last_move_pos = other.last_move_pos;
    }

    // ------------------------------------------------------------------------
    // Shapes
    // ------------------------------------------------------------------------

    /// Closed axis-aligned rectangle, clockwise in y-down space.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.close();
    }

    /// Circular arc from angle `start` sweeping to `end` (radians).
    ///
    /// A negative sweep runs counter-clockwise. If the path already has a
    /// current point, a line joins it to the arc start.
    pub fn arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64) {
        self.elliptic_arc(cx, cy, r, r, start, end);
    }

    fn elliptic_arc(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, start: f64, end: f64) {
        let sweep = (end - start).clamp(-2.0 * PI, 2.0 * PI);
        let x0 = cx + rx * start.cos();
        let y0 = cy + ry * start.sin();
        if self.commands.is_empty() || matches!(self.commands.last(), Some(PathCommand::Close)) {
            self.move_to(x0, y0);
        } else if self.last_pos != PointD::new(x0, y0) {
            self.line_to(x0, y0);
        }
        if sweep == 0.0 {
            return;
        }
        let segments = (sweep.abs() / (PI / 2.0)).ceil().max(1.0) as usize;
        let step = sweep / segments as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let mut a = start;
        for _ in 0..segments {
            let b = a + step;
            let (sa, ca) = a.sin_cos();
            let (sb, cb) = b.sin_cos();
            self.cubic_to(
                cx + rx * (ca - k * sa),
                cy + ry * (sa + k * ca),
                cx + rx * (cb + k * sb),
                cy + ry * (sb - k * cb),
                cx + rx * cb,
                cy + ry * sb,
            );
            a = b;
        }
    }

    /// Closed ellipse, clockwise in y-down space.
    pub fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) {
        self.move_to(cx + rx, cy);
        self.elliptic_arc(cx, cy, rx, ry, 0.0, 2.0 * PI);
        self.close();
    }

    /// Closed circle, clockwise in y-down space.
    pub fn circle(&mut self, cx: f64, cy: f64, r: f64) {
        self.ellipse(cx, cy, r, r);
    }

    /// Rectangle with quarter-circle corners of radius `r`.
    pub fn rounded_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64) {
        let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
        if r == 0.0 {
            self.rect(x, y, w, h);
            return;
        }
        let k = r * (1.0 - KAPPA_90);
        self.move_to(x + r, y);
        self.line_to(x + w - r, y);
        self.cubic_to(x + w - k, y, x + w, y + k, x + w, y + r);
        self.line_to(x + w, y + h - r);
        self.cubic_to(x + w, y + h - k, x + w - k, y + h, x + w - r, y + h);
        self.line_to(x + r, y + h);
        self.cubic_to(x + k, y + h, x, y + h - k, x, y + h - r);
        self.line_to(x, y + r);
        self.cubic_to(x, y + k, x + k, y, x + r, y);
        self.close();
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Copy of this path with every point mapped through `m`.
    pub fn transformed(&self, m: &TransAffine) -> VectorPath {
        let t = |p: PointD| m.transform_point(p);
        VectorPath {
            commands: self
                .commands
                .iter()
                .map(|c| match *c {
                    PathCommand::MoveTo(p) => PathCommand::MoveTo(t(p)),
                    PathCommand::LineTo(p) => PathCommand::LineTo(t(p)),
                    PathCommand::QuadTo(c, p) => PathCommand::QuadTo(t(c), t(p)),
                    PathCommand::CubicTo(c1, c2, p) => PathCommand::CubicTo(t(c1), t(c2), t(p)),
                    PathCommand::Close => PathCommand::Close,
                })
                .collect(),
            winding: self.winding,
            last_pos: t(self.last_pos),
            last_move_pos: t(self.last_move_pos),
        }
    }

    /// Bounds of all points including curve control points, or `None` when
    /// the path has no points.
    pub fn bounds(&self) -> Option<RectD> {
        let mut r = RectD::empty();
        let mut any = false;
        let mut add = |p: &PointD| {
            if p.is_finite() {
                r.add_point(p.x, p.y);
                any = true;
            }
        };
        for c in &self.commands {
            match c {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => add(p),
                PathCommand::QuadTo(c, p) => {
                    add(c);
                    add(p);
                }
                PathCommand::CubicTo(c1, c2, p) => {
                    add(c1);
                    add(c2);
                    add(p);
                }
                PathCommand::Close => {}
            }
        }
        any.then_some(r)
    }

    /// Number of sub-paths (move commands).
    pub fn contour_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PathCommand::MoveTo(_)))
            .count()
    }

    /// Fail if any coordinate is NaN or infinite.
    pub fn validate(&self) -> RenderResult<()> {
        for (i, c) in self.commands.iter().enumerate() {
            let ok = match c {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => p.is_finite(),
                PathCommand::QuadTo(c, p) => c.is_finite() && p.is_finite(),
                PathCommand::CubicTo(c1, c2, p) => {
                    c1.is_finite() && c2.is_finite() && p.is_finite()
                }
                PathCommand::Close => true,
            };
            if !ok {
                return Err(RenderError::Geometry(format!(
                    "non-finite coordinate in command {} ({:?})",
                    i, c
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Flattening
    // ------------------------------------------------------------------------

    /// Flatten into polylines. Curves are subdivided with the given
    /// approximation scale; non-finite points are dropped.
    pub fn flatten(&self, scale: f64) -> Vec<Contour> {
        let flattener = CurveFlattener::with_scale(scale);
        let mut out: Vec<Contour> = Vec::new();
        let mut cur = Contour::default();
        let mut start = PointD::default();
        let mut pen = PointD::default();
        let mut scratch: Vec<PointD> = Vec::new();

        fn push_point(c: &mut Contour, p: PointD) {
            if !p.is_finite() {
                log::trace!("dropping non-finite path point {:?}", p);
                return;
            }
            if c.points.last() != Some(&p) {
                c.points.push(p);
            }
        }

        fn finish(out: &mut Vec<Contour>, c: &mut Contour) {
            let c = std::mem::take(c);
            if !c.points.is_empty() {
                out.push(c);
            }
        }

        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    finish(&mut out, &mut cur);
                    push_point(&mut cur, p);
                    start = p;
                    pen = p;
                }
                PathCommand::LineTo(p) => {
                    if cur.points.is_empty() {
                        push_point(&mut cur, pen);
                    }
                    push_point(&mut cur, p);
                    pen = p;
                }
                PathCommand::QuadTo(c, p) => {
                    if cur.points.is_empty() {
                        push_point(&mut cur, pen);
                    }
                    scratch.clear();
                    flattener.quad(pen, c, p, &mut scratch);
                    for &q in &scratch {
                        push_point(&mut cur, q);
                    }
                    pen = p;
                }
                PathCommand::CubicTo(c1, c2, p) => {
                    if cur.points.is_empty() {
                        push_point(&mut cur, pen);
                    }
                    scratch.clear();
                    flattener.cubic(pen, c1, c2, p, &mut scratch);
                    for &q in &scratch {
                        push_point(&mut cur, q);
                    }
                    pen = p;
                }
                PathCommand::Close => {
                    if cur.points.len() > 1 && cur.points.last() == cur.points.first() {
                        cur.points.pop();
                    }
                    cur.closed = true;
                    finish(&mut out, &mut cur);
                    pen = start;
                }
            }
        }
        finish(&mut out, &mut cur);
        out
    }

    /// Stream flattened points to a polygon accumulator.
    ///
    /// `emit(x, y, move)` receives every point; `move` is true for the first
    /// point of each sub-path. Sub-paths are implicitly closed by the
    /// receiver.
    pub fn emit_points<F: FnMut(f64, f64, bool)>(&self, scale: f64, mut emit: F) {
        for contour in self.flatten(scale) {
            for (i, p) in contour.points.iter().enumerate() {
                emit(p.x, p.y, i == 0);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
