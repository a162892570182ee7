//! Bezier curve flattening.
//!
//! Recursive de Casteljau subdivision that stops once the control polygon is
//! within a distance tolerance of the chord. The tolerance is half a unit
//! divided by the approximation scale; pass the device scale so curves drawn
//! under magnification stay smooth.
//!
//! Output points exclude the curve's start point (the caller already has it)
//! and always end exactly at the curve's end point.

use crate::basics::PointD;

// ============================================================================
// Constants
// ============================================================================

const CURVE_COLLINEARITY_EPSILON: f64 = 1e-30;
const CURVE_RECURSION_LIMIT: u32 = 32;

#[inline]
fn calc_sq_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    dx * dx + dy * dy
}

// ============================================================================
// CurveFlattener
// ============================================================================

/// Adaptive subdivision flattener for quadratic and cubic curves.
#[derive(Debug, Clone, Copy)]
pub struct CurveFlattener {
    approximation_scale: f64,
    distance_tolerance_square: f64,
}

impl CurveFlattener {
    pub fn new() -> Self {
        let mut c = Self {
            approximation_scale: 1.0,
            distance_tolerance_square: 0.0,
        };
        c.set_approximation_scale(1.0);
        c
    }

    pub fn with_scale(scale: f64) -> Self {
        let mut c = Self::new();
        c.set_approximation_scale(scale);
        c
    }

    pub fn set_approximation_scale(&mut self, s: f64) {
        let s = if s.is_finite() && s > 0.0 { s } else { 1.0 };
        self.approximation_scale = s;
        let tol = 0.5 / s;
        self.distance_tolerance_square = tol * tol;
    }

    pub fn approximation_scale(&self) -> f64 {
        self.approximation_scale
    }

    /// Flatten a quadratic curve from `p1` through control `p2` to `p3`.
    pub fn quad(&self, p1: PointD, p2: PointD, p3: PointD, out: &mut Vec<PointD>) {
        self.recursive_quad(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y, 0, out);
        out.push(p3);
    }

    /// Flatten a cubic curve from `p1` with controls `p2`, `p3` to `p4`.
    pub fn cubic(&self, p1: PointD, p2: PointD, p3: PointD, p4: PointD, out: &mut Vec<PointD>) {
        self.recursive_cubic(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y, p4.x, p4.y, 0, out);
        out.push(p4);
    }

    #[allow(clippy::too_many_arguments)]
    fn recursive_quad(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
        level: u32,
        out: &mut Vec<PointD>,
    ) {
        if level > CURVE_RECURSION_LIMIT {
            return;
        }

        let x12 = (x1 + x2) / 2.0;
        let y12 = (y1 + y2) / 2.0;
        let x23 = (x2 + x3) / 2.0;
        let y23 = (y2 + y3) / 2.0;
        let x123 = (x12 + x23) / 2.0;
        let y123 = (y12 + y23) / 2.0;

        let dx = x3 - x1;
        let dy = y3 - y1;
        let d = ((x2 - x3) * dy - (y2 - y3) * dx).abs();

        if d > CURVE_COLLINEARITY_EPSILON {
            if d * d <= self.distance_tolerance_square * (dx * dx + dy * dy) {
                out.push(PointD::new(x123, y123));
                return;
            }
        } else {
            // Collinear: only the control point's overshoot matters.
            let da = dx * dx + dy * dy;
            let d_val = if da == 0.0 {
                calc_sq_distance(x1, y1, x2, y2)
            } else {
                let t = ((x2 - x1) * dx + (y2 - y1) * dy) / da;
                if t > 0.0 && t < 1.0 {
                    return;
                }
                if t <= 0.0 {
                    calc_sq_distance(x2, y2, x1, y1)
                } else {
                    calc_sq_distance(x2, y2, x3, y3)
                }
            };
            if d_val < self.distance_tolerance_square {
                out.push(PointD::new(x2, y2));
                return;
            }
        }

        self.recursive_quad(x1, y1, x12, y12, x123, y123, level + 1, out);
        self.recursive_quad(x123, y123, x23, y23, x3, y3, level + 1, out);
    }

    #[allow(clippy::too_many_arguments)]
    fn recursive_cubic(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
        x4: f64,
        y4: f64,
        level: u32,
        out: &mut Vec<PointD>,
    ) {
        if level > CURVE_RECURSION_LIMIT {
            return;
        }

        let x12 = (x1 + x2) / 2.0;
        let y12 = (y1 + y2) / 2.0;
        let x23 = (x2 + x3) / 2.0;
        let y23 = (y2 + y3) / 2.0;
        let x34 = (x3 + x4) / 2.0;
        let y34 = (y3 + y4) / 2.0;
        let x123 = (x12 + x23) / 2.0;
        let y123 = (y12 + y23) / 2.0;
        let x234 = (x23 + x34) / 2.0;
        let y234 = (y23 + y34) / 2.0;
        let x1234 = (x123 + x234) / 2.0;
        let y1234 = (y123 + y234) / 2.0;

        let dx = x4 - x1;
        let dy = y4 - y1;

        let mut d2 = ((x2 - x4) * dy - (y2 - y4) * dx).abs();
        let mut d3 = ((x3 - x4) * dy - (y3 - y4) * dx).abs();

        let significant2 = d2 > CURVE_COLLINEARITY_EPSILON;
        let significant3 = d3 > CURVE_COLLINEARITY_EPSILON;

        match (significant2, significant3) {
            (false, false) => {
                // All collinear or p1 == p4.
                let k = dx * dx + dy * dy;
                if k == 0.0 {
                    d2 = calc_sq_distance(x1, y1, x2, y2);
                    d3 = calc_sq_distance(x4, y4, x3, y3);
                } else {
                    let k = 1.0 / k;
                    d2 = k * ((x2 - x1) * dx + (y2 - y1) * dy);
                    d3 = k * ((x3 - x1) * dx + (y3 - y1) * dy);
                    if d2 > 0.0 && d2 < 1.0 && d3 > 0.0 && d3 < 1.0 {
                        return;
                    }
                    d2 = if d2 <= 0.0 {
                        calc_sq_distance(x2, y2, x1, y1)
                    } else if d2 >= 1.0 {
                        calc_sq_distance(x2, y2, x4, y4)
                    } else {
                        calc_sq_distance(x2, y2, x1 + d2 * dx, y1 + d2 * dy)
                    };
                    d3 = if d3 <= 0.0 {
                        calc_sq_distance(x3, y3, x1, y1)
                    } else if d3 >= 1.0 {
                        calc_sq_distance(x3, y3, x4, y4)
                    } else {
                        calc_sq_distance(x3, y3, x1 + d3 * dx, y1 + d3 * dy)
                    };
                }
                if d2 > d3 {
                    if d2 < self.distance_tolerance_square {
                        out.push(PointD::new(x2, y2));
                        return;
                    }
                } else if d3 < self.distance_tolerance_square {
                    out.push(PointD::new(x3, y3));
                    return;
                }
            }
            (false, true) => {
                if d3 * d3 <= self.distance_tolerance_square * (dx * dx + dy * dy) {
                    out.push(PointD::new(x23, y23));
                    return;
                }
            }
            (true, false) => {
                if d2 * d2 <= self.distance_tolerance_square * (dx * dx + dy * dy) {
                    out.push(PointD::new(x23, y23));
                    return;
                }
            }
            (true, true) => {
                if (d2 + d3) * (d2 + d3) <= self.distance_tolerance_square * (dx * dx + dy * dy) {
                    out.push(PointD::new(x23, y23));
                    return;
                }
            }
        }

        self.recursive_cubic(x1, y1, x12, y12, x123, y123, x1234, y1234, level + 1, out);
        self.recursive_cubic(x1234, y1234, x234, y234, x34, y34, x4, y4, level + 1, out);
    }
}

impl Default for CurveFlattener {
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

    fn quad_at(p1: PointD, p2: PointD, p3: PointD, t: f64) -> PointD {
        let mt = 1.0 - t;
        PointD::new(
            mt * mt * p1.x + 2.0 * mt * t * p2.x + t * t * p3.x,
            mt * mt * p1.y + 2.0 * mt * t * p2.y + t * t * p3.y,
        )
    }

    #[test]
    fn test_quad_ends_at_endpoint() {
        let f = CurveFlattener::new();
        let mut out = Vec::new();
        let (p1, p2, p3) = (
            PointD::new(0.0, 0.0),
            PointD::new(50.0, 100.0),
            PointD::new(100.0, 0.0),
        );
        f.quad(p1, p2, p3, &mut out);
        assert!(out.len() > 4);
        assert_eq!(*out.last().unwrap(), p3);
    }

    #[test]
    fn test_quad_points_lie_near_curve() {
        let f = CurveFlattener::new();
        let mut out = Vec::new();
        let (p1, p2, p3) = (
            PointD::new(0.0, 0.0),
            PointD::new(50.0, 100.0),
            PointD::new(100.0, 0.0),
        );
        f.quad(p1, p2, p3, &mut out);
        // Every emitted point should be close to some point on the curve.
        for p in &out {
            let best = (0..=1000)
                .map(|i| quad_at(p1, p2, p3, i as f64 / 1000.0).distance(p))
                .fold(f64::MAX, f64::min);
            assert!(best < 0.5, "point {:?} off curve by {}", p, best);
        }
    }

    #[test]
    fn test_straight_cubic_collapses() {
        let f = CurveFlattener::new();
        let mut out = Vec::new();
        f.cubic(
            PointD::new(0.0, 0.0),
            PointD::new(10.0, 0.0),
            PointD::new(20.0, 0.0),
            PointD::new(30.0, 0.0),
            &mut out,
        );
        assert_eq!(out, vec![PointD::new(30.0, 0.0)]);
    }

    #[test]
    fn test_higher_scale_gives_more_points() {
        let mut coarse = Vec::new();
        let mut fine = Vec::new();
        let pts = [
            PointD::new(0.0, 0.0),
            PointD::new(0.0, 100.0),
            PointD::new(100.0, 100.0),
            PointD::new(100.0, 0.0),
        ];
        CurveFlattener::with_scale(1.0).cubic(pts[0], pts[1], pts[2], pts[3], &mut coarse);
        CurveFlattener::with_scale(8.0).cubic(pts[0], pts[1], pts[2], pts[3], &mut fine);
        assert!(fine.len() > coarse.len());
    }

    #[test]
    fn test_invalid_scale_falls_back() {
        let f = CurveFlattener::with_scale(f64::NAN);
        assert_eq!(f.approximation_scale(), 1.0);
    }
}
