//! Foundation types, constants, and rounding helpers.
//!
//! Everything else in the crate depends on this module: the fixed-point
//! scan coordinate model, the winding rule, and the integer/float
//! rectangle and point types.

use core::ops::{Add, Sub};

// ============================================================================
// Fixed-point scan coordinate model
// ============================================================================

/// Sub-pixel units per device pixel, in both x and y.
///
/// Spans emitted by the rasterizer are expressed in these units, so a span
/// `(x0, x1, y)` covers device pixels `x0 / RAST_FIXED_SCALE ..`.
pub const RAST_FIXED_SCALE: i32 = 20;

/// [`RAST_FIXED_SCALE`] as a float.
pub const RAST_FIXED_SCALE_F: f64 = RAST_FIXED_SCALE as f64;

/// Largest bitmap side (in pixels) the fixed-point model supports.
///
/// Edge intersection multiplies two fixed-point deltas; keeping every
/// coordinate below this bound keeps those products inside `i64` with a wide
/// margin and every span coordinate inside `i32`.
pub const MAX_RASTER_DIMENSION: i32 = i32::MAX / (RAST_FIXED_SCALE * 4);

/// Convert a device coordinate to fixed-point scan units.
#[inline]
pub fn to_fixed(v: f64) -> i32 {
    iround(v * RAST_FIXED_SCALE_F)
}

/// Convert fixed-point scan units back to device coordinates.
#[inline]
pub fn from_fixed(v: i32) -> f64 {
    v as f64 / RAST_FIXED_SCALE_F
}

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Round a double to the nearest integer (round half away from zero).
#[inline]
pub fn iround(v: f64) -> i32 {
    if v < 0.0 {
        (v - 0.5) as i32
    } else {
        (v + 0.5) as i32
    }
}

/// Round a double to the nearest unsigned integer (round half up).
#[inline]
pub fn uround(v: f64) -> u32 {
    (v + 0.5) as u32
}

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    let i = v as i32;
    i - (i as f64 > v) as i32
}

/// Ceiling of a double as a signed integer.
#[inline]
pub fn iceil(v: f64) -> i32 {
    v.ceil() as i32
}

// ============================================================================
// Winding rule
// ============================================================================

/// Rule deciding whether a point enclosed by several contours is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Winding {
    /// Inside when the signed crossing count is non-zero.
    #[default]
    NonZero,
    /// Inside when the crossing count is odd.
    EvenOdd,
}

impl Winding {
    /// Apply the rule to a signed crossing count.
    #[inline]
    pub fn is_inside(self, count: i32) -> bool {
        match self {
            Winding::NonZero => count != 0,
            Winding::EvenOdd => count & 1 != 0,
        }
    }
}

// ============================================================================
// Mathematical constants
// ============================================================================

pub const PI: f64 = std::f64::consts::PI;

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Normalize so that x1 <= x2 and y1 <= y2, swapping if needed.
    pub fn normalize(&mut self) -> &Self {
        if self.x1 > self.x2 {
            core::mem::swap(&mut self.x1, &mut self.x2);
        }
        if self.y1 > self.y2 {
            core::mem::swap(&mut self.y1, &mut self.y2);
        }
        self
    }

    /// Clip this rectangle to the intersection with `r`.
    /// Returns `true` if the result is a valid (non-empty) rectangle.
    pub fn clip(&mut self, r: &Self) -> bool {
        if self.x2 > r.x2 {
            self.x2 = r.x2;
        }
        if self.y2 > r.y2 {
            self.y2 = r.y2;
        }
        if self.x1 < r.x1 {
            self.x1 = r.x1;
        }
        if self.y1 < r.y1 {
            self.y1 = r.y1;
        }
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if the rectangle is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if the point (x, y) is inside the rectangle.
    pub fn hit_test(&self, x: T, y: T) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Returns `true` if this rectangle overlaps `r`.
    pub fn overlaps(&self, r: &Self) -> bool {
        !(r.x1 > self.x2 || r.x2 < self.x1 || r.y1 > self.y2 || r.y2 < self.y1)
    }

    /// Smallest rectangle containing both `self` and `r`.
    pub fn union(&self, r: &Self) -> Self {
        let pick_min = |a: T, b: T| if b < a { b } else { a };
        let pick_max = |a: T, b: T| if b > a { b } else { a };
        Self {
            x1: pick_min(self.x1, r.x1),
            y1: pick_min(self.y1, r.y1),
            x2: pick_max(self.x2, r.x2),
            y2: pick_max(self.y2, r.y2),
        }
    }
}

impl<T: Copy + Add<Output = T> + Sub<Output = T>> Rect<T> {
    /// Grow the rectangle by `m` on every side.
    pub fn expand(&self, m: T) -> Self {
        Self {
            x1: self.x1 - m,
            y1: self.y1 - m,
            x2: self.x2 + m,
            y2: self.y2 + m,
        }
    }

    pub fn width(&self) -> T {
        self.x2 - self.x1
    }

    pub fn height(&self) -> T {
        self.y2 - self.y1
    }
}

pub type RectI = Rect<i32>;
pub type RectD = Rect<f64>;

impl RectD {
    /// An inverted rectangle that any `add_point` call will replace.
    pub fn empty() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    /// Grow to include the point `(x, y)`.
    pub fn add_point(&mut self, x: f64, y: f64) {
        self.x1 = self.x1.min(x);
        self.y1 = self.y1.min(y);
        self.x2 = self.x2.max(x);
        self.y2 = self.y2.max(y);
    }

    /// Integer pixel rectangle covering this one (inclusive corners).
    pub fn to_pixels(&self) -> RectI {
        RectI::new(ifloor(self.x1), ifloor(self.y1), iceil(self.x2), iceil(self.y2))
    }
}

// ============================================================================
// Point
// ============================================================================

/// A 2D point with `f64` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl PointD {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, o: &PointD) -> f64 {
        (self.x - o.x).hypot(self.y - o.y)
    }
}

impl Add for PointD {
    type Output = PointD;
    fn add(self, o: PointD) -> PointD {
        PointD::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for PointD {
    type Output = PointD;
    fn sub(self, o: PointD) -> PointD {
        PointD::new(self.x - o.x, self.y - o.y)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iround() {
        assert_eq!(iround(0.5), 1);
        assert_eq!(iround(0.49), 0);
        assert_eq!(iround(-0.5), -1);
        assert_eq!(iround(-0.49), 0);
        assert_eq!(iround(1.5), 2);
        assert_eq!(iround(-1.5), -2);
    }

    #[test]
    fn test_ifloor() {
        assert_eq!(ifloor(1.7), 1);
        assert_eq!(ifloor(1.0), 1);
        assert_eq!(ifloor(-1.7), -2);
        assert_eq!(ifloor(-1.0), -1);
        assert_eq!(ifloor(0.0), 0);
    }

    #[test]
    fn test_fixed_round_trip() {
        assert_eq!(to_fixed(1.0), RAST_FIXED_SCALE);
        assert_eq!(to_fixed(0.5), RAST_FIXED_SCALE / 2);
        assert_eq!(from_fixed(to_fixed(3.25)), 3.25);
    }

    #[test]
    fn test_max_dimension_fits_fixed_range() {
        let edge = MAX_RASTER_DIMENSION as i64 * RAST_FIXED_SCALE as i64;
        assert!(edge * 2 < i32::MAX as i64);
    }

    #[test]
    fn test_winding_rule() {
        assert!(Winding::NonZero.is_inside(2));
        assert!(Winding::NonZero.is_inside(-1));
        assert!(!Winding::NonZero.is_inside(0));
        assert!(Winding::EvenOdd.is_inside(1));
        assert!(Winding::EvenOdd.is_inside(-3));
        assert!(!Winding::EvenOdd.is_inside(2));
        assert_eq!(Winding::default(), Winding::NonZero);
    }

    #[test]
    fn test_rect_clip() {
        let mut r = RectI::new(0, 0, 100, 100);
        let clip = RectI::new(10, 10, 50, 50);
        assert!(r.clip(&clip));
        assert_eq!(r, RectI::new(10, 10, 50, 50));

        let mut r2 = RectI::new(60, 60, 70, 70);
        assert!(!r2.clip(&clip));
    }

    #[test]
    fn test_rect_union_expand() {
        let a = RectD::new(0.0, 0.0, 1.0, 1.0);
        let b = RectD::new(-1.0, 0.5, 0.5, 3.0);
        assert_eq!(a.union(&b), RectD::new(-1.0, 0.0, 1.0, 3.0));
        assert_eq!(a.expand(2.0), RectD::new(-2.0, -2.0, 3.0, 3.0));
    }

    #[test]
    fn test_rect_add_point() {
        let mut r = RectD::empty();
        r.add_point(3.0, -1.0);
        r.add_point(-2.0, 4.0);
        assert_eq!(r, RectD::new(-2.0, -1.0, 3.0, 4.0));
        assert_eq!(r.to_pixels(), RectI::new(-2, -1, 3, 4));
    }
}
