//! Affine transformation matrix.
//!
//! The canvas state, paint styles and GPU views all carry one of these.
//! Paths are mapped to device space on insertion; paints keep their own
//! matrix and are inverse-mapped per pixel by the fillers.

use crate::basics::PointD;

/// Epsilon for affine matrix comparisons.
pub const AFFINE_EPSILON: f64 = 1e-14;

/// 2D affine transformation matrix.
///
/// Stores six components: `[sx, shy, shx, sy, tx, ty]` representing the
/// matrix:
///
/// ```text
///   | sx  shx tx |
///   | shy  sy ty |
///   |  0    0  1 |
/// ```
///
/// Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
#[derive(Debug, Clone, Copy)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TransAffine {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Identity matrix.
    pub const fn new() -> Self {
        Self {
            sx: 1.0,
            shy: 0.0,
            shx: 0.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Custom matrix from six components.
    pub const fn new_custom(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    /// Rotation matrix (radians).
    pub fn new_rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new_custom(ca, sa, -sa, ca, 0.0, 0.0)
    }

    /// Non-uniform scaling matrix.
    pub const fn new_scaling(x: f64, y: f64) -> Self {
        Self::new_custom(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    /// Translation matrix.
    pub const fn new_translation(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, x, y)
    }

    // ====================================================================
    // Operations (mutate self)
    // ====================================================================

    /// Reset to identity.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    /// Post-multiply: `self = self * m` (apply `self`, then `m`).
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Pre-multiply: `self = m * self` (apply `m`, then `self`).
    pub fn premultiply(&mut self, m: &TransAffine) -> &mut Self {
        let mut t = *m;
        t.multiply(self);
        *self = t;
        self
    }

    /// Apply a translation before the current transform (canvas `translate`).
    pub fn pre_translate(&mut self, x: f64, y: f64) -> &mut Self {
        self.premultiply(&Self::new_translation(x, y))
    }

    /// Apply a scale before the current transform (canvas `scale`).
    pub fn pre_scale(&mut self, x: f64, y: f64) -> &mut Self {
        self.premultiply(&Self::new_scaling(x, y))
    }

    /// Apply a rotation before the current transform (canvas `rotate`).
    pub fn pre_rotate(&mut self, a: f64) -> &mut Self {
        self.premultiply(&Self::new_rotation(a))
    }

    /// Invert the matrix in place. A singular matrix becomes non-finite.
    pub fn invert(&mut self) -> &mut Self {
        let d = self.determinant_reciprocal();
        let t0 = self.sy * d;
        self.sy = self.sx * d;
        self.shy = -self.shy * d;
        self.shx = -self.shx * d;
        let t4 = -self.tx * t0 - self.ty * self.shx;
        self.ty = -self.tx * self.shy - self.ty * self.sy;
        self.sx = t0;
        self.tx = t4;
        self
    }

    /// Inverted copy, or `None` when the matrix is singular.
    pub fn inverted(&self) -> Option<TransAffine> {
        if self.determinant().abs() <= AFFINE_EPSILON {
            return None;
        }
        let mut t = *self;
        t.invert();
        Some(t)
    }

    // ====================================================================
    // Transformations
    // ====================================================================

    /// Forward transform: `(x, y) -> (x', y')`.
    #[inline]
    pub fn transform(&self, x: &mut f64, y: &mut f64) {
        let tmp = *x;
        *x = tmp * self.sx + *y * self.shx + self.tx;
        *y = tmp * self.shy + *y * self.sy + self.ty;
    }

    /// Forward transform of a point by value.
    #[inline]
    pub fn transform_point(&self, p: PointD) -> PointD {
        PointD::new(
            p.x * self.sx + p.y * self.shx + self.tx,
            p.x * self.shy + p.y * self.sy + self.ty,
        )
    }

    /// Inverse transform: `(x', y') -> (x, y)`.
    #[inline]
    pub fn inverse_transform(&self, x: &mut f64, y: &mut f64) {
        let d = self.determinant_reciprocal();
        let a = (*x - self.tx) * d;
        let b = (*y - self.ty) * d;
        *x = a * self.sy - b * self.shx;
        *y = b * self.sx - a * self.shy;
    }

    // ====================================================================
    // Auxiliary
    // ====================================================================

    /// Determinant of the 2x2 portion.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    /// Reciprocal of the determinant.
    #[inline]
    pub fn determinant_reciprocal(&self) -> f64 {
        1.0 / (self.sx * self.sy - self.shy * self.shx)
    }

    /// Length of the transformed unit x and y axes.
    pub fn scaling_abs(&self) -> (f64, f64) {
        (self.sx.hypot(self.shy), self.shx.hypot(self.sy))
    }

    /// Mean of the two axis scales; stroke widths are multiplied by this.
    pub fn scale_avg(&self) -> f64 {
        let (x, y) = self.scaling_abs();
        (x + y) * 0.5
    }

    /// Check if this is an identity matrix.
    pub fn is_identity(&self) -> bool {
        self.is_equal(&Self::new(), AFFINE_EPSILON)
    }

    /// Check if two matrices are equal within epsilon.
    pub fn is_equal(&self, m: &TransAffine, epsilon: f64) -> bool {
        let eq = |a: f64, b: f64| (a - b).abs() <= epsilon;
        eq(self.sx, m.sx)
            && eq(self.shy, m.shy)
            && eq(self.shx, m.shx)
            && eq(self.sy, m.sy)
            && eq(self.tx, m.tx)
            && eq(self.ty, m.ty)
    }
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TransAffine {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other, AFFINE_EPSILON)
    }
}

impl std::ops::Mul for TransAffine {
    type Output = TransAffine;
    fn mul(self, rhs: TransAffine) -> TransAffine {
        let mut result = self;
        result.multiply(&rhs);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================
