//! Paint styles: solid colours, gradients and bitmap patterns.
//!
//! Paints are immutable descriptors. Coordinates inside a gradient or
//! bitmap paint live in paint space; the paint's `transform` maps paint
//! space into user space, and the canvas transform active at draw time maps
//! user space onto the device.

use std::f64::consts::PI;
use std::sync::Arc;

use crate::bitmap32::Bitmap32;
use crate::color::Rgba8;
use crate::trans_affine::TransAffine;

// ============================================================================
// Gradient
// ============================================================================

/// Gradient geometry in paint space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientKind {
    /// Ratio 0 at `(x0, y0)`, 1 at `(x1, y1)`, constant along perpendiculars.
    Linear { x0: f64, y0: f64, x1: f64, y1: f64 },
    /// Two-point conical gradient between circles `(x0, y0, r0)` and
    /// `(x1, y1, r1)`.
    Radial {
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    },
    /// Angle around `(x0, y0)`, starting at `start_angle` radians and
    /// increasing clockwise in a y-down system.
    Sweep { x0: f64, y0: f64, start_angle: f64 },
}

/// How ratios outside `[0, 1]` are folded back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMethod {
    #[default]
    Pad,
    Repeat,
    Reflect,
}

impl CycleMethod {
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            CycleMethod::Pad => t.clamp(0.0, 1.0),
            CycleMethod::Repeat => t - t.floor(),
            CycleMethod::Reflect => {
                let m = t.rem_euclid(2.0);
                if m > 1.0 {
                    2.0 - m
                } else {
                    m
                }
            }
        }
    }
}

/// A gradient paint.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientPaint {
    pub kind: GradientKind,
    pub stops: Vec<(f64, Rgba8)>,
    pub cycle: CycleMethod,
    pub transform: TransAffine,
}

impl GradientPaint {
    pub fn new(kind: GradientKind) -> Self {
        Self {
            kind,
            stops: Vec::new(),
            cycle: CycleMethod::Pad,
            transform: TransAffine::new(),
        }
    }

    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(GradientKind::Linear { x0, y0, x1, y1 })
    }

    pub fn radial(x0: f64, y0: f64, r0: f64, x1: f64, y1: f64, r1: f64) -> Self {
        Self::new(GradientKind::Radial {
            x0,
            y0,
            r0,
            x1,
            y1,
            r1,
        })
    }

    pub fn sweep(x0: f64, y0: f64, start_angle: f64) -> Self {
        Self::new(GradientKind::Sweep { x0, y0, start_angle })
    }

    pub fn add_color_stop(&mut self, ratio: f64, color: Rgba8) -> &mut Self {
        self.stops.push((ratio, color));
        self
    }

    pub fn with_stop(mut self, ratio: f64, color: Rgba8) -> Self {
        self.stops.push((ratio, color));
        self
    }

    pub fn with_cycle(mut self, cycle: CycleMethod) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn with_transform(mut self, transform: TransAffine) -> Self {
        self.transform = transform;
        self
    }

    /// Unfolded ratio at a paint-space point, or `None` where a radial
    /// gradient is undefined (the pixel stays transparent).
    pub fn raw_ratio(&self, x: f64, y: f64) -> Option<f64> {
        match self.kind {
            GradientKind::Linear { x0, y0, x1, y1 } => {
                let dx = x1 - x0;
                let dy = y1 - y0;
                let len2 = dx * dx + dy * dy;
                if len2 <= 0.0 {
                    return Some(0.0);
                }
                Some(((x - x0) * dx + (y - y0) * dy) / len2)
            }
            GradientKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => radial_ratio(x - x0, y - y0, x1 - x0, y1 - y0, r0, r1),
            GradientKind::Sweep { x0, y0, start_angle } => {
                let a = (y - y0).atan2(x - x0) - start_angle;
                Some(a.rem_euclid(2.0 * PI) / (2.0 * PI))
            }
        }
    }

    /// Ratio in `[0, 1]` at a paint-space point after applying the cycle
    /// method.
    pub fn ratio_in_paint_space(&self, x: f64, y: f64) -> Option<f64> {
        self.raw_ratio(x, y).map(|t| self.cycle.apply(t))
    }

    /// Ratio at a user-space point: inverse-maps through `transform` first.
    pub fn ratio_at(&self, px: f64, py: f64) -> Option<f64> {
        let inv = self.transform.inverted()?;
        let (mut x, mut y) = (px, py);
        inv.transform(&mut x, &mut y);
        self.ratio_in_paint_space(x, y)
    }
}

/// Largest `t` with `r(t) >= 0` such that the point `(px, py)` (relative to
/// the start centre) lies on the circle interpolated at `t`.
fn radial_ratio(px: f64, py: f64, cdx: f64, cdy: f64, r0: f64, r1: f64) -> Option<f64> {
    let dr = r1 - r0;
    let a = cdx * cdx + cdy * cdy - dr * dr;
    let b = px * cdx + py * cdy + r0 * dr;
    let c = px * px + py * py - r0 * r0;
    let valid = |t: f64| r0 + t * dr >= 0.0;

    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        let t = c / (2.0 * b);
        return valid(t).then_some(t);
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t1 = (b + sq) / a;
    let t2 = (b - sq) / a;
    let (hi, lo) = if t1 > t2 { (t1, t2) } else { (t2, t1) };
    if valid(hi) {
        Some(hi)
    } else if valid(lo) {
        Some(lo)
    } else {
        None
    }
}

// ============================================================================
// Bitmap pattern
// ============================================================================

/// Edge behaviour of a bitmap paint along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageWrap {
    #[default]
    Clamp,
    Repeat,
}

impl ImageWrap {
    #[inline]
    pub fn apply(self, v: f64, size: u32) -> f64 {
        match self {
            ImageWrap::Clamp => v,
            ImageWrap::Repeat => v.rem_euclid(size.max(1) as f64),
        }
    }
}

/// A bitmap pattern paint. The bitmap is shared, not copied.
#[derive(Debug, Clone)]
pub struct BitmapPaint {
    pub bitmap: Arc<Bitmap32>,
    pub transform: TransAffine,
    pub repeat_x: ImageWrap,
    pub repeat_y: ImageWrap,
    /// Bilinear when true, nearest neighbour otherwise.
    pub smooth: bool,
}

impl BitmapPaint {
    pub fn new(bitmap: Arc<Bitmap32>) -> Self {
        Self {
            bitmap,
            transform: TransAffine::new(),
            repeat_x: ImageWrap::Clamp,
            repeat_y: ImageWrap::Clamp,
            smooth: true,
        }
    }

    pub fn with_transform(mut self, transform: TransAffine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_repeat(mut self, x: ImageWrap, y: ImageWrap) -> Self {
        self.repeat_x = x;
        self.repeat_y = y;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }
}

impl PartialEq for BitmapPaint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bitmap, &other.bitmap)
            && self.transform == other.transform
            && self.repeat_x == other.repeat_x
            && self.repeat_y == other.repeat_y
            && self.smooth == other.smooth
    }
}

// ============================================================================
// Paint
// ============================================================================

/// Fill or stroke style.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Paint {
    /// Draw nothing.
    #[default]
    None,
    Color(Rgba8),
    Gradient(GradientPaint),
    Bitmap(BitmapPaint),
}

impl Paint {
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }

    /// Paint-space to user-space transform; identity for solid colours.
    pub fn transform(&self) -> TransAffine {
        match self {
            Paint::None | Paint::Color(_) => TransAffine::new(),
            Paint::Gradient(g) => g.transform,
            Paint::Bitmap(b) => b.transform,
        }
    }

    /// Short name used in logs and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Paint::None => "none",
            Paint::Color(_) => "color",
            Paint::Gradient(g) => match g.kind {
                GradientKind::Linear { .. } => "linear gradient",
                GradientKind::Radial { .. } => "radial gradient",
                GradientKind::Sweep { .. } => "sweep gradient",
            },
            Paint::Bitmap(_) => "bitmap",
        }
    }
}

impl From<Rgba8> for Paint {
    fn from(c: Rgba8) -> Self {
        Paint::Color(c)
    }
}

impl From<GradientPaint> for Paint {
    fn from(g: GradientPaint) -> Self {
        Paint::Gradient(g)
    }
}

impl From<BitmapPaint> for Paint {
    fn from(b: BitmapPaint) -> Self {
        Paint::Bitmap(b)
    }
}

// ============================================================================
// Tests
// ============================================================================
