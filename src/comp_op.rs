//! Porter-Duff compositing and W3C blend modes over premultiplied pixels.
//!
//! `CompositeOperation` is a stateless selector applied in bulk to two
//! premultiplied runs of equal length: `dst = op(dst, src)`. The common
//! modes (`SourceOver`, `Source`, `Destination`, `Clear`) have exact integer
//! paths; everything else goes through an f64 premultiplied working space
//! and is clamped back to bytes, so no channel can overflow or wrap.

use core::fmt;
use core::str::FromStr;

use crate::color::{mul_u8, PremulRgba8};

// ============================================================================
// Modes
// ============================================================================

/// Porter-Duff compositing operators (plus `Lighter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeMode {
    Clear,
    Source,
    Destination,
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Xor,
    Lighter,
}

/// Separable and non-separable blend modes from W3C Compositing and Blending Level 1,
/// plus the additive `Add` and `Subtract` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Add,
    Subtract,
}

/// A compositing operator or a blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeOperation {
    Composite(CompositeMode),
    Blend(BlendMode),
}

impl Default for CompositeOperation {
    fn default() -> Self {
        CompositeOperation::SOURCE_OVER
    }
}

impl From<CompositeMode> for CompositeOperation {
    fn from(m: CompositeMode) -> Self {
        CompositeOperation::Composite(m)
    }
}

impl From<BlendMode> for CompositeOperation {
    fn from(m: BlendMode) -> Self {
        CompositeOperation::Blend(m)
    }
}

const NAMES: &[(&str, CompositeOperation)] = &[
    ("clear", CompositeOperation::Composite(CompositeMode::Clear)),
    ("copy", CompositeOperation::Composite(CompositeMode::Source)),
    ("destination", CompositeOperation::Composite(CompositeMode::Destination)),
    ("source-over", CompositeOperation::Composite(CompositeMode::SourceOver)),
    ("source-in", CompositeOperation::Composite(CompositeMode::SourceIn)),
    ("source-out", CompositeOperation::Composite(CompositeMode::SourceOut)),
    ("source-atop", CompositeOperation::Composite(CompositeMode::SourceAtop)),
    ("destination-over", CompositeOperation::Composite(CompositeMode::DestinationOver)),
    ("destination-in", CompositeOperation::Composite(CompositeMode::DestinationIn)),
    ("destination-out", CompositeOperation::Composite(CompositeMode::DestinationOut)),
    ("destination-atop", CompositeOperation::Composite(CompositeMode::DestinationAtop)),
    ("xor", CompositeOperation::Composite(CompositeMode::Xor)),
    ("lighter", CompositeOperation::Composite(CompositeMode::Lighter)),
    ("normal", CompositeOperation::Blend(BlendMode::Normal)),
    ("multiply", CompositeOperation::Blend(BlendMode::Multiply)),
    ("screen", CompositeOperation::Blend(BlendMode::Screen)),
    ("overlay", CompositeOperation::Blend(BlendMode::Overlay)),
    ("darken", CompositeOperation::Blend(BlendMode::Darken)),
    ("lighten", CompositeOperation::Blend(BlendMode::Lighten)),
    ("color-dodge", CompositeOperation::Blend(BlendMode::ColorDodge)),
    ("color-burn", CompositeOperation::Blend(BlendMode::ColorBurn)),
    ("hard-light", CompositeOperation::Blend(BlendMode::HardLight)),
    ("soft-light", CompositeOperation::Blend(BlendMode::SoftLight)),
    ("difference", CompositeOperation::Blend(BlendMode::Difference)),
    ("exclusion", CompositeOperation::Blend(BlendMode::Exclusion)),
    ("hue", CompositeOperation::Blend(BlendMode::Hue)),
    ("saturation", CompositeOperation::Blend(BlendMode::Saturation)),
    ("color", CompositeOperation::Blend(BlendMode::Color)),
    ("luminosity", CompositeOperation::Blend(BlendMode::Luminosity)),
    ("add", CompositeOperation::Blend(BlendMode::Add)),
    ("subtract", CompositeOperation::Blend(BlendMode::Subtract)),
];

impl CompositeOperation {
    pub const SOURCE_OVER: CompositeOperation =
        CompositeOperation::Composite(CompositeMode::SourceOver);

    /// Every operation, in a stable order.
    pub fn all() -> impl Iterator<Item = CompositeOperation> {
        NAMES.iter().map(|(_, op)| *op)
    }

    /// Canvas-style name (`"source-over"`, `"multiply"`, ...).
    pub fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, op)| op == self)
            .map_or("source-over", |(n, _)| n)
    }

    /// Source-over and normal produce identical results.
    pub fn is_source_over(&self) -> bool {
        matches!(
            self,
            CompositeOperation::Composite(CompositeMode::SourceOver)
                | CompositeOperation::Blend(BlendMode::Normal)
        )
    }

    /// Blend `src` into `dst` element-wise. Extra elements in the longer
    /// slice are ignored.
    pub fn blend(&self, dst: &mut [PremulRgba8], src: &[PremulRgba8]) {
        let n = dst.len().min(src.len());
        let (dst, src) = (&mut dst[..n], &src[..n]);
        match *self {
            CompositeOperation::Composite(CompositeMode::SourceOver)
            | CompositeOperation::Blend(BlendMode::Normal) => {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = source_over(*d, *s);
                }
            }
            CompositeOperation::Composite(CompositeMode::Source) => dst.copy_from_slice(src),
            CompositeOperation::Composite(CompositeMode::Destination) => {}
            CompositeOperation::Composite(CompositeMode::Clear) => {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = clear(*d, *s);
                }
            }
            op => {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = op.blend_float(*d, *s);
                }
            }
        }
    }

    /// Blend `count` pixels of `src` starting at `src_n` into `dst`
    /// starting at `dst_n`.
    pub fn blend_at(
        &self,
        dst: &mut [PremulRgba8],
        dst_n: usize,
        src: &[PremulRgba8],
        src_n: usize,
        count: usize,
    ) {
        self.blend(&mut dst[dst_n..dst_n + count], &src[src_n..src_n + count]);
    }

    /// Blend a single pixel.
    pub fn blend_pixel(&self, d: PremulRgba8, s: PremulRgba8) -> PremulRgba8 {
        match *self {
            CompositeOperation::Composite(CompositeMode::SourceOver)
            | CompositeOperation::Blend(BlendMode::Normal) => source_over(d, s),
            CompositeOperation::Composite(CompositeMode::Source) => s,
            CompositeOperation::Composite(CompositeMode::Destination) => d,
            CompositeOperation::Composite(CompositeMode::Clear) => clear(d, s),
            op => op.blend_float(d, s),
        }
    }

    fn blend_float(&self, d: PremulRgba8, s: PremulRgba8) -> PremulRgba8 {
        let d = Px::from(d);
        let s = Px::from(s);
        let out = match *self {
            CompositeOperation::Composite(m) => composite(m, d, s),
            CompositeOperation::Blend(m) => blend(m, d, s),
        };
        out.to_premul()
    }
}

impl fmt::Display for CompositeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompositeOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(s))
            .map(|(_, op)| *op)
            .ok_or_else(|| format!("unknown composite operation '{s}'"))
    }
}

// ============================================================================
// Integer paths
// ============================================================================

// Dca' = Sca + Dca.(1 - Sa)
#[inline]
fn source_over(d: PremulRgba8, s: PremulRgba8) -> PremulRgba8 {
    match s.a {
        255 => s,
        0 if s.r == 0 && s.g == 0 && s.b == 0 => d,
        _ => {
            let k = 255 - s.a;
            PremulRgba8::new(
                s.r.saturating_add(mul_u8(d.r, k)),
                s.g.saturating_add(mul_u8(d.g, k)),
                s.b.saturating_add(mul_u8(d.b, k)),
                s.a.saturating_add(mul_u8(d.a, k)),
            )
        }
    }
}

// Da' = max(Da - Sa, 0), colour scaled by Da'/Da.
#[inline]
fn clear(d: PremulRgba8, s: PremulRgba8) -> PremulRgba8 {
    let na = d.a.saturating_sub(s.a);
    if na == 0 || d.a == 0 {
        return PremulRgba8::TRANSPARENT;
    }
    let scale = |c: u8| ((c as u32 * na as u32 + d.a as u32 / 2) / d.a as u32).min(na as u32) as u8;
    PremulRgba8::new(scale(d.r), scale(d.g), scale(d.b), na)
}

// ============================================================================
// Premultiplied f64 working space
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Px {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
}

impl From<PremulRgba8> for Px {
    fn from(c: PremulRgba8) -> Self {
        let [r, g, b, a] = c.to_f64();
        Px { r, g, b, a }
    }
}

impl Px {
    fn to_premul(self) -> PremulRgba8 {
        PremulRgba8::from_f64(self.r, self.g, self.b, self.a)
    }

    fn rgb(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Straight colour, or black for fully transparent pixels.
    fn unpremul(&self) -> [f64; 3] {
        if self.a <= 0.0 {
            [0.0; 3]
        } else {
            [self.r / self.a, self.g / self.a, self.b / self.a].map(|c| c.clamp(0.0, 1.0))
        }
    }
}

fn composite(mode: CompositeMode, d: Px, s: Px) -> Px {
    let d1a = 1.0 - d.a;
    let s1a = 1.0 - s.a;
    let per = |f: &dyn Fn(f64, f64) -> f64, a: f64| Px {
        r: f(s.r, d.r),
        g: f(s.g, d.g),
        b: f(s.b, d.b),
        a,
    };
    match mode {
        CompositeMode::Clear => {
            let na = (d.a - s.a).max(0.0);
            let k = if d.a > 0.0 { na / d.a } else { 0.0 };
            per(&|_, dc| dc * k, na)
        }
        CompositeMode::Source => s,
        CompositeMode::Destination => d,
        CompositeMode::SourceOver => per(&|sc, dc| sc + dc * s1a, s.a + d.a * s1a),
        CompositeMode::SourceIn => per(&|sc, _| sc * d.a, s.a * d.a),
        CompositeMode::SourceOut => per(&|sc, _| sc * d1a, s.a * d1a),
        CompositeMode::SourceAtop => per(&|sc, dc| sc * d.a + dc * s1a, d.a),
        CompositeMode::DestinationOver => per(&|sc, dc| dc + sc * d1a, d.a + s.a * d1a),
        CompositeMode::DestinationIn => per(&|_, dc| dc * s.a, d.a * s.a),
        CompositeMode::DestinationOut => per(&|_, dc| dc * s1a, d.a * s1a),
        CompositeMode::DestinationAtop => per(&|sc, dc| dc * s.a + sc * d1a, s.a),
        CompositeMode::Xor => per(&|sc, dc| sc * d1a + dc * s1a, s.a * d1a + d.a * s1a),
        CompositeMode::Lighter => per(&|sc, dc| (sc + dc).min(1.0), (s.a + d.a).min(1.0)),
    }
}

fn blend(mode: BlendMode, d: Px, s: Px) -> Px {
    let ra = s.a + d.a - s.a * d.a;
    match mode {
        BlendMode::Normal => composite(CompositeMode::SourceOver, d, s),
        BlendMode::Add => composite(CompositeMode::Lighter, d, s),
        BlendMode::Subtract => Px {
            r: (d.r - s.r).max(0.0),
            g: (d.g - s.g).max(0.0),
            b: (d.b - s.b).max(0.0),
            a: ra,
        },
        BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity => {
            let cs = s.unpremul();
            let cb = d.unpremul();
            let mixed = match mode {
                BlendMode::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
                BlendMode::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
                BlendMode::Color => set_lum(cs, lum(cb)),
                _ => set_lum(cb, lum(cs)),
            };
            let sc = s.rgb();
            let dc = d.rgb();
            let ch = |i: usize| sc[i] * (1.0 - d.a) + dc[i] * (1.0 - s.a) + s.a * d.a * mixed[i];
            Px {
                r: ch(0),
                g: ch(1),
                b: ch(2),
                a: ra,
            }
        }
        _ => {
            let f = separable(mode);
            let ch = |sc: f64, dc: f64| {
                let cs = if s.a > 0.0 { (sc / s.a).min(1.0) } else { 0.0 };
                let cb = if d.a > 0.0 { (dc / d.a).min(1.0) } else { 0.0 };
                sc * (1.0 - d.a) + dc * (1.0 - s.a) + s.a * d.a * f(cb, cs)
            };
            Px {
                r: ch(s.r, d.r),
                g: ch(s.g, d.g),
                b: ch(s.b, d.b),
                a: ra,
            }
        }
    }
}

/// Separable blend function `B(cb, cs)` on straight colour channels.
fn separable(mode: BlendMode) -> fn(f64, f64) -> f64 {
    match mode {
        BlendMode::Multiply => |cb, cs| cb * cs,
        BlendMode::Screen => screen,
        BlendMode::Overlay => |cb, cs| hard_light(cs, cb),
        BlendMode::Darken => f64::min,
        BlendMode::Lighten => f64::max,
        BlendMode::ColorDodge => |cb, cs| {
            if cb <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        },
        BlendMode::ColorBurn => |cb, cs| {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        },
        BlendMode::HardLight => hard_light,
        BlendMode::SoftLight => |cb, cs| {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let dd = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (dd - cb)
            }
        },
        BlendMode::Difference => |cb, cs| (cb - cs).abs(),
        BlendMode::Exclusion => |cb, cs| cb + cs - 2.0 * cb * cs,
        _ => |_, cs| cs,
    }
}

fn screen(cb: f64, cs: f64) -> f64 {
    cb + cs - cb * cs
}

fn hard_light(cb: f64, cs: f64) -> f64 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        screen(cb, 2.0 * cs - 1.0)
    }
}

// ---- Non-separable helpers

fn lum(c: [f64; 3]) -> f64 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f64; 3]) -> [f64; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 && l - n > 0.0 {
        out = out.map(|v| l + (v - l) * l / (l - n));
    }
    if x > 1.0 && x - l > 0.0 {
        out = out.map(|v| l + (v - l) * (1.0 - l) / (x - l));
    }
    out
}

fn set_lum(c: [f64; 3], l: f64) -> [f64; 3] {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn sat(c: [f64; 3]) -> f64 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f64; 3], s: f64) -> [f64; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    if max <= min {
        return [0.0; 3];
    }
    c.map(|v| (v - min) * s / (max - min))
}

// ============================================================================
// Tests
// ============================================================================
