//! 32-bit RGBA bitmap.
//!
//! Pixels are stored as four bytes in RGBA order. A bitmap is either
//! premultiplied (stored values are `PremulRgba8`) or straight (`Rgba8`);
//! the flag only changes how stored words are interpreted. All compositing
//! works on premultiplied rows, so the row accessors convert at this
//! boundary and nowhere else.

use crate::basics::RectI;
use crate::color::{depremultiply_in_place, premultiply_in_place, PremulRgba8, Rgba8};
use crate::error::{RenderError, RenderResult};

/// Owned RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap32 {
    width: u32,
    height: u32,
    premultiplied: bool,
    data: Vec<Rgba8>,
}

impl Bitmap32 {
    /// Transparent bitmap of the given size.
    pub fn new(width: u32, height: u32, premultiplied: bool) -> Self {
        Self {
            width,
            height,
            premultiplied,
            data: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Wrap straight-alpha pixels.
    pub fn from_rgba(width: u32, height: u32, data: Vec<Rgba8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RenderError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            premultiplied: false,
            data,
        })
    }

    /// Build from a tightly packed RGBA byte buffer (straight alpha).
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(RenderError::DimensionMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| Rgba8::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::from_rgba(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn premultiplied(&self) -> bool {
        self.premultiplied
    }

    pub fn area(&self) -> usize {
        self.data.len()
    }

    /// Stored pixel words, interpreted according to [`Bitmap32::premultiplied`].
    pub fn raw(&self) -> &[Rgba8] {
        &self.data
    }

    pub fn raw_mut(&mut self) -> &mut [Rgba8] {
        &mut self.data
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    // ====================================================================
    // Single pixel access
    // ====================================================================

    /// Straight colour at `(x, y)`; transparent outside the bitmap.
    pub fn get_rgba(&self, x: i32, y: i32) -> Rgba8 {
        if !self.in_bounds(x, y) {
            return Rgba8::TRANSPARENT;
        }
        let v = self.data[self.index(x, y)];
        if self.premultiplied {
            bytemuck::cast::<Rgba8, PremulRgba8>(v).depremultiplied()
        } else {
            v
        }
    }

    pub fn set_rgba(&mut self, x: i32, y: i32, c: Rgba8) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.index(x, y);
        self.data[i] = if self.premultiplied {
            bytemuck::cast(c.premultiplied())
        } else {
            c
        };
    }

    /// Premultiplied colour at `(x, y)`; transparent outside the bitmap.
    pub fn get_premul(&self, x: i32, y: i32) -> PremulRgba8 {
        if !self.in_bounds(x, y) {
            return PremulRgba8::TRANSPARENT;
        }
        let v = self.data[self.index(x, y)];
        if self.premultiplied {
            bytemuck::cast(v)
        } else {
            v.premultiplied()
        }
    }

    pub fn set_premul(&mut self, x: i32, y: i32, c: PremulRgba8) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.index(x, y);
        self.data[i] = if self.premultiplied {
            bytemuck::cast(c)
        } else {
            c.depremultiplied()
        };
    }

    // ====================================================================
    // Row access
    // ====================================================================

    /// Read `out.len()` pixels of row `y` starting at `x0` as premultiplied.
    /// The run must lie inside the bitmap.
    pub fn read_row_premul(&self, y: i32, x0: i32, out: &mut [PremulRgba8]) {
        let start = self.index(x0, y);
        let src = &self.data[start..start + out.len()];
        if self.premultiplied {
            out.copy_from_slice(bytemuck::cast_slice(src));
        } else {
            for (o, s) in out.iter_mut().zip(src) {
                *o = s.premultiplied();
            }
        }
    }

    /// Write premultiplied pixels into row `y` starting at `x0`, converting
    /// to the stored format. The run must lie inside the bitmap.
    pub fn write_row_premul(&mut self, y: i32, x0: i32, src: &[PremulRgba8]) {
        let start = self.index(x0, y);
        let premultiplied = self.premultiplied;
        let dst = &mut self.data[start..start + src.len()];
        if premultiplied {
            dst.copy_from_slice(bytemuck::cast_slice(src));
        } else {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = s.depremultiplied();
            }
        }
    }

    // ====================================================================
    // Bulk operations
    // ====================================================================

    /// Set every pixel to `c`.
    pub fn fill(&mut self, c: Rgba8) {
        let v = if self.premultiplied {
            bytemuck::cast(c.premultiplied())
        } else {
            c
        };
        self.data.fill(v);
    }

    /// Set every pixel inside the inclusive rectangle to `c`.
    pub fn fill_rect(&mut self, rect: RectI, c: Rgba8) {
        let mut r = rect;
        r.normalize();
        let bounds = RectI::new(0, 0, self.width as i32 - 1, self.height as i32 - 1);
        if !r.clip(&bounds) {
            return;
        }
        let v = if self.premultiplied {
            bytemuck::cast(c.premultiplied())
        } else {
            c
        };
        for y in r.y1..=r.y2 {
            let start = self.index(r.x1, y);
            let end = self.index(r.x2, y) + 1;
            self.data[start..end].fill(v);
        }
    }

    /// Convert stored pixels to premultiplied form if they are not already.
    pub fn premultiply_in_place_if_required(&mut self) {
        if self.premultiplied {
            return;
        }
        premultiply_in_place(&mut self.data);
        self.premultiplied = true;
    }

    /// Convert stored pixels to straight alpha if they are premultiplied.
    pub fn depremultiply_in_place_if_required(&mut self) {
        if !self.premultiplied {
            return;
        }
        depremultiply_in_place(bytemuck::cast_slice_mut(&mut self.data));
        self.premultiplied = false;
    }

    /// Straight-alpha RGBA bytes, row-major.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let c = self.get_rgba(x, y);
                out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        out
    }

    /// Same size and same straight colours, regardless of storage format.
    pub fn content_equals(&self, other: &Bitmap32) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        if self.premultiplied == other.premultiplied {
            return self.data == other.data;
        }
        (0..self.height as i32).all(|y| {
            (0..self.width as i32).all(|x| self.get_premul(x, y) == other.get_premul(x, y))
        })
    }

    // ====================================================================
    // Sampling
    // ====================================================================

    /// Nearest pixel to the continuous point `(x, y)`, clamped to the edges.
    pub fn sample_nearest(&self, x: f64, y: f64) -> PremulRgba8 {
        if self.data.is_empty() {
            return PremulRgba8::TRANSPARENT;
        }
        let px = (x.floor() as i32).clamp(0, self.width as i32 - 1);
        let py = (y.floor() as i32).clamp(0, self.height as i32 - 1);
        self.get_premul(px, py)
    }

    /// Bilinear sample around `(x, y)` with pixel centres at `i + 0.5`,
    /// clamped to the edges.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> PremulRgba8 {
        if self.data.is_empty() {
            return PremulRgba8::TRANSPARENT;
        }
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (w, h) = (self.width as i32 - 1, self.height as i32 - 1);
        let xi0 = (x0 as i32).clamp(0, w);
        let yi0 = (y0 as i32).clamp(0, h);
        let xi1 = (x0 as i32 + 1).clamp(0, w);
        let yi1 = (y0 as i32 + 1).clamp(0, h);

        let c00 = self.get_premul(xi0, yi0).to_f64();
        let c10 = self.get_premul(xi1, yi0).to_f64();
        let c01 = self.get_premul(xi0, yi1).to_f64();
        let c11 = self.get_premul(xi1, yi1).to_f64();
        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        PremulRgba8::from_f64(out[0], out[1], out[2], out[3])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let b = Bitmap32::new(3, 2, true);
        assert_eq!(b.area(), 6);
        assert!(b.raw().iter().all(|p| *p == Rgba8::TRANSPARENT));
    }

    #[test]
    fn test_get_set_convert() {
        let mut b = Bitmap32::new(2, 2, true);
        b.set_rgba(1, 1, Rgba8::new(255, 0, 0, 128));
        assert_eq!(b.get_premul(1, 1), PremulRgba8::new(128, 0, 0, 128));
        assert_eq!(b.get_rgba(1, 1), Rgba8::new(255, 0, 0, 128));
        // Out of range reads are transparent, writes ignored.
        b.set_rgba(5, 5, Rgba8::WHITE);
        assert_eq!(b.get_rgba(-1, 0), Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_row_round_trip_straight() {
        let mut b = Bitmap32::new(4, 1, false);
        let row = [PremulRgba8::new(100, 50, 0, 200), PremulRgba8::new(0, 0, 0, 0)];
        b.write_row_premul(0, 1, &row);
        let mut out = [PremulRgba8::TRANSPARENT; 2];
        b.read_row_premul(0, 1, &mut out);
        for (a, e) in out.iter().zip(&row) {
            assert!((a.r as i32 - e.r as i32).abs() <= 1);
            assert_eq!(a.a, e.a);
        }
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut b = Bitmap32::new(4, 4, false);
        b.fill_rect(RectI::new(2, 2, 10, 10), Rgba8::RED);
        assert_eq!(b.get_rgba(3, 3), Rgba8::RED);
        assert_eq!(b.get_rgba(1, 3), Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_premultiply_toggle_and_content_equals() {
        let mut a = Bitmap32::new(2, 1, false);
        a.set_rgba(0, 0, Rgba8::new(200, 100, 50, 255));
        a.set_rgba(1, 0, Rgba8::new(0, 255, 0, 255));
        let b = a.clone();
        a.premultiply_in_place_if_required();
        assert!(a.premultiplied());
        assert!(a.content_equals(&b));
        a.depremultiply_in_place_if_required();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rgba_bytes() {
        let mut b = Bitmap32::new(1, 1, true);
        b.fill(Rgba8::new(10, 20, 30, 255));
        assert_eq!(b.to_rgba_bytes(), vec![10, 20, 30, 255]);
        let c = Bitmap32::from_rgba_bytes(1, 1, &[10, 20, 30, 255]).unwrap();
        assert!(c.content_equals(&b));
        assert!(Bitmap32::from_rgba_bytes(2, 1, &[0; 4]).is_err());
    }

    #[test]
    fn test_sampling() {
        let mut b = Bitmap32::new(2, 1, true);
        b.set_rgba(0, 0, Rgba8::BLACK);
        b.set_rgba(1, 0, Rgba8::WHITE);
        assert_eq!(b.sample_nearest(1.7, 0.2), PremulRgba8::new(255, 255, 255, 255));
        let mid = b.sample_bilinear(1.0, 0.5);
        assert!((mid.r as i32 - 128).abs() <= 1);
        assert_eq!(b.sample_bilinear(0.5, 0.5), PremulRgba8::new(0, 0, 0, 255));
    }
}
