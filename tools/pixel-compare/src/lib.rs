// Pixel comparison library for korge-raster scenes.
//
// Provides RGBA buffers, comparison statistics, diff images, and BMP/raw I/O.

use std::fs::File;
use std::io::{self, Read as IoRead, Write as IoWrite};
use std::path::Path;

use korge_raster::Bitmap32;

pub mod scenes;

// ============================================================================
// Pixel Buffer
// ============================================================================

/// Straight-alpha RGBA pixels, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn from_bitmap(bitmap: &Bitmap32) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            data: bitmap.to_rgba_bytes(),
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, p: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&p);
    }

    fn same_size(&self, other: &PixelBuffer) -> io::Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "size mismatch: {}x{} vs {}x{}",
                    self.width, self.height, other.width, other.height
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Comparison
// ============================================================================

#[derive(Debug, Clone)]
pub struct DiffInfo {
    pub x: u32,
    pub y: u32,
    pub pixel_a: [u8; 4],
    pub pixel_b: [u8; 4],
}

/// Statistics of a two-buffer comparison.
#[derive(Debug, Clone)]
pub struct CompareResult {
    pub total_pixels: u64,
    /// Pixels differing by at least 1 in any channel.
    pub different_pixels: u64,
    pub max_channel_diff: u8,
    /// Mean absolute channel difference over all channels of all pixels.
    pub mean_channel_diff: f64,
    /// Sum of alpha over each buffer, in pixels of full coverage.
    pub coverage_a: f64,
    pub coverage_b: f64,
    pub first_diff: Option<DiffInfo>,
    /// Count of channels per absolute difference.
    pub diff_histogram: [u64; 256],
}

impl CompareResult {
    pub fn identical(&self) -> bool {
        self.different_pixels == 0
    }

    /// Backends agree when the mean difference stays under `tolerance`
    /// (0..255 scale) and total coverage differs by under 5%.
    pub fn similar(&self, tolerance: f64) -> bool {
        let cov = self.coverage_a.max(self.coverage_b);
        let cov_ok = cov == 0.0 || (self.coverage_a - self.coverage_b).abs() / cov < 0.05;
        self.mean_channel_diff <= tolerance && cov_ok
    }
}

impl std::fmt::Display for CompareResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.identical() {
            return write!(f, "IDENTICAL: {} pixels match", self.total_pixels);
        }
        write!(
            f,
            "DIFFERENT: {}/{} pixels differ ({:.2}%), max_diff={}, mean_diff={:.4}, coverage {:.1} vs {:.1}",
            self.different_pixels,
            self.total_pixels,
            self.different_pixels as f64 / self.total_pixels.max(1) as f64 * 100.0,
            self.max_channel_diff,
            self.mean_channel_diff,
            self.coverage_a,
            self.coverage_b,
        )?;
        if let Some(d) = &self.first_diff {
            write!(f, "\n  first diff at ({}, {}): A={:?} B={:?}", d.x, d.y, d.pixel_a, d.pixel_b)?;
        }
        Ok(())
    }
}

pub fn compare_buffers(a: &PixelBuffer, b: &PixelBuffer) -> io::Result<CompareResult> {
    a.same_size(b)?;
    let mut r = CompareResult {
        total_pixels: a.width as u64 * a.height as u64,
        different_pixels: 0,
        max_channel_diff: 0,
        mean_channel_diff: 0.0,
        coverage_a: 0.0,
        coverage_b: 0.0,
        first_diff: None,
        diff_histogram: [0; 256],
    };
    let mut sum = 0u64;
    for y in 0..a.height {
        for x in 0..a.width {
            let (pa, pb) = (a.pixel(x, y), b.pixel(x, y));
            r.coverage_a += pa[3] as f64 / 255.0;
            r.coverage_b += pb[3] as f64 / 255.0;
            let mut differs = false;
            for c in 0..4 {
                let d = pa[c].abs_diff(pb[c]);
                r.diff_histogram[d as usize] += 1;
                sum += d as u64;
                r.max_channel_diff = r.max_channel_diff.max(d);
                differs |= d > 0;
            }
            if differs {
                r.different_pixels += 1;
                if r.first_diff.is_none() {
                    r.first_diff = Some(DiffInfo {
                        x,
                        y,
                        pixel_a: pa,
                        pixel_b: pb,
                    });
                }
            }
        }
    }
    r.mean_channel_diff = sum as f64 / (r.total_pixels.max(1) * 4) as f64;
    Ok(r)
}

/// Dark grey where equal, red scaled by the difference (x10) elsewhere.
pub fn generate_diff_image(a: &PixelBuffer, b: &PixelBuffer) -> io::Result<PixelBuffer> {
    a.same_size(b)?;
    let mut out = PixelBuffer::new(a.width, a.height);
    for y in 0..a.height {
        for x in 0..a.width {
            let (pa, pb) = (a.pixel(x, y), b.pixel(x, y));
            let d = (0..4).map(|c| pa[c].abs_diff(pb[c])).max().unwrap_or(0);
            let p = if d == 0 {
                [40, 40, 40, 255]
            } else {
                [(d as u16 * 10).min(255) as u8, 0, 0, 255]
            };
            out.set_pixel(x, y, p);
        }
    }
    Ok(out)
}

/// `[A | diff | B]`.
pub fn generate_sidebyside(a: &PixelBuffer, b: &PixelBuffer) -> io::Result<PixelBuffer> {
    let diff = generate_diff_image(a, b)?;
    let mut out = PixelBuffer::new(a.width * 3, a.height);
    for (panel, src) in [a, &diff, b].into_iter().enumerate() {
        for y in 0..a.height {
            for x in 0..a.width {
                out.set_pixel(panel as u32 * a.width + x, y, src.pixel(x, y));
            }
        }
    }
    Ok(out)
}

// ============================================================================
// BMP I/O (32-bit BGRA, top-down)
// ============================================================================

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

pub fn save_bmp(path: &Path, buf: &PixelBuffer) -> io::Result<()> {
    let image_size = buf.width * buf.height * 4;
    let mut out = Vec::with_capacity(54 + image_size as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(54 + image_size).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(buf.width as i32).to_le_bytes());
    out.extend_from_slice(&(-(buf.height as i32)).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&image_size.to_le_bytes());
    out.extend_from_slice(&[0; 16]);
    for px in buf.data.chunks_exact(4) {
        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
    File::create(path)?.write_all(&out)
}

/// Reads 24- and 32-bit uncompressed BMPs in either row order.
pub fn load_bmp(path: &Path) -> io::Result<PixelBuffer> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    if data.len() < 54 || &data[0..2] != b"BM" {
        return Err(invalid("not a BMP file"));
    }
    let u32_at = |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    let pixel_offset = u32_at(10) as usize;
    let w = u32_at(18) as i32;
    let h = u32_at(22) as i32;
    let bytes_pp = u16::from_le_bytes([data[28], data[29]]) as usize / 8;
    if bytes_pp != 3 && bytes_pp != 4 {
        return Err(invalid(format!("unsupported BMP depth: {} bits", bytes_pp * 8)));
    }
    let (width, height) = (w.unsigned_abs(), h.unsigned_abs());
    let stride = (width as usize * bytes_pp + 3) / 4 * 4;
    if data.len() < pixel_offset + stride * height as usize {
        return Err(invalid("truncated BMP pixel data"));
    }

    let mut buf = PixelBuffer::new(width, height);
    for y in 0..height {
        let src_y = if h < 0 { y } else { height - 1 - y };
        let row = pixel_offset + src_y as usize * stride;
        for x in 0..width {
            let s = row + x as usize * bytes_pp;
            let a = if bytes_pp == 4 { data[s + 3] } else { 255 };
            buf.set_pixel(x, y, [data[s + 2], data[s + 1], data[s], a]);
        }
    }
    Ok(buf)
}

// ============================================================================
// Raw RGBA I/O: [width:u32][height:u32][rgba...]
// ============================================================================

pub fn save_raw(path: &Path, buf: &PixelBuffer) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(&buf.width.to_le_bytes())?;
    f.write_all(&buf.height.to_le_bytes())?;
    f.write_all(&buf.data)
}

pub fn load_raw(path: &Path) -> io::Result<PixelBuffer> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    if data.len() < 8 {
        return Err(invalid("raw file too small"));
    }
    let width = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let expected = width as usize * height as usize * 4 + 8;
    if data.len() < expected {
        return Err(invalid(format!(
            "raw file too small: expected {expected} bytes, got {}",
            data.len()
        )));
    }
    Ok(PixelBuffer {
        width,
        height,
        data: data[8..expected].to_vec(),
    })
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

pub fn load_image(path: &Path) -> io::Result<PixelBuffer> {
    match extension(path) {
        Some("bmp") => load_bmp(path),
        Some("raw") | Some("rgba") => load_raw(path),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported image format: {path:?}"),
        )),
    }
}

pub fn save_image(path: &Path, buf: &PixelBuffer) -> io::Result<()> {
    match extension(path) {
        Some("bmp") => save_bmp(path, buf),
        Some("raw") | Some("rgba") => save_raw(path, buf),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported image format: {path:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, p: [u8; 4]) -> PixelBuffer {
        let mut b = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                b.set_pixel(x, y, p);
            }
        }
        b
    }

    #[test]
    fn test_compare_identical_and_different() {
        let a = solid(4, 4, [10, 20, 30, 255]);
        let r = compare_buffers(&a, &a).unwrap();
        assert!(r.identical());
        assert_eq!(r.coverage_a, 16.0);

        let mut b = a.clone();
        b.set_pixel(2, 1, [10, 20, 40, 255]);
        let r = compare_buffers(&a, &b).unwrap();
        assert_eq!(r.different_pixels, 1);
        assert_eq!(r.max_channel_diff, 10);
        assert_eq!(r.first_diff.as_ref().map(|d| (d.x, d.y)), Some((2, 1)));
        assert!(r.similar(1.0));
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        assert!(compare_buffers(&PixelBuffer::new(2, 2), &PixelBuffer::new(3, 2)).is_err());
    }

    #[test]
    fn test_sidebyside_layout() {
        let a = solid(2, 1, [255, 0, 0, 255]);
        let b = solid(2, 1, [0, 0, 255, 255]);
        let s = generate_sidebyside(&a, &b).unwrap();
        assert_eq!(s.width, 6);
        assert_eq!(s.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(s.pixel(2, 0), [255, 0, 0, 255]);
        assert_eq!(s.pixel(5, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_bmp_and_raw_files() {
        let mut img = solid(3, 2, [1, 2, 3, 255]);
        img.set_pixel(2, 1, [200, 100, 50, 128]);
        let dir = std::env::temp_dir();
        for name in ["pixel_compare_test.bmp", "pixel_compare_test.raw"] {
            let path = dir.join(name);
            save_image(&path, &img).unwrap();
            assert_eq!(load_image(&path).unwrap(), img);
            let _ = std::fs::remove_file(&path);
        }
    }
}
