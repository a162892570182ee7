//! CPU execution of GPU draw commands.
//!
//! `SoftwareRenderContext` behaves like a fixed-function GPU with an 8-bit
//! stencil attachment: triangles are rasterized with edge functions at
//! pixel centres under a top-left fill rule, the stencil test runs per face,
//! and surviving fragments are shaded by the command's `PaintShader` and
//! blended into a premultiplied `Bitmap32`.

use crate::basics::{ifloor, RectI};
use crate::bitmap32::Bitmap32;
use crate::color::PremulRgba8;
use crate::gpu_commands::{DrawCommand, RenderContext};
use crate::error::RenderResult;

#[derive(Debug, Clone, Copy)]
struct Vert {
    x: f64,
    y: f64,
    len: f32,
    max_len: f32,
}

#[inline]
fn edge(a: &Vert, b: &Vert, px: f64, py: f64) -> f64 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Top or left edge of a triangle with positive orientation.
#[inline]
fn is_top_left(a: &Vert, b: &Vert) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    (dy == 0.0 && dx > 0.0) || dy < 0.0
}

#[inline]
fn covers(w: f64, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}

/// Software stand-in for a GPU render target.
#[derive(Debug, Clone)]
pub struct SoftwareRenderContext {
    color: Bitmap32,
    stencil: Vec<u8>,
    triangles: usize,
    fragments: usize,
}

impl SoftwareRenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_bitmap(Bitmap32::new(width, height, true))
    }

    /// Render into an existing bitmap.
    pub fn with_bitmap(color: Bitmap32) -> Self {
        let stencil = vec![0; color.area()];
        Self {
            color,
            stencil,
            triangles: 0,
            fragments: 0,
        }
    }

    pub fn bitmap(&self) -> &Bitmap32 {
        &self.color
    }

    pub fn into_bitmap(self) -> Bitmap32 {
        self.color
    }

    pub fn stencil_at(&self, x: i32, y: i32) -> u8 {
        if !self.color.in_bounds(x, y) {
            return 0;
        }
        self.stencil[y as usize * self.color.width() as usize + x as usize]
    }

    /// Triangles and fragments processed so far.
    pub fn stats(&self) -> (usize, usize) {
        (self.triangles, self.fragments)
    }

    fn target_rect(&self, scissor: Option<RectI>) -> Option<RectI> {
        let w = self.color.width() as i32;
        let h = self.color.height() as i32;
        let mut r = RectI::new(0, 0, w - 1, h - 1);
        if !r.is_valid() {
            return None;
        }
        if let Some(s) = scissor {
            if !r.clip(&s) {
                return None;
            }
        }
        Some(r)
    }

    fn raster_triangle(&mut self, cmd: &DrawCommand, clip: RectI, tri: [Vert; 3]) {
        let [a, mut b, mut c] = tri;
        let area = edge(&a, &b, c.x, c.y);
        if area == 0.0 || !area.is_finite() {
            return;
        }
        let front = area > 0.0;
        if !front {
            std::mem::swap(&mut b, &mut c);
        }
        let area = area.abs();
        self.triangles += 1;

        let min_x = ifloor(a.x.min(b.x).min(c.x)).max(clip.x1);
        let max_x = ifloor(a.x.max(b.x).max(c.x)).min(clip.x2);
        let min_y = ifloor(a.y.min(b.y).min(c.y)).max(clip.y1);
        let max_y = ifloor(a.y.max(b.y).max(c.y)).min(clip.y2);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let tl_bc = is_top_left(&b, &c);
        let tl_ca = is_top_left(&c, &a);
        let tl_ab = is_top_left(&a, &b);
        let width = self.color.width() as usize;
        let ops = cmd.stencil.face(front);
        let r = cmd.stencil_ref;
        let write_color = !cmd.color_mask.is_none();

        for y in min_y..=max_y {
            let py = y as f64 + 0.5;
            for x in min_x..=max_x {
                let px = x as f64 + 0.5;
                let w0 = edge(&b, &c, px, py);
                let w1 = edge(&c, &a, px, py);
                let w2 = edge(&a, &b, px, py);
                if !(covers(w0, tl_bc) && covers(w1, tl_ca) && covers(w2, tl_ab)) {
                    continue;
                }
                self.fragments += 1;

                if cmd.stencil.enabled {
                    let idx = y as usize * width + x as usize;
                    let s = self.stencil[idx];
                    let pass = cmd
                        .stencil
                        .compare
                        .test(r.reference & r.read_mask, s & r.read_mask);
                    let op = if pass { ops.pass } else { ops.fail };
                    let v = op.apply(s, r.reference);
                    self.stencil[idx] = (s & !r.write_mask) | (v & r.write_mask);
                    if !pass {
                        continue;
                    }
                }
                if !write_color {
                    continue;
                }

                let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
                let len = (a.len as f64 * l0 + b.len as f64 * l1 + c.len as f64 * l2) as f32;
                let max_len =
                    (a.max_len as f64 * l0 + b.max_len as f64 * l1 + c.max_len as f64 * l2) as f32;
                let src = cmd.shader.fragment(px, py, len, max_len);
                let dst = self.color.get_premul(x, y);
                let out = match cmd.blend {
                    Some(blend) => {
                        let to32 = |c: PremulRgba8| c.to_f64().map(|v| v as f32);
                        let o = blend.apply(to32(src), to32(dst));
                        PremulRgba8::from_f64(o[0] as f64, o[1] as f64, o[2] as f64, o[3] as f64)
                    }
                    None => src,
                };
                let m = cmd.color_mask;
                let out = PremulRgba8::new(
                    if m.r { out.r } else { dst.r },
                    if m.g { out.g } else { dst.g },
                    if m.b { out.b } else { dst.b },
                    if m.a { out.a } else { dst.a },
                );
                self.color.set_premul(x, y, out);
            }
        }
    }
}

impl RenderContext for SoftwareRenderContext {
    fn draw(&mut self, cmd: &DrawCommand) -> RenderResult<()> {
        let Some(clip) = self.target_rect(cmd.scissor) else {
            return Ok(());
        };
        let verts: Vec<Vert> = cmd
            .vertices
            .iter()
            .map(|v| {
                let (mut x, mut y) = (v.x as f64, v.y as f64);
                cmd.transform.transform(&mut x, &mut y);
                Vert {
                    x,
                    y,
                    len: v.len,
                    max_len: v.max_len,
                }
            })
            .collect();
        for [i, j, k] in cmd.draw_type.triangles(verts.len()) {
            self.raster_triangle(cmd, clip, [verts[i], verts[j], verts[k]]);
        }
        Ok(())
    }

    fn clear_stencil(&mut self, value: u8) {
        self.stencil.fill(value);
    }

    fn size(&self) -> (u32, u32) {
        (self.color.width(), self.color.height())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;
    use crate::gpu_commands::{
        CompareMode, DrawType, GpuBlend, ShapeVertex, StencilOp, StencilOpFunc, StencilReference,
    };
    use crate::gpu_programs::PaintShader;
    use crate::paint::Paint;
    use crate::trans_affine::TransAffine;

    fn red() -> PaintShader {
        PaintShader::for_paint(&Paint::Color(Rgba8::RED), &TransAffine::new(), 1.0, 1.0).unwrap()
    }

    fn quad(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<ShapeVertex> {
        vec![
            ShapeVertex::solid(x0, y0),
            ShapeVertex::solid(x1, y0),
            ShapeVertex::solid(x1, y1),
            ShapeVertex::solid(x0, y1),
        ]
    }

    fn count_red(ctx: &SoftwareRenderContext) -> usize {
        let b = ctx.bitmap();
        let mut n = 0;
        for y in 0..b.height() as i32 {
            for x in 0..b.width() as i32 {
                if b.get_premul(x, y).r == 255 {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_quad_covers_exact_pixels() {
        let mut ctx = SoftwareRenderContext::new(8, 8);
        let cmd = DrawCommand::new(quad(2.0, 2.0, 6.0, 5.0), DrawType::TriangleFan, red());
        ctx.draw(&cmd).unwrap();
        // Shared diagonal is drawn once and the quad covers 4x3 pixels.
        assert_eq!(count_red(&ctx), 12);
        assert_eq!(ctx.stats().1, 12);
        assert_eq!(ctx.bitmap().get_premul(2, 2).r, 255);
        assert_eq!(ctx.bitmap().get_premul(6, 2).a, 0);
    }

    #[test]
    fn test_adjacent_quads_do_not_overlap() {
        let mut ctx = SoftwareRenderContext::new(8, 8);
        for q in [quad(0.0, 0.0, 3.5, 8.0), quad(3.5, 0.0, 8.0, 8.0)] {
            ctx.draw(&DrawCommand::new(q, DrawType::TriangleFan, red())).unwrap();
        }
        assert_eq!(ctx.stats().1, 64);
    }

    #[test]
    fn test_scissor_limits_output() {
        let mut ctx = SoftwareRenderContext::new(8, 8);
        let mut cmd = DrawCommand::new(quad(0.0, 0.0, 8.0, 8.0), DrawType::TriangleFan, red());
        cmd.scissor = Some(RectI::new(1, 1, 2, 2));
        ctx.draw(&cmd).unwrap();
        assert_eq!(count_red(&ctx), 4);
    }

    #[test]
    fn test_stencil_invert_and_gate() {
        let mut ctx = SoftwareRenderContext::new(8, 8);
        let write = DrawCommand::stencil_only(
            quad(0.0, 0.0, 4.0, 8.0),
            DrawType::TriangleFan,
            StencilOpFunc::test(CompareMode::Always).with_pass(StencilOp::Invert),
            StencilReference::new(0, 0xFF, 0x01),
        );
        ctx.draw(&write).unwrap();
        assert_eq!(ctx.stencil_at(0, 0), 1);
        assert_eq!(ctx.stencil_at(5, 0), 0);
        assert_eq!(ctx.bitmap().get_premul(0, 0).a, 0);

        let mut cover = DrawCommand::new(quad(0.0, 0.0, 8.0, 8.0), DrawType::TriangleFan, red());
        cover.stencil = StencilOpFunc::test(CompareMode::Equal);
        cover.stencil_ref = StencilReference::new(1, 0x01, 0);
        ctx.draw(&cover).unwrap();
        assert_eq!(count_red(&ctx), 32);

        ctx.clear_stencil(0);
        assert_eq!(ctx.stencil_at(0, 0), 0);
    }

    #[test]
    fn test_faces_get_separate_ops() {
        let mut ctx = SoftwareRenderContext::new(4, 4);
        let func = StencilOpFunc::test(CompareMode::Always)
            .with_pass_front_back(StencilOp::IncrementWrap, StencilOp::DecrementWrap);
        let r = StencilReference::new(0, 0xFF, 0x7F);
        let cw = quad(0.0, 0.0, 4.0, 4.0);
        let mut ccw = cw.clone();
        ccw.reverse();
        ctx.draw(&DrawCommand::stencil_only(cw, DrawType::TriangleFan, func, r)).unwrap();
        assert_eq!(ctx.stencil_at(1, 1), 1);
        ctx.draw(&DrawCommand::stencil_only(ccw.clone(), DrawType::TriangleFan, func, r)).unwrap();
        assert_eq!(ctx.stencil_at(1, 1), 0);
        ctx.draw(&DrawCommand::stencil_only(ccw, DrawType::TriangleFan, func, r)).unwrap();
        assert_eq!(ctx.stencil_at(1, 1), 0x7F);
    }

    #[test]
    fn test_blend_and_transform() {
        let mut ctx = SoftwareRenderContext::new(4, 4);
        let mut cmd = DrawCommand::new(quad(0.0, 0.0, 1.0, 1.0), DrawType::TriangleFan, red());
        cmd.transform = TransAffine::new_scaling(2.0, 2.0);
        ctx.draw(&cmd).unwrap();
        assert_eq!(count_red(&ctx), 4);

        let half_blue = PaintShader::for_paint(
            &Paint::Color(Rgba8::BLUE),
            &TransAffine::new(),
            0.5,
            1.0,
        )
        .unwrap();
        let mut over = DrawCommand::new(quad(0.0, 0.0, 1.0, 1.0), DrawType::TriangleFan, half_blue);
        over.blend = Some(GpuBlend::NORMAL);
        ctx.draw(&over).unwrap();
        let p = ctx.bitmap().get_premul(0, 0);
        assert!((p.r as i32 - 127).abs() <= 1 && (p.b as i32 - 128).abs() <= 1, "{p:?}");
        assert_eq!(p.a, 255);
    }
}
