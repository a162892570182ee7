//! Shape rendering through GPU draw commands.
//!
//! Fills are drawn either directly as a triangle strip around the bounds
//! centre (convex, unclipped shapes) or with the stencil-then-cover
//! technique: the path's fan triangles accumulate parity or winding in the
//! stencil buffer, and a covering quad is drawn where the stencil says the
//! pixel is inside. Edges are antialiased with a thin border strip whose
//! vertices carry a signed distance to the edge, evaluated by the paint
//! program's `smoothstep`.
//!
//! Stencil layout: bit 7 holds the clip, bits 0..=6 the fill winding.

use crate::basics::{PointD, RectD, RectI, Winding};
use crate::error::RenderResult;
use crate::gpu_commands::{
    CompareMode, DrawCommand, DrawType, GpuBlend, RenderContext, ShapeVertex, StencilOp,
    StencilOpFunc, StencilReference, BIG_MAX_LEN,
};
use crate::gpu_programs::PaintShader;
use crate::shape::{FillShape, Shape, ShapeRenderer};
use crate::trans_affine::TransAffine;
use crate::vector_path::{Contour, VectorPath};

const CLIP_BIT: u8 = 0x80;
const WINDING_MASK: u8 = 0x7F;
/// Half the antialiasing border thickness, in device pixels.
const AA_HALF_WIDTH: f64 = 0.8;
const MITER_LIMIT: f64 = 5.0;
/// Covering quad margin, in device pixels.
const QUAD_MARGIN: f64 = 2.0;

/// Which technique the last fill used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuDrawPath {
    Convex,
    Stencil,
}

/// Closed flattened contours with at least three points.
fn fill_contours(path: &VectorPath, scale: f64) -> Vec<Contour> {
    path.flatten(scale)
        .into_iter()
        .filter(|c| c.points.len() >= 3)
        .collect()
}

fn contour_bounds(contours: &[Contour]) -> RectD {
    let mut r = RectD::empty();
    for p in contours.iter().flat_map(|c| c.points.iter()) {
        r.add_point(p.x, p.y);
    }
    r
}

fn center(r: &RectD) -> PointD {
    PointD::new((r.x1 + r.x2) * 0.5, (r.y1 + r.y2) * 0.5)
}

/// Unit left normal of `a -> b`, or `None` for a zero-length edge.
fn left_normal(a: PointD, b: PointD) -> Option<PointD> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    (len > 1e-12).then(|| PointD::new(-dy / len, dx / len))
}

/// Per-vertex offsets along the miter of the left normals, scaled by `w`.
fn miter_offsets(pts: &[PointD], w: f64) -> Vec<PointD> {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let n0 = left_normal(prev, cur);
            let n1 = left_normal(cur, next);
            let (n0, n1) = match (n0, n1) {
                (Some(a), Some(b)) => (a, b),
                (Some(a), None) | (None, Some(a)) => (a, a),
                (None, None) => return PointD::new(0.0, 0.0),
            };
            let (mx, my) = (n0.x + n1.x, n0.y + n1.y);
            let ml = (mx * mx + my * my).sqrt();
            if ml < 1e-9 {
                return PointD::new(n0.x * w, n0.y * w);
            }
            let (mx, my) = (mx / ml, my / ml);
            let k = (1.0 / (mx * n0.x + my * n0.y)).min(MITER_LIMIT);
            PointD::new(mx * w * k, my * w * k)
        })
        .collect()
}

/// Fan around `mid` covering `pts`, closed back to the first point.
fn fan(mid: PointD, pts: &[PointD], out: &mut Vec<ShapeVertex>) {
    out.clear();
    out.push(ShapeVertex::solid(mid.x as f32, mid.y as f32));
    for p in pts.iter().chain(pts.first()) {
        out.push(ShapeVertex::solid(p.x as f32, p.y as f32));
    }
}

/// Renders a `Shape` through a `RenderContext`.
#[derive(Debug, Clone)]
pub struct GpuShapeView {
    shape: Shape,
    antialiased: bool,
    global_scale: f64,
    transform: TransAffine,
    render_bounds: Option<RectI>,
    vertices: Vec<ShapeVertex>,
    last_path: Option<GpuDrawPath>,
}

impl GpuShapeView {
    pub fn new(shape: Shape, antialiased: bool) -> Self {
        Self {
            shape,
            antialiased,
            global_scale: 1.0,
            transform: TransAffine::new(),
            render_bounds: None,
            vertices: Vec::new(),
            last_path: None,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub fn antialiased(&self) -> bool {
        self.antialiased
    }

    pub fn set_antialiased(&mut self, antialiased: bool) {
        self.antialiased = antialiased;
    }

    pub fn global_scale(&self) -> f64 {
        self.global_scale
    }

    /// Device pixels per shape unit, for border width and AA falloff.
    pub fn set_global_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.global_scale = scale;
        }
    }

    /// Shape-to-device transform. Also resets the global scale to the
    /// transform's average scale.
    pub fn set_transform(&mut self, transform: TransAffine) {
        self.transform = transform;
        self.set_global_scale(transform.scale_avg());
    }

    /// Scissor rectangle in device pixels, inclusive; `None` for the whole
    /// target.
    pub fn set_render_bounds(&mut self, bounds: Option<RectI>) {
        self.render_bounds = bounds;
    }

    /// Technique used by the most recent fill.
    pub fn last_path(&self) -> Option<GpuDrawPath> {
        self.last_path
    }

    /// Local bounds of the shape.
    pub fn bounds(&self) -> Option<RectD> {
        self.shape.bounds()
    }

    /// Issue the commands drawing the current shape.
    pub fn render<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> RenderResult<()> {
        let shape = std::mem::take(&mut self.shape);
        let result = self.render_shape(ctx, &shape);
        self.shape = shape;
        result
    }

    /// Issue the commands drawing `shape` with this view's settings.
    pub fn render_shape<C: RenderContext + ?Sized>(&mut self, ctx: &mut C, shape: &Shape) -> RenderResult<()> {
        match shape {
            Shape::Empty => Ok(()),
            Shape::Fill(f) => self.render_fill(ctx, f),
            Shape::Polyline(p) => self.render_fill(ctx, &p.to_fill()),
            Shape::Text(t) => self.render_fill(ctx, &t.outline),
            Shape::Compound(children) => {
                for c in children {
                    self.render_shape(ctx, c)?;
                }
                Ok(())
            }
        }
    }

    fn command(&self, draw_type: DrawType, shader: PaintShader) -> DrawCommand {
        let mut cmd = DrawCommand::new(self.vertices.clone(), draw_type, shader);
        cmd.scissor = self.render_bounds;
        cmd.transform = self.transform;
        cmd
    }

    fn stencil_command(&self, draw_type: DrawType, func: StencilOpFunc, r: StencilReference) -> DrawCommand {
        let mut cmd = DrawCommand::stencil_only(self.vertices.clone(), draw_type, func, r);
        cmd.scissor = self.render_bounds;
        cmd.transform = self.transform;
        cmd
    }

    fn render_fill<C: RenderContext + ?Sized>(&mut self, ctx: &mut C, shape: &FillShape) -> RenderResult<()> {
        let blend = GpuBlend::from_composite(shape.composite).map_err(|e| {
            log::warn!("gpu fill skipped: {e}");
            e
        })?;
        let scale = self.global_scale;
        let paint_transform = shape.transform * self.transform;
        let Some(shader) = PaintShader::for_paint(&shape.paint, &paint_transform, shape.global_alpha, scale)
        else {
            return Ok(());
        };
        let contours = fill_contours(&shape.path, scale);
        if contours.is_empty() {
            return Ok(());
        }
        let clip = match &shape.clip {
            Some(c) => {
                let cc = fill_contours(c, scale);
                if cc.is_empty() {
                    return Ok(());
                }
                Some(cc)
            }
            None => None,
        };

        if clip.is_none() && shape.is_convex() {
            self.draw_convex(ctx, &contours[0], blend, shader)?;
            self.last_path = Some(GpuDrawPath::Convex);
            log::debug!("gpu fill: convex path, {} points", contours[0].points.len());
        } else {
            self.draw_stencil(ctx, &contours, clip.as_deref(), shape.winding(), blend, shader)?;
            self.last_path = Some(GpuDrawPath::Stencil);
            log::debug!(
                "gpu fill: stencil path, {} contours, clipped: {}",
                contours.len(),
                clip.is_some()
            );
        }
        Ok(())
    }

    fn draw_convex<C: RenderContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        contour: &Contour,
        blend: GpuBlend,
        shader: PaintShader,
    ) -> RenderResult<()> {
        let pts = &contour.points;
        let mid = center(&contour_bounds(std::slice::from_ref(contour)));

        // Interior strip: edge vertices sit at the coverage midpoint and the
        // centre carries the distance to the nearest edge.
        let (mid_len, edge_len) = if self.antialiased {
            let r = pts
                .iter()
                .zip(pts.iter().cycle().skip(1))
                .filter_map(|(a, b)| {
                    let l = a.distance(b);
                    (l > 1e-12).then(|| ((b.x - a.x) * (mid.y - a.y) - (b.y - a.y) * (mid.x - a.x)).abs() / l)
                })
                .fold(f64::INFINITY, f64::min);
            (r as f32, 0.0)
        } else {
            (BIG_MAX_LEN, BIG_MAX_LEN)
        };
        self.vertices.clear();
        for p in pts.iter().chain(pts.first()) {
            self.vertices
                .push(ShapeVertex::new(mid.x as f32, mid.y as f32, 0.0, mid_len));
            self.vertices
                .push(ShapeVertex::new(p.x as f32, p.y as f32, 0.0, edge_len));
        }
        let mut cmd = self.command(DrawType::TriangleStrip, shader.clone());
        cmd.blend = Some(blend);
        ctx.draw(&cmd)?;

        if self.antialiased {
            // Outward fringe, fading from half coverage on the edge.
            let w = AA_HALF_WIDTH / self.global_scale;
            let outward = if contour.signed_area() > 0.0 { -1.0 } else { 1.0 };
            let offsets = miter_offsets(pts, w * outward);
            self.vertices.clear();
            for (p, o) in pts.iter().zip(&offsets).chain(pts.iter().zip(&offsets).take(1)) {
                self.vertices.push(ShapeVertex::new(p.x as f32, p.y as f32, 0.0, 0.0));
                self.vertices.push(ShapeVertex::new(
                    (p.x + o.x) as f32,
                    (p.y + o.y) as f32,
                    w as f32,
                    0.0,
                ));
            }
            let mut cmd = self.command(DrawType::TriangleStrip, shader);
            cmd.blend = Some(blend);
            ctx.draw(&cmd)?;
        }
        Ok(())
    }

    fn draw_stencil<C: RenderContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        contours: &[Contour],
        clip: Option<&[Contour]>,
        winding: Winding,
        blend: GpuBlend,
        shader: PaintShader,
    ) -> RenderResult<()> {
        let bounds = contour_bounds(contours);
        let mid = center(&bounds);

        // Clip parity into bit 7.
        if let Some(clip) = clip {
            let clip_mid = center(&contour_bounds(clip));
            let func = StencilOpFunc::test(CompareMode::Always).with_pass(StencilOp::Invert);
            let r = StencilReference::new(CLIP_BIT, 0xFF, CLIP_BIT);
            for c in clip {
                fan(clip_mid, &c.points, &mut self.vertices);
                ctx.draw(&self.stencil_command(DrawType::TriangleFan, func, r))?;
            }
        }

        // Winding into bits 0..=6, only inside the clip.
        let (gate, gate_ref, gate_mask) = if clip.is_some() {
            (CompareMode::Equal, CLIP_BIT, CLIP_BIT)
        } else {
            (CompareMode::Always, 0, 0)
        };
        let (func, write_mask, final_compare, final_ref, final_mask) = match winding {
            Winding::EvenOdd => (
                StencilOpFunc::test(gate).with_pass(StencilOp::Invert),
                0x01,
                CompareMode::Equal,
                0x01,
                0x01,
            ),
            Winding::NonZero => (
                StencilOpFunc::test(gate)
                    .with_pass_front_back(StencilOp::IncrementWrap, StencilOp::DecrementWrap),
                WINDING_MASK,
                CompareMode::NotEqual,
                0,
                WINDING_MASK,
            ),
        };
        let r = StencilReference::new(gate_ref, gate_mask, write_mask);
        for c in contours {
            fan(mid, &c.points, &mut self.vertices);
            ctx.draw(&self.stencil_command(DrawType::TriangleFan, func, r))?;
        }

        // Border fringe outside the filled pixels.
        if self.antialiased && clip.is_none() {
            let w = AA_HALF_WIDTH / self.global_scale;
            for c in contours {
                let offsets = miter_offsets(&c.points, w);
                self.vertices.clear();
                for (p, o) in c.points.iter().zip(&offsets).chain(c.points.iter().zip(&offsets).take(1)) {
                    self.vertices.push(ShapeVertex::new(
                        (p.x - o.x) as f32,
                        (p.y - o.y) as f32,
                        -w as f32,
                        0.0,
                    ));
                    self.vertices.push(ShapeVertex::new(
                        (p.x + o.x) as f32,
                        (p.y + o.y) as f32,
                        w as f32,
                        0.0,
                    ));
                }
                let mut cmd = self.command(DrawType::TriangleStrip, shader.clone());
                cmd.blend = Some(blend);
                cmd.stencil = StencilOpFunc::test(final_compare.inverted());
                cmd.stencil_ref = StencilReference::new(final_ref, final_mask, 0);
                ctx.draw(&cmd)?;
            }
        }

        // Cover.
        let q = bounds.expand(QUAD_MARGIN / self.global_scale);
        self.vertices.clear();
        for (x, y) in [(q.x1, q.y1), (q.x2, q.y1), (q.x2, q.y2), (q.x1, q.y2)] {
            self.vertices.push(ShapeVertex::solid(x as f32, y as f32));
        }
        let mut cmd = self.command(DrawType::TriangleFan, shader);
        cmd.blend = Some(blend);
        cmd.stencil = StencilOpFunc::test(final_compare);
        cmd.stencil_ref = StencilReference::new(final_ref, final_mask, 0);
        ctx.draw(&cmd)?;

        ctx.clear_stencil(0);
        Ok(())
    }
}

/// A render context paired with the view settings used to draw into it.
#[derive(Debug)]
pub struct GpuShapeRenderer<C> {
    view: GpuShapeView,
    ctx: C,
}

impl<C: RenderContext> GpuShapeRenderer<C> {
    pub fn new(ctx: C, antialiased: bool) -> Self {
        Self {
            view: GpuShapeView::new(Shape::Empty, antialiased),
            ctx,
        }
    }

    pub fn view_mut(&mut self) -> &mut GpuShapeView {
        &mut self.view
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }
}

impl<C: RenderContext> ShapeRenderer for GpuShapeRenderer<C> {
    fn draw_shape(&mut self, shape: &Shape) -> RenderResult<()> {
        self.view.render_shape(&mut self.ctx, shape)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;
    use crate::comp_op::BlendMode;
    use crate::error::RenderError;
    use crate::gpu_commands::{CommandBuffer, GpuCommand};
    use crate::gpu_software::SoftwareRenderContext;

    fn rect_shape(x: f64, y: f64, w: f64, h: f64) -> FillShape {
        let mut p = VectorPath::new();
        p.rect(x, y, w, h);
        FillShape::new(p, Rgba8::RED)
    }

    fn donut(winding: Winding) -> FillShape {
        let mut p = VectorPath::with_winding(winding);
        p.rect(2.0, 2.0, 16.0, 16.0);
        p.rect(6.0, 6.0, 8.0, 8.0);
        FillShape::new(p, Rgba8::RED)
    }

    #[test]
    fn test_convex_fast_path_draws_without_stencil() {
        let mut view = GpuShapeView::new(Shape::Fill(rect_shape(1.0, 1.0, 4.0, 4.0)), false);
        let mut buf = CommandBuffer::new(8, 8);
        view.render(&mut buf).unwrap();
        assert_eq!(view.last_path(), Some(GpuDrawPath::Convex));
        assert_eq!(buf.commands().len(), 1);
        let cmd = buf.draws().next().unwrap();
        assert_eq!(cmd.draw_type, DrawType::TriangleStrip);
        assert!(!cmd.stencil.enabled);
        // (mid, p) for four corners plus the closing pair.
        assert_eq!(cmd.vertices.len(), 10);
    }

    #[test]
    fn test_convex_fill_pixels() {
        let mut view = GpuShapeView::new(Shape::Fill(rect_shape(1.0, 1.0, 4.0, 4.0)), false);
        let mut ctx = SoftwareRenderContext::new(8, 8);
        view.render(&mut ctx).unwrap();
        let b = ctx.bitmap();
        assert_eq!(b.get_premul(1, 1), Rgba8::RED.premultiplied());
        assert_eq!(b.get_premul(4, 4), Rgba8::RED.premultiplied());
        assert_eq!(b.get_premul(5, 5).a, 0);
        assert_eq!(b.get_premul(0, 3).a, 0);
    }

    #[test]
    fn test_stencil_sequence_for_concave_fill() {
        let mut view = GpuShapeView::new(Shape::Fill(donut(Winding::EvenOdd)), true);
        let mut buf = CommandBuffer::new(20, 20);
        view.render(&mut buf).unwrap();
        assert_eq!(view.last_path(), Some(GpuDrawPath::Stencil));

        let cmds = buf.commands();
        // Two stencil fans, two border strips, the cover quad, the clear.
        assert_eq!(cmds.len(), 6);
        let GpuCommand::Draw(first) = &cmds[0] else {
            panic!("expected draw");
        };
        assert!(first.color_mask.is_none());
        assert_eq!(first.stencil.front.pass, StencilOp::Invert);
        assert_eq!(first.stencil_ref.write_mask, 0x01);
        let GpuCommand::Draw(border) = &cmds[2] else {
            panic!("expected draw");
        };
        assert_eq!(border.stencil.compare, CompareMode::NotEqual);
        assert_eq!(border.stencil_ref.write_mask, 0);
        let GpuCommand::Draw(cover) = &cmds[4] else {
            panic!("expected draw");
        };
        assert_eq!(cover.stencil.compare, CompareMode::Equal);
        assert_eq!(cover.vertices[0], ShapeVertex::solid(0.0, 0.0));
        assert!(matches!(cmds[5], GpuCommand::ClearStencil(0)));
    }

    #[test]
    fn test_donut_windings() {
        for (winding, center_filled) in [(Winding::EvenOdd, false), (Winding::NonZero, true)] {
            let mut view = GpuShapeView::new(Shape::Fill(donut(winding)), false);
            let mut ctx = SoftwareRenderContext::new(20, 20);
            view.render(&mut ctx).unwrap();
            let b = ctx.bitmap();
            assert_eq!(b.get_premul(3, 3).a, 255);
            // Both rects share orientation, so non-zero fills the hole.
            assert_eq!(b.get_premul(10, 10).a == 255, center_filled, "{winding:?}");
            assert_eq!(b.get_premul(19, 19).a, 0);
            assert_eq!(ctx.stencil_at(10, 10), 0);
        }
    }

    #[test]
    fn test_clip_gates_fill() {
        let mut clip = VectorPath::new();
        clip.rect(0.0, 0.0, 5.0, 10.0);
        let shape = rect_shape(0.0, 0.0, 10.0, 10.0).with_clip(Some(clip));
        let mut view = GpuShapeView::new(Shape::Fill(shape), true);
        let mut ctx = SoftwareRenderContext::new(10, 10);
        view.render(&mut ctx).unwrap();
        assert_eq!(view.last_path(), Some(GpuDrawPath::Stencil));
        assert_eq!(ctx.bitmap().get_premul(4, 5).a, 255);
        assert_eq!(ctx.bitmap().get_premul(5, 5).a, 0);
    }

    #[test]
    fn test_antialiased_edge_is_partial() {
        let mut view = GpuShapeView::new(Shape::Fill(rect_shape(2.0, 2.0, 10.5, 10.0)), true);
        let mut ctx = SoftwareRenderContext::new(16, 16);
        view.render(&mut ctx).unwrap();
        let b = ctx.bitmap();
        assert_eq!(b.get_premul(6, 6).a, 255);
        // Column 12 is half covered by the edge at x = 12.5.
        let edge = b.get_premul(12, 6).a;
        assert!(edge > 64 && edge < 192, "{edge}");
        assert_eq!(b.get_premul(14, 6).a, 0);
    }

    #[test]
    fn test_stroke_renders_as_fill() {
        let mut c = crate::context2d::Context2d::shape_builder(20, 20);
        c.set_stroke_style(Rgba8::RED);
        c.set_line_width(4.0);
        c.move_to(2.0, 10.0);
        c.line_to(18.0, 10.0);
        c.stroke();
        let mut view = GpuShapeView::new(c.build_shape(), false);
        let mut ctx = SoftwareRenderContext::new(20, 20);
        view.render(&mut ctx).unwrap();
        let b = ctx.bitmap();
        assert_eq!(b.get_premul(10, 8).a, 255);
        assert_eq!(b.get_premul(10, 11).a, 255);
        assert_eq!(b.get_premul(10, 12).a, 0);
        assert_eq!(b.get_premul(10, 7).a, 0);
    }

    #[test]
    fn test_unsupported_blend_is_an_error() {
        let shape = rect_shape(0.0, 0.0, 4.0, 4.0).with_composite(BlendMode::Hue);
        let mut view = GpuShapeView::new(Shape::Fill(shape), true);
        let mut buf = CommandBuffer::new(8, 8);
        let err = view.render(&mut buf).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedOperation { .. }));
        assert!(buf.commands().is_empty());
    }

    #[test]
    fn test_shape_renderer_and_render_bounds() {
        let mut r = GpuShapeRenderer::new(SoftwareRenderContext::new(8, 8), false);
        r.view_mut().set_render_bounds(Some(RectI::new(0, 0, 3, 7)));
        r.draw_shape(&Shape::Fill(rect_shape(0.0, 0.0, 8.0, 8.0))).unwrap();
        let b = r.context().bitmap();
        assert_eq!(b.get_premul(3, 0).a, 255);
        assert_eq!(b.get_premul(4, 0).a, 0);
    }
}
