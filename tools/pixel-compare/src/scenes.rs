// Named test scenes, rendered through either backend.

use std::f64::consts::PI;

use korge_raster::context2d::Context2d;
use korge_raster::gpu_shape_view::GpuShapeView;
use korge_raster::gpu_software::SoftwareRenderContext;
use korge_raster::paint::GradientPaint;
use korge_raster::shape::ShapeBuilder;
use korge_raster::{
    Bitmap32, Bitmap32Context2d, LineCap, LineJoin, RenderResult, Rgba8, Shape, ShapeRenderer,
    Winding,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Scanline rasterizer into a `Bitmap32`.
    Cpu,
    /// Stencil-then-cover commands executed by the software render context.
    Gpu,
}

type SceneFn = fn(&mut Context2d<ShapeBuilder>, f64, f64);

const SCENES: &[(&str, SceneFn)] = &[
    ("circle", scene_circle),
    ("donut", scene_donut),
    ("star", scene_star),
    ("stroke", scene_stroke),
    ("dash", scene_dash),
    ("gradient", scene_gradient),
    ("clip", scene_clip),
    ("alpha", scene_alpha),
];

pub fn list_scenes() -> Vec<&'static str> {
    SCENES.iter().map(|(name, _)| *name).collect()
}

/// Records the named scene, or `None` when unknown.
pub fn build_scene(name: &str, width: u32, height: u32) -> Option<Shape> {
    let (_, f) = SCENES.iter().find(|(n, _)| *n == name)?;
    let mut c = Context2d::shape_builder(width, height);
    f(&mut c, width as f64, height as f64);
    Some(c.build_shape())
}

pub fn render_shape(shape: &Shape, width: u32, height: u32, backend: Backend) -> RenderResult<Bitmap32> {
    match backend {
        Backend::Cpu => {
            let mut r = Bitmap32Context2d::new(Bitmap32::new(width, height, true), true)?;
            r.draw_shape(shape)?;
            Ok(r.into_bitmap())
        }
        Backend::Gpu => {
            let mut ctx = SoftwareRenderContext::new(width, height);
            GpuShapeView::new(shape.clone(), true).render(&mut ctx)?;
            Ok(ctx.into_bitmap())
        }
    }
}

fn scene_circle(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    c.set_fill_style(Rgba8::new(30, 144, 255, 255));
    c.circle(w / 2.0, h / 2.0, w.min(h) * 0.4);
    c.fill(None);
}

fn scene_donut(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    let r = w.min(h) * 0.45;
    c.set_fill_style(Rgba8::new(200, 60, 40, 255));
    c.circle(w / 2.0, h / 2.0, r);
    c.circle(w / 2.0, h / 2.0, r * 0.5);
    c.fill(Some(Winding::EvenOdd));
}

fn star_path(c: &mut Context2d<ShapeBuilder>, cx: f64, cy: f64, r: f64) {
    for i in 0..5 {
        let a = i as f64 * 4.0 * PI / 5.0 - PI / 2.0;
        let (x, y) = (cx + r * a.cos(), cy + r * a.sin());
        if i == 0 {
            c.move_to(x, y);
        } else {
            c.line_to(x, y);
        }
    }
    c.close_path();
}

fn scene_star(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    let r = w.min(h) * 0.45;
    c.set_fill_style(Rgba8::new(240, 200, 0, 255));
    star_path(c, w / 2.0, h / 2.0, r);
    c.fill(Some(Winding::NonZero));
}

fn scene_stroke(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    c.set_stroke_style(Rgba8::BLACK);
    c.set_line_width(w.min(h) / 20.0);
    c.set_line_join(LineJoin::Round);
    c.set_line_cap(LineCap::Round);
    c.move_to(w * 0.1, h * 0.8);
    c.line_to(w * 0.35, h * 0.2);
    c.line_to(w * 0.6, h * 0.7);
    c.quad_to(w * 0.8, h * 0.1, w * 0.9, h * 0.5);
    c.stroke();
}

fn scene_dash(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    c.set_stroke_style(Rgba8::new(20, 120, 60, 255));
    c.set_line_width(4.0);
    c.set_line_cap(LineCap::Butt);
    c.set_line_dash(&[12.0, 6.0]);
    c.rect(w * 0.1, h * 0.1, w * 0.8, h * 0.8);
    c.stroke();
}

fn scene_gradient(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    let g = GradientPaint::linear(0.0, 0.0, w, h)
        .with_stop(0.0, Rgba8::RED)
        .with_stop(0.5, Rgba8::GREEN)
        .with_stop(1.0, Rgba8::BLUE);
    c.set_fill_style(g);
    c.rect(w * 0.05, h * 0.05, w * 0.9, h * 0.9);
    c.fill(None);
}

fn scene_clip(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    c.circle(w / 2.0, h / 2.0, w.min(h) * 0.35);
    c.clip(None);
    c.begin_path();
    c.set_fill_style(Rgba8::new(120, 0, 200, 255));
    c.rect(0.0, 0.0, w / 2.0, h);
    c.fill(None);
}

fn scene_alpha(c: &mut Context2d<ShapeBuilder>, w: f64, h: f64) {
    c.set_global_alpha(0.5);
    c.set_fill_style(Rgba8::RED);
    c.fill_rect(w * 0.1, h * 0.1, w * 0.5, h * 0.5);
    c.set_fill_style(Rgba8::BLUE);
    c.fill_rect(w * 0.4, h * 0.4, w * 0.5, h * 0.5);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compare_buffers, PixelBuffer};

    #[test]
    fn test_every_scene_builds_and_draws() {
        for name in list_scenes() {
            let shape = build_scene(name, 64, 64).unwrap();
            let bmp = render_shape(&shape, 64, 64, Backend::Cpu).unwrap();
            let covered = PixelBuffer::from_bitmap(&bmp)
                .data
                .chunks_exact(4)
                .filter(|p| p[3] > 0)
                .count();
            assert!(covered > 0, "scene {name} drew nothing");
        }
        assert!(build_scene("nope", 8, 8).is_none());
    }

    #[test]
    fn test_backends_agree_on_circle() {
        let shape = build_scene("circle", 64, 64).unwrap();
        let cpu = PixelBuffer::from_bitmap(&render_shape(&shape, 64, 64, Backend::Cpu).unwrap());
        let gpu = PixelBuffer::from_bitmap(&render_shape(&shape, 64, 64, Backend::Gpu).unwrap());
        let r = compare_buffers(&cpu, &gpu).unwrap();
        assert!(r.similar(8.0), "{r}");
    }
}
