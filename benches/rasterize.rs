use criterion::{black_box, criterion_group, criterion_main, Criterion};

use korge_raster::color::Rgba8;
use korge_raster::gpu_shape_view::GpuShapeView;
use korge_raster::gpu_software::SoftwareRenderContext;
use korge_raster::paint::{GradientPaint, Paint};
use korge_raster::{Bitmap32, Context2d, Winding};

fn star(c: &mut Context2d<impl korge_raster::Renderer>, cx: f64, cy: f64, r: f64) {
    for i in 0..5 {
        let a = i as f64 * 4.0 * std::f64::consts::PI / 5.0;
        let (x, y) = (cx + r * a.cos(), cy + r * a.sin());
        if i == 0 {
            c.move_to(x, y);
        } else {
            c.line_to(x, y);
        }
    }
    c.close_path();
}

fn bench_fill(cr: &mut Criterion) {
    for aa in [false, true] {
        let name = if aa { "fill_circle_aa" } else { "fill_circle" };
        cr.bench_function(name, |b| {
            let mut c = Bitmap32::new(512, 512, true).context2d(aa).unwrap();
            c.set_fill_style(Rgba8::new(30, 144, 255, 200));
            b.iter(|| {
                c.begin_path();
                c.circle(256.0, 256.0, black_box(200.0));
                c.fill(None);
            });
        });
    }

    cr.bench_function("fill_star_even_odd_gradient", |b| {
        let mut c = Bitmap32::new(512, 512, true).context2d(true).unwrap();
        let g = GradientPaint::linear(0.0, 0.0, 512.0, 512.0)
            .with_stop(0.0, Rgba8::RED)
            .with_stop(1.0, Rgba8::BLUE);
        c.set_fill_style(Paint::Gradient(g));
        b.iter(|| {
            c.begin_path();
            star(&mut c, 256.0, 256.0, black_box(240.0));
            c.fill(Some(Winding::EvenOdd));
        });
    });
}

fn bench_stroke(cr: &mut Criterion) {
    cr.bench_function("stroke_polyline_w8", |b| {
        let mut c = Bitmap32::new(512, 512, true).context2d(true).unwrap();
        c.set_stroke_style(Rgba8::BLACK);
        c.set_line_width(8.0);
        b.iter(|| {
            c.begin_path();
            c.move_to(20.0, 20.0);
            for i in 1..40 {
                let x = 20.0 + i as f64 * 12.0;
                let y = if i % 2 == 0 { 20.0 } else { 490.0 };
                c.line_to(x, black_box(y));
            }
            c.stroke();
        });
    });
}

fn bench_gpu(cr: &mut Criterion) {
    cr.bench_function("gpu_software_star", |b| {
        let mut rec = Context2d::shape_builder(512, 512);
        rec.set_fill_style(Rgba8::GREEN);
        star(&mut rec, 256.0, 256.0, 240.0);
        rec.fill(Some(Winding::NonZero));
        let mut view = GpuShapeView::new(rec.build_shape(), true);
        let mut ctx = SoftwareRenderContext::new(512, 512);
        b.iter(|| view.render(&mut ctx).unwrap());
    });
}

criterion_group!(benches, bench_fill, bench_stroke, bench_gpu);
criterion_main!(benches);
