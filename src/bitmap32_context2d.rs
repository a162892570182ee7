//! Software canvas backend.
//!
//! `Bitmap32Context2d` drives one draw call through the whole CPU pipeline:
//! pick a filler, build the fill or stroke outline, feed clip and path into
//! the rasterizer, and composite the resulting spans row by row.
//!
//! Fills rasterize every sub-path together so nested contours share one
//! winding count. Strokes flush after each source sub-path so overlapping
//! stroke segments do not accumulate coverage twice.

use crate::basics::{RectI, Winding, MAX_RASTER_DIMENSION};
use crate::bitmap32::Bitmap32;
use crate::comp_op::CompositeOperation;
use crate::context2d::{Context2d, Renderer, State};
use crate::error::{RenderError, RenderResult};
use crate::filler::Filler;
use crate::rasterizer::{Rasterizer, DEFAULT_QUALITY};
use crate::scanline_writer::{ScanlineTarget, ScanlineWriter};
use crate::shape::{FillShape, Shape, ShapeRenderer};
use crate::stroke::{stroke_contours, StrokeInfo};
use crate::vector_path::VectorPath;

/// What to rasterize for one draw call.
enum Outline<'a> {
    Fill(&'a VectorPath, Winding),
    Stroke(&'a VectorPath, &'a StrokeInfo),
}

/// Per-draw compositing parameters.
struct DrawParams<'a> {
    clip: Option<&'a VectorPath>,
    composite: CompositeOperation,
    global_alpha: f64,
}

/// CPU renderer into an owned `Bitmap32`.
pub struct Bitmap32Context2d {
    bitmap: Bitmap32,
    antialiasing: bool,
    rasterizer: Rasterizer,
    writer: ScanlineWriter,
    filler: Filler,
}

impl Bitmap32Context2d {
    /// Wrap `bitmap`. Quality is 4 sub-rows with antialiasing, 1 without.
    pub fn new(bitmap: Bitmap32, antialiasing: bool) -> RenderResult<Self> {
        let size = bitmap.width().max(bitmap.height());
        if size > MAX_RASTER_DIMENSION as u32 {
            return Err(RenderError::BitmapTooLarge {
                size: size.min(i32::MAX as u32) as i32,
                max: MAX_RASTER_DIMENSION,
            });
        }
        let mut ctx = Self {
            writer: ScanlineWriter::new(bitmap.width()),
            bitmap,
            antialiasing,
            rasterizer: Rasterizer::new(),
            filler: Filler::None,
        };
        ctx.set_antialiasing(antialiasing);
        Ok(ctx)
    }

    pub fn bitmap(&self) -> &Bitmap32 {
        &self.bitmap
    }

    pub fn bitmap_mut(&mut self) -> &mut Bitmap32 {
        &mut self.bitmap
    }

    pub fn into_bitmap(self) -> Bitmap32 {
        self.bitmap
    }

    pub fn antialiasing(&self) -> bool {
        self.antialiasing
    }

    pub fn set_antialiasing(&mut self, antialiasing: bool) {
        self.antialiasing = antialiasing;
        self.set_quality(if antialiasing { DEFAULT_QUALITY } else { 1 });
    }

    /// Vertical sub-rows per pixel row.
    pub fn quality(&self) -> i32 {
        self.rasterizer.quality()
    }

    pub fn set_quality(&mut self, quality: i32) {
        self.rasterizer.set_quality(quality);
        self.writer.set_sub_rows_per_pixel(self.rasterizer.quality());
    }

    fn device_bounds(&self) -> RectI {
        RectI::new(
            0,
            0,
            self.bitmap.width() as i32 - 1,
            self.bitmap.height() as i32 - 1,
        )
    }

    /// Rasterize `outline` with the currently bound filler.
    fn draw(&mut self, outline: Outline<'_>, params: DrawParams<'_>) {
        if self.bitmap.area() == 0 {
            return;
        }
        let bounds = self.device_bounds();
        let Self {
            bitmap,
            rasterizer,
            writer,
            filler,
            ..
        } = self;

        rasterizer.reset();
        if let Some(clip) = params.clip {
            rasterizer.set_clip_winding(clip.winding());
            let c = rasterizer.clip_mut();
            clip.emit_points(1.0, |x, y, m| c.add(x, y, m));
            c.close();
        }

        let mut target = ScanlineTarget {
            bitmap,
            filler,
            composite: params.composite,
            global_alpha: params.global_alpha,
        };
        let mut spans = 0;
        let mut flushes = 0;

        match outline {
            Outline::Fill(path, winding) => {
                let p = rasterizer.path_mut();
                path.emit_points(1.0, |x, y, m| p.add(x, y, m));
                p.close();
                spans += rasterizer
                    .rasterize_fill(bounds, winding, |x0, x1, y| writer.select(x0, x1, y, &mut target));
            }
            Outline::Stroke(path, info) => {
                for contour in path.flatten(1.0) {
                    let ring = stroke_contours(std::slice::from_ref(&contour), info, 1.0);
                    let p = rasterizer.path_mut();
                    p.reset();
                    ring.emit_points(1.0, |x, y, m| p.add(x, y, m));
                    p.close();
                    spans += rasterizer.rasterize_fill(bounds, Winding::NonZero, |x0, x1, y| {
                        writer.select(x0, x1, y, &mut target)
                    });
                    writer.finish(&mut target);
                    flushes += 1;
                }
            }
        }
        writer.finish(&mut target);
        flushes += 1;
        log::debug!("rasterized {spans} spans in {flushes} flushes");
    }

    fn draw_fill_shape(&mut self, shape: &FillShape) {
        self.filler = Filler::for_paint(&shape.paint, &shape.transform);
        if self.filler.is_none() {
            return;
        }
        self.draw(
            Outline::Fill(&shape.path, shape.winding()),
            DrawParams {
                clip: shape.clip.as_ref(),
                composite: shape.composite,
                global_alpha: shape.global_alpha,
            },
        );
    }
}

impl Renderer for Bitmap32Context2d {
    fn width(&self) -> u32 {
        self.bitmap.width()
    }

    fn height(&self) -> u32 {
        self.bitmap.height()
    }

    fn render_final(&mut self, state: &State, fill: bool, winding: Option<Winding>) {
        let paint = if fill {
            &state.fill_style
        } else {
            &state.stroke_style
        };
        self.filler.set(paint, state);
        if self.filler.is_none() {
            return;
        }
        let params = DrawParams {
            clip: state.clip.as_ref(),
            composite: state.global_composite_operation,
            global_alpha: state.global_alpha,
        };
        if fill {
            let winding = winding.unwrap_or(state.path.winding());
            self.draw(Outline::Fill(&state.path, winding), params);
        } else {
            let info = state.stroke_info();
            self.draw(Outline::Stroke(&state.path, &info), params);
        }
    }
}

impl ShapeRenderer for Bitmap32Context2d {
    fn draw_shape(&mut self, shape: &Shape) -> RenderResult<()> {
        match shape {
            Shape::Empty => {}
            Shape::Compound(children) => {
                for child in children {
                    self.draw_shape(child)?;
                }
            }
            Shape::Fill(f) => self.draw_fill_shape(f),
            Shape::Text(t) => self.draw_fill_shape(&t.outline),
            Shape::Polyline(p) => {
                self.filler = Filler::for_paint(&p.paint, &p.transform);
                if !self.filler.is_none() {
                    self.draw(
                        Outline::Stroke(&p.path, &p.stroke),
                        DrawParams {
                            clip: p.clip.as_ref(),
                            composite: p.composite,
                            global_alpha: p.global_alpha,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

impl Bitmap32 {
    /// Canvas drawing into this bitmap.
    pub fn context2d(self, antialiasing: bool) -> RenderResult<Context2d<Bitmap32Context2d>> {
        Ok(Context2d::new(Bitmap32Context2d::new(self, antialiasing)?))
    }
}

// ============================================================================
// Tests
// ============================================================================
