//! # korge-raster
//!
//! Software scanline rasterizer and compositor for 2D vector graphics, with
//! a canvas-style drawing API and a stencil-based GPU rendering path that
//! shares the same shape and paint model.
//!
//! ## Architecture
//!
//! A draw call flows through four stages:
//!
//! 1. **Canvas state** ([`context2d`]): transforms, clip, paints, line style,
//!    and the current path, built in device space.
//! 2. **Outline** ([`stroke`], [`dash`]): strokes become non-zero fill
//!    polygons.
//! 3. **Scanline rasterizer** ([`rasterizer`]): fixed-point edges are
//!    sampled on sub-rows and merged into horizontal spans per pixel row,
//!    honouring the winding rule and the clip polygon.
//! 4. **Scanline writer** ([`scanline_writer`]): spans accumulate coverage,
//!    then a [`filler`] produces source colours that are composited into a
//!    [`bitmap32::Bitmap32`] with a [`comp_op::CompositeOperation`].
//!
//! Drawing can also be recorded into a [`shape::Shape`] tree and replayed
//! through either backend: [`bitmap32_context2d::Bitmap32Context2d`] on the
//! CPU, or [`gpu_shape_view::GpuShapeView`] which emits stencil-then-cover
//! draw commands for any [`gpu_commands::RenderContext`].

// Phase 1: Foundation Types & Math
pub mod basics;
pub mod color;
pub mod error;
pub mod trans_affine;

// Phase 2: Geometry
pub mod curves;
pub mod vector_path;

// Phase 3: Scanline Rasterizer
pub mod polygon_scanline;
pub mod rasterizer;
pub mod segment_set;

// Phase 4: Pixels, Paints & Compositing
pub mod bitmap32;
pub mod comp_op;
pub mod filler;
pub mod gradient_lut;
pub mod paint;
pub mod scanline_writer;

// Phase 5: Outlines
pub mod dash;
pub mod stroke;

// Phase 6: Canvas & Shapes
pub mod bitmap32_context2d;
pub mod context2d;
pub mod shape;

// Phase 7: GPU Path
pub mod gpu_commands;
pub mod gpu_programs;
pub mod gpu_shape_view;
pub mod gpu_software;

pub use basics::Winding;
pub use bitmap32::Bitmap32;
pub use bitmap32_context2d::Bitmap32Context2d;
pub use color::{PremulRgba8, Rgba8};
pub use comp_op::{BlendMode, CompositeMode, CompositeOperation};
pub use context2d::{Context2d, Renderer, State};
pub use error::{RenderError, RenderResult};
pub use paint::Paint;
pub use shape::{Shape, ShapeRenderer};
pub use stroke::{LineCap, LineJoin, StrokeInfo};
pub use trans_affine::TransAffine;
pub use vector_path::VectorPath;
