//! Retained shape tree.
//!
//! A `Shape` is an immutable record of resolved drawing operations: device
//! space geometry plus the paint, transform and compositing it was drawn
//! with. `ShapeBuilder` records one by acting as a `Context2d` backend, and
//! any `ShapeRenderer` can replay it later.

use std::cell::OnceCell;

use crate::basics::{RectD, Winding};
use crate::comp_op::CompositeOperation;
use crate::context2d::{Context2d, Renderer, State};
use crate::error::RenderResult;
use crate::paint::Paint;
use crate::stroke::{stroke_to_fill, StrokeInfo};
use crate::trans_affine::TransAffine;
use crate::vector_path::VectorPath;

// ============================================================================
// Shape types
// ============================================================================

/// A filled path.
#[derive(Debug, Clone)]
pub struct FillShape {
    /// Device-space path; its winding is the fill rule.
    pub path: VectorPath,
    pub clip: Option<VectorPath>,
    pub paint: Paint,
    /// Transform the paint is mapped through.
    pub transform: TransAffine,
    pub global_alpha: f64,
    pub composite: CompositeOperation,
    convex: OnceCell<bool>,
}

impl FillShape {
    pub fn new(path: VectorPath, paint: impl Into<Paint>) -> Self {
        Self {
            path,
            clip: None,
            paint: paint.into(),
            transform: TransAffine::new(),
            global_alpha: 1.0,
            composite: CompositeOperation::SOURCE_OVER,
            convex: OnceCell::new(),
        }
    }

    pub fn with_clip(mut self, clip: Option<VectorPath>) -> Self {
        self.clip = clip;
        self
    }

    pub fn with_transform(mut self, transform: TransAffine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_global_alpha(mut self, alpha: f64) -> Self {
        self.global_alpha = alpha;
        self
    }

    pub fn with_composite(mut self, op: impl Into<CompositeOperation>) -> Self {
        self.composite = op.into();
        self
    }

    pub fn winding(&self) -> Winding {
        self.path.winding()
    }

    /// Single contour turning one way exactly once. Computed on first use.
    pub fn is_convex(&self) -> bool {
        *self.convex.get_or_init(|| path_is_convex(&self.path))
    }

    pub fn bounds(&self) -> Option<RectD> {
        self.path.bounds()
    }
}

fn path_is_convex(path: &VectorPath) -> bool {
    let contours = path.flatten(1.0);
    let [contour] = contours.as_slice() else {
        return false;
    };
    let pts = &contour.points;
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    let mut turning = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let c = pts[(i + 2) % n];
        let (ux, uy) = (b.x - a.x, b.y - a.y);
        let (vx, vy) = (c.x - b.x, c.y - b.y);
        let cross = ux * vy - uy * vx;
        if cross.abs() > 1e-12 {
            if sign != 0.0 && cross.signum() != sign {
                return false;
            }
            sign = cross.signum();
        }
        turning += cross.atan2(ux * vx + uy * vy);
    }
    // A star turns one way all along but winds twice.
    sign != 0.0 && (turning.abs() - 2.0 * std::f64::consts::PI).abs() < 1e-6
}

/// A stroked path.
#[derive(Debug, Clone)]
pub struct PolylineShape {
    pub path: VectorPath,
    pub clip: Option<VectorPath>,
    pub paint: Paint,
    pub transform: TransAffine,
    pub global_alpha: f64,
    pub composite: CompositeOperation,
    /// Device-space stroke parameters.
    pub stroke: StrokeInfo,
}

impl PolylineShape {
    /// The stroke expanded into a non-zero fill.
    pub fn to_fill(&self) -> FillShape {
        FillShape {
            path: stroke_to_fill(&self.path, &self.stroke, 1.0),
            clip: self.clip.clone(),
            paint: self.paint.clone(),
            transform: self.transform,
            global_alpha: self.global_alpha,
            composite: self.composite,
            convex: OnceCell::new(),
        }
    }
}

/// Text already converted to glyph outlines.
#[derive(Debug, Clone)]
pub struct TextShape {
    pub text: String,
    pub outline: FillShape,
}

/// A node of the shape tree.
#[derive(Debug, Clone, Default)]
pub enum Shape {
    #[default]
    Empty,
    Fill(FillShape),
    Polyline(PolylineShape),
    Text(TextShape),
    Compound(Vec<Shape>),
}

impl Shape {
    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Empty => true,
            Shape::Compound(children) => children.iter().all(Shape::is_empty),
            _ => false,
        }
    }

    /// Device-space bounds, including stroke width.
    pub fn bounds(&self) -> Option<RectD> {
        match self {
            Shape::Empty => None,
            Shape::Fill(f) => f.bounds(),
            Shape::Polyline(p) => stroke_to_fill(&p.path, &p.stroke, 1.0).bounds(),
            Shape::Text(t) => t.outline.bounds(),
            Shape::Compound(children) => children
                .iter()
                .filter_map(Shape::bounds)
                .reduce(|a, b| a.union(&b)),
        }
    }

    /// Visit every leaf in drawing order.
    pub fn for_each_leaf<F: FnMut(&Shape)>(&self, f: &mut F) {
        match self {
            Shape::Empty => {}
            Shape::Compound(children) => {
                for c in children {
                    c.for_each_leaf(f);
                }
            }
            leaf => f(leaf),
        }
    }
}

// ============================================================================
// Rendering capability
// ============================================================================

/// A backend that can draw a retained shape tree.
pub trait ShapeRenderer {
    fn draw_shape(&mut self, shape: &Shape) -> RenderResult<()>;
}

// ============================================================================
// ShapeBuilder
// ============================================================================

/// `Renderer` that records operations instead of drawing them.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    width: u32,
    height: u32,
    shapes: Vec<Shape>,
}

impl ShapeBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Take the recorded shapes as one shape.
    pub fn take_shape(&mut self) -> Shape {
        let mut shapes = std::mem::take(&mut self.shapes);
        match shapes.len() {
            0 => Shape::Empty,
            1 => shapes.pop().unwrap_or_default(),
            _ => Shape::Compound(shapes),
        }
    }
}

impl Renderer for ShapeBuilder {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn render_final(&mut self, state: &State, fill: bool, winding: Option<Winding>) {
        let shape = if fill {
            let mut path = state.path.clone();
            if let Some(w) = winding {
                path.set_winding(w);
            }
            Shape::Fill(FillShape {
                path,
                clip: state.clip.clone(),
                paint: state.fill_style.clone(),
                transform: state.transform,
                global_alpha: state.global_alpha,
                composite: state.global_composite_operation,
                convex: OnceCell::new(),
            })
        } else {
            Shape::Polyline(PolylineShape {
                path: state.path.clone(),
                clip: state.clip.clone(),
                paint: state.stroke_style.clone(),
                transform: state.transform,
                global_alpha: state.global_alpha,
                composite: state.global_composite_operation,
                stroke: state.stroke_info(),
            })
        };
        self.shapes.push(shape);
    }
}

impl Context2d<ShapeBuilder> {
    /// Canvas that records into a shape tree.
    pub fn shape_builder(width: u32, height: u32) -> Self {
        Context2d::new(ShapeBuilder::new(width, height))
    }

    /// Everything drawn so far, as one shape.
    pub fn build_shape(&mut self) -> Shape {
        self.renderer_mut().take_shape()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;

    fn polygon(pts: &[(f64, f64)]) -> VectorPath {
        let mut p = VectorPath::new();
        for (i, &(x, y)) in pts.iter().enumerate() {
            if i == 0 {
                p.move_to(x, y);
            } else {
                p.line_to(x, y);
            }
        }
        p.close();
        p
    }

    #[test]
    fn test_convexity() {
        let square = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(FillShape::new(square, Rgba8::RED).is_convex());

        let l = polygon(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ]);
        assert!(!FillShape::new(l, Rgba8::RED).is_convex());

        let mut circle = VectorPath::new();
        circle.circle(50.0, 50.0, 20.0);
        assert!(FillShape::new(circle, Rgba8::RED).is_convex());
    }

    #[test]
    fn test_star_and_multi_contour_are_not_convex() {
        let star: Vec<(f64, f64)> = (0..5)
            .map(|i| {
                let a = i as f64 * 4.0 * std::f64::consts::PI / 5.0;
                (a.cos() * 10.0, a.sin() * 10.0)
            })
            .collect();
        assert!(!FillShape::new(polygon(&star), Rgba8::RED).is_convex());

        let mut two = VectorPath::new();
        two.rect(0.0, 0.0, 5.0, 5.0);
        two.rect(10.0, 0.0, 5.0, 5.0);
        assert!(!FillShape::new(two, Rgba8::RED).is_convex());
    }

    #[test]
    fn test_builder_records_fill_and_stroke() {
        let mut c = Context2d::shape_builder(100, 100);
        c.set_fill_style(Rgba8::RED);
        c.rect(10.0, 10.0, 20.0, 20.0);
        c.fill(Some(Winding::EvenOdd));
        c.set_line_width(4.0);
        c.stroke();

        let shape = c.build_shape();
        let Shape::Compound(children) = &shape else {
            panic!("expected compound, got {shape:?}");
        };
        assert_eq!(children.len(), 2);
        let Shape::Fill(f) = &children[0] else {
            panic!("expected fill");
        };
        assert_eq!(f.winding(), Winding::EvenOdd);
        assert_eq!(f.paint, Paint::Color(Rgba8::RED));
        let Shape::Polyline(p) = &children[1] else {
            panic!("expected polyline");
        };
        assert_eq!(p.stroke.thickness, 4.0);

        // Stroke bounds grow by half the width.
        let b = shape.bounds().unwrap();
        assert!((b.x1 - 8.0).abs() < 1e-9 && (b.x2 - 32.0).abs() < 1e-9);

        assert!(c.build_shape().is_empty());
    }

    #[test]
    fn test_single_recording_is_not_wrapped() {
        let mut c = Context2d::shape_builder(10, 10);
        c.fill_rect(0.0, 0.0, 5.0, 5.0);
        assert!(matches!(c.build_shape(), Shape::Fill(_)));
    }

    #[test]
    fn test_for_each_leaf_flattens_compounds() {
        let leaf = Shape::Fill(FillShape::new(VectorPath::new(), Rgba8::RED));
        let tree = Shape::Compound(vec![
            leaf.clone(),
            Shape::Empty,
            Shape::Compound(vec![leaf.clone(), leaf]),
        ]);
        let mut n = 0;
        tree.for_each_leaf(&mut |_| n += 1);
        assert_eq!(n, 3);
    }
}
