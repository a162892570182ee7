//! Canvas-style drawing state machine.
//!
//! `Context2d` owns the current `State` and a save stack, builds paths in
//! device space (points go through the current transform as they are added),
//! and hands finished fills and strokes to a `Renderer` backend.

use crate::basics::Winding;
use crate::color::Rgba8;
use crate::comp_op::CompositeOperation;
use crate::paint::Paint;
use crate::stroke::{LineCap, LineJoin, StrokeInfo};
use crate::trans_affine::TransAffine;
use crate::vector_path::VectorPath;

// ============================================================================
// State
// ============================================================================

/// Drawing state captured by `save` and restored by `restore`.
#[derive(Debug, Clone)]
pub struct State {
    pub transform: TransAffine,
    /// Device-space clip; its winding is the clip winding.
    pub clip: Option<VectorPath>,
    /// Current path in device space. Not part of the saved state.
    pub path: VectorPath,
    pub line_width: f64,
    pub start_line_cap: LineCap,
    pub end_line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub stroke_style: Paint,
    pub fill_style: Paint,
    pub global_alpha: f64,
    pub global_composite_operation: CompositeOperation,
    pub line_dash: Option<Vec<f64>>,
    pub line_dash_offset: f64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: TransAffine::new(),
            clip: None,
            path: VectorPath::new(),
            line_width: 1.0,
            start_line_cap: LineCap::Butt,
            end_line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            stroke_style: Paint::Color(Rgba8::BLACK),
            fill_style: Paint::Color(Rgba8::BLACK),
            global_alpha: 1.0,
            global_composite_operation: CompositeOperation::SOURCE_OVER,
            line_dash: None,
            line_dash_offset: 0.0,
        }
    }
}

impl State {
    /// Line width in device pixels.
    pub fn scaled_line_width(&self) -> f64 {
        self.line_width * self.transform.scale_avg()
    }

    /// Device-space stroke parameters.
    pub fn stroke_info(&self) -> StrokeInfo {
        let scale = self.transform.scale_avg();
        StrokeInfo {
            thickness: self.scaled_line_width(),
            start_cap: self.start_line_cap,
            end_cap: self.end_line_cap,
            join: self.line_join,
            miter_limit: self.miter_limit,
            dash: self
                .line_dash
                .as_ref()
                .map(|d| d.iter().map(|v| v * scale).collect()),
            dash_offset: self.line_dash_offset * scale,
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Backend receiving finished fill and stroke operations.
pub trait Renderer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Draw `state.path`. `fill` selects fill versus stroke; `winding`
    /// overrides the path's own rule for fills.
    fn render_final(&mut self, state: &State, fill: bool, winding: Option<Winding>);
}

// ============================================================================
// Context2d
// ============================================================================

pub struct Context2d<R: Renderer> {
    renderer: R,
    state: State,
    stack: Vec<State>,
}

impl<R: Renderer> Context2d<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            state: State::default(),
            stack: Vec::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn width(&self) -> u32 {
        self.renderer.width()
    }

    pub fn height(&self) -> u32 {
        self.renderer.height()
    }

    // ------------------------------------------------------------------------
    // State stack
    // ------------------------------------------------------------------------

    pub fn save(&mut self) {
        let mut saved = self.state.clone();
        saved.path.clear();
        self.stack.push(saved);
    }

    /// Pop the last saved state. The current path survives. Unbalanced
    /// calls are ignored.
    pub fn restore(&mut self) {
        let Some(mut prev) = self.stack.pop() else {
            log::trace!("restore without matching save");
            return;
        };
        prev.path = std::mem::take(&mut self.state.path);
        self.state = prev;
    }

    // ------------------------------------------------------------------------
    // Transform
    // ------------------------------------------------------------------------

    pub fn translate(&mut self, x: f64, y: f64) {
        self.state.transform.pre_translate(x, y);
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform.pre_scale(sx, sy);
    }

    pub fn rotate(&mut self, angle: f64) {
        self.state.transform.pre_rotate(angle);
    }

    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.state
            .transform
            .premultiply(&TransAffine::new_custom(a, b, c, d, e, f));
    }

    pub fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.state.transform = TransAffine::new_custom(a, b, c, d, e, f);
    }

    // ------------------------------------------------------------------------
    // Path building
    // ------------------------------------------------------------------------

    #[inline]
    fn device(&self, x: f64, y: f64) -> (f64, f64) {
        let (mut x, mut y) = (x, y);
        self.state.transform.transform(&mut x, &mut y);
        (x, y)
    }

    pub fn begin_path(&mut self) {
        self.state.path.clear();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        let (x, y) = self.device(x, y);
        self.state.path.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        let (x, y) = self.device(x, y);
        self.state.path.line_to(x, y);
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        let (cx, cy) = self.device(cx, cy);
        let (x, y) = self.device(x, y);
        self.state.path.quad_to(cx, cy, x, y);
    }

    pub fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        let (c1x, c1y) = self.device(c1x, c1y);
        let (c2x, c2y) = self.device(c2x, c2y);
        let (x, y) = self.device(x, y);
        self.state.path.cubic_to(c1x, c1y, c2x, c2y, x, y);
    }

    pub fn close_path(&mut self) {
        self.state.path.close();
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.close_path();
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64) {
        let mut local = VectorPath::new();
        local.circle(cx, cy, r);
        self.state
            .path
            .append(&local.transformed(&self.state.transform));
    }

    // ------------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------------

    /// Fill the current path, optionally overriding its winding.
    pub fn fill(&mut self, winding: Option<Winding>) {
        if self.state.fill_style.is_none() || self.state.path.is_empty() {
            return;
        }
        self.renderer.render_final(&self.state, true, winding);
    }

    pub fn stroke(&mut self) {
        if self.state.stroke_style.is_none()
            || self.state.path.is_empty()
            || !(self.state.line_width > 0.0)
        {
            return;
        }
        self.renderer.render_final(&self.state, false, None);
    }

    /// Fill a rectangle without touching the current path.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let saved = std::mem::take(&mut self.state.path);
        self.rect(x, y, w, h);
        self.fill(None);
        self.state.path = saved;
    }

    /// Stroke a rectangle without touching the current path.
    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let saved = std::mem::take(&mut self.state.path);
        self.rect(x, y, w, h);
        self.stroke();
        self.state.path = saved;
    }

    /// Move the current path into the clip (non-zero unless `winding` says
    /// otherwise). A nested clip replaces the previous one until the
    /// enclosing `restore`.
    pub fn clip(&mut self, winding: Option<Winding>) {
        let mut clip = self.state.path.clone();
        clip.set_winding(winding.unwrap_or(Winding::NonZero));
        if self.state.clip.is_some() {
            log::debug!("nested clip replaces the previous clip path");
        }
        self.state.clip = Some(clip);
        self.state.path.clear();
    }

    pub fn unclip(&mut self) {
        self.state.clip = None;
    }

    // ------------------------------------------------------------------------
    // Style setters
    // ------------------------------------------------------------------------

    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    /// Set both start and end caps.
    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.start_line_cap = cap;
        self.state.end_line_cap = cap;
    }

    pub fn set_start_line_cap(&mut self, cap: LineCap) {
        self.state.start_line_cap = cap;
    }

    pub fn set_end_line_cap(&mut self, cap: LineCap) {
        self.state.end_line_cap = cap;
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    pub fn set_miter_limit(&mut self, limit: f64) {
        self.state.miter_limit = limit;
    }

    pub fn set_fill_style(&mut self, paint: impl Into<Paint>) {
        self.state.fill_style = paint.into();
    }

    pub fn set_stroke_style(&mut self, paint: impl Into<Paint>) {
        self.state.stroke_style = paint.into();
    }

    pub fn set_global_alpha(&mut self, alpha: f64) {
        self.state.global_alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn set_global_composite_operation(&mut self, op: impl Into<CompositeOperation>) {
        self.state.global_composite_operation = op.into();
    }

    /// Empty pattern means a solid line.
    pub fn set_line_dash(&mut self, pattern: &[f64]) {
        self.state.line_dash = if pattern.is_empty() {
            None
        } else {
            Some(pattern.to_vec())
        };
    }

    pub fn set_line_dash_offset(&mut self, offset: f64) {
        self.state.line_dash_offset = offset;
    }
}

// ============================================================================
// Tests
// ============================================================================
