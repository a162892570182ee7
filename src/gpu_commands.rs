//! GPU command layer.
//!
//! Plain data describing what a hardware backend is asked to do: vertex
//! runs with a primitive type, fixed-function blend and stencil state, and
//! the paint shader to run. `RenderContext` is the submission seam;
//! `CommandBuffer` records for later replay and `SoftwareRenderContext`
//! (in `gpu_software`) executes on the CPU.

use bytemuck::{Pod, Zeroable};

use crate::basics::RectI;
use crate::comp_op::{BlendMode, CompositeMode, CompositeOperation};
use crate::error::{RenderError, RenderResult};
use crate::gpu_programs::PaintShader;
use crate::trans_affine::TransAffine;

/// `max_len` marking a vertex that never fades.
pub const BIG_MAX_LEN: f32 = 10000.0;

// ============================================================================
// Vertices and primitives
// ============================================================================

/// Position plus signed distance to the nearest edge and the distance at
/// which coverage reaches zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ShapeVertex {
    pub x: f32,
    pub y: f32,
    pub len: f32,
    pub max_len: f32,
}

impl ShapeVertex {
    pub const fn new(x: f32, y: f32, len: f32, max_len: f32) -> Self {
        Self { x, y, len, max_len }
    }

    /// Vertex with no antialiasing falloff.
    pub const fn solid(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0, BIG_MAX_LEN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawType {
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawType {
    /// Vertex index triples assembled from `count` vertices. Strip
    /// triangles alternate order so they keep the winding of the first.
    pub fn triangles(self, count: usize) -> Vec<[usize; 3]> {
        match self {
            DrawType::Triangles => (0..count / 3).map(|i| [3 * i, 3 * i + 1, 3 * i + 2]).collect(),
            DrawType::TriangleStrip => (0..count.saturating_sub(2))
                .map(|i| {
                    if i % 2 == 0 {
                        [i, i + 1, i + 2]
                    } else {
                        [i + 1, i, i + 2]
                    }
                })
                .collect(),
            DrawType::TriangleFan => (1..count.saturating_sub(1)).map(|i| [0, i, i + 1]).collect(),
        }
    }
}

// ============================================================================
// Stencil state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

impl StencilOp {
    /// New stencil value before the write mask is applied.
    pub fn apply(self, value: u8, reference: u8) -> u8 {
        match self {
            StencilOp::Keep => value,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference,
            StencilOp::Increment => value.saturating_add(1),
            StencilOp::IncrementWrap => value.wrapping_add(1),
            StencilOp::Decrement => value.saturating_sub(1),
            StencilOp::DecrementWrap => value.wrapping_sub(1),
            StencilOp::Invert => !value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    #[default]
    Always,
    Never,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareMode {
    /// `reference <op> value`, both already masked.
    pub fn test(self, reference: u8, value: u8) -> bool {
        match self {
            CompareMode::Always => true,
            CompareMode::Never => false,
            CompareMode::Equal => reference == value,
            CompareMode::NotEqual => reference != value,
            CompareMode::Less => reference < value,
            CompareMode::LessEqual => reference <= value,
            CompareMode::Greater => reference > value,
            CompareMode::GreaterEqual => reference >= value,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            CompareMode::Always => CompareMode::Never,
            CompareMode::Never => CompareMode::Always,
            CompareMode::Equal => CompareMode::NotEqual,
            CompareMode::NotEqual => CompareMode::Equal,
            CompareMode::Less => CompareMode::GreaterEqual,
            CompareMode::LessEqual => CompareMode::Greater,
            CompareMode::Greater => CompareMode::LessEqual,
            CompareMode::GreaterEqual => CompareMode::Less,
        }
    }
}

/// Stencil ops for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilFaceOps {
    pub fail: StencilOp,
    pub pass: StencilOp,
}

/// Stencil test and update, with separate front and back face ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilOpFunc {
    pub enabled: bool,
    pub compare: CompareMode,
    pub front: StencilFaceOps,
    pub back: StencilFaceOps,
}

impl StencilOpFunc {
    pub const DISABLED: StencilOpFunc = StencilOpFunc {
        enabled: false,
        compare: CompareMode::Always,
        front: StencilFaceOps {
            fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        },
        back: StencilFaceOps {
            fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        },
    };

    /// Enabled test with `Keep` everywhere.
    pub fn test(compare: CompareMode) -> Self {
        Self {
            enabled: true,
            compare,
            ..Self::DISABLED
        }
    }

    /// Same op on both faces when the test passes.
    pub fn with_pass(mut self, op: StencilOp) -> Self {
        self.front.pass = op;
        self.back.pass = op;
        self
    }

    pub fn with_pass_front_back(mut self, front: StencilOp, back: StencilOp) -> Self {
        self.front.pass = front;
        self.back.pass = back;
        self
    }

    pub fn face(&self, front: bool) -> &StencilFaceOps {
        if front {
            &self.front
        } else {
            &self.back
        }
    }
}

/// Reference value with read and write masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilReference {
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
}

impl Default for StencilReference {
    fn default() -> Self {
        Self {
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
        }
    }
}

impl StencilReference {
    pub fn new(reference: u8, read_mask: u8, write_mask: u8) -> Self {
        Self {
            reference,
            read_mask,
            write_mask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask {
        r: true,
        g: true,
        b: true,
        a: true,
    };
    pub const NONE: ColorMask = ColorMask {
        r: false,
        g: false,
        b: false,
        a: false,
    };

    pub fn is_none(&self) -> bool {
        !(self.r || self.g || self.b || self.a)
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ============================================================================
// Blending
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

/// Fixed-function blend state over premultiplied colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBlend {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_a: BlendFactor,
    pub dst_a: BlendFactor,
    pub eq_rgb: BlendEquation,
    pub eq_a: BlendEquation,
}

impl GpuBlend {
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            src_rgb: src,
            dst_rgb: dst,
            src_a: src,
            dst_a: dst,
            eq_rgb: BlendEquation::Add,
            eq_a: BlendEquation::Add,
        }
    }

    pub const NORMAL: GpuBlend = GpuBlend::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

    /// Blend state for `op`. CSS modes beyond `Normal`, `Add`, `Multiply`
    /// and `Screen` need shader blending and are rejected.
    pub fn from_composite(op: CompositeOperation) -> RenderResult<GpuBlend> {
        use BlendFactor::*;
        let blend = match op {
            CompositeOperation::Composite(mode) => {
                let (src, dst) = match mode {
                    CompositeMode::Clear => (Zero, Zero),
                    CompositeMode::Source => (One, Zero),
                    CompositeMode::Destination => (Zero, One),
                    CompositeMode::SourceOver => (One, OneMinusSrcAlpha),
                    CompositeMode::SourceIn => (DstAlpha, Zero),
                    CompositeMode::SourceOut => (OneMinusDstAlpha, Zero),
                    CompositeMode::SourceAtop => (DstAlpha, OneMinusSrcAlpha),
                    CompositeMode::DestinationOver => (OneMinusDstAlpha, One),
                    CompositeMode::DestinationIn => (Zero, SrcAlpha),
                    CompositeMode::DestinationOut => (Zero, OneMinusSrcAlpha),
                    CompositeMode::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
                    CompositeMode::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
                    CompositeMode::Lighter => (One, One),
                };
                GpuBlend::new(src, dst)
            }
            CompositeOperation::Blend(BlendMode::Normal) => GpuBlend::NORMAL,
            CompositeOperation::Blend(BlendMode::Add) => GpuBlend::new(One, One),
            // Exact over an opaque destination.
            CompositeOperation::Blend(BlendMode::Multiply) => GpuBlend {
                src_rgb: DstColor,
                dst_rgb: OneMinusSrcAlpha,
                ..GpuBlend::NORMAL
            },
            CompositeOperation::Blend(BlendMode::Screen) => GpuBlend {
                dst_rgb: OneMinusSrcColor,
                ..GpuBlend::NORMAL
            },
            CompositeOperation::Blend(_) => {
                return Err(RenderError::unsupported("gpu", format!("blend mode {}", op.name())));
            }
        };
        Ok(blend)
    }

    /// Evaluate on premultiplied `[r, g, b, a]` in `0..=1`.
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let factor = |f: BlendFactor, ch: usize| -> f32 {
            match f {
                BlendFactor::Zero => 0.0,
                BlendFactor::One => 1.0,
                BlendFactor::SrcColor => src[ch],
                BlendFactor::OneMinusSrcColor => 1.0 - src[ch],
                BlendFactor::DstColor => dst[ch],
                BlendFactor::OneMinusDstColor => 1.0 - dst[ch],
                BlendFactor::SrcAlpha => src[3],
                BlendFactor::OneMinusSrcAlpha => 1.0 - src[3],
                BlendFactor::DstAlpha => dst[3],
                BlendFactor::OneMinusDstAlpha => 1.0 - dst[3],
            }
        };
        let combine = |eq: BlendEquation, s: f32, d: f32| -> f32 {
            let v = match eq {
                BlendEquation::Add => s + d,
                BlendEquation::Subtract => s - d,
                BlendEquation::ReverseSubtract => d - s,
            };
            v.clamp(0.0, 1.0)
        };
        let mut out = [0.0; 4];
        for ch in 0..3 {
            out[ch] = combine(
                self.eq_rgb,
                src[ch] * factor(self.src_rgb, ch),
                dst[ch] * factor(self.dst_rgb, ch),
            );
        }
        out[3] = combine(self.eq_a, src[3] * factor(self.src_a, 3), dst[3] * factor(self.dst_a, 3));
        out
    }
}

// ============================================================================
// Commands
// ============================================================================

/// One draw call.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub vertices: Vec<ShapeVertex>,
    pub draw_type: DrawType,
    /// `None` writes the shader output unblended.
    pub blend: Option<GpuBlend>,
    pub stencil: StencilOpFunc,
    pub stencil_ref: StencilReference,
    pub color_mask: ColorMask,
    /// Inclusive pixel rectangle; `None` means the whole target.
    pub scissor: Option<RectI>,
    pub shader: PaintShader,
    /// Shape space to device space.
    pub transform: TransAffine,
}

impl DrawCommand {
    pub fn new(vertices: Vec<ShapeVertex>, draw_type: DrawType, shader: PaintShader) -> Self {
        Self {
            vertices,
            draw_type,
            blend: Some(GpuBlend::NORMAL),
            stencil: StencilOpFunc::DISABLED,
            stencil_ref: StencilReference::default(),
            color_mask: ColorMask::ALL,
            scissor: None,
            shader,
            transform: TransAffine::new(),
        }
    }

    /// Stencil-only pass: colour writes off, no blending.
    pub fn stencil_only(
        vertices: Vec<ShapeVertex>,
        draw_type: DrawType,
        stencil: StencilOpFunc,
        stencil_ref: StencilReference,
    ) -> Self {
        Self {
            blend: None,
            stencil,
            stencil_ref,
            color_mask: ColorMask::NONE,
            ..Self::new(vertices, draw_type, PaintShader::stencil())
        }
    }
}

/// Submission seam for GPU-style backends.
pub trait RenderContext {
    fn draw(&mut self, cmd: &DrawCommand) -> RenderResult<()>;
    fn clear_stencil(&mut self, value: u8);
    fn size(&self) -> (u32, u32);
}

/// A recorded command.
#[derive(Debug, Clone)]
pub enum GpuCommand {
    Draw(DrawCommand),
    ClearStencil(u8),
}

/// `RenderContext` that records commands for later submission.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    width: u32,
    height: u32,
    commands: Vec<GpuCommand>,
}

impl CommandBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCommand> + '_ {
        self.commands.iter().filter_map(|c| match c {
            GpuCommand::Draw(d) => Some(d),
            GpuCommand::ClearStencil(_) => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Submit everything recorded to `ctx`, in order.
    pub fn replay<C: RenderContext + ?Sized>(&self, ctx: &mut C) -> RenderResult<()> {
        for cmd in &self.commands {
            match cmd {
                GpuCommand::Draw(d) => ctx.draw(d)?,
                GpuCommand::ClearStencil(v) => ctx.clear_stencil(*v),
            }
        }
        Ok(())
    }
}

impl RenderContext for CommandBuffer {
    fn draw(&mut self, cmd: &DrawCommand) -> RenderResult<()> {
        self.commands.push(GpuCommand::Draw(cmd.clone()));
        Ok(())
    }

    fn clear_stencil(&mut self, value: u8) {
        self.commands.push(GpuCommand::ClearStencil(value));
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_assembly() {
        assert_eq!(DrawType::Triangles.triangles(7), vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(
            DrawType::TriangleStrip.triangles(5),
            vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]
        );
        assert_eq!(DrawType::TriangleFan.triangles(5), vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        assert!(DrawType::TriangleFan.triangles(2).is_empty());
    }

    #[test]
    fn test_stencil_ops_wrap() {
        assert_eq!(StencilOp::IncrementWrap.apply(255, 0), 0);
        assert_eq!(StencilOp::DecrementWrap.apply(0, 0), 255);
        assert_eq!(StencilOp::Increment.apply(255, 0), 255);
        assert_eq!(StencilOp::Invert.apply(0b1010_0000, 0), 0b0101_1111);
        assert_eq!(StencilOp::Replace.apply(3, 9), 9);
    }

    #[test]
    fn test_compare_inversion() {
        for mode in [CompareMode::Equal, CompareMode::Less, CompareMode::GreaterEqual] {
            for (r, v) in [(1, 1), (1, 2), (2, 1)] {
                assert_ne!(mode.test(r, v), mode.inverted().test(r, v));
            }
        }
    }

    #[test]
    fn test_blend_mapping() {
        let over = GpuBlend::from_composite(CompositeOperation::SOURCE_OVER).unwrap();
        let out = over.apply([0.5, 0.0, 0.0, 0.5], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(out, [0.5, 0.0, 0.5, 1.0]);

        let clear = GpuBlend::from_composite(CompositeMode::Clear.into()).unwrap();
        assert_eq!(clear.apply([1.0; 4], [1.0; 4]), [0.0; 4]);

        let screen = GpuBlend::from_composite(BlendMode::Screen.into()).unwrap();
        let out = screen.apply([0.5, 0.5, 0.5, 1.0], [0.5, 0.5, 0.5, 1.0]);
        assert!((out[0] - 0.75).abs() < 1e-6);

        assert!(matches!(
            GpuBlend::from_composite(BlendMode::Hue.into()),
            Err(RenderError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_command_buffer_records_and_replays() {
        let mut buf = CommandBuffer::new(8, 8);
        let cmd = DrawCommand::new(vec![ShapeVertex::solid(0.0, 0.0)], DrawType::Triangles, PaintShader::stencil());
        buf.draw(&cmd).unwrap();
        buf.clear_stencil(0);
        assert_eq!(buf.commands().len(), 2);
        assert_eq!(buf.draws().count(), 1);

        let mut copy = CommandBuffer::new(8, 8);
        buf.replay(&mut copy).unwrap();
        assert_eq!(copy.commands().len(), 2);
        buf.clear();
        assert!(buf.commands().is_empty());
    }
}
