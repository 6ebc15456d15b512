/// Per-draw configuration: shader program, blend state and primitive range.
///
/// A `DrawItem` is built for one `GraphicsContext::draw` call and not
/// retained; every draw fully specifies its own blend configuration.

use glam::Vec4;
use crate::graphics::shader_program::ShaderProgram;

/// Blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFunction {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Factor applied to the incoming (source) color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    DestinationColor,
    OneMinusDestinationColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SourceAlphaSaturate,
}

/// Factor applied to the color already in the target (destination)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationBlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    DestinationColor,
    OneMinusDestinationColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

/// Blend configuration of a single draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    /// Blending enabled; when false the remaining fields are ignored
    pub enabled: bool,
    pub color_function: BlendFunction,
    pub source_color_factor: SourceBlendFactor,
    pub destination_color_factor: DestinationBlendFactor,
    pub alpha_function: BlendFunction,
    pub source_alpha_factor: SourceBlendFactor,
    pub destination_alpha_factor: DestinationBlendFactor,
    /// Constant used by the `Constant*` factors (RGBA)
    pub constant_color: Vec4,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            color_function: BlendFunction::Add,
            source_color_factor: SourceBlendFactor::SourceAlpha,
            destination_color_factor: DestinationBlendFactor::OneMinusSourceAlpha,
            alpha_function: BlendFunction::Add,
            source_alpha_factor: SourceBlendFactor::One,
            destination_alpha_factor: DestinationBlendFactor::OneMinusSourceAlpha,
            constant_color: Vec4::ZERO,
        }
    }
}

impl BlendState {
    /// Blending disabled
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Standard alpha blending (`src * a + dst * (1 - a)`)
    pub fn alpha_blending() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Additive blending weighted by a constant color
    pub fn additive_constant(constant_color: Vec4) -> Self {
        Self {
            enabled: true,
            color_function: BlendFunction::Add,
            source_color_factor: SourceBlendFactor::ConstantColor,
            destination_color_factor: DestinationBlendFactor::One,
            constant_color,
            ..Self::default()
        }
    }
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Transient description of one draw call
#[derive(Clone, Copy)]
pub struct DrawItem<'a> {
    pub shader_program: &'a ShaderProgram,
    pub blend_state: BlendState,
    pub primitive_topology: PrimitiveTopology,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

impl<'a> DrawItem<'a> {
    /// Draw `vertex_count` vertices from 0 with blending disabled
    pub fn new(shader_program: &'a ShaderProgram, primitive_topology: PrimitiveTopology, vertex_count: u32) -> Self {
        Self {
            shader_program,
            blend_state: BlendState::default(),
            primitive_topology,
            first_vertex: 0,
            vertex_count,
        }
    }

    /// Replace the blend state
    pub fn with_blend_state(mut self, blend_state: BlendState) -> Self {
        self.blend_state = blend_state;
        self
    }
}
