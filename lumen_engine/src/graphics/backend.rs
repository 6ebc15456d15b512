/// GraphicsBackend trait - the raw GPU capability wrapped by GraphicsContext
///
/// The trait mirrors a classic bind-to-edit API: uploads and sampler
/// parameters apply to the texture bound on the *active* unit. Only the
/// `GraphicsContext` is expected to call these methods directly; it keeps
/// the binding cache in sync with what the backend actually has bound.

use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::error::Result;
use crate::graphics::draw_item::{BlendState, PrimitiveTopology};

// ============================================================================
// Backend object handles
// ============================================================================

/// Backend texture object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Backend program object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

// ============================================================================
// Binding points and image targets
// ============================================================================

/// Binding point a texture is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    Cubemap,
}

/// One face of a cubemap, in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubemapSide {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubemapSide {
    /// All faces in the fixed face order (+X, -X, +Y, -Y, +Z, -Z)
    pub const ALL: [CubemapSide; 6] = [
        CubemapSide::PositiveX,
        CubemapSide::NegativeX,
        CubemapSide::PositiveY,
        CubemapSide::NegativeY,
        CubemapSide::PositiveZ,
        CubemapSide::NegativeZ,
    ];

    /// Position of this face in the fixed face order
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single 2D image slot of a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTarget {
    Texture2D,
    CubemapFace(CubemapSide),
}

impl ImageTarget {
    /// Binding point the owning texture must be bound to
    pub fn texture_target(self) -> TextureTarget {
        match self {
            ImageTarget::Texture2D => TextureTarget::Texture2D,
            ImageTarget::CubemapFace(_) => TextureTarget::Cubemap,
        }
    }
}

// ============================================================================
// Pixel formats
// ============================================================================

/// Storage format of a texture on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    Rgb8,
    Rgba8,
}

/// Channel layout of client pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Rgb,
    Rgba,
}

impl SourceFormat {
    pub fn channel_count(self) -> usize {
        match self {
            SourceFormat::Rgb => 3,
            SourceFormat::Rgba => 4,
        }
    }
}

/// Element type of client pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    UnsignedByte,
}

impl SourceType {
    pub fn size(self) -> usize {
        match self {
            SourceType::UnsignedByte => 1,
        }
    }
}

/// (internal format, source format, source element type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatTriple {
    pub internal_format: InternalFormat,
    pub source_format: SourceFormat,
    pub source_type: SourceType,
}

impl FormatTriple {
    /// Bytes per pixel of client data in this format
    pub fn bytes_per_pixel(&self) -> usize {
        self.source_format.channel_count() * self.source_type.size()
    }
}

/// Sub-rectangle of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// ============================================================================
// Sampler parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Sampling state applied to the texture bound on the active unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerParameters {
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

// ============================================================================
// Misc state
// ============================================================================

bitflags! {
    /// Buffers cleared by `GraphicsContext::clear`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Value written to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

// ============================================================================
// Backend trait
// ============================================================================

/// Raw GPU backend
///
/// Implemented by concrete backends (e.g. [`crate::graphics::HeadlessBackend`]).
/// Calls are issued from the frame thread only.
pub trait GraphicsBackend: Send {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Allocate a new texture object (no storage yet)
    fn create_texture(&mut self) -> Result<TextureHandle>;

    /// Delete a texture object; bindings referencing it are cleared
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Select the texture unit subsequent bind/upload calls apply to
    fn active_texture(&mut self, unit: u32);

    /// Bind a texture (or nothing) to `target` on the active unit
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureHandle>);

    /// Allocate storage for one image level, optionally with initial pixels
    fn tex_image_2d(
        &mut self,
        target: ImageTarget,
        level: u32,
        format: FormatTriple,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<()>;

    /// Overwrite a sub-region of an allocated image level
    fn tex_sub_image_2d(
        &mut self,
        target: ImageTarget,
        level: u32,
        region: ImageRegion,
        source_format: SourceFormat,
        source_type: SourceType,
        pixels: &[u8],
    ) -> Result<()>;

    /// Set sampling parameters of the texture bound to `target`
    fn tex_parameters(&mut self, target: TextureTarget, parameters: &SamplerParameters);

    /// Compile and link a program
    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle>;

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Set a uniform of the current program
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()>;

    /// Clear the selected buffers of the current surface
    fn clear(&mut self, flags: ClearFlags, color: Vec4);

    /// Apply blend state for the next draw
    fn set_blend_state(&mut self, blend: &BlendState);

    /// Submit a non-indexed draw with the current program
    fn draw_arrays(&mut self, topology: PrimitiveTopology, first_vertex: u32, vertex_count: u32) -> Result<()>;
}
