//! GPU resource layer
//!
//! `GraphicsContext` wraps a `GraphicsBackend` and caches binding state.
//! Textures, cubemaps and shader programs are created through a context
//! and released back to it when dropped.

pub mod backend;
pub mod context;
pub mod cubemap;
pub mod draw_item;
pub mod headless;
pub mod loaders;
pub mod shader_program;
pub mod texture;

pub use backend::{
    GraphicsBackend, TextureHandle, ProgramHandle, TextureTarget, CubemapSide,
    ImageTarget, ImageRegion, InternalFormat, SourceFormat, SourceType, FormatTriple,
    MinFilter, MagFilter, WrapMode, SamplerParameters, ClearFlags, UniformValue,
};
pub use context::{
    GraphicsContext, SharedGraphicsContext, BindingCache, ContextStats,
    ReleaseQueue, ReleasedObject, ContextGuard, lock_context,
};
pub use cubemap::{Cubemap, CubemapDescription};
pub use draw_item::{
    DrawItem, BlendState, BlendFunction, SourceBlendFactor, DestinationBlendFactor,
    PrimitiveTopology,
};
pub use headless::{HeadlessBackend, HeadlessProbe, BackendCallCounts, DrawRecord};
pub use loaders::{
    TextureAsset, load_cubemap, register_graphics_loaders,
    parse_cubemap_description, parse_texture2d_description,
    build_cubemap, build_texture2d, build_shader_program,
};
pub use shader_program::ShaderProgram;
pub use texture::{
    Texture, Texture2D, TextureDescription, TextureFormat, TextureFilter,
    format_mapping, sampler_filters,
};
