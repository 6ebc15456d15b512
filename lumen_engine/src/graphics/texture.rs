/// 2D textures, texture descriptions and the format/filter tables
///
/// A texture is created from an immutable `TextureDescription`. The
/// description is validated completely before the first backend call, so a
/// rejected description never leaves a half-built texture object behind.

use crate::error::{Error, Result};
use crate::graphics::backend::{
    TextureHandle, TextureTarget, ImageTarget, ImageRegion, FormatTriple,
    InternalFormat, SourceFormat, SourceType, SamplerParameters,
    MinFilter, MagFilter, WrapMode,
};
use crate::graphics::context::{GraphicsContext, ReleaseQueue, ReleasedObject};

// ============================================================================
// Format & filter
// ============================================================================

/// Pixel format of a texture
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    RGB_UINT8,
    RGBA_UINT8,
}

impl TextureFormat {
    /// Parse the name used in asset descriptions
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "RGB_UINT8" => Some(TextureFormat::RGB_UINT8),
            "RGBA_UINT8" => Some(TextureFormat::RGBA_UINT8),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextureFormat::RGB_UINT8 => "RGB_UINT8",
            TextureFormat::RGBA_UINT8 => "RGBA_UINT8",
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        format_mapping(self).bytes_per_pixel()
    }
}

/// Sampling quality of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Point,
    Bilinear,
    /// Needs more than one mip level
    Trilinear,
}

impl TextureFilter {
    /// Parse the name used in asset descriptions
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "point" => Some(TextureFilter::Point),
            "bilinear" => Some(TextureFilter::Bilinear),
            "trilinear" => Some(TextureFilter::Trilinear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextureFilter::Point => "point",
            TextureFilter::Bilinear => "bilinear",
            TextureFilter::Trilinear => "trilinear",
        }
    }
}

/// Backend format triple of a texture format
pub fn format_mapping(format: TextureFormat) -> FormatTriple {
    match format {
        TextureFormat::RGB_UINT8 => FormatTriple {
            internal_format: InternalFormat::Rgb8,
            source_format: SourceFormat::Rgb,
            source_type: SourceType::UnsignedByte,
        },
        TextureFormat::RGBA_UINT8 => FormatTriple {
            internal_format: InternalFormat::Rgba8,
            source_format: SourceFormat::Rgba,
            source_type: SourceType::UnsignedByte,
        },
    }
}

/// Minification and magnification filters for a filter and mip level count
///
/// Trilinear filtering with a single level fails with `PreconditionFailed`.
pub fn sampler_filters(filter: TextureFilter, mip_map_count: u32) -> Result<(MinFilter, MagFilter)> {
    let mipmapped = mip_map_count > 1;
    match filter {
        TextureFilter::Point if mipmapped => Ok((MinFilter::NearestMipmapNearest, MagFilter::Nearest)),
        TextureFilter::Point => Ok((MinFilter::Nearest, MagFilter::Nearest)),
        TextureFilter::Bilinear if mipmapped => Ok((MinFilter::LinearMipmapNearest, MagFilter::Linear)),
        TextureFilter::Bilinear => Ok((MinFilter::Linear, MagFilter::Linear)),
        TextureFilter::Trilinear if mipmapped => Ok((MinFilter::LinearMipmapLinear, MagFilter::Linear)),
        TextureFilter::Trilinear => Err(Error::PreconditionFailed(format!(
            "trilinear filtering requires more than one mip level (got {})",
            mip_map_count
        ))),
    }
}

// ============================================================================
// Description
// ============================================================================

/// Immutable description of a texture (2D or cubemap face)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: TextureFilter,
    pub mip_map_count: u32,
}

impl TextureDescription {
    /// Single-level description
    pub fn new(width: u32, height: u32, format: TextureFormat, filter: TextureFilter) -> Self {
        Self {
            width,
            height,
            format,
            filter,
            mip_map_count: 1,
        }
    }

    pub fn with_mip_map_count(mut self, mip_map_count: u32) -> Self {
        self.mip_map_count = mip_map_count;
        self
    }

    /// Check dimensions and mip count, and return the sampler parameters
    pub fn validate(&self) -> Result<SamplerParameters> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::PreconditionFailed(format!(
                "texture dimensions must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        if self.mip_map_count == 0 {
            return Err(Error::PreconditionFailed("mip map count must be at least 1".to_string()));
        }
        let (min_filter, mag_filter) = sampler_filters(self.filter, self.mip_map_count)?;
        Ok(SamplerParameters {
            min_filter,
            mag_filter,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
        })
    }

    pub fn format_triple(&self) -> FormatTriple {
        format_mapping(self.format)
    }

    /// Size of a mip level (each level halves, down to 1)
    pub fn level_extent(&self, level: u32) -> (u32, u32) {
        let shrink = |size: u32| size.checked_shr(level).unwrap_or(0).max(1);
        (shrink(self.width), shrink(self.height))
    }

    /// Bytes of one full image at level 0
    pub fn image_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Check a sub-region write against this description
    pub(crate) fn validate_write(&self, level: u32, region: ImageRegion, data: &[u8]) -> Result<()> {
        if level >= self.mip_map_count {
            return Err(Error::InvalidResource(format!(
                "mip level {} out of range ({} levels)",
                level, self.mip_map_count
            )));
        }
        let (level_width, level_height) = self.level_extent(level);
        let fits_x = region.x.checked_add(region.width).is_some_and(|end| end <= level_width);
        let fits_y = region.y.checked_add(region.height).is_some_and(|end| end <= level_height);
        if !fits_x || !fits_y {
            return Err(Error::InvalidResource(format!(
                "region {}x{} at ({}, {}) exceeds level {} size {}x{}",
                region.width, region.height, region.x, region.y, level, level_width, level_height
            )));
        }
        let expected = region.width as usize * region.height as usize * self.format.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::InvalidResource(format!(
                "write data is {} bytes, region needs {}",
                data.len(),
                expected
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Texture trait
// ============================================================================

/// GPU texture bindable to a sampling unit
pub trait Texture: Send + Sync {
    fn handle(&self) -> TextureHandle;

    fn target(&self) -> TextureTarget;

    fn description(&self) -> &TextureDescription;

    /// Bind to `unit` (elided by the context when already bound there)
    fn bind(&self, context: &mut GraphicsContext, unit: u32) {
        context.bind_texture(self.target(), unit, self.handle());
    }
}

// ============================================================================
// Texture2D
// ============================================================================

pub struct Texture2D {
    handle: TextureHandle,
    description: TextureDescription,
    release_queue: ReleaseQueue,
}

impl Texture2D {
    /// Create a texture, optionally with level 0 contents
    ///
    /// `pixels` must hold exactly width x height pixels of the format.
    pub fn new(
        context: &mut GraphicsContext,
        description: TextureDescription,
        pixels: Option<&[u8]>,
    ) -> Result<Self> {
        let parameters = description.validate()?;
        if let Some(data) = pixels {
            if data.len() != description.image_size() {
                return Err(Error::InvalidResource(format!(
                    "pixel buffer is {} bytes, expected {}",
                    data.len(),
                    description.image_size()
                )));
            }
        }

        let handle = context.backend_mut().create_texture()?;
        // Built before the uploads so a failed upload still releases the handle.
        let texture = Self {
            handle,
            description,
            release_queue: context.release_queue().clone(),
        };

        context.bind_texture(TextureTarget::Texture2D, 0, handle);
        let format = description.format_triple();
        for level in 0..description.mip_map_count {
            let (width, height) = description.level_extent(level);
            let data = if level == 0 { pixels } else { None };
            context
                .backend_mut()
                .tex_image_2d(ImageTarget::Texture2D, level, format, width, height, data)?;
        }
        context
            .backend_mut()
            .tex_parameters(TextureTarget::Texture2D, &parameters);

        crate::engine_debug!(
            "lumen::Texture2D",
            "Created {}x{} {} texture ({} levels)",
            description.width,
            description.height,
            description.format.as_str(),
            description.mip_map_count
        );
        Ok(texture)
    }

    /// Overwrite a region of one mip level
    ///
    /// Binds the texture on unit 0, then uploads.
    #[allow(clippy::too_many_arguments)]
    pub fn write(
        &self,
        context: &mut GraphicsContext,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()> {
        let region = ImageRegion { x, y, width, height };
        self.description.validate_write(level, region, data)?;
        context.bind_texture(TextureTarget::Texture2D, 0, self.handle);
        let format = self.description.format_triple();
        context.backend_mut().tex_sub_image_2d(
            ImageTarget::Texture2D,
            level,
            region,
            format.source_format,
            format.source_type,
            data,
        )
    }

    pub fn width(&self) -> u32 {
        self.description.width
    }

    pub fn height(&self) -> u32 {
        self.description.height
    }
}

impl Texture for Texture2D {
    fn handle(&self) -> TextureHandle {
        self.handle
    }

    fn target(&self) -> TextureTarget {
        TextureTarget::Texture2D
    }

    fn description(&self) -> &TextureDescription {
        &self.description
    }
}

impl Drop for Texture2D {
    fn drop(&mut self) {
        self.release_queue.push(ReleasedObject::Texture(self.handle));
    }
}

impl std::fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture2D")
            .field("handle", &self.handle)
            .field("description", &self.description)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
