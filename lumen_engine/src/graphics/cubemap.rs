/// Cubemap textures
///
/// Six faces sharing one description. Initial pixel data is a
/// single buffer holding the faces back to back in the order +X, -X, +Y, -Y,
/// +Z, -Z.

use crate::error::{Error, Result};
use crate::graphics::backend::{CubemapSide, ImageRegion, ImageTarget, TextureHandle, TextureTarget};
use crate::graphics::context::{GraphicsContext, ReleaseQueue, ReleasedObject};
use crate::graphics::texture::{Texture, TextureDescription};

/// Description of a cubemap (applies to each face)
pub type CubemapDescription = TextureDescription;

pub struct Cubemap {
    handle: TextureHandle,
    description: CubemapDescription,
    release_queue: ReleaseQueue,
}

impl Cubemap {
    /// Create a cubemap
    ///
    /// With `pixels`, the buffer must be exactly six face images long; face
    /// `i` of `CubemapSide::ALL` receives slice `i`. Without, storage is
    /// allocated and left uninitialized. Every mip level gets storage, only
    /// level 0 receives pixels.
    pub fn new(
        context: &mut GraphicsContext,
        description: CubemapDescription,
        pixels: Option<&[u8]>,
    ) -> Result<Self> {
        let parameters = description.validate()?;
        let face_size = description.image_size();
        if let Some(data) = pixels {
            if data.len() != face_size * CubemapSide::ALL.len() {
                return Err(Error::InvalidResource(format!(
                    "cubemap pixel buffer is {} bytes, expected 6 faces of {}",
                    data.len(),
                    face_size
                )));
            }
        }

        let handle = context.backend_mut().create_texture()?;
        let cubemap = Self {
            handle,
            description,
            release_queue: context.release_queue().clone(),
        };

        context.bind_texture(TextureTarget::Cubemap, 0, handle);
        let format = description.format_triple();
        for side in CubemapSide::ALL {
            let face = pixels.map(|data| &data[side.index() * face_size..(side.index() + 1) * face_size]);
            for level in 0..description.mip_map_count {
                let (width, height) = description.level_extent(level);
                let data = if level == 0 { face } else { None };
                context.backend_mut().tex_image_2d(
                    ImageTarget::CubemapFace(side),
                    level,
                    format,
                    width,
                    height,
                    data,
                )?;
            }
        }
        context
            .backend_mut()
            .tex_parameters(TextureTarget::Cubemap, &parameters);

        crate::engine_debug!(
            "lumen::Cubemap",
            "Created {}x{} {} cubemap ({} levels)",
            description.width,
            description.height,
            description.format.as_str(),
            description.mip_map_count
        );
        Ok(cubemap)
    }

    /// Overwrite a region of one face at one mip level
    ///
    /// Binds the cubemap on unit 0, then uploads.
    #[allow(clippy::too_many_arguments)]
    pub fn write(
        &self,
        context: &mut GraphicsContext,
        side: CubemapSide,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()> {
        let region = ImageRegion { x, y, width, height };
        self.description.validate_write(level, region, data)?;
        context.bind_texture(TextureTarget::Cubemap, 0, self.handle);
        let format = self.description.format_triple();
        context.backend_mut().tex_sub_image_2d(
            ImageTarget::CubemapFace(side),
            level,
            region,
            format.source_format,
            format.source_type,
            data,
        )
    }
}

impl Texture for Cubemap {
    fn handle(&self) -> TextureHandle {
        self.handle
    }

    fn target(&self) -> TextureTarget {
        TextureTarget::Cubemap
    }

    fn description(&self) -> &TextureDescription {
        &self.description
    }
}

impl Drop for Cubemap {
    fn drop(&mut self) {
        self.release_queue.push(ReleasedObject::Texture(self.handle));
    }
}

impl std::fmt::Debug for Cubemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cubemap")
            .field("handle", &self.handle)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
#[path = "cubemap_tests.rs"]
mod tests;
