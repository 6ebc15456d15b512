/// Asset loaders for GPU resources
///
/// Descriptions are JSON objects. Texture and cubemap descriptions:
///
/// ```json
/// { "width": 64, "height": 64, "format": "RGB_UINT8", "filter": "bilinear",
///   "data_file": "sky.raw", "mip_map_count": 1 }
/// ```
///
/// `data_file` is raw pixel data relative to the description's directory
/// (six faces back to back for a cubemap). Shader descriptions name two
/// source files and optionally the sampler uniforms:
///
/// ```json
/// { "vertex_shader": "sprite.vert", "fragment_shader": "sprite.frag",
///   "samplers": ["sprite_texture"] }
/// ```

use std::path::Path;
use serde_json::Value;
use crate::error::{Error, Result};
use crate::graphics::context::{lock_context, SharedGraphicsContext};
use crate::graphics::cubemap::{Cubemap, CubemapDescription};
use crate::graphics::shader_program::ShaderProgram;
use crate::graphics::texture::{Texture2D, TextureDescription, TextureFilter, TextureFormat};
use crate::resource::{LoadRequest, ResourceHandle, ResourceManager};

// ============================================================================
// Description parsing
// ============================================================================

/// A texture description plus the file holding its pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub description: TextureDescription,
    pub data_file: String,
}

fn field<'a>(id: &str, description: &'a Value, name: &str) -> Result<&'a Value> {
    description
        .get(name)
        .ok_or_else(|| Error::invalid_asset(id, name, "missing field"))
}

fn string_field<'a>(id: &str, description: &'a Value, name: &str) -> Result<&'a str> {
    field(id, description, name)?
        .as_str()
        .ok_or_else(|| Error::invalid_asset(id, name, "expected a string"))
}

fn u32_value(id: &str, value: &Value, name: &str) -> Result<u32> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::invalid_asset(id, name, "expected an unsigned 32-bit integer"))
}

fn parse_texture_asset(id: &str, description: &Value) -> Result<TextureAsset> {
    let width = u32_value(id, field(id, description, "width")?, "width")?;
    let height = u32_value(id, field(id, description, "height")?, "height")?;

    let filter_name = string_field(id, description, "filter")?;
    let filter = TextureFilter::parse(filter_name).ok_or_else(|| {
        Error::invalid_asset(id, "filter", format!("invalid filter '{}'", filter_name))
    })?;
    let format_name = string_field(id, description, "format")?;
    let format = TextureFormat::parse(format_name).ok_or_else(|| {
        Error::invalid_asset(id, "format", format!("invalid format '{}'", format_name))
    })?;

    let mip_map_count = match description.get("mip_map_count") {
        Some(value) => u32_value(id, value, "mip_map_count")?,
        None => 1,
    };
    let data_file = string_field(id, description, "data_file")?.to_string();

    Ok(TextureAsset {
        description: TextureDescription {
            width,
            height,
            format,
            filter,
            mip_map_count,
        },
        data_file,
    })
}

/// Parse a cubemap description (`mip_map_count` defaults to 1)
pub fn parse_cubemap_description(id: &str, description: &Value) -> Result<TextureAsset> {
    parse_texture_asset(id, description)
}

/// Parse a 2D texture description (`mip_map_count` defaults to 1)
pub fn parse_texture2d_description(id: &str, description: &Value) -> Result<TextureAsset> {
    parse_texture_asset(id, description)
}

fn read_data_file(directory: &Path, data_file: &str) -> Result<Vec<u8>> {
    let path = directory.join(data_file);
    std::fs::read(&path).map_err(|e| Error::io(&path, e))
}

fn read_source_file(directory: &Path, file: &str) -> Result<String> {
    let path = directory.join(file);
    std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
}

// ============================================================================
// Builders
// ============================================================================

/// Build a cubemap from its description and the pixels next to it
pub fn build_cubemap(
    context: &SharedGraphicsContext,
    description: &Value,
    id: &str,
    directory: &Path,
) -> Result<Cubemap> {
    let asset = parse_cubemap_description(id, description)?;
    let pixels = read_data_file(directory, &asset.data_file)?;
    let cubemap_description: CubemapDescription = asset.description;
    let mut context = lock_context(context)?;
    Cubemap::new(&mut context, cubemap_description, Some(&pixels))
}

/// Build a 2D texture from its description and the pixels next to it
pub fn build_texture2d(
    context: &SharedGraphicsContext,
    description: &Value,
    id: &str,
    directory: &Path,
) -> Result<Texture2D> {
    let asset = parse_texture2d_description(id, description)?;
    let pixels = read_data_file(directory, &asset.data_file)?;
    let mut context = lock_context(context)?;
    Texture2D::new(&mut context, asset.description, Some(&pixels))
}

/// Compile a shader program from its description and the sources next to it
pub fn build_shader_program(
    context: &SharedGraphicsContext,
    description: &Value,
    id: &str,
    directory: &Path,
) -> Result<ShaderProgram> {
    let vertex_source = read_source_file(directory, string_field(id, description, "vertex_shader")?)?;
    let fragment_source = read_source_file(directory, string_field(id, description, "fragment_shader")?)?;

    let samplers: Vec<&str> = match description.get("samplers") {
        None => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .ok_or_else(|| Error::invalid_asset(id, "samplers", "expected a list of strings"))
            })
            .collect::<Result<_>>()?,
        Some(_) => return Err(Error::invalid_asset(id, "samplers", "expected a list of strings")),
    };

    let mut context = lock_context(context)?;
    ShaderProgram::new(&mut context, &vertex_source, &fragment_source, &samplers)
}

// ============================================================================
// Loaders
// ============================================================================

/// Build a cubemap and register it in `manager` under `id`
///
/// Nothing is registered when validation, file reading, construction or
/// registration fails.
pub fn load_cubemap(
    context: &SharedGraphicsContext,
    manager: &ResourceManager,
    description: &Value,
    id: &str,
    directory: &Path,
) -> Result<ResourceHandle<Cubemap>> {
    let handle = build_cubemap(context, description, id, directory)
        .and_then(|cubemap| manager.register_resource(id, cubemap))
        .map_err(|error| crate::engine_err!("lumen::Cubemap", error))?;
    crate::engine_info!("lumen::Cubemap", "Successfully loaded cubemap: {}", id);
    Ok(handle)
}

/// Install the Cubemap, Texture2D and ShaderProgram loaders
///
/// Every loader locks `context` while it builds its resource.
pub fn register_graphics_loaders(manager: &mut ResourceManager, context: &SharedGraphicsContext) -> Result<()> {
    let cubemap_context = context.clone();
    manager.register_loader(move |request: &LoadRequest| {
        build_cubemap(&cubemap_context, &request.description, &request.id, &request.directory)
    })?;

    let texture_context = context.clone();
    manager.register_loader(move |request: &LoadRequest| {
        build_texture2d(&texture_context, &request.description, &request.id, &request.directory)
    })?;

    let shader_context = context.clone();
    manager.register_loader(move |request: &LoadRequest| {
        build_shader_program(&shader_context, &request.description, &request.id, &request.directory)
    })?;

    Ok(())
}

#[cfg(test)]
#[path = "loaders_tests.rs"]
mod tests;
