//! Unit tests for the GPU asset loaders

use super::*;
use std::fs;
use serde_json::json;
use tempfile::TempDir;
use crate::graphics::backend::{CubemapSide, ImageTarget};
use crate::graphics::context::GraphicsContext;
use crate::graphics::headless::{HeadlessBackend, HeadlessProbe};
use crate::graphics::texture::Texture;

// ============================================================================
// Helper Functions
// ============================================================================

fn shared_context() -> (SharedGraphicsContext, HeadlessProbe) {
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    (GraphicsContext::new_shared(backend), probe)
}

fn sky_description() -> Value {
    json!({
        "width": 2,
        "height": 2,
        "format": "RGB_UINT8",
        "filter": "bilinear",
        "data_file": "sky.raw"
    })
}

/// Six 2x2 RGB faces, face i filled with i
fn write_sky_pixels(directory: &Path) {
    let pixels: Vec<u8> = (0..6u8).flat_map(|face| std::iter::repeat(face).take(12)).collect();
    fs::write(directory.join("sky.raw"), pixels).unwrap();
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_full_description() {
    let description = json!({
        "width": 64, "height": 32, "format": "RGBA_UINT8", "filter": "trilinear",
        "data_file": "t.raw", "mip_map_count": 4
    });

    let asset = parse_texture2d_description("t.texture2d", &description).unwrap();

    assert_eq!(asset.description.width, 64);
    assert_eq!(asset.description.height, 32);
    assert_eq!(asset.description.format, TextureFormat::RGBA_UINT8);
    assert_eq!(asset.description.filter, TextureFilter::Trilinear);
    assert_eq!(asset.description.mip_map_count, 4);
    assert_eq!(asset.data_file, "t.raw");
}

#[test]
fn test_parse_defaults_to_single_mip_level() {
    let asset = parse_cubemap_description("sky.cubemap", &sky_description()).unwrap();
    assert_eq!(asset.description.mip_map_count, 1);
}

#[test]
fn test_parse_errors_name_the_field() {
    let cases = [
        ("filter", json!({ "width": 1, "height": 1, "format": "RGB_UINT8", "filter": "fancy", "data_file": "x" })),
        ("format", json!({ "width": 1, "height": 1, "format": "BGR", "filter": "point", "data_file": "x" })),
        ("width", json!({ "height": 1, "format": "RGB_UINT8", "filter": "point", "data_file": "x" })),
        ("height", json!({ "width": 1, "height": -3, "format": "RGB_UINT8", "filter": "point", "data_file": "x" })),
        ("data_file", json!({ "width": 1, "height": 1, "format": "RGB_UINT8", "filter": "point" })),
        ("mip_map_count", json!({ "width": 1, "height": 1, "format": "RGB_UINT8", "filter": "point", "data_file": "x", "mip_map_count": "two" })),
    ];

    for (expected_field, description) in cases {
        match parse_cubemap_description("bad.cubemap", &description) {
            Err(Error::InvalidAsset { id, field, .. }) => {
                assert_eq!(id, "bad.cubemap");
                assert_eq!(field, expected_field);
            }
            other => panic!("expected InvalidAsset for {}, got {:?}", expected_field, other),
        }
    }
}

// ============================================================================
// load_cubemap
// ============================================================================

#[test]
fn test_load_cubemap_registers_resource() {
    let dir = TempDir::new().unwrap();
    write_sky_pixels(dir.path());
    let (context, probe) = shared_context();
    let manager = ResourceManager::new();

    let handle = load_cubemap(&context, &manager, &sky_description(), "sky.cubemap", dir.path()).unwrap();

    assert!(manager.get::<Cubemap>("sky.cubemap").unwrap().ptr_eq(&handle));
    let face = probe
        .image(handle.handle(), ImageTarget::CubemapFace(CubemapSide::PositiveZ), 0)
        .unwrap();
    assert_eq!(face, vec![4; 12]);
}

#[test]
fn test_load_cubemap_invalid_filter_never_registers() {
    let dir = TempDir::new().unwrap();
    write_sky_pixels(dir.path());
    let (context, probe) = shared_context();
    let manager = ResourceManager::new();
    let mut description = sky_description();
    description["filter"] = json!("blurry");

    let result = load_cubemap(&context, &manager, &description, "sky.cubemap", dir.path());

    assert!(matches!(result, Err(Error::InvalidAsset { .. })));
    assert!(!manager.contains::<Cubemap>("sky.cubemap"));
    assert_eq!(probe.calls().total(), 0);
}

#[test]
fn test_load_cubemap_missing_data_file() {
    let dir = TempDir::new().unwrap();
    let (context, _probe) = shared_context();
    let manager = ResourceManager::new();

    let result = load_cubemap(&context, &manager, &sky_description(), "sky.cubemap", dir.path());

    assert!(matches!(result, Err(Error::Io { .. })));
    assert!(manager.is_empty());
}

#[test]
fn test_load_cubemap_twice_keeps_first() {
    let dir = TempDir::new().unwrap();
    write_sky_pixels(dir.path());
    let (context, probe) = shared_context();
    let manager = ResourceManager::new();

    let first = load_cubemap(&context, &manager, &sky_description(), "sky.cubemap", dir.path()).unwrap();
    let second = load_cubemap(&context, &manager, &sky_description(), "sky.cubemap", dir.path());

    assert!(matches!(second, Err(Error::AlreadyExists(_))));
    assert!(manager.get::<Cubemap>("sky.cubemap").unwrap().ptr_eq(&first));

    // The rejected duplicate was released back to the context
    lock_context(&context).unwrap().flush_released();
    assert_eq!(probe.texture_count(), 1);
}

// ============================================================================
// Typed loaders
// ============================================================================

#[test]
fn test_registered_loaders_build_all_types() {
    let dir = TempDir::new().unwrap();
    write_sky_pixels(dir.path());
    fs::write(dir.path().join("sky.cubemap"), sky_description().to_string()).unwrap();
    fs::write(dir.path().join("icon.raw"), [255u8; 16]).unwrap();
    fs::write(
        dir.path().join("icon.texture2d"),
        r#"{ "width": 2, "height": 2, "format": "RGBA_UINT8", "filter": "point", "data_file": "icon.raw" }"#,
    )
    .unwrap();
    fs::write(dir.path().join("sprite.vert"), "void main() {}").unwrap();
    fs::write(dir.path().join("sprite.frag"), "void main() {}").unwrap();
    fs::write(
        dir.path().join("sprite.shader"),
        r#"{ "vertex_shader": "sprite.vert", "fragment_shader": "sprite.frag", "samplers": ["sprite_texture"] }"#,
    )
    .unwrap();

    let (context, probe) = shared_context();
    let mut manager = ResourceManager::new();
    manager.add_search_path(dir.path());
    register_graphics_loaders(&mut manager, &context).unwrap();

    let sky = manager.load::<Cubemap>("sky.cubemap").unwrap();
    let icon = manager.load::<Texture2D>("icon.texture2d").unwrap();
    let shader = manager.load::<ShaderProgram>("sprite.shader").unwrap();

    assert_eq!(sky.description().width, 2);
    assert_eq!(
        probe.image(icon.handle(), ImageTarget::Texture2D, 0),
        Some(vec![255u8; 16])
    );
    assert_eq!(shader.sampler_unit("sprite_texture"), Some(0));
    assert_eq!(
        probe.program_sources(shader.handle()),
        Some(("void main() {}".to_string(), "void main() {}".to_string()))
    );
}

#[test]
fn test_shader_samplers_must_be_strings() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.vert"), "v").unwrap();
    fs::write(dir.path().join("a.frag"), "f").unwrap();
    let (context, _probe) = shared_context();
    let description = json!({ "vertex_shader": "a.vert", "fragment_shader": "a.frag", "samplers": [1] });

    let result = build_shader_program(&context, &description, "a.shader", dir.path());

    assert!(matches!(result, Err(Error::InvalidAsset { ref field, .. }) if field == "samplers"));
}

#[test]
fn test_register_graphics_loaders_twice_fails() {
    let (context, _probe) = shared_context();
    let mut manager = ResourceManager::new();

    register_graphics_loaders(&mut manager, &context).unwrap();

    assert!(matches!(
        register_graphics_loaders(&mut manager, &context),
        Err(Error::AlreadyExists(_))
    ));
}
