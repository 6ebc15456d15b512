//! Integration tests for resource loading
//!
//! Assets are written to a temporary directory and loaded through a Scene's
//! resource manager onto the headless backend.
//!
//! Run with: cargo test --test resource_integration_tests

use std::fs;
use std::path::Path;
use std::time::Duration;
use lumen_engine::lumen::graphics::{
    Cubemap, CubemapSide, HeadlessBackend, HeadlessProbe, GraphicsContext, ImageTarget,
    ShaderProgram, Texture, Texture2D, TextureFilter,
};
use lumen_engine::lumen::resource::ResourceStatus;
use lumen_engine::lumen::scene::Scene;
use lumen_engine::lumen::{EngineConfig, Error};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

/// Lay out a small asset tree:
///
/// ```text
/// textures/sky.cubemap + sky.raw
/// textures/icon.texture2d + icon.raw
/// shaders/sprite.shader + sprite.vert + sprite.frag
/// ```
fn write_assets(root: &Path) {
    let textures = root.join("textures");
    let shaders = root.join("shaders");
    fs::create_dir_all(&textures).unwrap();
    fs::create_dir_all(&shaders).unwrap();

    fs::write(
        textures.join("sky.cubemap"),
        r#"{ "width": 2, "height": 2, "format": "RGBA_UINT8", "filter": "trilinear",
             "mip_map_count": 2, "data_file": "sky.raw" }"#,
    )
    .unwrap();
    let sky: Vec<u8> = (0..6u8).flat_map(|face| std::iter::repeat(face * 10).take(16)).collect();
    fs::write(textures.join("sky.raw"), sky).unwrap();

    fs::write(
        textures.join("icon.texture2d"),
        r#"{ "width": 1, "height": 1, "format": "RGB_UINT8", "filter": "point", "data_file": "icon.raw" }"#,
    )
    .unwrap();
    fs::write(textures.join("icon.raw"), [1u8, 2, 3]).unwrap();

    fs::write(
        shaders.join("sprite.shader"),
        r#"{ "vertex_shader": "sprite.vert", "fragment_shader": "sprite.frag", "samplers": ["sprite_texture"] }"#,
    )
    .unwrap();
    fs::write(shaders.join("sprite.vert"), "void main() { gl_Position = vec4(0.0); }").unwrap();
    fs::write(shaders.join("sprite.frag"), "void main() {}").unwrap();
}

fn scene_for(root: &Path) -> (Scene, HeadlessProbe) {
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    let config = EngineConfig::default().with_search_path(root);
    let scene = Scene::new("assets", GraphicsContext::new_shared(backend), &config).unwrap();
    (scene, probe)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_integration_load_all_resource_types() {
    let dir = TempDir::new().unwrap();
    write_assets(dir.path());
    let (scene, probe) = scene_for(dir.path());
    let resources = scene.resource_manager();

    let sky = resources.load::<Cubemap>("textures/sky.cubemap").unwrap();
    let icon = resources.load::<Texture2D>("textures/icon.texture2d").unwrap();
    let sprite = resources.load::<ShaderProgram>("shaders/sprite.shader").unwrap();

    assert_eq!(sky.description().filter, TextureFilter::Trilinear);
    assert_eq!(
        probe.image(sky.handle(), ImageTarget::CubemapFace(CubemapSide::NegativeX), 0),
        Some(vec![10u8; 16])
    );
    assert_eq!(
        probe.image_size(sky.handle(), ImageTarget::CubemapFace(CubemapSide::NegativeX), 1),
        Some((1, 1))
    );
    assert_eq!(probe.image(icon.handle(), ImageTarget::Texture2D, 0), Some(vec![1, 2, 3]));
    assert_eq!(sprite.sampler_unit("sprite_texture"), Some(0));
    assert_eq!(resources.len(), 3);
}

#[test]
fn test_integration_repeated_loads_share_one_gpu_object() {
    let dir = TempDir::new().unwrap();
    write_assets(dir.path());
    let (scene, probe) = scene_for(dir.path());

    let first = scene.resource_manager().load::<Texture2D>("textures/icon.texture2d").unwrap();
    let second = scene.resource_manager().load::<Texture2D>("textures/icon.texture2d").unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(probe.calls().create_texture, 1);
}

#[test]
fn test_integration_same_file_as_different_types() {
    let dir = TempDir::new().unwrap();
    write_assets(dir.path());
    // A 2D texture description is not a valid cubemap: 3 bytes is not six faces
    let (scene, _probe) = scene_for(dir.path());

    let as_cubemap = scene.resource_manager().load::<Cubemap>("textures/icon.texture2d");

    assert!(matches!(as_cubemap, Err(Error::InvalidResource(_))));
    assert!(scene.resource_manager().load::<Texture2D>("textures/icon.texture2d").is_ok());
}

#[test]
fn test_integration_unused_resources_are_released_after_collection() {
    let dir = TempDir::new().unwrap();
    write_assets(dir.path());
    let (mut scene, probe) = scene_for(dir.path());

    let sky = scene.resource_manager().load::<Cubemap>("textures/sky.cubemap").unwrap();
    let handle = sky.handle();
    drop(sky);

    assert_eq!(scene.resource_manager().collect_unused(), 1);
    assert_eq!(
        scene.resource_manager().status::<Cubemap>("textures/sky.cubemap"),
        ResourceStatus::Unloaded
    );
    // Deletion happens at the frame's release point
    assert!(probe.texture_exists(handle));
    scene.frame(Duration::from_millis(16), &[]);
    assert!(!probe.texture_exists(handle));
}

#[test]
fn test_integration_missing_data_file_reports_path() {
    let dir = TempDir::new().unwrap();
    write_assets(dir.path());
    fs::remove_file(dir.path().join("textures/icon.raw")).unwrap();
    let (scene, probe) = scene_for(dir.path());

    match scene.resource_manager().load::<Texture2D>("textures/icon.texture2d") {
        Err(Error::Io { path, .. }) => assert!(path.ends_with("icon.raw")),
        other => panic!("expected Io error, got {:?}", other),
    }
    assert_eq!(probe.texture_count(), 0);
}
