/// Headless backend - in-memory implementation of GraphicsBackend
///
/// Stores every texture image in system memory, tracks the real binding
/// state and counts each backend call. Used by tests (as an instrumented
/// backend) and by tools that need the engine core without a window.
///
/// The backend itself is moved into a `GraphicsContext`; a `HeadlessProbe`
/// obtained before that keeps read access to the recorded state.

use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::backend::{
    GraphicsBackend, TextureHandle, ProgramHandle, TextureTarget, ImageTarget,
    FormatTriple, ImageRegion, SourceFormat, SourceType, SamplerParameters,
    ClearFlags, UniformValue,
};
use crate::graphics::draw_item::{BlendState, PrimitiveTopology};

// ============================================================================
// Recorded state
// ============================================================================

/// Number of calls received per backend entry point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCallCounts {
    pub create_texture: u32,
    pub delete_texture: u32,
    pub active_texture: u32,
    pub bind_texture: u32,
    pub tex_image: u32,
    pub tex_sub_image: u32,
    pub tex_parameters: u32,
    pub create_program: u32,
    pub delete_program: u32,
    pub use_program: u32,
    pub set_uniform: u32,
    pub clear: u32,
    pub set_blend_state: u32,
    pub draw: u32,
}

impl BackendCallCounts {
    /// Sum of all calls
    pub fn total(&self) -> u32 {
        self.create_texture
            + self.delete_texture
            + self.active_texture
            + self.bind_texture
            + self.tex_image
            + self.tex_sub_image
            + self.tex_parameters
            + self.create_program
            + self.delete_program
            + self.use_program
            + self.set_uniform
            + self.clear
            + self.set_blend_state
            + self.draw
    }
}

/// One image level stored in memory
#[derive(Debug, Clone)]
struct HeadlessImage {
    width: u32,
    height: u32,
    format: FormatTriple,
    pixels: Vec<u8>,
}

#[derive(Debug, Default)]
struct HeadlessTexture {
    /// Fixed by the first bind
    target: Option<TextureTarget>,
    images: FxHashMap<(ImageTarget, u32), HeadlessImage>,
    parameters: Option<SamplerParameters>,
}

#[derive(Debug)]
struct HeadlessProgram {
    vertex_source: String,
    fragment_source: String,
    uniforms: FxHashMap<String, UniformValue>,
}

/// A draw call as seen by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramHandle>,
    pub blend_state: Option<BlendState>,
    pub topology: PrimitiveTopology,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_name: u32,
    textures: FxHashMap<TextureHandle, HeadlessTexture>,
    programs: FxHashMap<ProgramHandle, HeadlessProgram>,
    active_unit: u32,
    bindings: FxHashMap<(TextureTarget, u32), TextureHandle>,
    current_program: Option<ProgramHandle>,
    /// Blend state applied since the last draw (consumed by the draw)
    pending_blend: Option<BlendState>,
    draws: Vec<DrawRecord>,
    clears: Vec<(ClearFlags, Vec4)>,
    errors: Vec<String>,
    calls: BackendCallCounts,
}

impl HeadlessState {
    fn next_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn bound_texture_mut(&mut self, target: TextureTarget) -> Result<(TextureHandle, &mut HeadlessTexture)> {
        let handle = *self.bindings.get(&(target, self.active_unit)).ok_or_else(|| {
            Error::BackendError(format!(
                "No texture bound to {:?} on unit {}",
                target, self.active_unit
            ))
        })?;
        let texture = self
            .textures
            .get_mut(&handle)
            .ok_or_else(|| Error::BackendError(format!("Texture {:?} does not exist", handle)))?;
        Ok((handle, texture))
    }
}

fn lock(state: &Arc<Mutex<HeadlessState>>) -> MutexGuard<'_, HeadlessState> {
    // The state is plain data; a panic elsewhere cannot leave it half-updated
    // in a way that matters for inspection.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Backend
// ============================================================================

/// In-memory graphics backend
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    /// Inspection handle sharing this backend's state
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: self.state.clone(),
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_texture(&mut self) -> Result<TextureHandle> {
        let mut state = lock(&self.state);
        state.calls.create_texture += 1;
        let handle = TextureHandle(state.next_name());
        state.textures.insert(handle, HeadlessTexture::default());
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        let mut state = lock(&self.state);
        state.calls.delete_texture += 1;
        if state.textures.remove(&texture).is_none() {
            state.errors.push(format!("delete_texture: unknown texture {:?}", texture));
        }
        state.bindings.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&mut self, unit: u32) {
        let mut state = lock(&self.state);
        state.calls.active_texture += 1;
        state.active_unit = unit;
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureHandle>) {
        let mut state = lock(&self.state);
        state.calls.bind_texture += 1;
        let unit = state.active_unit;
        let Some(handle) = texture else {
            state.bindings.remove(&(target, unit));
            return;
        };
        let mismatch = match state.textures.get_mut(&handle) {
            None => Some(format!("bind_texture: unknown texture {:?}", handle)),
            Some(tex) => match tex.target {
                None => {
                    tex.target = Some(target);
                    None
                }
                Some(existing) if existing != target => Some(format!(
                    "bind_texture: texture {:?} is a {:?}, bound as {:?}",
                    handle, existing, target
                )),
                Some(_) => None,
            },
        };
        match mismatch {
            Some(error) => state.errors.push(error),
            None => {
                state.bindings.insert((target, unit), handle);
            }
        }
    }

    fn tex_image_2d(
        &mut self,
        target: ImageTarget,
        level: u32,
        format: FormatTriple,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.tex_image += 1;
        let size = width as usize * height as usize * format.bytes_per_pixel();
        let pixels = match pixels {
            Some(data) if data.len() != size => {
                return Err(Error::BackendError(format!(
                    "tex_image_2d: expected {} bytes, got {}",
                    size,
                    data.len()
                )));
            }
            Some(data) => data.to_vec(),
            None => vec![0u8; size],
        };
        let (_, texture) = state.bound_texture_mut(target.texture_target())?;
        texture.images.insert(
            (target, level),
            HeadlessImage { width, height, format, pixels },
        );
        Ok(())
    }

    fn tex_sub_image_2d(
        &mut self,
        target: ImageTarget,
        level: u32,
        region: ImageRegion,
        source_format: SourceFormat,
        source_type: SourceType,
        pixels: &[u8],
    ) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.tex_sub_image += 1;
        let (handle, texture) = state.bound_texture_mut(target.texture_target())?;
        let image = texture.images.get_mut(&(target, level)).ok_or_else(|| {
            Error::BackendError(format!(
                "tex_sub_image_2d: {:?} level {} of texture {:?} has no storage",
                target, level, handle
            ))
        })?;

        let bpp = source_format.channel_count() * source_type.size();
        if bpp != image.format.bytes_per_pixel() {
            return Err(Error::BackendError("tex_sub_image_2d: pixel size mismatch".to_string()));
        }
        let fits_x = region.x.checked_add(region.width).is_some_and(|end| end <= image.width);
        let fits_y = region.y.checked_add(region.height).is_some_and(|end| end <= image.height);
        if !fits_x || !fits_y {
            return Err(Error::BackendError(format!(
                "tex_sub_image_2d: region {:?} outside {}x{} image",
                region, image.width, image.height
            )));
        }
        let row = region.width as usize * bpp;
        if pixels.len() != row * region.height as usize {
            return Err(Error::BackendError("tex_sub_image_2d: wrong data length".to_string()));
        }

        let stride = image.width as usize * bpp;
        for (r, src) in pixels.chunks_exact(row).enumerate() {
            let start = (region.y as usize + r) * stride + region.x as usize * bpp;
            image.pixels[start..start + row].copy_from_slice(src);
        }
        Ok(())
    }

    fn tex_parameters(&mut self, target: TextureTarget, parameters: &SamplerParameters) {
        let mut state = lock(&self.state);
        state.calls.tex_parameters += 1;
        let error = match state.bound_texture_mut(target) {
            Ok((_, texture)) => {
                texture.parameters = Some(*parameters);
                None
            }
            Err(e) => Some(e.to_string()),
        };
        if let Some(error) = error {
            state.errors.push(error);
        }
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle> {
        let mut state = lock(&self.state);
        state.calls.create_program += 1;
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            return Err(Error::BackendError("create_program: empty shader source".to_string()));
        }
        let handle = ProgramHandle(state.next_name());
        state.programs.insert(
            handle,
            HeadlessProgram {
                vertex_source: vertex_source.to_string(),
                fragment_source: fragment_source.to_string(),
                uniforms: FxHashMap::default(),
            },
        );
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let mut state = lock(&self.state);
        state.calls.delete_program += 1;
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        let mut state = lock(&self.state);
        state.calls.use_program += 1;
        if state.programs.contains_key(&program) {
            state.current_program = Some(program);
        } else {
            state.errors.push(format!("use_program: unknown program {:?}", program));
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.set_uniform += 1;
        let current = state
            .current_program
            .ok_or_else(|| Error::BackendError("set_uniform: no program in use".to_string()))?;
        if let Some(program) = state.programs.get_mut(&current) {
            program.uniforms.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4) {
        let mut state = lock(&self.state);
        state.calls.clear += 1;
        state.clears.push((flags, color));
    }

    fn set_blend_state(&mut self, blend: &BlendState) {
        let mut state = lock(&self.state);
        state.calls.set_blend_state += 1;
        state.pending_blend = Some(*blend);
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first_vertex: u32, vertex_count: u32) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.draw += 1;
        if state.current_program.is_none() {
            return Err(Error::BackendError("draw_arrays: no program in use".to_string()));
        }
        let record = DrawRecord {
            program: state.current_program,
            blend_state: state.pending_blend.take(),
            topology,
            first_vertex,
            vertex_count,
        };
        state.draws.push(record);
        Ok(())
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Read-only view of a `HeadlessBackend`'s recorded state
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessProbe {
    /// Call counters
    pub fn calls(&self) -> BackendCallCounts {
        lock(&self.state).calls
    }

    /// Pixels of one image level, if allocated
    pub fn image(&self, texture: TextureHandle, target: ImageTarget, level: u32) -> Option<Vec<u8>> {
        lock(&self.state)
            .textures
            .get(&texture)?
            .images
            .get(&(target, level))
            .map(|image| image.pixels.clone())
    }

    /// Dimensions of one image level, if allocated
    pub fn image_size(&self, texture: TextureHandle, target: ImageTarget, level: u32) -> Option<(u32, u32)> {
        lock(&self.state)
            .textures
            .get(&texture)?
            .images
            .get(&(target, level))
            .map(|image| (image.width, image.height))
    }

    /// Sampler parameters last applied to a texture
    pub fn sampler_parameters(&self, texture: TextureHandle) -> Option<SamplerParameters> {
        lock(&self.state).textures.get(&texture)?.parameters
    }

    /// Texture actually bound on the backend
    pub fn bound_texture(&self, target: TextureTarget, unit: u32) -> Option<TextureHandle> {
        lock(&self.state).bindings.get(&(target, unit)).copied()
    }

    pub fn active_unit(&self) -> u32 {
        lock(&self.state).active_unit
    }

    pub fn texture_exists(&self, texture: TextureHandle) -> bool {
        lock(&self.state).textures.contains_key(&texture)
    }

    pub fn texture_count(&self) -> usize {
        lock(&self.state).textures.len()
    }

    pub fn program_exists(&self, program: ProgramHandle) -> bool {
        lock(&self.state).programs.contains_key(&program)
    }

    /// Shader sources a program was created from
    pub fn program_sources(&self, program: ProgramHandle) -> Option<(String, String)> {
        lock(&self.state)
            .programs
            .get(&program)
            .map(|p| (p.vertex_source.clone(), p.fragment_source.clone()))
    }

    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        lock(&self.state).programs.get(&program)?.uniforms.get(name).copied()
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        lock(&self.state).draws.clone()
    }

    pub fn clears(&self) -> Vec<(ClearFlags, Vec4)> {
        lock(&self.state).clears.clone()
    }

    /// Misuse recorded by the backend (like a GL error queue)
    pub fn errors(&self) -> Vec<String> {
        lock(&self.state).errors.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
