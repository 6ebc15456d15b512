/// GraphicsContext - owns the backend and elides redundant state changes
///
/// The context mirrors what the backend has bound per (binding point, unit),
/// the active unit and the current program. A request that matches the
/// mirrored state is answered without a backend call.
///
/// GPU objects are not deleted where they are dropped: textures and programs
/// push their handle onto the context's `ReleaseQueue`, and the handles are
/// deleted at the next `flush_released()` (the scene calls it once per frame).

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::backend::{
    GraphicsBackend, TextureHandle, ProgramHandle, TextureTarget, ClearFlags,
};
use crate::graphics::draw_item::DrawItem;

/// Context shared between the scene, its renderers and the resource loaders
pub type SharedGraphicsContext = Arc<Mutex<GraphicsContext>>;

// ============================================================================
// Locking
// ============================================================================

thread_local! {
    /// Shared contexts locked through `lock_context` on this thread
    static HELD_CONTEXTS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

fn context_key(context: &SharedGraphicsContext) -> usize {
    Arc::as_ptr(context) as usize
}

fn held_by_current_thread(key: usize) -> bool {
    HELD_CONTEXTS.with(|held| held.borrow().contains(&key))
}

/// Exclusive access to a shared context, obtained from `lock_context`
pub struct ContextGuard<'a> {
    guard: MutexGuard<'a, GraphicsContext>,
    key: usize,
}

impl Deref for ContextGuard<'_> {
    type Target = GraphicsContext;

    fn deref(&self) -> &GraphicsContext {
        &self.guard
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut GraphicsContext {
        &mut self.guard
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let key = self.key;
        HELD_CONTEXTS.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(position) = held.iter().position(|k| *k == key) {
                held.swap_remove(position);
            }
        });
    }
}

/// Lock a shared context
///
/// A lock poisoned by a panicking holder is recovered: the panic was caught
/// at a controller or renderer boundary and the frame goes on.
///
/// # Errors
///
/// `BackendError` if this thread already holds the context (for instance a
/// renderer loading a resource while it keeps the context locked). Waiting
/// would never return.
pub fn lock_context(context: &SharedGraphicsContext) -> Result<ContextGuard<'_>> {
    let key = context_key(context);
    if held_by_current_thread(key) {
        return Err(Error::BackendError(
            "Graphics context is already locked by this thread".to_string(),
        ));
    }
    let guard = context.lock().unwrap_or_else(|poisoned| {
        crate::engine_warn!("lumen::GraphicsContext", "Recovering context lock poisoned by a panic");
        context.clear_poison();
        poisoned.into_inner()
    });
    HELD_CONTEXTS.with(|held| held.borrow_mut().push(key));
    Ok(ContextGuard { guard, key })
}

// ============================================================================
// Deferred release
// ============================================================================

/// A backend object waiting for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasedObject {
    Texture(TextureHandle),
    Program(ProgramHandle),
}

/// Queue of objects dropped since the last flush
///
/// Cloned into every GPU resource so `Drop` never needs the context itself.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: Arc<Mutex<Vec<ReleasedObject>>>,
}

impl ReleaseQueue {
    pub fn push(&self, object: ReleasedObject) {
        // Losing a handle to poisoning only leaks it; never panic in Drop.
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(object);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self) -> Vec<ReleasedObject> {
        self.pending
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }
}

// ============================================================================
// Binding cache
// ============================================================================

/// Mirror of the backend's texture bindings
#[derive(Debug, Default)]
pub struct BindingCache {
    bound: FxHashMap<(TextureTarget, u32), TextureHandle>,
    /// None until the first unit change, so the first one is always issued
    active_unit: Option<u32>,
}

impl BindingCache {
    /// Texture currently bound to (target, unit), if known
    pub fn bound(&self, target: TextureTarget, unit: u32) -> Option<TextureHandle> {
        self.bound.get(&(target, unit)).copied()
    }

    pub fn active_unit(&self) -> Option<u32> {
        self.active_unit
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn record(&mut self, target: TextureTarget, unit: u32, texture: TextureHandle) {
        self.bound.insert((target, unit), texture);
    }

    /// Forget every binding of a deleted texture
    fn purge(&mut self, texture: TextureHandle) {
        self.bound.retain(|_, bound| *bound != texture);
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters since context creation (or the last `reset_stats`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Texture bind requests received
    pub bind_requests: u64,
    /// Bind requests that reached the backend
    pub binds_issued: u64,
    pub active_unit_changes: u64,
    pub program_changes: u64,
    pub draw_calls: u64,
    pub clears: u64,
    /// Objects deleted by `flush_released`
    pub objects_released: u64,
}

// ============================================================================
// GraphicsContext
// ============================================================================

pub struct GraphicsContext {
    backend: Box<dyn GraphicsBackend>,
    bindings: BindingCache,
    current_program: Option<ProgramHandle>,
    release_queue: ReleaseQueue,
    stats: ContextStats,
}

impl GraphicsContext {
    pub fn new<B: GraphicsBackend + 'static>(backend: B) -> Self {
        crate::engine_debug!("lumen::GraphicsContext", "Context created on '{}' backend", backend.name());
        Self {
            backend: Box::new(backend),
            bindings: BindingCache::default(),
            current_program: None,
            release_queue: ReleaseQueue::default(),
            stats: ContextStats::default(),
        }
    }

    /// Wrap a new context for sharing
    pub fn new_shared<B: GraphicsBackend + 'static>(backend: B) -> SharedGraphicsContext {
        Arc::new(Mutex::new(Self::new(backend)))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Direct backend access for resource construction
    ///
    /// Callers that bind through this must keep the cache coherent; resources
    /// in this crate only upload to what `bind_texture` made current.
    pub(crate) fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ContextStats::default();
    }

    /// Queue that resources created on this context release into
    pub fn release_queue(&self) -> &ReleaseQueue {
        &self.release_queue
    }

    // ===== TEXTURE BINDING =====

    /// Make `unit` the active texture unit (elided when already active)
    pub fn set_active_unit(&mut self, unit: u32) {
        if self.bindings.active_unit == Some(unit) {
            return;
        }
        self.backend.active_texture(unit);
        self.bindings.active_unit = Some(unit);
        self.stats.active_unit_changes += 1;
    }

    /// Bind `texture` to `target` on `unit`
    ///
    /// The unit is made active either way, so a following upload reaches
    /// the right texture. The bind itself is skipped when the cache shows
    /// the same texture already bound there.
    pub fn bind_texture(&mut self, target: TextureTarget, unit: u32, texture: TextureHandle) {
        self.stats.bind_requests += 1;
        self.set_active_unit(unit);
        if self.bindings.bound(target, unit) == Some(texture) {
            crate::engine_trace!("lumen::GraphicsContext", "Bind of {:?} on unit {} elided", texture, unit);
            return;
        }
        self.backend.bind_texture(target, Some(texture));
        self.bindings.record(target, unit, texture);
        self.stats.binds_issued += 1;
    }

    // ===== PROGRAMS & DRAWING =====

    /// Make a program current (elided when already current)
    pub fn use_program(&mut self, program: ProgramHandle) {
        if self.current_program == Some(program) {
            return;
        }
        self.backend.use_program(program);
        self.current_program = Some(program);
        self.stats.program_changes += 1;
    }

    /// Submit one draw item
    ///
    /// The blend state is sent before every draw; the previous draw's state
    /// is never assumed to persist.
    pub fn draw(&mut self, item: &DrawItem<'_>) -> Result<()> {
        self.use_program(item.shader_program.handle());
        self.backend.set_blend_state(&item.blend_state);
        self.backend
            .draw_arrays(item.primitive_topology, item.first_vertex, item.vertex_count)?;
        self.stats.draw_calls += 1;
        Ok(())
    }

    /// Clear the selected buffers of the current surface
    pub fn clear(&mut self, flags: ClearFlags, color: Vec4) {
        self.backend.clear(flags, color);
        self.stats.clears += 1;
    }

    // ===== RELEASE =====

    /// Delete every object queued since the last flush
    ///
    /// Returns the number of deleted objects.
    pub fn flush_released(&mut self) -> usize {
        let released = self.release_queue.take();
        for object in &released {
            match *object {
                ReleasedObject::Texture(texture) => {
                    self.backend.delete_texture(texture);
                    self.bindings.purge(texture);
                }
                ReleasedObject::Program(program) => {
                    self.backend.delete_program(program);
                    if self.current_program == Some(program) {
                        self.current_program = None;
                    }
                }
            }
        }
        if !released.is_empty() {
            crate::engine_debug!("lumen::GraphicsContext", "Released {} GPU objects", released.len());
        }
        self.stats.objects_released += released.len() as u64;
        released.len()
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.flush_released();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
