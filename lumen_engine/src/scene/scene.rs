/// Scene - ordered controllers and renderers driving the frame pipeline.
///
/// Controllers and renderers live in slot maps with stable keys; a separate
/// order list keeps registration order, which is the order every phase
/// iterates in. Adding or removing needs `&mut Scene`, which no controller
/// or renderer holds during a pass.
///
/// A controller or renderer that panics is caught at its own boundary,
/// logged, and disabled for the rest of its life. Other controllers and the
/// frame itself carry on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use slotmap::{new_key_type, SlotMap};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graphics::{lock_context, register_graphics_loaders, SharedGraphicsContext};
use crate::input::InputEvent;
use crate::resource::ResourceManager;
use super::controller::SceneController;
use super::controller_registry::ControllerRegistry;
use super::profiler::CpuTimeProfiler;
use super::renderer::SceneRenderer;

// ===== KEYS =====

new_key_type! {
    /// Stable key of a controller within a Scene.
    pub struct ControllerKey;

    /// Stable key of a renderer within a Scene.
    pub struct RendererKey;
}

/// Process-unique scene identity, handed to controllers at attach time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

impl SceneId {
    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

// ===== SLOTS =====

struct ControllerSlot {
    name: String,
    controller: Box<dyn SceneController>,
    profiler: Option<CpuTimeProfiler>,
    faulted: bool,
}

struct RendererSlot {
    name: String,
    renderer: Box<dyn SceneRenderer>,
    faulted: bool,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one controller hook, isolating panics
///
/// Returns None if the controller is (or just became) faulted.
fn run_guarded<R>(
    slot: &mut ControllerSlot,
    phase: &str,
    hook: impl FnOnce(&mut dyn SceneController) -> R,
) -> Option<R> {
    if slot.faulted {
        return None;
    }
    let controller = slot.controller.as_mut();
    match panic::catch_unwind(AssertUnwindSafe(|| hook(controller))) {
        Ok(result) => Some(result),
        Err(payload) => {
            slot.faulted = true;
            crate::engine_error!(
                "lumen::Scene",
                "Controller '{}' panicked in {} ({}); it is disabled",
                slot.name,
                phase,
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

// ===== SCENE =====

pub struct Scene {
    id: SceneId,
    name: String,
    context: SharedGraphicsContext,
    resource_manager: ResourceManager,
    controllers: SlotMap<ControllerKey, ControllerSlot>,
    controller_order: Vec<ControllerKey>,
    renderers: SlotMap<RendererKey, RendererSlot>,
    renderer_order: Vec<RendererKey>,
    profiling: bool,
    frame_count: u64,
}

impl Scene {
    /// Create an empty scene drawing through `context`
    ///
    /// The scene's resource manager gets the configured search paths and the
    /// Cubemap, Texture2D and ShaderProgram loaders.
    pub fn new(name: &str, context: SharedGraphicsContext, config: &EngineConfig) -> Result<Self> {
        let mut resource_manager = ResourceManager::new();
        for path in &config.search_paths {
            resource_manager.add_search_path(path.clone());
        }
        register_graphics_loaders(&mut resource_manager, &context)?;

        let scene = Self {
            id: SceneId::next(),
            name: name.to_string(),
            context,
            resource_manager,
            controllers: SlotMap::with_key(),
            controller_order: Vec::new(),
            renderers: SlotMap::with_key(),
            renderer_order: Vec::new(),
            profiling: config.enable_profiling,
            frame_count: 0,
        };
        crate::engine_info!("lumen::Scene", "Scene '{}' created ({:?})", scene.name, scene.id);
        Ok(scene)
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Graphics context shared with the resource loaders
    ///
    /// Release the `lock_context` guard before loading through
    /// `resource_manager()`: a load needing the context while this thread
    /// holds it fails with `BackendError` (and the failure is cached).
    pub fn context(&self) -> &SharedGraphicsContext {
        &self.context
    }

    pub fn resource_manager(&self) -> &ResourceManager {
        &self.resource_manager
    }

    pub fn resource_manager_mut(&mut self) -> &mut ResourceManager {
        &mut self.resource_manager
    }

    /// Frames completed by `frame()`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_profiling_enabled(&self) -> bool {
        self.profiling
    }

    /// Turn update profiling on or off; turning it off drops collected samples
    pub fn set_profiling_enabled(&mut self, enabled: bool) {
        self.profiling = enabled;
        for slot in self.controllers.values_mut() {
            if !enabled {
                slot.profiler = None;
            } else if slot.profiler.is_none() {
                slot.profiler = Some(CpuTimeProfiler::new());
            }
        }
    }

    // ===== CONTROLLERS =====

    /// Attach a controller under `name` (names need not be unique)
    pub fn add_controller<C: SceneController>(&mut self, name: &str, controller: C) -> ControllerKey {
        self.add_boxed_controller(name, Box::new(controller))
    }

    pub fn add_boxed_controller(&mut self, name: &str, mut controller: Box<dyn SceneController>) -> ControllerKey {
        controller.on_attach(self.id);
        let key = self.controllers.insert(ControllerSlot {
            name: name.to_string(),
            controller,
            profiler: self.profiling.then(CpuTimeProfiler::new),
            faulted: false,
        });
        self.controller_order.push(key);
        crate::engine_debug!("lumen::Scene", "Controller '{}' added to scene '{}'", name, self.name);
        key
    }

    /// Build a controller through `registry` and attach it under `name`
    ///
    /// # Errors
    ///
    /// `NotFound` if `name` is not registered.
    pub fn add_controller_by_name(&mut self, registry: &ControllerRegistry, name: &str) -> Result<ControllerKey> {
        let controller = registry.create(name, self)?;
        Ok(self.add_boxed_controller(name, controller))
    }

    /// Detach a controller, handing it back
    pub fn remove_controller(&mut self, key: ControllerKey) -> Option<Box<dyn SceneController>> {
        let slot = self.controllers.remove(key)?;
        self.controller_order.retain(|k| *k != key);
        crate::engine_debug!("lumen::Scene", "Controller '{}' removed from scene '{}'", slot.name, self.name);
        Some(slot.controller)
    }

    /// Detach the first controller named `name`
    pub fn remove_controller_by_name(&mut self, name: &str) -> Option<Box<dyn SceneController>> {
        let key = self.controller_key(name)?;
        self.remove_controller(key)
    }

    /// Key of the first controller named `name`
    pub fn controller_key(&self, name: &str) -> Option<ControllerKey> {
        self.controller_order
            .iter()
            .copied()
            .find(|key| self.controllers.get(*key).is_some_and(|slot| slot.name == name))
    }

    /// First controller named `name`, if it is a `T`
    pub fn controller<T: SceneController>(&self, name: &str) -> Option<&T> {
        let slot = self.controllers.get(self.controller_key(name)?)?;
        slot.controller.as_ref().as_any().downcast_ref::<T>()
    }

    pub fn controller_mut<T: SceneController>(&mut self, name: &str) -> Option<&mut T> {
        let key = self.controller_key(name)?;
        let slot = self.controllers.get_mut(key)?;
        slot.controller.as_mut().as_any_mut().downcast_mut::<T>()
    }

    /// Controller names in registration order
    pub fn controller_names(&self) -> Vec<String> {
        self.controller_order
            .iter()
            .filter_map(|key| self.controllers.get(*key))
            .map(|slot| slot.name.clone())
            .collect()
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Update timings of the first controller named `name` (profiling only)
    pub fn controller_profile(&self, name: &str) -> Option<&CpuTimeProfiler> {
        let slot = self.controllers.get(self.controller_key(name)?)?;
        slot.profiler.as_ref()
    }

    /// True once the first controller named `name` has panicked
    pub fn is_controller_faulted(&self, name: &str) -> bool {
        self.controller_key(name)
            .and_then(|key| self.controllers.get(key))
            .is_some_and(|slot| slot.faulted)
    }

    // ===== RENDERERS =====

    /// Attach a renderer after letting it create its resources
    ///
    /// # Errors
    ///
    /// Whatever `create_resources` returned; the renderer is not attached.
    pub fn add_renderer<R: SceneRenderer>(&mut self, name: &str, renderer: R) -> Result<RendererKey> {
        let mut renderer: Box<dyn SceneRenderer> = Box::new(renderer);
        if let Err(error) = renderer.create_resources(self) {
            crate::engine_error!("lumen::Scene", "Renderer '{}' failed to create resources: {}", name, error);
            return Err(error);
        }
        let key = self.renderers.insert(RendererSlot {
            name: name.to_string(),
            renderer,
            faulted: false,
        });
        self.renderer_order.push(key);
        Ok(key)
    }

    pub fn remove_renderer(&mut self, key: RendererKey) -> Option<Box<dyn SceneRenderer>> {
        let slot = self.renderers.remove(key)?;
        self.renderer_order.retain(|k| *k != key);
        Some(slot.renderer)
    }

    /// First renderer named `name`, if it is a `T`
    ///
    /// Renderers are detached while the render pass runs, so this returns
    /// None when called from inside `SceneRenderer::render`.
    pub fn renderer<T: SceneRenderer>(&self, name: &str) -> Option<&T> {
        self.renderer_order
            .iter()
            .filter_map(|key| self.renderers.get(*key))
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.renderer.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    // ===== FRAME PIPELINE =====

    /// Offer `event` to controllers in registration order
    ///
    /// Stops at the first controller that consumes it. Returns whether any
    /// controller did.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        for key in &self.controller_order {
            let Some(slot) = self.controllers.get_mut(*key) else {
                continue;
            };
            if run_guarded(slot, "process_event", |c| c.process_event(event)) == Some(true) {
                return true;
            }
        }
        false
    }

    /// Dispatch a batch of events; returns how many were consumed
    pub fn process_events(&mut self, events: &[InputEvent]) -> usize {
        events.iter().filter(|event| self.process_event(event)).count()
    }

    /// Run before_update, update and after_update on every controller
    ///
    /// The delta is truncated to whole microseconds and every controller
    /// receives the same value.
    pub fn update(&mut self, delta_time: Duration) {
        let micros = u64::try_from(delta_time.as_micros()).unwrap_or(u64::MAX);
        let delta_time = Duration::from_micros(micros);

        for key in &self.controller_order {
            if let Some(slot) = self.controllers.get_mut(*key) {
                run_guarded(slot, "before_update", |c| c.before_update());
            }
        }

        for key in &self.controller_order {
            let Some(slot) = self.controllers.get_mut(*key) else {
                continue;
            };
            if slot.faulted {
                continue;
            }
            if let Some(profiler) = slot.profiler.as_mut() {
                profiler.begin_measurement();
            }
            let completed = run_guarded(slot, "update", |c| c.update(delta_time)).is_some();
            if let Some(profiler) = slot.profiler.as_mut() {
                if completed {
                    profiler.end_measurement();
                } else {
                    profiler.cancel_measurement();
                }
            }
        }

        for key in &self.controller_order {
            if let Some(slot) = self.controllers.get_mut(*key) {
                run_guarded(slot, "after_update", |c| c.after_update());
            }
        }
    }

    /// Run every renderer in registration order
    ///
    /// Errors and panics are logged; the remaining renderers still run.
    pub fn render(&mut self) {
        let mut renderers = std::mem::take(&mut self.renderers);

        for key in &self.renderer_order {
            let Some(slot) = renderers.get_mut(*key) else {
                continue;
            };
            if slot.faulted {
                continue;
            }
            let renderer = slot.renderer.as_mut();
            let scene: &Scene = self;
            match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(scene))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    crate::engine_error!("lumen::Scene", "Renderer '{}' failed: {}", slot.name, error);
                }
                Err(payload) => {
                    slot.faulted = true;
                    crate::engine_error!(
                        "lumen::Scene",
                        "Renderer '{}' panicked ({}); it is disabled",
                        slot.name,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        self.renderers = renderers;
    }

    /// Run one frame: events, update pass, render pass, then release GPU
    /// objects dropped during the frame
    pub fn frame(&mut self, delta_time: Duration, events: &[InputEvent]) {
        self.process_events(events);
        self.update(delta_time);
        self.render();
        match lock_context(&self.context) {
            Ok(mut context) => {
                context.flush_released();
            }
            Err(error) => {
                crate::engine_error!("lumen::Scene", "Cannot release GPU objects: {}", error);
            }
        }
        self.frame_count += 1;
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        // Drop everything that may own GPU objects, then release them while
        // the context is still reachable.
        self.renderers.clear();
        self.controllers.clear();
        self.resource_manager = ResourceManager::new();
        if let Ok(mut context) = lock_context(&self.context) {
            context.flush_released();
        }
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
