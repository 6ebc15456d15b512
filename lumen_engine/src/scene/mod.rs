//! Scene module
//!
//! Provides the scene frame pipeline, scene controllers and their registry,
//! scene renderers and controller update profiling.

mod controller;
mod controller_registry;
mod profiler;
mod renderer;
mod scene;

pub use controller::{AsAny, SceneController};
pub use controller_registry::{ControllerFactory, ControllerRegistry};
pub use profiler::CpuTimeProfiler;
pub use renderer::SceneRenderer;
pub use scene::{ControllerKey, RendererKey, Scene, SceneId};
