/*!
# Lumen Engine

Run-time core of a small real-time engine.

A `Scene` drives the frame: it dispatches input events to its controllers,
advances them, runs its renderers and finally releases GPU objects dropped
during the frame. Controllers and renderers get their GPU resources
(textures, cubemaps, shader programs) from the scene's `ResourceManager`,
which loads each resource once and shares it.

## Architecture

- **GraphicsBackend**: Raw GPU capability (a headless in-memory backend is included)
- **GraphicsContext**: Owns the backend, elides redundant binds, defers deletions
- **Texture2D / Cubemap / ShaderProgram**: GPU resources created through a context
- **ResourceManager**: Lazily loaded, shared resources keyed by (type, id)
- **SceneController / ControllerRegistry**: Named per-frame behavior, built by name
- **SceneRenderer**: Render pass collaborators
- **Scene**: Ordered controllers and renderers, frame pipeline
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod input;
pub mod graphics;
pub mod resource;
pub mod scene;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade and configuration
    pub use crate::engine::Engine;
    pub use crate::config::EngineConfig;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Input sub-module
    pub mod input {
        pub use crate::input::*;
    }

    // Graphics sub-module with the GPU resource layer
    pub mod graphics {
        pub use crate::graphics::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
