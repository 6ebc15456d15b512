/// Scene controllers.
///
/// A SceneController is a named unit of per-frame behavior attached to one
/// Scene. Every hook has a no-op default, so a controller only implements
/// the phases it cares about.

use std::any::Any;
use std::time::Duration;
use crate::input::InputEvent;
use super::scene::SceneId;

/// Upcast to `Any` for downcasting trait objects to their concrete type.
///
/// Blanket-implemented for every `'static` type. Call it on the trait object
/// (`boxed.as_ref().as_any()`), not on the `Box` itself.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-frame behavior attached to a Scene.
///
/// Within one frame the scene calls, in order: `process_event` for each
/// pending event (until a controller consumes it), `before_update` on every
/// controller, `update` on every controller with the same delta, then
/// `after_update` on every controller.
pub trait SceneController: AsAny + Send {
    /// Called once, when the controller is added to `scene`.
    fn on_attach(&mut self, _scene: SceneId) {}

    fn before_update(&mut self) {}

    /// Advance by `delta_time` (whole microseconds).
    fn update(&mut self, _delta_time: Duration) {}

    fn after_update(&mut self) {}

    /// Handle an input event. Returning `true` consumes it: controllers
    /// registered later do not see it.
    fn process_event(&mut self, _event: &InputEvent) -> bool {
        false
    }
}
