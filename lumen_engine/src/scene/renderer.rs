/// Scene renderers.
///
/// A SceneRenderer draws the scene after the update pass. It reads controller
/// state through `Scene::controller::<T>()` and draws through the scene's
/// graphics context.

use crate::error::Result;
use super::controller::AsAny;
use super::scene::Scene;

/// Render-pass collaborator of a Scene.
///
/// `&mut self` allows renderers to keep GPU resources and per-frame state.
pub trait SceneRenderer: AsAny + Send {
    /// Load the resources this renderer needs.
    ///
    /// Called once by `Scene::add_renderer`; an error aborts the addition.
    fn create_resources(&mut self, _scene: &Scene) -> Result<()> {
        Ok(())
    }

    /// Draw one frame. Errors are logged by the scene and do not stop other
    /// renderers.
    fn render(&mut self, scene: &Scene) -> Result<()>;
}
