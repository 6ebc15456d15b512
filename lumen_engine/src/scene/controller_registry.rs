/// Controller registry.
///
/// Maps a controller type name to a factory, so scenes can be assembled
/// from names (configuration files, tooling). The registry is an ordinary
/// object owned by the application; there is no process-wide instance.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use super::controller::SceneController;
use super::scene::Scene;

/// Builds a controller for the scene it will be attached to
pub type ControllerFactory = Box<dyn Fn(&Scene) -> Box<dyn SceneController> + Send + Sync>;

#[derive(Default)]
pub struct ControllerRegistry {
    factories: FxHashMap<String, ControllerFactory>,
    /// Names in registration order
    order: Vec<String>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `name` is taken; the registry is left unchanged.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&Scene) -> Box<dyn SceneController> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            crate::engine_bail!(
                "lumen::ControllerRegistry",
                Error::AlreadyExists(format!("controller '{}'", name))
            );
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        self.order.push(name.to_string());
        crate::engine_debug!("lumen::ControllerRegistry", "Registered controller '{}'", name);
        Ok(())
    }

    /// Registered names, in registration order
    pub fn registered_controllers(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Build a new controller instance for `scene`
    ///
    /// # Errors
    ///
    /// `NotFound` if no factory is registered under `name`.
    pub fn create(&self, name: &str, scene: &Scene) -> Result<Box<dyn SceneController>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory(scene)),
            None => Err(crate::engine_err!(
                "lumen::ControllerRegistry",
                Error::NotFound(format!("controller '{}'", name))
            )),
        }
    }
}

#[cfg(test)]
#[path = "controller_registry_tests.rs"]
mod tests;
