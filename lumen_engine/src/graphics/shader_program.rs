/// Linked shader programs
///
/// Sampler uniforms get fixed texture units at link time: the n-th sampler
/// name passed to `ShaderProgram::new` samples unit n for the life of the
/// program. `set_texture` then only has to bind to that unit.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::backend::{ProgramHandle, UniformValue};
use crate::graphics::context::{GraphicsContext, ReleaseQueue, ReleasedObject};
use crate::graphics::texture::Texture;

pub struct ShaderProgram {
    handle: ProgramHandle,
    sampler_units: FxHashMap<String, u32>,
    release_queue: ReleaseQueue,
}

impl ShaderProgram {
    /// Compile and link a program, assigning units to `samplers` in order
    pub fn new(
        context: &mut GraphicsContext,
        vertex_source: &str,
        fragment_source: &str,
        samplers: &[&str],
    ) -> Result<Self> {
        let mut sampler_units = FxHashMap::default();
        for (unit, name) in samplers.iter().enumerate() {
            if sampler_units.insert(name.to_string(), unit as u32).is_some() {
                return Err(Error::AlreadyExists(format!("sampler '{}' listed twice", name)));
            }
        }

        let handle = context
            .backend_mut()
            .create_program(vertex_source, fragment_source)?;
        let program = Self {
            handle,
            sampler_units,
            release_queue: context.release_queue().clone(),
        };

        for (name, unit) in &program.sampler_units {
            program.set_uniform(context, name, UniformValue::Int(*unit as i32))?;
        }

        crate::engine_debug!(
            "lumen::ShaderProgram",
            "Linked program {:?} with {} samplers",
            handle,
            samplers.len()
        );
        Ok(program)
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Unit a sampler reads from
    pub fn sampler_unit(&self, sampler: &str) -> Option<u32> {
        self.sampler_units.get(sampler).copied()
    }

    /// Set a uniform (makes the program current)
    pub fn set_uniform(&self, context: &mut GraphicsContext, name: &str, value: UniformValue) -> Result<()> {
        context.use_program(self.handle);
        context.backend_mut().set_uniform(name, value)
    }

    /// Bind `texture` to the unit of `sampler`
    pub fn set_texture(&self, context: &mut GraphicsContext, sampler: &str, texture: &dyn Texture) -> Result<()> {
        let unit = self.sampler_unit(sampler).ok_or_else(|| {
            Error::NotFound(format!("sampler '{}' in program {:?}", sampler, self.handle))
        })?;
        texture.bind(context, unit);
        Ok(())
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.release_queue.push(ReleasedObject::Program(self.handle));
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("sampler_units", &self.sampler_units)
            .finish()
    }
}

#[cfg(test)]
#[path = "shader_program_tests.rs"]
mod tests;
