//! Explicit particle time integration.

use glam::Vec3;
use nodyn_array::DeviceArray;
use nodyn_core::ModuleError;
use nodyn_graph::{Module, NodeContext};
use tracing::trace;

use crate::system::fields::*;

/// Semi-implicit Euler on `Velocity` and `Position`, with acceleration
/// `gravity + Force / ParticleMass`.
#[derive(Debug, Default)]
pub struct ParticleIntegrator;

impl ParticleIntegrator {
    /// A new integrator.
    pub fn new() -> Self {
        Self
    }
}

impl Module for ParticleIntegrator {
    fn name(&self) -> &str {
        "ParticleIntegrator"
    }

    fn execute(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let dt = ctx.dt();
        let gravity = if ctx.get::<bool>(GRAVITY_ENABLED)? {
            ctx.config().gravity
        } else {
            Vec3::ZERO
        };
        let inv_mass = {
            let m = ctx.get::<f32>(PARTICLE_MASS)?;
            if m > 0.0 { 1.0 / m } else { 0.0 }
        };

        let force = ctx.read::<DeviceArray<Vec3>>(FORCE)?;
        let mut velocity = ctx.write::<DeviceArray<Vec3>>(VELOCITY)?;
        velocity.par_zip_mut(VELOCITY, &*force, |_, v, f| {
            *v += (gravity + *f * inv_mass) * dt;
        })?;
        ctx.write::<DeviceArray<Vec3>>(POSITION)?
            .par_zip_mut(POSITION, &*velocity, |_, p, v| *p += *v * dt)?;

        trace!(node = %ctx.node(), particles = velocity.len(), dt, "particles integrated");
        Ok(())
    }
}
