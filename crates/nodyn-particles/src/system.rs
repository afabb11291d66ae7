//! The particle system node.

use glam::Vec3;
use nodyn_array::DeviceArray;
use nodyn_core::{FieldError, ModuleError};
use nodyn_graph::{FieldDecl, FieldTable, Node, NodeContext, Pipeline};
use tracing::{debug, info};

use crate::constraint::BoundaryConstraint;
use crate::cube::{check_box, check_spacing, BoundarySet};
use crate::error::ParticleError;
use crate::integrator::ParticleIntegrator;

/// Field names declared by [`ParticleSystem`].
pub mod fields {
    /// `ArrayState<Vec3>`.
    pub const POSITION: &str = "Position";
    /// `ArrayState<Vec3>`.
    pub const VELOCITY: &str = "Velocity";
    /// `ArrayState<Vec3>`: accumulated external force, cleared each step.
    pub const FORCE: &str = "Force";
    /// `Var<f32>`: mass of every particle.
    pub const PARTICLE_MASS: &str = "ParticleMass";
    /// `Var<bool>`: apply scene gravity.
    pub const GRAVITY_ENABLED: &str = "GravityEnabled";
    /// `InstanceIn<BoundarySet>`: walls the particles stay within.
    pub const BOUNDARY: &str = "Boundary";
}

use fields::*;

/// Largest lattice a single [`ParticleSystem::load_particles`] call accepts.
pub const MAX_PARTICLES: u64 = 1 << 26;

/// A set of point particles advanced under gravity and clamped by an
/// optional boundary.
#[derive(Debug, Default)]
pub struct ParticleSystem {
    points: Vec<Vec3>,
}

impl ParticleSystem {
    /// No particles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample a lattice with `spacing` between neighbours over the box
    /// `lo..=hi` and append it. Returns the number of particles added.
    ///
    /// Lattices above [`MAX_PARTICLES`] are rejected before anything is
    /// allocated.
    pub fn load_particles(&mut self, lo: Vec3, hi: Vec3, spacing: f32) -> Result<usize, ParticleError> {
        check_spacing(spacing)?;
        check_box(lo, hi)?;
        let steps = ((hi - lo) / spacing).floor();
        let counts = [steps.x, steps.y, steps.z].map(|s| (s as u64).saturating_add(1));
        let requested = counts.iter().fold(1u64, |acc, &c| acc.saturating_mul(c));
        if requested > MAX_PARTICLES {
            return Err(ParticleError::TooManyParticles { requested });
        }
        let before = self.points.len();
        self.points.reserve(requested as usize);
        for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    let offset = Vec3::new(i as f32, j as f32, k as f32) * spacing;
                    self.points.push(lo + offset);
                }
            }
        }
        let added = self.points.len() - before;
        debug!(added, spacing, "particles loaded");
        Ok(added)
    }

    /// Shift every authored particle by `t`.
    pub fn translate(&mut self, t: Vec3) -> &mut Self {
        for p in &mut self.points {
            *p += t;
        }
        self
    }

    /// Scale every authored particle about the origin by `s`.
    pub fn scale(&mut self, s: f32) -> &mut Self {
        for p in &mut self.points {
            *p *= s;
        }
        self
    }

    /// Authored particle positions; copied to `Position` at reset.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of authored particles.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no particle was authored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Node for ParticleSystem {
    fn class_name(&self) -> &str {
        "ParticleSystem"
    }

    fn declare_fields(&self, f: &mut FieldTable) -> Result<(), FieldError> {
        f.declare(FieldDecl::array_state::<Vec3>(POSITION).describe("Particle position"))?;
        f.declare(FieldDecl::array_state::<Vec3>(VELOCITY).describe("Particle velocity"))?;
        f.declare(FieldDecl::array_state::<Vec3>(FORCE).describe("Force on each particle"))?;
        f.declare(FieldDecl::var(PARTICLE_MASS, 1.0f32))?;
        f.declare(FieldDecl::var(GRAVITY_ENABLED, true))?;
        f.declare(FieldDecl::instance_in::<BoundarySet>(BOUNDARY).describe("Boundary the particles stay within"))?;
        Ok(())
    }

    fn build_pipeline(&self, pipeline: &mut Pipeline) {
        pipeline.push(Box::new(ParticleIntegrator::new()));
        pipeline.push(Box::new(BoundaryConstraint::new()));
    }

    fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let n = self.points.len();
        ctx.write::<DeviceArray<Vec3>>(POSITION)?.assign(&self.points);
        ctx.write::<DeviceArray<Vec3>>(VELOCITY)?.fill_new(n, Vec3::ZERO);
        ctx.write::<DeviceArray<Vec3>>(FORCE)?.fill_new(n, Vec3::ZERO);
        info!(node = %ctx.node(), particles = n, "particle system reset");
        Ok(())
    }

    fn update_topology(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        if ctx.input_changed(BOUNDARY)? {
            let cubes = ctx.read::<BoundarySet>(BOUNDARY)?.cubes.len();
            debug!(node = %ctx.node(), cubes, "boundary changed");
        }
        Ok(())
    }

    fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        ctx.write::<DeviceArray<Vec3>>(FORCE)?
            .par_for_each_mut(|_, f| *f = Vec3::ZERO);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_includes_both_ends() {
        let mut ps = ParticleSystem::new();
        let n = ps.load_particles(Vec3::ZERO, Vec3::ONE, 0.5).unwrap();
        assert_eq!(n, 27);
        assert_eq!(ps.points()[0], Vec3::ZERO);
        assert_eq!(*ps.points().last().unwrap(), Vec3::ONE);
    }

    #[test]
    fn scale_then_translate() {
        let mut ps = ParticleSystem::new();
        ps.load_particles(Vec3::ZERO, Vec3::ONE, 1.0).unwrap();
        ps.scale(0.5).translate(Vec3::Y);
        assert_eq!(*ps.points().last().unwrap(), Vec3::new(0.5, 1.5, 0.5));
    }

    #[test]
    fn bad_spacing_adds_nothing() {
        let mut ps = ParticleSystem::new();
        assert!(ps.load_particles(Vec3::ZERO, Vec3::ONE, f32::NAN).is_err());
        assert!(ps.is_empty());
    }

    #[test]
    fn oversized_lattice_is_rejected_before_allocating() {
        let mut ps = ParticleSystem::new();
        ps.load_particles(Vec3::ZERO, Vec3::ONE, 0.5).unwrap();
        match ps.load_particles(Vec3::ZERO, Vec3::ONE, 1.0e-4) {
            Err(ParticleError::TooManyParticles { requested }) => {
                assert!(requested > MAX_PARTICLES);
                assert!(requested >= 10_000u64.pow(3));
            }
            other => panic!("expected TooManyParticles, got {other:?}"),
        }
        assert_eq!(ps.len(), 27);
    }

    #[test]
    fn huge_extent_saturates_instead_of_overflowing() {
        let mut ps = ParticleSystem::new();
        let err = ps
            .load_particles(Vec3::splat(-1.0e30), Vec3::splat(1.0e30), f32::MIN_POSITIVE)
            .unwrap_err();
        assert_eq!(err, ParticleError::TooManyParticles { requested: u64::MAX });
    }
}
