//! Particle systems and static boundaries for nodyn.
//!
//! A [`ParticleSystem`] node advances point particles with a
//! [`ParticleIntegrator`] and keeps them inside the walls of a connected
//! [`StaticBoundary`] through a [`BoundaryConstraint`]. Boundaries are
//! composite nodes: [`add_particle_system`] makes a particle system their
//! child and wires the walls into it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod constraint;
pub mod cube;
pub mod error;
pub mod factory;
pub mod integrator;
pub mod system;

pub use boundary::{add_particle_system, StaticBoundary};
pub use constraint::BoundaryConstraint;
pub use cube::{BoundarySet, Cube};
pub use error::ParticleError;
pub use factory::register_nodes;
pub use integrator::ParticleIntegrator;
pub use system::{fields, ParticleSystem, MAX_PARTICLES};
