//! Benchmark scenes and utilities for the nodyn simulation framework.
//!
//! Provides pre-built graphs for benchmarking and examples:
//!
//! - [`particle_scene`]: one container with `systems` particle blocks attached
//! - [`rigid_scene`]: a row of boxes, spheres and capsules chained by ball joints
//! - [`plasticity_scene`]: two small particle blocks dropped into a unit box

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use glam::{Quat, Vec3};
use nodyn_core::{GraphError, NodeId};
use nodyn_graph::{ConfigError, Graph, SceneConfig};
use nodyn_particles::{add_particle_system, ParticleError, ParticleSystem, StaticBoundary};
use nodyn_rigid::{
    BoxInfo, CapsuleInfo, RigidBodyInfo, RigidBodySystem, RigidError, SphereInfo, DEFAULT_DENSITY,
};

/// Errors raised while assembling a benchmark scene.
#[derive(Debug)]
pub enum SceneError {
    /// The scene configuration was rejected.
    Config(ConfigError),
    /// Graph wiring failed.
    Graph(GraphError),
    /// Particle or boundary parameters were rejected.
    Particle(ParticleError),
    /// Body or joint authoring failed.
    Rigid(RigidError),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "scene config: {e}"),
            Self::Graph(e) => write!(f, "scene graph: {e}"),
            Self::Particle(e) => write!(f, "scene particles: {e}"),
            Self::Rigid(e) => write!(f, "scene bodies: {e}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Graph(e) => Some(e),
            Self::Particle(e) => Some(e),
            Self::Rigid(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SceneError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GraphError> for SceneError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<ParticleError> for SceneError {
    fn from(e: ParticleError) -> Self {
        Self::Particle(e)
    }
}

impl From<RigidError> for SceneError {
    fn from(e: RigidError) -> Self {
        Self::Rigid(e)
    }
}

/// A unit container holding `systems` particle blocks of roughly
/// `per_axis³` particles each. Returns the graph and the boundary node.
pub fn particle_scene(systems: usize, per_axis: usize) -> Result<(Graph, NodeId), SceneError> {
    let mut graph = Graph::default();
    let mut boundary = StaticBoundary::new();
    boundary.load_cube(Vec3::ZERO, Vec3::ONE, 0.005, true)?;
    let b = graph.add_node(boundary)?;

    let spacing = 0.1 / per_axis.max(1) as f32;
    for k in 0..systems {
        let lo = Vec3::new(0.1 + 0.02 * (k % 30) as f32, 0.5, 0.4);
        let mut ps = ParticleSystem::new();
        ps.load_particles(lo, lo + Vec3::splat(spacing * (per_axis.max(1) - 1) as f32), spacing)?;
        let p = graph.add_node(ps)?;
        add_particle_system(&mut graph, b, p)?;
    }
    Ok((graph, b))
}

/// A single rigid-body system with `bodies` bodies laid out on a line,
/// cycling through boxes, spheres and capsules, with each neighbor pair
/// joined by a ball-and-socket joint.
pub fn rigid_system(bodies: usize) -> Result<RigidBodySystem, RigidError> {
    let mut system = RigidBodySystem::new();
    let mut previous = None;
    for i in 0..bodies {
        let body = RigidBodyInfo::at(Vec3::new(0.3 * i as f32, 1.0, 0.0), Quat::IDENTITY);
        let actor = match i % 3 {
            0 => system.add_box(&BoxInfo::new(Vec3::splat(0.1)), &body, DEFAULT_DENSITY)?,
            1 => system.add_sphere(&SphereInfo::new(0.1), &body, DEFAULT_DENSITY)?,
            _ => system.add_capsule(&CapsuleInfo::new(0.05, 0.1), &body, DEFAULT_DENSITY)?,
        };
        if let Some(prev) = previous {
            let anchor = Vec3::new(0.3 * i as f32 - 0.15, 1.0, 0.0);
            system
                .create_ball_and_socket_joint(&prev, &actor)?
                .set_anchor_point(anchor, &prev, &actor);
        }
        previous = Some(actor);
    }
    Ok(system)
}

/// A graph holding [`rigid_system`]`(bodies)`. Returns the graph and the
/// system node.
pub fn rigid_scene(bodies: usize) -> Result<(Graph, NodeId), SceneError> {
    let mut graph = Graph::default();
    let id = graph.add_node(rigid_system(bodies)?)?;
    Ok((graph, id))
}

/// Two particle blocks dropped side by side into a unit container.
///
/// Returns the graph and the two particle-system nodes.
pub fn plasticity_scene(config: SceneConfig) -> Result<(Graph, [NodeId; 2]), SceneError> {
    let mut graph = Graph::new(config)?;
    let mut boundary = StaticBoundary::new();
    boundary.load_cube(Vec3::ZERO, Vec3::ONE, 0.005, true)?;
    let b = graph.add_node(boundary)?;

    let mut block = |offset: Vec3| -> Result<NodeId, SceneError> {
        let mut ps = ParticleSystem::new();
        ps.load_particles(Vec3::splat(-1.1), Vec3::splat(1.15), 0.1)?;
        ps.scale(0.05).translate(offset);
        let p = graph.add_node(ps)?;
        add_particle_system(&mut graph, b, p)?;
        Ok(p)
    };
    let left = block(Vec3::new(0.3, 0.2, 0.5))?;
    let right = block(Vec3::new(0.5, 0.2, 0.5))?;
    Ok((graph, [left, right]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_scene_attaches_every_system() {
        let (graph, b) = particle_scene(3, 4).unwrap();
        assert_eq!(graph.children(b).unwrap().len(), 3);
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn rigid_system_joins_neighbors() {
        let system = rigid_system(5).unwrap();
        assert_eq!(system.body_count(), 5);
        assert_eq!(system.joints::<nodyn_rigid::BallAndSocketJoint>().len(), 4);
    }

    #[test]
    fn plasticity_scene_steps() {
        let (mut graph, [a, b]) = plasticity_scene(SceneConfig::default()).unwrap();
        assert_ne!(a, b);
        graph.run(5).unwrap();
    }
}
