//! Catalog registration for the particle nodes.

use glam::Vec3;
use nodyn_graph::NodeFactory;
use tracing::warn;

use crate::boundary::StaticBoundary;
use crate::system::ParticleSystem;

/// Catalog group holding the particle nodes.
pub const GROUP: &str = "Particle System";

fn default_boundary() -> StaticBoundary {
    let mut boundary = StaticBoundary::new();
    if let Err(e) = boundary.load_cube(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 1.0, 0.5), 0.02, true) {
        warn!(error = %e, "default boundary cube rejected");
    }
    boundary
}

/// Add the particle nodes to `factory`.
pub fn register_nodes(factory: &mut NodeFactory) {
    factory
        .add_group(GROUP, "Particle System", "ToolBarIco/ParticleSystem/ParticleSystem.png")
        .add_action(
            "Particle System",
            "ToolBarIco/ParticleSystem/ParticleSystem.png",
            || Box::new(ParticleSystem::new()),
        )
        .add_action("Boundary", "ToolBarIco/RigidBody/StaticBoundary.png", || {
            Box::new(default_boundary())
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodyn_graph::downcast_node;

    #[test]
    fn boundary_action_preloads_unit_cube() {
        let mut f = NodeFactory::new();
        register_nodes(&mut f);
        let node = f.find(GROUP, "Boundary").unwrap().create();
        let boundary = downcast_node::<StaticBoundary>(&*node).unwrap();
        assert_eq!(boundary.cubes().len(), 1);
        assert_eq!(boundary.cubes()[0].hi, Vec3::new(0.5, 1.0, 0.5));
        assert!(boundary.cubes()[0].inverted);
    }
}
