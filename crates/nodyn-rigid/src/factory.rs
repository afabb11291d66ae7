//! Catalog registration for the rigid-body nodes.

use nodyn_graph::NodeFactory;

use crate::system::RigidBodySystem;
use crate::vehicle::Vehicle;

/// Catalog group holding the rigid-body nodes.
pub const GROUP: &str = "Rigid Body";

/// Add the rigid-body nodes to `factory`.
pub fn register_nodes(factory: &mut NodeFactory) {
    factory
        .add_group(GROUP, "Rigid body", "ToolBarIco/RigidBody/RigidBody.png")
        .add_action(
            "Rigid Body System",
            "ToolBarIco/RigidBody/GhostParticles.png",
            || Box::new(RigidBodySystem::new()),
        )
        .add_action("Vehicle", "ToolBarIco/RigidBody/Vehicle.png", || {
            Box::new(Vehicle::new())
        });
}
