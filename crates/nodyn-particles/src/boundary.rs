//! Static boundary: a composite node owning particle systems.

use glam::Vec3;
use nodyn_core::{FieldError, GraphError, ModuleError, NodeId};
use nodyn_graph::{FieldDecl, FieldTable, Graph, Node, NodeContext};
use tracing::{debug, info};

use crate::cube::{BoundarySet, Cube};
use crate::error::ParticleError;
use crate::system::fields::BOUNDARY;

/// Walls shared by a set of child particle systems.
///
/// Publishes its cubes through the `Boundary` instance state; children
/// attached with [`add_particle_system`] read them through their own
/// `Boundary` input.
#[derive(Debug, Default)]
pub struct StaticBoundary {
    cubes: Vec<Cube>,
    particle_systems: Vec<NodeId>,
}

impl StaticBoundary {
    /// No walls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box wall. With `inverted` the box is a container; otherwise
    /// an obstacle.
    pub fn load_cube(&mut self, lo: Vec3, hi: Vec3, spacing: f32, inverted: bool) -> Result<&mut Self, ParticleError> {
        self.cubes.push(Cube::new(lo, hi, spacing, inverted)?);
        debug!(?lo, ?hi, spacing, inverted, "boundary cube loaded");
        Ok(self)
    }

    /// Loaded walls.
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    /// Particle systems attached to this boundary.
    pub fn particle_systems(&self) -> &[NodeId] {
        &self.particle_systems
    }
}

/// Attach `child` to `boundary`: record it, make it a graph child and
/// connect the boundary output into the child's `Boundary` input.
///
/// Nothing changes on failure.
pub fn add_particle_system(graph: &mut Graph, boundary: NodeId, child: NodeId) -> Result<(), GraphError> {
    graph.node_ref::<StaticBoundary>(boundary)?;
    let input = graph.field(child, BOUNDARY)?;
    graph.connect_named(boundary, BOUNDARY, child, BOUNDARY)?;
    if let Err(e) = graph.add_child(boundary, child) {
        graph.disconnect(input)?;
        return Err(e);
    }
    graph
        .node_mut::<StaticBoundary>(boundary)?
        .particle_systems
        .push(child);
    Ok(())
}

impl Node for StaticBoundary {
    fn class_name(&self) -> &str {
        "StaticBoundary"
    }

    fn declare_fields(&self, f: &mut FieldTable) -> Result<(), FieldError> {
        f.declare(FieldDecl::instance_state(BOUNDARY, BoundarySet::default()).describe("Walls shared with child particle systems"))?;
        Ok(())
    }

    fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        ctx.set(
            BOUNDARY,
            BoundarySet {
                cubes: self.cubes.clone(),
            },
        )?;
        info!(
            node = %ctx.node(),
            cubes = self.cubes.len(),
            particle_systems = self.particle_systems.len(),
            "boundary reset"
        );
        Ok(())
    }
}
