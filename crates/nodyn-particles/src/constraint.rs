//! Boundary collision for particles.

use glam::Vec3;
use nodyn_array::DeviceArray;
use nodyn_core::ModuleError;
use nodyn_graph::{Module, NodeContext};

use crate::cube::BoundarySet;
use crate::system::fields::*;

/// Projects particles that left the connected boundary back onto it and
/// removes the velocity component pointing into the wall.
///
/// Does nothing while the `Boundary` input is unconnected.
#[derive(Debug, Default)]
pub struct BoundaryConstraint;

impl BoundaryConstraint {
    /// A new constraint.
    pub fn new() -> Self {
        Self
    }
}

impl Module for BoundaryConstraint {
    fn name(&self) -> &str {
        "BoundaryConstraint"
    }

    fn execute(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let guard = ctx.read::<BoundarySet>(BOUNDARY)?;
        let boundary: &BoundarySet = &guard;
        if boundary.is_empty() {
            return Ok(());
        }

        // Velocities first: the correction depends on the unprojected
        // position.
        let mut position = ctx.write::<DeviceArray<Vec3>>(POSITION)?;
        ctx.write::<DeviceArray<Vec3>>(VELOCITY)?
            .par_zip_mut(VELOCITY, &*position, |_, v, p| {
                if let (_, Some(n)) = boundary.resolve(*p) {
                    let into_wall = v.dot(n);
                    if into_wall < 0.0 {
                        *v -= n * into_wall;
                    }
                }
            })?;
        position.par_for_each_mut(|_, p| *p = boundary.resolve(*p).0);
        Ok(())
    }
}
