//! Handles to registered bodies.

use glam::{Quat, Vec3};

use crate::shape::ShapeType;

/// Handle to a registered body.
///
/// Returned by the `add_*` calls on
/// [`RigidBodySystem`](crate::RigidBodySystem). `idx` is the body's
/// position in the registry, or `-1` for a handle that was never
/// registered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Actor {
    /// Body index, `-1` when unset.
    pub idx: i32,
    /// Element kind of the body's shape.
    pub shape_type: ShapeType,
    /// Barycenter in the world at registration time.
    pub center: Vec3,
    /// Orientation at registration time.
    pub rot: Quat,
}

impl Actor {
    /// A handle that refers to no body.
    pub fn unset() -> Self {
        Self {
            idx: -1,
            shape_type: ShapeType::Other,
            center: Vec3::ZERO,
            rot: Quat::IDENTITY,
        }
    }

    /// Whether this handle names a registered body.
    pub fn is_set(&self) -> bool {
        self.idx >= 0
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::unset()
    }
}
