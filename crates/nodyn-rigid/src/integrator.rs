//! Explicit rigid-body time integration.
//!
//! Semi-implicit Euler: velocities first (gravity on dynamic bodies), then
//! positions and orientations from the updated velocities. Contact and
//! joint resolution belong to solver modules placed after this one.

use glam::{Mat3, Quat, Vec3};
use nodyn_array::DeviceArray;
use nodyn_core::ModuleError;
use nodyn_graph::{Module, NodeContext};
use tracing::trace;

use crate::body::Attribute;
use crate::system::fields::*;

/// Advances `Velocity`, `Center`, `Quaternion`, `RotationMatrix` and
/// `Inertia` of a [`RigidBodySystem`](crate::RigidBodySystem) by one `dt`.
#[derive(Debug, Default)]
pub struct RigidBodyIntegrator;

impl RigidBodyIntegrator {
    /// A new integrator.
    pub fn new() -> Self {
        Self
    }
}

/// First-order quaternion update `q + ½·dt·ω·q`, renormalized.
pub fn integrate_rotation(q: Quat, omega: Vec3, dt: f32) -> Quat {
    let w = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
    let dq = w * q;
    let next = Quat::from_xyzw(
        q.x + 0.5 * dt * dq.x,
        q.y + 0.5 * dt * dq.y,
        q.z + 0.5 * dt * dq.z,
        q.w + 0.5 * dt * dq.w,
    );
    next.normalize()
}

impl Module for RigidBodyIntegrator {
    fn name(&self) -> &str {
        "RigidBodyIntegrator"
    }

    fn execute(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let dt = ctx.dt();
        let gravity = if ctx.get::<bool>(GRAVITY_ENABLED)? {
            ctx.config().gravity.normalize_or_zero() * ctx.get::<f32>(GRAVITY_VALUE)?
        } else {
            Vec3::ZERO
        };

        let attrs = ctx.read::<DeviceArray<Attribute>>(ATTRIBUTE)?;
        let n = attrs.len();
        let attr = attrs.as_slice();
        let moving = |i: usize| attr.get(i).is_some_and(|a| !a.is_static());
        let dynamic = |i: usize| attr.get(i).is_some_and(|a| a.is_dynamic());

        // 1. Velocities.
        let mut velocity = ctx.write::<DeviceArray<Vec3>>(VELOCITY)?;
        velocity.ensure_len(VELOCITY, n)?;
        velocity.par_for_each_mut(|i, v| {
            if dynamic(i) {
                *v += gravity * dt;
            }
        });

        // 2. Positions.
        ctx.write::<DeviceArray<Vec3>>(CENTER)?
            .par_zip_mut(CENTER, &*velocity, |i, c, v| {
                if moving(i) {
                    *c += *v * dt;
                }
            })?;
        drop(velocity);

        // 3. Orientations.
        let omega = ctx.read::<DeviceArray<Vec3>>(ANGULAR_VELOCITY)?;
        omega.ensure_len(ANGULAR_VELOCITY, n)?;
        let mut quat = ctx.write::<DeviceArray<Quat>>(QUATERNION)?;
        quat.par_zip_mut(QUATERNION, &*omega, |i, q, w| {
            if moving(i) {
                *q = integrate_rotation(*q, *w, dt);
            }
        })?;

        // 4. Derived rotation and world inertia.
        let mut rotation = ctx.write::<DeviceArray<Mat3>>(ROTATION_MATRIX)?;
        rotation.par_zip_mut(ROTATION_MATRIX, &*quat, |_, r, q| *r = Mat3::from_quat(*q))?;
        let initial = ctx.read::<DeviceArray<Mat3>>(INITIAL_INERTIA)?;
        initial.ensure_len(INITIAL_INERTIA, n)?;
        let local = initial.as_slice();
        let mut inertia = ctx.write::<DeviceArray<Mat3>>(INERTIA)?;
        inertia.par_zip_mut(INERTIA, &*rotation, |i, world, r| {
            if let Some(i0) = local.get(i) {
                *world = *r * *i0 * r.transpose();
            }
        })?;

        trace!(node = %ctx.node(), bodies = n, dt, "rigid bodies integrated");
        Ok(())
    }
}
