//! A rigid-body system whose bodies drive shape instances.
//!
//! A vehicle binds each body to one instance of a renderable shape. Every
//! step the instance transforms follow the bound bodies' poses, expressed
//! relative to the orientation each body had at the last reset.

use glam::{Mat3, Vec3};
use nodyn_array::{DeviceArray, DeviceArrayList};
use nodyn_core::{FieldError, ModuleError};
use nodyn_graph::{FieldDecl, FieldTable, Node, NodeContext, Pipeline};
use tracing::debug;

use crate::actor::Actor;
use crate::error::RigidError;
use crate::joint::check_actor;
use crate::system::{fields, RigidBodySystem};

/// Field names declared by [`Vehicle`] on top of the rigid-body fields.
pub mod vehicle_fields {
    /// `ArrayState<(u32, u32)>`: (shape, instance) per binding.
    pub const BINDING: &str = "Binding";
    /// `ArrayState<i32>`: bound body per binding.
    pub const BINDING_TAG: &str = "BindingTag";
    /// `ArrayListState<Transform>`: one list per shape, one entry per
    /// instance.
    pub const INSTANCE_TRANSFORM: &str = "InstanceTransform";
}

use vehicle_fields::*;

/// `(shape index, instance index)`.
pub type BindingPair = (u32, u32);

/// Placement of one shape instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation.
    pub translation: Vec3,
    /// Rotation.
    pub rotation: Mat3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Mat3::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// A [`RigidBodySystem`] plus body → shape instance bindings.
#[derive(Debug, Default)]
pub struct Vehicle {
    system: RigidBodySystem,
    bindings: Vec<(i32, BindingPair)>,
    initial_rotation: Vec<Mat3>,
}

impl Vehicle {
    /// An empty vehicle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying rigid-body system.
    pub fn system(&self) -> &RigidBodySystem {
        &self.system
    }

    /// The underlying rigid-body system, for authoring bodies and joints.
    pub fn system_mut(&mut self) -> &mut RigidBodySystem {
        &mut self.system
    }

    /// Drive instance `pair.1` of shape `pair.0` with `actor`'s body.
    ///
    /// Takes effect at the next reset.
    pub fn bind(&mut self, actor: &Actor, pair: BindingPair) -> Result<(), RigidError> {
        check_actor(actor, self.system.body_count())?;
        self.bindings.push((actor.idx, pair));
        Ok(())
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> &[(i32, BindingPair)] {
        &self.bindings
    }

    fn instance_counts(&self) -> Vec<u32> {
        let shapes = self
            .bindings
            .iter()
            .map(|(_, (s, _))| *s as usize + 1)
            .max()
            .unwrap_or(0);
        let mut counts = vec![0u32; shapes];
        for (_, (s, i)) in &self.bindings {
            let c = &mut counts[*s as usize];
            *c = (*c).max(i + 1);
        }
        counts
    }

    fn update_instances(&self, ctx: &NodeContext<'_>) -> Result<(), RigidError> {
        let centers = ctx.read::<DeviceArray<Vec3>>(fields::CENTER)?;
        let rotations = ctx.read::<DeviceArray<Mat3>>(fields::ROTATION_MATRIX)?;
        let mut list = ctx.write::<DeviceArrayList<Transform>>(INSTANCE_TRANSFORM)?;

        for (k, (body, (shape, instance))) in self.bindings.iter().enumerate() {
            let b = *body as usize;
            let (Some(&c), Some(&r)) = (centers.get(b), rotations.get(b)) else {
                return Err(RigidError::InvalidActor { idx: *body });
            };
            let r0 = self.initial_rotation.get(k).copied().unwrap_or(Mat3::IDENTITY);
            let slot = list
                .list_mut(*shape as usize)
                .and_then(|l| l.get_mut(*instance as usize));
            if let Some(t) = slot {
                *t = Transform {
                    translation: c,
                    rotation: r * r0.transpose(),
                    scale: Vec3::ONE,
                };
            }
        }
        Ok(())
    }
}

impl Node for Vehicle {
    fn class_name(&self) -> &str {
        "Vehicle"
    }

    fn declare_fields(&self, f: &mut FieldTable) -> Result<(), FieldError> {
        self.system.declare_fields(f)?;
        f.declare(FieldDecl::array_state::<BindingPair>(BINDING).describe("Shape and instance per binding"))?;
        f.declare(FieldDecl::array_state::<i32>(BINDING_TAG).describe("Body per binding"))?;
        f.declare(FieldDecl::array_list_state::<Transform>(INSTANCE_TRANSFORM).describe("Instance transforms per shape"))?;
        Ok(())
    }

    fn build_pipeline(&self, pipeline: &mut Pipeline) {
        self.system.build_pipeline(pipeline);
    }

    fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        self.system.reset_states(ctx)?;

        let pairs: Vec<BindingPair> = self.bindings.iter().map(|(_, p)| *p).collect();
        let tags: Vec<i32> = self.bindings.iter().map(|(b, _)| *b).collect();
        ctx.write::<DeviceArray<BindingPair>>(BINDING)?.assign(&pairs);
        ctx.write::<DeviceArray<i32>>(BINDING_TAG)?.assign(&tags);
        ctx.write::<DeviceArrayList<Transform>>(INSTANCE_TRANSFORM)?
            .resize(&self.instance_counts());

        {
            let rotations = ctx.read::<DeviceArray<Mat3>>(fields::ROTATION_MATRIX)?;
            self.initial_rotation = tags
                .iter()
                .map(|&b| rotations.get(b as usize).copied().unwrap_or(Mat3::IDENTITY))
                .collect();
        }
        self.update_instances(ctx)?;
        debug!(node = %ctx.node(), bindings = self.bindings.len(), "vehicle bindings flushed");
        Ok(())
    }

    fn update_topology(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        self.system.update_topology(ctx)
    }

    fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        self.system.update_states(ctx)?;
        self.update_instances(ctx)?;
        Ok(())
    }
}
