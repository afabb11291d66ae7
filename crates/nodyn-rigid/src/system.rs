//! The rigid-body system node.
//!
//! Authoring happens on the host: bodies, shapes and joints are appended
//! to registries on the node. [`RigidBodySystem::synchronize`] flattens
//! them into freshly sized device arrays; it runs at every reset and may
//! be called explicitly after authoring more content on a running graph.
//!
//! ```text
//!   add_box / add_sphere / ...        create_*_joint
//!            │                              │
//!            ▼                              ▼
//!   bodies: DualArray  shapes: ShapeSet  joints: JointRegistry
//!            │              │               │
//!            └──────── synchronize ─────────┘
//!                           │
//!                           ▼
//!   Mass, Center, ..., Attribute      *Joints      Topology
//! ```

use std::any::Any;

use glam::{Mat3, Quat, Vec3};
use nodyn_array::{check_len, DeviceArray, DeviceArray2D, DualArray};
use nodyn_core::{FieldError, ModuleError};
use nodyn_graph::{FieldDecl, FieldTable, Node, NodeContext, Pipeline};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::actor::Actor;
use crate::body::{Attribute, CollisionMask, RigidBodyInfo};
use crate::elements::{DiscreteElements, ShapeSet, Stored};
use crate::error::RigidError;
use crate::integrator::RigidBodyIntegrator;
use crate::joint::{
    check_actor, BallAndSocketJoint, FixedJoint, HingeJoint, JointRecord, JointRegistry,
    PointJoint, SliderJoint,
};
use crate::shape::{BoxInfo, CapsuleInfo, Shape, SphereInfo, TetInfo};

/// Field names declared by [`RigidBodySystem`].
pub mod fields {
    /// `Var<bool>`: friction on contacts.
    pub const FRICTION_ENABLED: &str = "FrictionEnabled";
    /// `Var<bool>`: apply gravity to dynamic bodies.
    pub const GRAVITY_ENABLED: &str = "GravityEnabled";
    /// `Var<f32>`: gravity magnitude.
    pub const GRAVITY_VALUE: &str = "GravityValue";
    /// `Var<f32>`: friction coefficient.
    pub const FRICTION_COEFFICIENT: &str = "FrictionCoefficient";
    /// `Var<f32>`: penetration tolerance.
    pub const SLOP: &str = "Slop";
    /// `InstanceState<DiscreteElements>`.
    pub const TOPOLOGY: &str = "Topology";
    /// `ArrayState<f32>`.
    pub const MASS: &str = "Mass";
    /// `ArrayState<Vec3>`: world barycenters.
    pub const CENTER: &str = "Center";
    /// `ArrayState<Vec3>`: barycenter offsets in body frames.
    pub const OFFSET: &str = "Offset";
    /// `ArrayState<Vec3>`.
    pub const VELOCITY: &str = "Velocity";
    /// `ArrayState<Vec3>`.
    pub const ANGULAR_VELOCITY: &str = "AngularVelocity";
    /// `ArrayState<Mat3>`.
    pub const ROTATION_MATRIX: &str = "RotationMatrix";
    /// `ArrayState<Mat3>`: world inertia.
    pub const INERTIA: &str = "Inertia";
    /// `ArrayState<Mat3>`: body-frame inertia.
    pub const INITIAL_INERTIA: &str = "InitialInertia";
    /// `ArrayState<Quat>`.
    pub const QUATERNION: &str = "Quaternion";
    /// `ArrayState<CollisionMask>`.
    pub const COLLISION_MASK: &str = "CollisionMask";
    /// `ArrayState<Attribute>`.
    pub const ATTRIBUTE: &str = "Attribute";
    /// `ArrayState<BallAndSocketJoint>`.
    pub const BALL_AND_SOCKET_JOINTS: &str = "BallAndSocketJoints";
    /// `ArrayState<SliderJoint>`.
    pub const SLIDER_JOINTS: &str = "SliderJoints";
    /// `ArrayState<HingeJoint>`.
    pub const HINGE_JOINTS: &str = "HingeJoints";
    /// `ArrayState<FixedJoint>`.
    pub const FIXED_JOINTS: &str = "FixedJoints";
    /// `ArrayState<PointJoint>`.
    pub const POINT_JOINTS: &str = "PointJoints";
}

use fields::*;

/// Density used when callers have no better value.
pub const DEFAULT_DENSITY: f32 = 100.0;

/// A registry of rigid bodies and joints mirrored into device arrays.
#[derive(Debug, Default)]
pub struct RigidBodySystem {
    bodies: DualArray<RigidBodyInfo>,
    shapes: ShapeSet,
    joints: JointRegistry,
    sample_points: Vec<Vec3>,
    sample_normals: Vec<Vec3>,
    samples: DeviceArray2D<Vec3>,
    normals: DeviceArray2D<Vec3>,
    warned_joints: Option<u64>,
}

impl RigidBodySystem {
    /// An empty system.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Actors ─────────────────────────────────────────────────────

    fn add_shape<S: Stored>(&mut self, shape: &S, body: &RigidBodyInfo, density: f32) -> Result<Actor, RigidError> {
        if !density.is_finite() || density <= 0.0 {
            return Err(RigidError::InvalidDensity { density });
        }
        shape.validate()?;

        let props = shape.mass_properties(density);
        let idx = self.bodies.host_len();
        let mut state = *body;
        state.mass = props.mass;
        state.inertia = props.inertia;
        state.offset = props.barycenter;
        state.shape_type = S::TYPE;
        state.angle = state.angle.normalize();

        self.bodies.push(state);
        self.shapes.push(idx as u32, shape.clone());
        debug!(body = idx, shape = %S::TYPE, mass = props.mass, "actor added");
        Ok(Actor {
            idx: idx as i32,
            shape_type: S::TYPE,
            center: state.center(),
            rot: state.angle,
        })
    }

    /// Register a body carrying a box.
    pub fn add_box(&mut self, shape: &BoxInfo, body: &RigidBodyInfo, density: f32) -> Result<Actor, RigidError> {
        self.add_shape(shape, body, density)
    }

    /// Register a body carrying a sphere.
    pub fn add_sphere(&mut self, shape: &SphereInfo, body: &RigidBodyInfo, density: f32) -> Result<Actor, RigidError> {
        self.add_shape(shape, body, density)
    }

    /// Register a body carrying a tetrahedron.
    pub fn add_tet(&mut self, shape: &TetInfo, body: &RigidBodyInfo, density: f32) -> Result<Actor, RigidError> {
        self.add_shape(shape, body, density)
    }

    /// Register a body carrying a capsule.
    pub fn add_capsule(&mut self, shape: &CapsuleInfo, body: &RigidBodyInfo, density: f32) -> Result<Actor, RigidError> {
        self.add_shape(shape, body, density)
    }

    /// Registered body count (host side).
    pub fn body_count(&self) -> usize {
        self.bodies.host_len()
    }

    /// Host body records.
    pub fn bodies(&self) -> &[RigidBodyInfo] {
        self.bodies.host()
    }

    /// Authored shapes.
    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    /// Whether host records changed since the last synchronization.
    pub fn needs_sync(&self) -> bool {
        self.bodies.is_stale() || self.joints.has_unflushed()
    }

    // ── Joints ─────────────────────────────────────────────────────

    /// Join two bodies at a shared point.
    pub fn create_ball_and_socket_joint(&mut self, a1: &Actor, a2: &Actor) -> Result<&mut BallAndSocketJoint, RigidError> {
        let n = self.body_count();
        self.joints.create_pair(a1, a2, n, BallAndSocketJoint::default())
    }

    /// Constrain two bodies to slide along one axis.
    pub fn create_slider_joint(&mut self, a1: &Actor, a2: &Actor) -> Result<&mut SliderJoint, RigidError> {
        let n = self.body_count();
        self.joints.create_pair(a1, a2, n, SliderJoint::default())
    }

    /// Constrain two bodies to rotate about one axis.
    pub fn create_hinge_joint(&mut self, a1: &Actor, a2: &Actor) -> Result<&mut HingeJoint, RigidError> {
        let n = self.body_count();
        self.joints.create_pair(a1, a2, n, HingeJoint::default())
    }

    /// Weld two bodies together.
    pub fn create_fixed_joint(&mut self, a1: &Actor, a2: &Actor) -> Result<&mut FixedJoint, RigidError> {
        let n = self.body_count();
        self.joints.create_pair(a1, a2, n, FixedJoint::default())
    }

    /// Pin one body to a world point.
    pub fn create_point_joint(&mut self, a1: &Actor) -> Result<&mut PointJoint, RigidError> {
        check_actor(a1, self.body_count())?;
        Ok(self.joints.push(PointJoint {
            body_idx1: a1.idx,
            body_type1: a1.shape_type,
            ..PointJoint::default()
        }))
    }

    /// Host records of joint kind `J`.
    pub fn joints<J: JointRecord>(&self) -> &[J] {
        self.joints.all::<J>()
    }

    /// Host record `index` of joint kind `J`, for editing after creation.
    pub fn joint_mut<J: JointRecord>(&mut self, index: usize) -> Option<&mut J> {
        self.joints.get_mut::<J>(index)
    }

    /// The joint registry.
    pub fn joint_registry(&self) -> &JointRegistry {
        &self.joints
    }

    /// Whether unflushed joint changes still need a warning. Warns once
    /// per registry version.
    fn take_joint_warning(&mut self) -> bool {
        let version = self.joints.version();
        if !self.joints.has_unflushed() || self.warned_joints == Some(version) {
            return false;
        }
        self.warned_joints = Some(version);
        true
    }

    // ── Surface samples ────────────────────────────────────────────

    /// Sample points and normals shared by every body, relative to each
    /// body's barycenter in its frame.
    pub fn set_surface_samples(&mut self, samples: Vec<Vec3>, normals: Vec<Vec3>) -> Result<(), RigidError> {
        if samples.len() != normals.len() {
            return Err(RigidError::SampleCountMismatch {
                samples: samples.len(),
                normals: normals.len(),
            });
        }
        self.sample_points = samples;
        self.sample_normals = normals;
        Ok(())
    }

    /// World sample points: column `i` is sample `i`, row `j` is body `j`.
    pub fn samples(&self) -> &DeviceArray2D<Vec3> {
        &self.samples
    }

    /// World sample normals, laid out like [`samples`](Self::samples).
    pub fn normals(&self) -> &DeviceArray2D<Vec3> {
        &self.normals
    }

    /// Samples per body.
    pub fn sampling_point_size(&self) -> usize {
        self.sample_points.len()
    }

    // ── Synchronization ────────────────────────────────────────────

    /// Flatten the host registries into the device arrays.
    ///
    /// Every array is replaced whole and sized to the current registry;
    /// element order follows registration order.
    pub fn synchronize(&mut self, ctx: &NodeContext<'_>) -> Result<(), RigidError> {
        self.bodies.sync();
        self.shapes.sync();
        let dev = self.bodies.device();

        assign(ctx, MASS, dev.par_map(|_, b| b.mass))?;
        assign(ctx, CENTER, dev.par_map(|_, b| b.center()))?;
        assign(ctx, OFFSET, dev.par_map(|_, b| b.offset))?;
        assign(ctx, VELOCITY, dev.par_map(|_, b| b.linear_velocity))?;
        assign(ctx, ANGULAR_VELOCITY, dev.par_map(|_, b| b.angular_velocity))?;
        assign(ctx, ROTATION_MATRIX, dev.par_map(|_, b| b.rotation_matrix()))?;
        assign(ctx, INERTIA, dev.par_map(|_, b| b.world_inertia()))?;
        assign(ctx, INITIAL_INERTIA, dev.par_map(|_, b| b.inertia))?;
        assign(ctx, QUATERNION, dev.par_map(|_, b| b.angle))?;
        assign(ctx, COLLISION_MASK, dev.par_map(|_, b| b.collision_mask))?;
        assign(
            ctx,
            ATTRIBUTE,
            dev.par_map(|i, b| Attribute::new(b.motion_type, b.body_id.unwrap_or(i as u32))),
        )?;

        flush::<BallAndSocketJoint>(ctx, &self.joints)?;
        flush::<SliderJoint>(ctx, &self.joints)?;
        flush::<HingeJoint>(ctx, &self.joints)?;
        flush::<FixedJoint>(ctx, &self.joints)?;
        flush::<PointJoint>(ctx, &self.joints)?;
        self.joints.mark_flushed();
        self.warned_joints = None;

        self.refresh_topology(ctx)?;
        self.refresh_samples(ctx)?;
        info!(
            node = %ctx.node(),
            bodies = self.bodies.host_len(),
            joints = self.joints.total(),
            "rigid body system synchronized"
        );
        Ok(())
    }

    /// Fail with `StaleDeviceArray` unless every per-body array holds one
    /// element per registered body.
    pub fn check_device_arrays(&self, ctx: &NodeContext<'_>) -> Result<(), RigidError> {
        let n = self.body_count();
        check_len(MASS, n, len_of::<f32>(ctx, MASS)?)?;
        for name in [CENTER, OFFSET, VELOCITY, ANGULAR_VELOCITY] {
            check_len(name, n, len_of::<Vec3>(ctx, name)?)?;
        }
        for name in [ROTATION_MATRIX, INERTIA, INITIAL_INERTIA] {
            check_len(name, n, len_of::<Mat3>(ctx, name)?)?;
        }
        check_len(QUATERNION, n, len_of::<Quat>(ctx, QUATERNION)?)?;
        check_len(COLLISION_MASK, n, len_of::<CollisionMask>(ctx, COLLISION_MASK)?)?;
        check_len(ATTRIBUTE, n, len_of::<Attribute>(ctx, ATTRIBUTE)?)?;
        Ok(())
    }

    fn refresh_topology(&self, ctx: &NodeContext<'_>) -> Result<(), RigidError> {
        let centers = ctx.read::<DeviceArray<Vec3>>(CENTER)?;
        let rots = ctx.read::<DeviceArray<Quat>>(QUATERNION)?;
        let mut topology = ctx.write::<DiscreteElements>(TOPOLOGY)?;
        topology.rebuild(&self.shapes, centers.as_slice(), rots.as_slice())
    }

    fn refresh_samples(&mut self, ctx: &NodeContext<'_>) -> Result<(), RigidError> {
        let centers = ctx.read::<DeviceArray<Vec3>>(CENTER)?;
        let rotations = ctx.read::<DeviceArray<Mat3>>(ROTATION_MATRIX)?;
        check_len(ROTATION_MATRIX, centers.len(), rotations.len())?;

        let nx = self.sample_points.len();
        let ny = centers.len();
        let (c, r) = (centers.as_slice(), rotations.as_slice());
        let (pts, nrm) = (&self.sample_points, &self.sample_normals);
        let world: Vec<(Vec3, Vec3)> = (0..nx * ny)
            .into_par_iter()
            .map(|k| {
                let (i, j) = (k % nx, k / nx);
                (c[j] + r[j] * pts[i], r[j] * nrm[i])
            })
            .collect();
        let (points, normals): (Vec<Vec3>, Vec<Vec3>) = world.into_iter().unzip();
        self.samples.assign(nx, ny, &points)?;
        self.normals.assign(nx, ny, &normals)?;
        Ok(())
    }
}

fn assign<T: Any>(ctx: &NodeContext<'_>, name: &str, array: DeviceArray<T>) -> Result<(), FieldError> {
    *ctx.write::<DeviceArray<T>>(name)? = array;
    Ok(())
}

fn flush<J: JointRecord>(ctx: &NodeContext<'_>, joints: &JointRegistry) -> Result<(), FieldError> {
    ctx.write::<DeviceArray<J>>(J::KIND.field_name())?
        .assign(joints.all::<J>());
    Ok(())
}

fn len_of<T: Any>(ctx: &NodeContext<'_>, name: &str) -> Result<usize, FieldError> {
    Ok(ctx.read::<DeviceArray<T>>(name)?.len())
}

impl Node for RigidBodySystem {
    fn class_name(&self) -> &str {
        "RigidBodySystem"
    }

    fn declare_fields(&self, f: &mut FieldTable) -> Result<(), FieldError> {
        f.declare(FieldDecl::var(FRICTION_ENABLED, true).describe("A toggle to control the friction"))?;
        f.declare(FieldDecl::var(GRAVITY_ENABLED, true).describe("A toggle to control the gravity"))?;
        f.declare(FieldDecl::var(GRAVITY_VALUE, 9.8f32).describe("Gravity magnitude"))?;
        f.declare(FieldDecl::var(FRICTION_COEFFICIENT, 1000.0f32).describe("Friction coefficient"))?;
        f.declare(FieldDecl::var(SLOP, 0.001f32).describe("Penetration tolerance"))?;
        f.declare(FieldDecl::instance_state(TOPOLOGY, DiscreteElements::new()).describe("Collision elements in the world frame"))?;

        f.declare(FieldDecl::array_state::<f32>(MASS).describe("Mass"))?;
        f.declare(FieldDecl::array_state::<Vec3>(CENTER).describe("Center of mass"))?;
        f.declare(FieldDecl::array_state::<Vec3>(OFFSET).describe("Barycenter offset"))?;
        f.declare(FieldDecl::array_state::<Vec3>(VELOCITY).describe("Linear velocity"))?;
        f.declare(FieldDecl::array_state::<Vec3>(ANGULAR_VELOCITY).describe("Angular velocity"))?;
        f.declare(FieldDecl::array_state::<Mat3>(ROTATION_MATRIX).describe("Rotation matrix"))?;
        f.declare(FieldDecl::array_state::<Mat3>(INERTIA).describe("Inertia in the world frame"))?;
        f.declare(FieldDecl::array_state::<Mat3>(INITIAL_INERTIA).describe("Inertia in the body frame"))?;
        f.declare(FieldDecl::array_state::<Quat>(QUATERNION).describe("Orientation"))?;
        f.declare(FieldDecl::array_state::<CollisionMask>(COLLISION_MASK).describe("Collision mask"))?;
        f.declare(FieldDecl::array_state::<Attribute>(ATTRIBUTE).describe("Motion type and object id"))?;

        f.declare(FieldDecl::array_state::<BallAndSocketJoint>(BALL_AND_SOCKET_JOINTS).describe("Ball and socket joints"))?;
        f.declare(FieldDecl::array_state::<SliderJoint>(SLIDER_JOINTS).describe("Slider joints"))?;
        f.declare(FieldDecl::array_state::<HingeJoint>(HINGE_JOINTS).describe("Hinge joints"))?;
        f.declare(FieldDecl::array_state::<FixedJoint>(FIXED_JOINTS).describe("Fixed joints"))?;
        f.declare(FieldDecl::array_state::<PointJoint>(POINT_JOINTS).describe("Point joints"))?;
        Ok(())
    }

    fn build_pipeline(&self, pipeline: &mut Pipeline) {
        pipeline.push(Box::new(RigidBodyIntegrator::new()));
    }

    fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        self.synchronize(ctx)?;
        Ok(())
    }

    fn update_topology(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        self.check_device_arrays(ctx)?;
        if self.take_joint_warning() {
            warn!(
                node = %ctx.node(),
                joints = self.joints.total(),
                "joints added or edited since the last synchronize are not on device"
            );
        }
        self.refresh_topology(ctx)?;
        self.refresh_samples(ctx)?;
        Ok(())
    }
}
