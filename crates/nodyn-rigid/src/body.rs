//! Per-body host records and their packed device tags.

use glam::{Mat3, Quat, Vec3};

use crate::shape::ShapeType;

/// How a body participates in the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionType {
    /// Never moves.
    Static = 0,
    /// Moves only by its prescribed velocity; ignores forces.
    Kinematic = 1,
    /// Fully simulated.
    #[default]
    Dynamic = 2,
}

impl MotionType {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Static,
            1 => Self::Kinematic,
            _ => Self::Dynamic,
        }
    }
}

/// Which element kinds a body collides with. One bit per [`ShapeType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    /// Collide with everything.
    pub const ALL: Self = Self(u32::MAX);
    /// Collide with nothing.
    pub const NONE: Self = Self(0);

    /// This mask with `shape` cleared.
    pub fn excluding(self, shape: ShapeType) -> Self {
        Self(self.0 & !shape.bit())
    }

    /// Whether collisions against `shape` are enabled.
    pub fn accepts(self, shape: ShapeType) -> bool {
        self.0 & shape.bit() != 0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Packed per-body tag: motion type in the top two bits, object id in
/// the low thirty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Attribute(pub u32);

impl Attribute {
    const MOTION_SHIFT: u32 = 30;
    const ID_MASK: u32 = (1 << Self::MOTION_SHIFT) - 1;

    /// Pack a motion type and an object id. Ids wider than 30 bits are
    /// truncated.
    pub fn new(motion: MotionType, object_id: u32) -> Self {
        Self(((motion as u32) << Self::MOTION_SHIFT) | (object_id & Self::ID_MASK))
    }

    /// The motion type.
    pub fn motion(self) -> MotionType {
        MotionType::from_bits(self.0 >> Self::MOTION_SHIFT)
    }

    /// The object id.
    pub fn object_id(self) -> u32 {
        self.0 & Self::ID_MASK
    }

    /// Whether the body is fully simulated.
    pub fn is_dynamic(self) -> bool {
        self.motion() == MotionType::Dynamic
    }

    /// Whether the body never moves.
    pub fn is_static(self) -> bool {
        self.motion() == MotionType::Static
    }
}

/// Host-side description of one rigid body.
///
/// `position` is the body origin in the world; shape records are authored
/// relative to it. The registry fills in `mass`, `inertia` and `offset`
/// from the attached shape when the body is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyInfo {
    /// Body origin in the world frame.
    pub position: Vec3,
    /// Orientation.
    pub angle: Quat,
    /// Linear velocity.
    pub linear_velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Mass; derived from shape and density.
    pub mass: f32,
    /// Inertia about the barycenter in the body frame.
    pub inertia: Mat3,
    /// Barycenter relative to the origin, in the body frame.
    pub offset: Vec3,
    /// Motion type.
    pub motion_type: MotionType,
    /// Element kinds this body collides with.
    pub collision_mask: CollisionMask,
    /// Caller-chosen id; defaults to the body index.
    pub body_id: Option<u32>,
    /// Element kind of the attached shape.
    pub shape_type: ShapeType,
}

impl Default for RigidBodyInfo {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            angle: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            inertia: Mat3::IDENTITY,
            offset: Vec3::ZERO,
            motion_type: MotionType::Dynamic,
            collision_mask: CollisionMask::ALL,
            body_id: None,
            shape_type: ShapeType::Other,
        }
    }
}

impl RigidBodyInfo {
    /// A dynamic body at `position` with orientation `angle`.
    pub fn at(position: Vec3, angle: Quat) -> Self {
        Self {
            position,
            angle,
            ..Self::default()
        }
    }

    /// Set the motion type.
    pub fn with_motion(mut self, motion_type: MotionType) -> Self {
        self.motion_type = motion_type;
        self
    }

    /// Set the linear velocity.
    pub fn with_velocity(mut self, v: Vec3) -> Self {
        self.linear_velocity = v;
        self
    }

    /// World position of the barycenter.
    pub fn center(&self) -> Vec3 {
        self.position + self.angle * self.offset
    }

    /// Rotation matrix of `angle`.
    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.angle)
    }

    /// Inertia in the world frame: `R · I₀ · Rᵀ`.
    pub fn world_inertia(&self) -> Mat3 {
        let r = self.rotation_matrix();
        r * self.inertia * r.transpose()
    }
}
