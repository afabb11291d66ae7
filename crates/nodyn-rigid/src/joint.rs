//! Joint records and the host-side joint registry.
//!
//! Joints are plain `Copy` records stored in one vector per kind. The
//! registry only appends; a record's index in its vector is its index in
//! the matching device array after the next synchronization.

use std::fmt;

use glam::{Quat, Vec3};

use crate::actor::Actor;
use crate::error::RigidError;
use crate::shape::ShapeType;

/// The five joint kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointKind {
    /// Shared anchor point, free rotation.
    BallAndSocket,
    /// Translation along one axis only.
    Slider,
    /// Rotation about one axis only.
    Hinge,
    /// No relative motion.
    Fixed,
    /// One body pinned to a world point.
    Point,
}

impl JointKind {
    /// All kinds in device-array order.
    pub const ALL: [JointKind; 5] = [
        Self::BallAndSocket,
        Self::Slider,
        Self::Hinge,
        Self::Fixed,
        Self::Point,
    ];

    /// Name of the device array holding joints of this kind.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::BallAndSocket => "BallAndSocketJoints",
            Self::Slider => "SliderJoints",
            Self::Hinge => "HingeJoints",
            Self::Fixed => "FixedJoints",
            Self::Point => "PointJoints",
        }
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BallAndSocket => "ball-and-socket",
            Self::Slider => "slider",
            Self::Hinge => "hinge",
            Self::Fixed => "fixed",
            Self::Point => "point",
        };
        f.write_str(s)
    }
}

/// Lever arm from an actor's registration pose to a world anchor, in the
/// actor's frame.
fn lever_arm(anchor: Vec3, actor: &Actor) -> Vec3 {
    actor.rot.inverse() * (anchor - actor.center)
}

fn relative_rotation(a1: &Actor, a2: &Actor) -> Quat {
    (a1.rot.inverse() * a2.rot).normalize()
}

// ── Ball and socket ────────────────────────────────────────────────

/// Two bodies sharing one anchor point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BallAndSocketJoint {
    /// First body.
    pub body_idx1: i32,
    /// Second body.
    pub body_idx2: i32,
    /// Shape kind of the first body.
    pub body_type1: ShapeType,
    /// Shape kind of the second body.
    pub body_type2: ShapeType,
    /// Anchor in the first body's frame.
    pub r1: Vec3,
    /// Anchor in the second body's frame.
    pub r2: Vec3,
}

impl Default for BallAndSocketJoint {
    fn default() -> Self {
        Self {
            body_idx1: -1,
            body_idx2: -1,
            body_type1: ShapeType::Other,
            body_type2: ShapeType::Other,
            r1: Vec3::ZERO,
            r2: Vec3::ZERO,
        }
    }
}

impl BallAndSocketJoint {
    /// Place the shared anchor at world point `anchor`.
    pub fn set_anchor_point(&mut self, anchor: Vec3, a1: &Actor, a2: &Actor) -> &mut Self {
        self.r1 = lever_arm(anchor, a1);
        self.r2 = lever_arm(anchor, a2);
        self
    }
}

// ── Slider ─────────────────────────────────────────────────────────

/// Relative translation along `slider_axis` only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliderJoint {
    /// First body.
    pub body_idx1: i32,
    /// Second body.
    pub body_idx2: i32,
    /// Shape kind of the first body.
    pub body_type1: ShapeType,
    /// Shape kind of the second body.
    pub body_type2: ShapeType,
    /// Anchor in the first body's frame.
    pub r1: Vec3,
    /// Anchor in the second body's frame.
    pub r2: Vec3,
    /// Sliding direction in the first body's frame.
    pub slider_axis: Vec3,
    /// Whether `d_min..=d_max` is enforced.
    pub use_range: bool,
    /// Lower travel limit.
    pub d_min: f32,
    /// Upper travel limit.
    pub d_max: f32,
    /// Relative rotation at authoring time.
    pub q_init: Quat,
}

impl Default for SliderJoint {
    fn default() -> Self {
        Self {
            body_idx1: -1,
            body_idx2: -1,
            body_type1: ShapeType::Other,
            body_type2: ShapeType::Other,
            r1: Vec3::ZERO,
            r2: Vec3::ZERO,
            slider_axis: Vec3::X,
            use_range: false,
            d_min: 0.0,
            d_max: 0.0,
            q_init: Quat::IDENTITY,
        }
    }
}

impl SliderJoint {
    /// Place the anchor and capture the bodies' relative rotation.
    pub fn set_anchor_point(&mut self, anchor: Vec3, a1: &Actor, a2: &Actor) -> &mut Self {
        self.r1 = lever_arm(anchor, a1);
        self.r2 = lever_arm(anchor, a2);
        self.q_init = relative_rotation(a1, a2);
        self
    }

    /// Sliding direction given in the world, stored in `a1`'s frame.
    pub fn set_axis(&mut self, axis: Vec3, a1: &Actor) -> &mut Self {
        self.slider_axis = (a1.rot.inverse() * axis).normalize_or_zero();
        self
    }

    /// Limit travel to `d_min..=d_max`.
    pub fn set_range(&mut self, d_min: f32, d_max: f32) -> &mut Self {
        self.use_range = true;
        self.d_min = d_min;
        self.d_max = d_max;
        self
    }
}

// ── Hinge ──────────────────────────────────────────────────────────

/// Relative rotation about one axis only, optionally driven.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HingeJoint {
    /// First body.
    pub body_idx1: i32,
    /// Second body.
    pub body_idx2: i32,
    /// Shape kind of the first body.
    pub body_type1: ShapeType,
    /// Shape kind of the second body.
    pub body_type2: ShapeType,
    /// Anchor in the first body's frame.
    pub r1: Vec3,
    /// Anchor in the second body's frame.
    pub r2: Vec3,
    /// Hinge axis in the first body's frame.
    pub hinge_axis_body1: Vec3,
    /// Hinge axis in the second body's frame.
    pub hinge_axis_body2: Vec3,
    /// Whether `theta_min..=theta_max` is enforced.
    pub use_range: bool,
    /// Lower angle limit in radians.
    pub theta_min: f32,
    /// Upper angle limit in radians.
    pub theta_max: f32,
    /// Whether the motor drives the hinge.
    pub use_motor: bool,
    /// Target relative angular speed.
    pub motor_velocity: f32,
}

impl Default for HingeJoint {
    fn default() -> Self {
        Self {
            body_idx1: -1,
            body_idx2: -1,
            body_type1: ShapeType::Other,
            body_type2: ShapeType::Other,
            r1: Vec3::ZERO,
            r2: Vec3::ZERO,
            hinge_axis_body1: Vec3::Z,
            hinge_axis_body2: Vec3::Z,
            use_range: false,
            theta_min: 0.0,
            theta_max: 0.0,
            use_motor: false,
            motor_velocity: 0.0,
        }
    }
}

impl HingeJoint {
    /// Place the hinge pivot at world point `anchor`.
    pub fn set_anchor_point(&mut self, anchor: Vec3, a1: &Actor, a2: &Actor) -> &mut Self {
        self.r1 = lever_arm(anchor, a1);
        self.r2 = lever_arm(anchor, a2);
        self
    }

    /// Hinge axis given in the world, stored in each body's frame.
    pub fn set_axis(&mut self, axis: Vec3, a1: &Actor, a2: &Actor) -> &mut Self {
        let axis = axis.normalize_or_zero();
        self.hinge_axis_body1 = a1.rot.inverse() * axis;
        self.hinge_axis_body2 = a2.rot.inverse() * axis;
        self
    }

    /// Limit the hinge angle to `theta_min..=theta_max`.
    pub fn set_range(&mut self, theta_min: f32, theta_max: f32) -> &mut Self {
        self.use_range = true;
        self.theta_min = theta_min;
        self.theta_max = theta_max;
        self
    }

    /// Drive the hinge at `velocity` rad/s.
    pub fn set_motor(&mut self, velocity: f32) -> &mut Self {
        self.use_motor = true;
        self.motor_velocity = velocity;
        self
    }
}

// ── Fixed ──────────────────────────────────────────────────────────

/// Two bodies welded together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedJoint {
    /// First body.
    pub body_idx1: i32,
    /// Second body.
    pub body_idx2: i32,
    /// Shape kind of the first body.
    pub body_type1: ShapeType,
    /// Shape kind of the second body.
    pub body_type2: ShapeType,
    /// Anchor in the first body's frame.
    pub r1: Vec3,
    /// Anchor in the second body's frame.
    pub r2: Vec3,
    /// Relative rotation to hold.
    pub q_init: Quat,
}

impl Default for FixedJoint {
    fn default() -> Self {
        Self {
            body_idx1: -1,
            body_idx2: -1,
            body_type1: ShapeType::Other,
            body_type2: ShapeType::Other,
            r1: Vec3::ZERO,
            r2: Vec3::ZERO,
            q_init: Quat::IDENTITY,
        }
    }
}

impl FixedJoint {
    /// Place the weld point and capture the relative rotation to hold.
    pub fn set_anchor_point(&mut self, anchor: Vec3, a1: &Actor, a2: &Actor) -> &mut Self {
        self.r1 = lever_arm(anchor, a1);
        self.r2 = lever_arm(anchor, a2);
        self.q_init = relative_rotation(a1, a2);
        self
    }
}

// ── Point ──────────────────────────────────────────────────────────

/// One body pinned to a fixed world point. `body_idx2` is always `-1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointJoint {
    /// The pinned body.
    pub body_idx1: i32,
    /// Always `-1`.
    pub body_idx2: i32,
    /// Shape kind of the pinned body.
    pub body_type1: ShapeType,
    /// Always [`ShapeType::Other`].
    pub body_type2: ShapeType,
    /// World point the body is pinned to.
    pub anchor_point: Vec3,
}

impl Default for PointJoint {
    fn default() -> Self {
        Self {
            body_idx1: -1,
            body_idx2: -1,
            body_type1: ShapeType::Other,
            body_type2: ShapeType::Other,
            anchor_point: Vec3::ZERO,
        }
    }
}

impl PointJoint {
    /// Pin to `anchor`.
    pub fn set_anchor_point(&mut self, anchor: Vec3) -> &mut Self {
        self.anchor_point = anchor;
        self
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// A joint record kind stored in a [`JointRegistry`].
pub trait JointRecord: Copy + Send + Sync + 'static {
    /// Which vector of the registry holds this kind.
    const KIND: JointKind;

    /// The registry's records of this kind.
    fn host(registry: &JointRegistry) -> &Vec<Self>;

    /// The registry's records of this kind, mutably.
    fn host_mut(registry: &mut JointRegistry) -> &mut Vec<Self>;

    /// Indices of the joined bodies; the second is `-1` for single-body
    /// joints.
    fn bodies(&self) -> (i32, i32);
}

macro_rules! joint_record {
    ($ty:ty, $kind:ident, $vec:ident) => {
        impl JointRecord for $ty {
            const KIND: JointKind = JointKind::$kind;

            fn host(registry: &JointRegistry) -> &Vec<Self> {
                &registry.$vec
            }

            fn host_mut(registry: &mut JointRegistry) -> &mut Vec<Self> {
                &mut registry.$vec
            }

            fn bodies(&self) -> (i32, i32) {
                (self.body_idx1, self.body_idx2)
            }
        }
    };
}

joint_record!(BallAndSocketJoint, BallAndSocket, ball_and_socket);
joint_record!(SliderJoint, Slider, slider);
joint_record!(HingeJoint, Hinge, hinge);
joint_record!(FixedJoint, Fixed, fixed);
joint_record!(PointJoint, Point, point);

/// Append-only host storage for every joint kind.
///
/// Tracks whether records were added since the last flush to device.
#[derive(Clone, Debug, Default)]
pub struct JointRegistry {
    ball_and_socket: Vec<BallAndSocketJoint>,
    slider: Vec<SliderJoint>,
    hinge: Vec<HingeJoint>,
    fixed: Vec<FixedJoint>,
    point: Vec<PointJoint>,
    version: u64,
    flushed: u64,
}

/// Reject an actor that is unset or outside `0..body_count`.
pub(crate) fn check_actor(actor: &Actor, body_count: usize) -> Result<(), RigidError> {
    if actor.idx < 0 || actor.idx as usize >= body_count {
        return Err(RigidError::InvalidActor { idx: actor.idx });
    }
    Ok(())
}

/// Reject a pair of actors that are individually invalid or name the
/// same body.
pub(crate) fn check_pair(a1: &Actor, a2: &Actor, body_count: usize) -> Result<(), RigidError> {
    check_actor(a1, body_count)?;
    check_actor(a2, body_count)?;
    if a1.idx == a2.idx {
        return Err(RigidError::InvalidActor { idx: a2.idx });
    }
    Ok(())
}

impl JointRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of kind `J`.
    pub fn all<J: JointRecord>(&self) -> &[J] {
        J::host(self)
    }

    /// Record `index` of kind `J`.
    pub fn get<J: JointRecord>(&self, index: usize) -> Option<&J> {
        J::host(self).get(index)
    }

    /// Record `index` of kind `J`, mutably. Edits count as unflushed.
    pub fn get_mut<J: JointRecord>(&mut self, index: usize) -> Option<&mut J> {
        if index >= J::host(self).len() {
            return None;
        }
        self.version += 1;
        J::host_mut(self).get_mut(index)
    }

    /// Append `joint` and hand back a borrow of the stored record.
    pub fn push<J: JointRecord>(&mut self, joint: J) -> &mut J {
        self.version += 1;
        let host = J::host_mut(self);
        host.push(joint);
        let last = host.len() - 1;
        &mut host[last]
    }

    /// Number of records of `kind`.
    pub fn len(&self, kind: JointKind) -> usize {
        match kind {
            JointKind::BallAndSocket => self.ball_and_socket.len(),
            JointKind::Slider => self.slider.len(),
            JointKind::Hinge => self.hinge.len(),
            JointKind::Fixed => self.fixed.len(),
            JointKind::Point => self.point.len(),
        }
    }

    /// Records across all kinds.
    pub fn total(&self) -> usize {
        JointKind::ALL.iter().map(|&k| self.len(k)).sum()
    }

    /// Whether there are no joints at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Counter bumped by every append and every mutable record borrow.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether records changed since [`mark_flushed`](Self::mark_flushed).
    pub fn has_unflushed(&self) -> bool {
        self.version != self.flushed
    }

    /// Record that the device copy now matches the host records.
    pub fn mark_flushed(&mut self) {
        self.flushed = self.version;
    }

    pub(crate) fn create_pair<J>(&mut self, a1: &Actor, a2: &Actor, body_count: usize, mut joint: J) -> Result<&mut J, RigidError>
    where
        J: JointRecord + Linked,
    {
        check_pair(a1, a2, body_count)?;
        joint.link(a1, a2);
        Ok(self.push(joint))
    }
}

/// Records joining two bodies.
pub(crate) trait Linked {
    fn link(&mut self, a1: &Actor, a2: &Actor);
}

macro_rules! linked {
    ($($ty:ty),*) => {
        $(impl Linked for $ty {
            fn link(&mut self, a1: &Actor, a2: &Actor) {
                self.body_idx1 = a1.idx;
                self.body_idx2 = a2.idx;
                self.body_type1 = a1.shape_type;
                self.body_type2 = a2.shape_type;
            }
        })*
    };
}

linked!(BallAndSocketJoint, SliderJoint, HingeJoint, FixedJoint);

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(idx: i32) -> Actor {
        Actor {
            idx,
            shape_type: ShapeType::Box,
            ..Actor::unset()
        }
    }

    #[test]
    fn pair_creation_copies_indices_and_types() {
        let mut reg = JointRegistry::new();
        let j = reg
            .create_pair(&actor(0), &actor(1), 2, HingeJoint::default())
            .unwrap();
        assert_eq!((j.body_idx1, j.body_idx2), (0, 1));
        assert_eq!(j.body_type2, ShapeType::Box);
        assert_eq!(reg.len(JointKind::Hinge), 1);
        assert!(reg.has_unflushed());
    }

    #[test]
    fn same_body_is_rejected() {
        let mut reg = JointRegistry::new();
        let err = reg
            .create_pair(&actor(1), &actor(1), 2, FixedJoint::default())
            .unwrap_err();
        assert_eq!(err, RigidError::InvalidActor { idx: 1 });
        assert!(reg.is_empty());
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut reg = JointRegistry::new();
        let err = reg
            .create_pair(&actor(0), &actor(5), 2, SliderJoint::default())
            .unwrap_err();
        assert_eq!(err, RigidError::InvalidActor { idx: 5 });
        assert_eq!(reg.len(JointKind::Slider), 0);
    }

    #[test]
    fn flush_tracking() {
        let mut reg = JointRegistry::new();
        assert!(!reg.has_unflushed());
        reg.push(PointJoint::default());
        reg.mark_flushed();
        assert!(!reg.has_unflushed());
        if let Some(p) = reg.get_mut::<PointJoint>(0) {
            p.set_anchor_point(Vec3::ONE);
        }
        assert!(reg.has_unflushed());
        assert_eq!(reg.all::<PointJoint>()[0].anchor_point, Vec3::ONE);
    }

    #[test]
    fn missing_record_leaves_registry_flushed() {
        let mut reg = JointRegistry::new();
        reg.push(HingeJoint::default());
        reg.mark_flushed();
        let version = reg.version();
        assert!(reg.get_mut::<HingeJoint>(1).is_none());
        assert!(reg.get_mut::<SliderJoint>(0).is_none());
        assert_eq!(reg.version(), version);
        assert!(!reg.has_unflushed());
    }

    #[test]
    fn anchor_lever_arms_are_body_local() {
        let a1 = Actor {
            center: Vec3::new(-1.0, 0.0, 0.0),
            rot: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            ..actor(0)
        };
        let a2 = Actor {
            center: Vec3::new(1.0, 0.0, 0.0),
            ..actor(1)
        };
        let mut j = FixedJoint::default();
        j.set_anchor_point(Vec3::ZERO, &a1, &a2);
        assert!(j.r1.abs_diff_eq(Vec3::new(0.0, -1.0, 0.0), 1e-5));
        assert!(j.r2.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
        assert!(j.q_init.abs_diff_eq(a1.rot.inverse(), 1e-5));
    }

    #[test]
    fn hinge_motor_and_range() {
        let mut h = HingeJoint::default();
        h.set_range(-1.0, 1.0).set_motor(2.0);
        assert!(h.use_range && h.use_motor);
        assert_eq!(h.motor_velocity, 2.0);
    }
}
