//! Primitive shape records.
//!
//! Shapes are authored in their body's frame: `center` is the shape's
//! barycenter relative to the body origin and `rot` its orientation
//! relative to the body.

use std::f32::consts::PI;
use std::fmt;

use glam::{Mat3, Quat, Vec3};

use crate::error::RigidError;
use crate::inertia::{
    box_inertia, capsule_inertia, capsule_volume, rotate_inertia, sphere_inertia, tet_centroid,
    tet_inertia, tet_signed_volume,
};

/// Element kind of a rigid body's collision shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapeType {
    /// Oriented box.
    Box,
    /// Sphere.
    Sphere,
    /// Tetrahedron.
    Tet,
    /// Capsule.
    Capsule,
    /// Not attached to a registered shape.
    #[default]
    Other,
}

impl ShapeType {
    /// Bit used by [`CollisionMask`](crate::body::CollisionMask).
    pub fn bit(self) -> u32 {
        match self {
            Self::Box => 1,
            Self::Tet => 1 << 1,
            Self::Capsule => 1 << 2,
            Self::Sphere => 1 << 3,
            Self::Other => 1 << 4,
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Tet => "tet",
            Self::Capsule => "capsule",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Mass properties derived from a shape and a density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassProperties {
    /// Total mass.
    pub mass: f32,
    /// Inertia about the barycenter, in the body frame.
    pub inertia: Mat3,
    /// Barycenter in the body frame.
    pub barycenter: Vec3,
}

/// Common behavior of the primitive shape records.
pub trait Shape: Clone + Send + Sync + 'static {
    /// Element kind tag.
    const TYPE: ShapeType;

    /// Reject degenerate descriptions.
    fn validate(&self) -> Result<(), RigidError>;

    /// Mass properties at `density`. Call only on validated shapes.
    fn mass_properties(&self, density: f32) -> MassProperties;

    /// This shape placed in the world by a body at `center` (its
    /// barycenter) with orientation `q`.
    fn to_world(&self, center: Vec3, q: Quat) -> Self;
}

fn unsupported(shape: ShapeType, reason: &str) -> RigidError {
    RigidError::UnsupportedShape {
        shape,
        reason: reason.to_string(),
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

// ── Box ────────────────────────────────────────────────────────────

/// Oriented box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxInfo {
    /// Barycenter in the body frame.
    pub center: Vec3,
    /// Half extent along each local axis.
    pub half_length: Vec3,
    /// Orientation in the body frame.
    pub rot: Quat,
}

impl Default for BoxInfo {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            half_length: Vec3::splat(0.5),
            rot: Quat::IDENTITY,
        }
    }
}

impl BoxInfo {
    /// An axis-aligned box centered on the body origin.
    pub fn new(half_length: Vec3) -> Self {
        Self {
            half_length,
            ..Self::default()
        }
    }
}

impl Shape for BoxInfo {
    const TYPE: ShapeType = ShapeType::Box;

    fn validate(&self) -> Result<(), RigidError> {
        if !self.center.is_finite() || !self.rot.is_finite() {
            return Err(unsupported(Self::TYPE, "non-finite pose"));
        }
        if !(positive(self.half_length.x) && positive(self.half_length.y) && positive(self.half_length.z)) {
            return Err(unsupported(Self::TYPE, "half lengths must be positive"));
        }
        Ok(())
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        let h = self.half_length;
        let mass = density * 8.0 * h.x * h.y * h.z;
        MassProperties {
            mass,
            inertia: rotate_inertia(box_inertia(mass, h), self.rot),
            barycenter: self.center,
        }
    }

    fn to_world(&self, center: Vec3, q: Quat) -> Self {
        Self {
            center,
            half_length: self.half_length,
            rot: (q * self.rot).normalize(),
        }
    }
}

// ── Sphere ─────────────────────────────────────────────────────────

/// Sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereInfo {
    /// Barycenter in the body frame.
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
    /// Orientation in the body frame.
    pub rot: Quat,
}

impl Default for SphereInfo {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 0.5,
            rot: Quat::IDENTITY,
        }
    }
}

impl SphereInfo {
    /// A sphere centered on the body origin.
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }
}

impl Shape for SphereInfo {
    const TYPE: ShapeType = ShapeType::Sphere;

    fn validate(&self) -> Result<(), RigidError> {
        if !self.center.is_finite() || !self.rot.is_finite() {
            return Err(unsupported(Self::TYPE, "non-finite pose"));
        }
        if !positive(self.radius) {
            return Err(unsupported(Self::TYPE, "radius must be positive"));
        }
        Ok(())
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        let r = self.radius;
        let mass = density * 4.0 / 3.0 * PI * r * r * r;
        MassProperties {
            mass,
            inertia: sphere_inertia(mass, r),
            barycenter: self.center,
        }
    }

    fn to_world(&self, center: Vec3, q: Quat) -> Self {
        Self {
            center,
            radius: self.radius,
            rot: (q * self.rot).normalize(),
        }
    }
}

// ── Tet ────────────────────────────────────────────────────────────

/// Tetrahedron given by its vertices in the body frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TetInfo {
    /// Vertices.
    pub v: [Vec3; 4],
}

impl Default for TetInfo {
    fn default() -> Self {
        Self {
            v: [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
        }
    }
}

impl TetInfo {
    /// Tetrahedron with the given vertices.
    pub fn new(v: [Vec3; 4]) -> Self {
        Self { v }
    }
}

/// Volumes below this are treated as degenerate.
const MIN_TET_VOLUME: f32 = 1.0e-12;

impl Shape for TetInfo {
    const TYPE: ShapeType = ShapeType::Tet;

    fn validate(&self) -> Result<(), RigidError> {
        if self.v.iter().any(|p| !p.is_finite()) {
            return Err(unsupported(Self::TYPE, "non-finite vertex"));
        }
        if tet_signed_volume(&self.v).abs() < MIN_TET_VOLUME {
            return Err(unsupported(Self::TYPE, "zero volume"));
        }
        Ok(())
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        let mass = density * tet_signed_volume(&self.v).abs();
        MassProperties {
            mass,
            inertia: tet_inertia(mass, &self.v),
            barycenter: tet_centroid(&self.v),
        }
    }

    fn to_world(&self, center: Vec3, q: Quat) -> Self {
        let c = tet_centroid(&self.v);
        Self {
            v: self.v.map(|p| center + q * (p - c)),
        }
    }
}

// ── Capsule ────────────────────────────────────────────────────────

/// Capsule whose axis is the local Y axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleInfo {
    /// Barycenter in the body frame.
    pub center: Vec3,
    /// Orientation in the body frame.
    pub rot: Quat,
    /// Radius of the cylinder and caps.
    pub radius: f32,
    /// Half height of the cylindrical segment.
    pub half_length: f32,
}

impl Default for CapsuleInfo {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            rot: Quat::IDENTITY,
            radius: 0.25,
            half_length: 0.5,
        }
    }
}

impl CapsuleInfo {
    /// A capsule centered on the body origin.
    pub fn new(radius: f32, half_length: f32) -> Self {
        Self {
            radius,
            half_length,
            ..Self::default()
        }
    }

    /// End points of the capsule's segment in the capsule's frame.
    pub fn segment(&self) -> (Vec3, Vec3) {
        let axis = self.rot * Vec3::Y * self.half_length;
        (self.center - axis, self.center + axis)
    }
}

impl Shape for CapsuleInfo {
    const TYPE: ShapeType = ShapeType::Capsule;

    fn validate(&self) -> Result<(), RigidError> {
        if !self.center.is_finite() || !self.rot.is_finite() {
            return Err(unsupported(Self::TYPE, "non-finite pose"));
        }
        if !positive(self.radius) {
            return Err(unsupported(Self::TYPE, "radius must be positive"));
        }
        if !self.half_length.is_finite() || self.half_length < 0.0 {
            return Err(unsupported(Self::TYPE, "half length must be non-negative"));
        }
        Ok(())
    }

    fn mass_properties(&self, density: f32) -> MassProperties {
        let mass = density * capsule_volume(self.radius, self.half_length);
        let local = capsule_inertia(density, self.radius, self.half_length);
        MassProperties {
            mass,
            inertia: rotate_inertia(local, self.rot),
            barycenter: self.center,
        }
    }

    fn to_world(&self, center: Vec3, q: Quat) -> Self {
        Self {
            center,
            rot: (q * self.rot).normalize(),
            radius: self.radius,
            half_length: self.half_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_shapes_rejected() {
        assert!(BoxInfo::new(Vec3::new(1.0, 0.0, 1.0)).validate().is_err());
        assert!(SphereInfo::new(-1.0).validate().is_err());
        assert!(SphereInfo::new(f32::NAN).validate().is_err());
        assert!(CapsuleInfo::new(0.1, -0.5).validate().is_err());
        let flat = TetInfo::new([Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)]);
        assert!(matches!(
            flat.validate(),
            Err(RigidError::UnsupportedShape { shape: ShapeType::Tet, .. })
        ));
    }

    #[test]
    fn box_mass_is_density_times_volume() {
        let b = BoxInfo::new(Vec3::new(0.5, 1.0, 1.5));
        let m = b.mass_properties(100.0);
        assert!((m.mass - 100.0 * 6.0).abs() < 1e-3);
    }

    #[test]
    fn tet_barycenter_is_centroid() {
        let t = TetInfo::default();
        let m = t.mass_properties(6.0);
        assert!((m.mass - 1.0).abs() < 1e-5);
        assert_eq!(m.barycenter, Vec3::splat(0.25));
    }

    #[test]
    fn tet_to_world_recenters_vertices() {
        let t = TetInfo::default();
        let w = t.to_world(Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY);
        assert_eq!(tet_centroid(&w.v), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn capsule_segment_follows_rotation() {
        let mut c = CapsuleInfo::new(0.1, 1.0);
        c.rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let (a, b) = c.segment();
        assert!(a.abs_diff_eq(Vec3::X, 1e-5));
        assert!(b.abs_diff_eq(-Vec3::X, 1e-5));
    }

    #[test]
    fn shape_bits_are_distinct() {
        let bits = [
            ShapeType::Box,
            ShapeType::Sphere,
            ShapeType::Tet,
            ShapeType::Capsule,
            ShapeType::Other,
        ]
        .map(ShapeType::bit);
        let or = bits.iter().fold(0u32, |a, b| a | b);
        assert_eq!(or.count_ones(), 5);
    }
}
