//! Mass properties of the primitive shapes.
//!
//! All tensors are about the shape's barycenter, expressed in the shape's
//! own frame unless noted otherwise.

use std::f32::consts::PI;

use glam::{Mat3, Quat, Vec3};

/// Inertia contribution of a unit point mass at `v` relative to the
/// reference origin.
///
/// ```text
/// | y²+z²  -xy    -xz   |
/// | -xy    x²+z²  -yz   |
/// | -xz    -yz    x²+y² |
/// ```
pub fn point_inertia(v: Vec3) -> Mat3 {
    let (x, y, z) = (v.x, v.y, v.z);
    // glam matrices are column-major; the tensor is symmetric.
    Mat3::from_cols(
        Vec3::new(y * y + z * z, -x * y, -x * z),
        Vec3::new(-x * y, x * x + z * z, -y * z),
        Vec3::new(-x * z, -y * z, x * x + y * y),
    )
}

/// Solid box with half extents `half`.
pub fn box_inertia(mass: f32, half: Vec3) -> Mat3 {
    let l = half * 2.0;
    let (a2, b2, c2) = (l.x * l.x, l.y * l.y, l.z * l.z);
    Mat3::from_diagonal(Vec3::new(b2 + c2, a2 + c2, a2 + b2) * (mass / 12.0))
}

/// Solid sphere of radius `r`.
pub fn sphere_inertia(mass: f32, r: f32) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(0.4 * mass * r * r))
}

/// Solid tetrahedron with vertices `v`, about its centroid.
pub fn tet_inertia(mass: f32, v: &[Vec3; 4]) -> Mat3 {
    let c = tet_centroid(v);
    let sum = v
        .iter()
        .fold(Mat3::ZERO, |acc, p| acc + point_inertia(*p - c));
    sum * (mass / 20.0)
}

/// Solid capsule: a cylinder of radius `r` and half height `h` along local
/// Y, capped by two hemispheres.
pub fn capsule_inertia(density: f32, r: f32, h: f32) -> Mat3 {
    let r2 = r * r;
    let height = 2.0 * h;
    let m_cyl = density * PI * r2 * height;
    let m_caps = density * 4.0 / 3.0 * PI * r2 * r;

    let axial = m_cyl * r2 / 2.0 + m_caps * 2.0 * r2 / 5.0;
    let lateral = m_cyl * (height * height / 12.0 + r2 / 4.0)
        + m_caps * (2.0 * r2 / 5.0 + height * height / 4.0 + 3.0 * height * r / 8.0);
    Mat3::from_diagonal(Vec3::new(lateral, axial, lateral))
}

/// Centroid of a tetrahedron.
pub fn tet_centroid(v: &[Vec3; 4]) -> Vec3 {
    (v[0] + v[1] + v[2] + v[3]) * 0.25
}

/// Signed volume of a tetrahedron.
pub fn tet_signed_volume(v: &[Vec3; 4]) -> f32 {
    (v[1] - v[0]).dot((v[2] - v[0]).cross(v[3] - v[0])) / 6.0
}

/// Capsule volume.
pub fn capsule_volume(r: f32, h: f32) -> f32 {
    PI * r * r * 2.0 * h + 4.0 / 3.0 * PI * r * r * r
}

/// Express a tensor given in a frame rotated by `rot` in the parent frame:
/// `R · I · Rᵀ`.
pub fn rotate_inertia(inertia: Mat3, rot: Quat) -> Mat3 {
    let r = Mat3::from_quat(rot);
    r * inertia * r.transpose()
}
