//! Axis-aligned box boundaries.

use glam::Vec3;

use crate::error::ParticleError;

/// An axis-aligned box acting as a boundary.
///
/// An `inverted` cube is a container: particles are kept inside it. A
/// regular cube is an obstacle: particles are pushed out of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cube {
    /// Lower corner.
    pub lo: Vec3,
    /// Upper corner.
    pub hi: Vec3,
    /// Distance kept between particles and the walls.
    pub spacing: f32,
    /// Container (`true`) or obstacle (`false`).
    pub inverted: bool,
}

impl Cube {
    /// A validated cube.
    pub fn new(lo: Vec3, hi: Vec3, spacing: f32, inverted: bool) -> Result<Self, ParticleError> {
        check_spacing(spacing)?;
        check_box(lo, hi)?;
        Ok(Self {
            lo,
            hi,
            spacing,
            inverted,
        })
    }

    /// Where `p` ends up after resolving against this cube, and the wall
    /// normal if it was moved.
    pub fn resolve(&self, p: Vec3) -> (Vec3, Option<Vec3>) {
        if self.inverted {
            self.keep_inside(p)
        } else {
            self.push_outside(p)
        }
    }

    fn keep_inside(&self, p: Vec3) -> (Vec3, Option<Vec3>) {
        let lo = self.lo + Vec3::splat(self.spacing);
        let hi = self.hi - Vec3::splat(self.spacing);
        // A wall pair closer than two spacings collapses to its midline.
        let mid = (self.lo + self.hi) * 0.5;
        let lo = lo.min(mid);
        let hi = hi.max(mid);
        let q = p.clamp(lo, hi);
        if q == p {
            return (p, None);
        }
        // Points the correction back inside, i.e. the wall's inward normal.
        (q, Some((q - p).normalize_or_zero()))
    }

    fn push_outside(&self, p: Vec3) -> (Vec3, Option<Vec3>) {
        let lo = self.lo - Vec3::splat(self.spacing);
        let hi = self.hi + Vec3::splat(self.spacing);
        if p.cmplt(lo).any() || p.cmpgt(hi).any() {
            return (p, None);
        }
        // Leave through the nearest face.
        let to_lo = p - lo;
        let to_hi = hi - p;
        let faces = [
            (to_lo.x, -Vec3::X),
            (to_hi.x, Vec3::X),
            (to_lo.y, -Vec3::Y),
            (to_hi.y, Vec3::Y),
            (to_lo.z, -Vec3::Z),
            (to_hi.z, Vec3::Z),
        ];
        let (depth, normal) = faces
            .into_iter()
            .fold((f32::INFINITY, Vec3::ZERO), |best, f| if f.0 < best.0 { f } else { best });
        (p + normal * depth, Some(normal))
    }
}

pub(crate) fn check_spacing(spacing: f32) -> Result<(), ParticleError> {
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(ParticleError::InvalidSpacing { spacing });
    }
    Ok(())
}

pub(crate) fn check_box(lo: Vec3, hi: Vec3) -> Result<(), ParticleError> {
    if !lo.is_finite() || !hi.is_finite() || !lo.cmplt(hi).all() {
        return Err(ParticleError::InvertedBox {
            lo: lo.to_array(),
            hi: hi.to_array(),
        });
    }
    Ok(())
}

/// Every cube loaded into a boundary node; the value passed from a
/// [`StaticBoundary`](crate::StaticBoundary) to its particle systems.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundarySet {
    /// Cubes in load order.
    pub cubes: Vec<Cube>,
}

impl BoundarySet {
    /// Resolve `p` against every cube in order. Returns the final point
    /// and the last wall normal hit.
    pub fn resolve(&self, p: Vec3) -> (Vec3, Option<Vec3>) {
        self.cubes.iter().fold((p, None), |(p, n), c| {
            let (q, hit) = c.resolve(p);
            (q, hit.or(n))
        })
    }

    /// Whether no cube is loaded.
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Cube {
        Cube::new(Vec3::ZERO, Vec3::ONE, 0.1, true).unwrap()
    }

    #[test]
    fn container_clamps_to_inner_margin() {
        let (q, n) = container().resolve(Vec3::new(0.5, -1.0, 0.5));
        assert_eq!(q, Vec3::new(0.5, 0.1, 0.5));
        assert_eq!(n, Some(Vec3::Y));
        let inside = Vec3::splat(0.5);
        assert_eq!(container().resolve(inside), (inside, None));
    }

    #[test]
    fn obstacle_pushes_through_nearest_face() {
        let c = Cube::new(Vec3::ZERO, Vec3::ONE, 0.01, false).unwrap();
        let (q, n) = c.resolve(Vec3::new(0.5, 0.95, 0.5));
        assert_eq!(n, Some(Vec3::Y));
        assert!((q.y - 1.01).abs() < 1e-6);
    }

    #[test]
    fn invalid_cubes_rejected() {
        assert!(matches!(
            Cube::new(Vec3::ONE, Vec3::ZERO, 0.1, true),
            Err(ParticleError::InvertedBox { .. })
        ));
        assert_eq!(
            Cube::new(Vec3::ZERO, Vec3::ONE, 0.0, true),
            Err(ParticleError::InvalidSpacing { spacing: 0.0 })
        );
    }
}
