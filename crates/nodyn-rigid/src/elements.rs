//! Collision elements of a rigid-body system.
//!
//! [`ShapeSet`] holds the authored shapes in body frames, one dual array
//! per kind plus the owning body of each element. [`DiscreteElements`] is
//! the world-frame device copy rebuilt from body poses; it is the
//! `Topology` state of a [`RigidBodySystem`](crate::RigidBodySystem).

use glam::{Quat, Vec3};
use nodyn_array::{check_len, DeviceArray, DualArray};

use crate::error::RigidError;
use crate::shape::{BoxInfo, CapsuleInfo, Shape, ShapeType, SphereInfo, TetInfo};

/// Authored shapes, grouped by kind, in body frames.
#[derive(Clone, Debug, Default)]
pub struct ShapeSet {
    pub(crate) boxes: DualArray<BoxInfo>,
    pub(crate) spheres: DualArray<SphereInfo>,
    pub(crate) tets: DualArray<TetInfo>,
    pub(crate) capsules: DualArray<CapsuleInfo>,
    box_owner: Vec<u32>,
    sphere_owner: Vec<u32>,
    tet_owner: Vec<u32>,
    capsule_owner: Vec<u32>,
    // body -> (kind, index within that kind)
    body_elements: Vec<(ShapeType, u32)>,
}

/// Per-kind storage access used by [`ShapeSet::push`].
pub(crate) trait Stored: Shape {
    fn store(set: &mut ShapeSet) -> (&mut DualArray<Self>, &mut Vec<u32>);
}

macro_rules! stored {
    ($ty:ty, $arr:ident, $owner:ident) => {
        impl Stored for $ty {
            fn store(set: &mut ShapeSet) -> (&mut DualArray<Self>, &mut Vec<u32>) {
                (&mut set.$arr, &mut set.$owner)
            }
        }
    };
}

stored!(BoxInfo, boxes, box_owner);
stored!(SphereInfo, spheres, sphere_owner);
stored!(TetInfo, tets, tet_owner);
stored!(CapsuleInfo, capsules, capsule_owner);

impl ShapeSet {
    /// Attach `shape` to `body`, which must be the next body index.
    pub(crate) fn push<S: Stored>(&mut self, body: u32, shape: S) {
        let (arr, owner) = S::store(self);
        let local = arr.push(shape) as u32;
        owner.push(body);
        self.body_elements.push((S::TYPE, local));
    }

    /// Copy every host list to its device mirror.
    pub(crate) fn sync(&mut self) {
        self.boxes.sync();
        self.spheres.sync();
        self.tets.sync();
        self.capsules.sync();
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.body_elements.len()
    }

    /// Whether no shape was added.
    pub fn is_empty(&self) -> bool {
        self.body_elements.is_empty()
    }

    /// Kind and per-kind index of the shape attached to `body`.
    pub fn element_of(&self, body: usize) -> Option<(ShapeType, u32)> {
        self.body_elements.get(body).copied()
    }

    /// Host boxes in body frames.
    pub fn boxes(&self) -> &[BoxInfo] {
        self.boxes.host()
    }

    /// Host spheres in body frames.
    pub fn spheres(&self) -> &[SphereInfo] {
        self.spheres.host()
    }

    /// Host tets in body frames.
    pub fn tets(&self) -> &[TetInfo] {
        self.tets.host()
    }

    /// Host capsules in body frames.
    pub fn capsules(&self) -> &[CapsuleInfo] {
        self.capsules.host()
    }
}

/// Place every synced element of one kind into the world.
fn place<S: Shape>(local: &DeviceArray<S>, owner: &[u32], centers: &[Vec3], rots: &[Quat]) -> DeviceArray<S> {
    local.par_map(|i, s| {
        let body = owner.get(i).map(|&b| b as usize);
        match body.and_then(|b| Some((centers.get(b)?, rots.get(b)?))) {
            Some((&c, &q)) => s.to_world(c, q),
            None => s.clone(),
        }
    })
}

/// World-frame collision elements with their body mapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscreteElements {
    boxes: DeviceArray<BoxInfo>,
    spheres: DeviceArray<SphereInfo>,
    tets: DeviceArray<TetInfo>,
    capsules: DeviceArray<CapsuleInfo>,
    box_body: DeviceArray<u32>,
    sphere_body: DeviceArray<u32>,
    tet_body: DeviceArray<u32>,
    capsule_body: DeviceArray<u32>,
    body_elements: DeviceArray<(ShapeType, u32)>,
}

impl DiscreteElements {
    /// No elements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the synced shapes and the per-body barycenters and
    /// orientations.
    ///
    /// `centers` and `rots` must hold one entry per body in `shapes`.
    pub fn rebuild(&mut self, shapes: &ShapeSet, centers: &[Vec3], rots: &[Quat]) -> Result<(), RigidError> {
        let bodies = shapes.body_elements.len();
        check_len("Center", bodies, centers.len())?;
        check_len("Quaternion", bodies, rots.len())?;
        check_len("Topology", bodies, shapes.boxes.device_len() + shapes.spheres.device_len() + shapes.tets.device_len() + shapes.capsules.device_len())?;

        self.boxes = place(shapes.boxes.device(), &shapes.box_owner, centers, rots);
        self.spheres = place(shapes.spheres.device(), &shapes.sphere_owner, centers, rots);
        self.tets = place(shapes.tets.device(), &shapes.tet_owner, centers, rots);
        self.capsules = place(shapes.capsules.device(), &shapes.capsule_owner, centers, rots);
        self.box_body.assign(&shapes.box_owner);
        self.sphere_body.assign(&shapes.sphere_owner);
        self.tet_body.assign(&shapes.tet_owner);
        self.capsule_body.assign(&shapes.capsule_owner);
        self.body_elements.assign(&shapes.body_elements);
        Ok(())
    }

    /// World-frame boxes.
    pub fn boxes(&self) -> &DeviceArray<BoxInfo> {
        &self.boxes
    }

    /// World-frame spheres.
    pub fn spheres(&self) -> &DeviceArray<SphereInfo> {
        &self.spheres
    }

    /// World-frame tets.
    pub fn tets(&self) -> &DeviceArray<TetInfo> {
        &self.tets
    }

    /// World-frame capsules.
    pub fn capsules(&self) -> &DeviceArray<CapsuleInfo> {
        &self.capsules
    }

    /// Owning body of each element of `kind`; empty for
    /// [`ShapeType::Other`].
    pub fn element_bodies(&self, kind: ShapeType) -> &[u32] {
        match kind {
            ShapeType::Box => self.box_body.as_slice(),
            ShapeType::Sphere => self.sphere_body.as_slice(),
            ShapeType::Tet => self.tet_body.as_slice(),
            ShapeType::Capsule => self.capsule_body.as_slice(),
            ShapeType::Other => &[],
        }
    }

    /// Kind and per-kind index of each body's element.
    pub fn body_elements(&self) -> &DeviceArray<(ShapeType, u32)> {
        &self.body_elements
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.body_elements.len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.body_elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_body_set() -> ShapeSet {
        let mut set = ShapeSet::default();
        set.push(0, SphereInfo::new(0.5));
        set.push(1, BoxInfo::new(Vec3::splat(0.25)));
        set.sync();
        set
    }

    #[test]
    fn push_records_body_mapping() {
        let set = two_body_set();
        assert_eq!(set.element_of(0), Some((ShapeType::Sphere, 0)));
        assert_eq!(set.element_of(1), Some((ShapeType::Box, 0)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn rebuild_places_elements_at_body_centers() {
        let set = two_body_set();
        let centers = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 0.0)];
        let rots = [Quat::IDENTITY, Quat::from_rotation_y(0.5)];
        let mut el = DiscreteElements::new();
        el.rebuild(&set, &centers, &rots).unwrap();
        assert_eq!(el.spheres().as_slice()[0].center, centers[0]);
        assert_eq!(el.boxes().as_slice()[0].center, centers[1]);
        assert!(el.boxes().as_slice()[0].rot.abs_diff_eq(rots[1], 1e-6));
        assert_eq!(el.element_bodies(ShapeType::Box), &[1]);
        assert_eq!(el.len(), 2);
    }

    #[test]
    fn rebuild_rejects_short_pose_arrays() {
        let set = two_body_set();
        let mut el = DiscreteElements::new();
        let err = el.rebuild(&set, &[Vec3::ZERO], &[Quat::IDENTITY]).unwrap_err();
        assert!(matches!(err, RigidError::StaleDeviceArray { expected: 2, found: 1, .. }));
        assert!(el.is_empty());
    }
}
