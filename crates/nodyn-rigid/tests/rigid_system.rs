//! Rigid-body authoring, synchronization and stepping through a graph.

use glam::{Mat3, Quat, Vec3};
use nodyn_array::{DeviceArray, DeviceArrayList};
use nodyn_core::{ModuleError, NodeId, StepError};
use nodyn_graph::{Graph, SceneConfig};
use nodyn_rigid::vehicle::vehicle_fields;
use nodyn_rigid::{
    fields, Actor, BallAndSocketJoint, BoxInfo, FixedJoint, HingeJoint, JointKind, MotionType,
    RigidBodyInfo, RigidBodySystem, RigidError, SphereInfo, Transform, Vehicle, DEFAULT_DENSITY,
};
use proptest::prelude::*;

fn sphere_body(sys: &mut RigidBodySystem, at: Vec3) -> Actor {
    sys.add_sphere(
        &SphereInfo::new(0.1),
        &RigidBodyInfo::at(at, Quat::IDENTITY),
        DEFAULT_DENSITY,
    )
    .unwrap()
}

fn len_of<T: 'static>(g: &Graph, node: NodeId, name: &str) -> usize {
    let f = g.field(node, name).unwrap();
    g.with_value(f, |a: &DeviceArray<T>| a.len()).unwrap()
}

#[test]
fn ball_joint_reaches_device_after_reset() {
    let mut sys = RigidBodySystem::new();
    let a = sphere_body(&mut sys, Vec3::ZERO);
    let b = sphere_body(&mut sys, Vec3::new(0.2, 0.0, 0.0));
    sys.create_ball_and_socket_joint(&a, &b)
        .unwrap()
        .set_anchor_point(Vec3::new(0.1, 0.0, 0.0), &a, &b);

    let mut g = Graph::default();
    let id = g.add_node(sys).unwrap();
    g.reset().unwrap();

    let f = g.field(id, fields::BALL_AND_SOCKET_JOINTS).unwrap();
    let joints = g
        .with_value(f, |a: &DeviceArray<BallAndSocketJoint>| a.to_host())
        .unwrap();
    assert_eq!(joints.len(), 1);
    assert_eq!((joints[0].body_idx1, joints[0].body_idx2), (0, 1));
    assert!(joints[0].r1.abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), 1e-6));
    assert!(joints[0].r2.abs_diff_eq(Vec3::new(-0.1, 0.0, 0.0), 1e-6));
}

#[test]
fn unset_actor_is_rejected_without_side_effects() {
    let mut sys = RigidBodySystem::new();
    let a = sphere_body(&mut sys, Vec3::ZERO);
    let err = sys.create_hinge_joint(&a, &Actor::unset()).unwrap_err();
    assert_eq!(err, RigidError::InvalidActor { idx: -1 });
    assert!(sys.joints::<HingeJoint>().is_empty());
    assert_eq!(sys.joint_registry().len(JointKind::Hinge), 0);
}

#[test]
fn per_body_arrays_match_registry_after_sync() {
    let mut sys = RigidBodySystem::new();
    for i in 0..3 {
        sphere_body(&mut sys, Vec3::new(i as f32, 0.0, 0.0));
    }
    sys.add_box(
        &BoxInfo::new(Vec3::splat(0.2)),
        &RigidBodyInfo::default().with_motion(MotionType::Static),
        DEFAULT_DENSITY,
    )
    .unwrap();

    let mut g = Graph::default();
    let id = g.add_node(sys).unwrap();
    g.reset().unwrap();

    assert_eq!(len_of::<f32>(&g, id, fields::MASS), 4);
    for name in [fields::CENTER, fields::OFFSET, fields::VELOCITY, fields::ANGULAR_VELOCITY] {
        assert_eq!(len_of::<Vec3>(&g, id, name), 4, "{name}");
    }
    for name in [fields::ROTATION_MATRIX, fields::INERTIA, fields::INITIAL_INERTIA] {
        assert_eq!(len_of::<Mat3>(&g, id, name), 4, "{name}");
    }
    assert_eq!(len_of::<Quat>(&g, id, fields::QUATERNION), 4);
    assert_eq!(len_of::<HingeJoint>(&g, id, fields::HINGE_JOINTS), 0);
}

#[test]
fn body_added_after_sync_makes_step_fail() {
    let mut sys = RigidBodySystem::new();
    sphere_body(&mut sys, Vec3::ZERO);
    let mut g = Graph::default();
    let id = g.add_node(sys).unwrap();
    g.step().unwrap();

    g.node_mut::<RigidBodySystem>(id)
        .map(|s| sphere_body(s, Vec3::ONE))
        .unwrap();
    let err = g.step().unwrap_err();
    match err {
        StepError::ModuleFailed { module, reason, .. } => {
            assert_eq!(module, "update_topology");
            assert_eq!(
                reason,
                ModuleError::StaleDeviceArray {
                    array: fields::MASS.into(),
                    expected: 2,
                    found: 1,
                }
            );
        }
        other => panic!("expected ModuleFailed, got {other:?}"),
    }
    assert_eq!(g.step().unwrap_err(), StepError::ResetRequired);

    // An explicit resynchronization recovers after reset.
    g.reset().unwrap();
    g.step().unwrap();
    assert_eq!(len_of::<f32>(&g, id, fields::MASS), 2);
}

#[test]
fn explicit_synchronize_flushes_new_joints() {
    let mut sys = RigidBodySystem::new();
    let a = sphere_body(&mut sys, Vec3::ZERO);
    let b = sphere_body(&mut sys, Vec3::X);
    let mut g = Graph::default();
    let id = g.add_node(sys).unwrap();
    g.step().unwrap();

    g.node_scope(id, |s: &mut RigidBodySystem, ctx| {
        s.create_fixed_joint(&a, &b).map(|_| ())?;
        s.synchronize(ctx)
    })
    .unwrap()
    .unwrap();
    assert_eq!(len_of::<FixedJoint>(&g, id, fields::FIXED_JOINTS), 1);
    g.step().unwrap();
}

#[test]
fn gravity_moves_only_dynamic_bodies() {
    let config = SceneConfig {
        dt: 0.5,
        ..SceneConfig::default()
    };
    let mut sys = RigidBodySystem::new();
    sphere_body(&mut sys, Vec3::ZERO);
    sys.add_sphere(
        &SphereInfo::new(0.1),
        &RigidBodyInfo::at(Vec3::X, Quat::IDENTITY).with_motion(MotionType::Static),
        DEFAULT_DENSITY,
    )
    .unwrap();
    let mut g = Graph::new(config).unwrap();
    let id = g.add_node(sys).unwrap();
    g.step().unwrap();

    let v = g.field(id, fields::VELOCITY).unwrap();
    let c = g.field(id, fields::CENTER).unwrap();
    let vel = g.with_value(v, |a: &DeviceArray<Vec3>| a.to_host()).unwrap();
    let pos = g.with_value(c, |a: &DeviceArray<Vec3>| a.to_host()).unwrap();
    assert!(vel[0].abs_diff_eq(Vec3::new(0.0, -4.9, 0.0), 1e-5));
    assert!(pos[0].abs_diff_eq(Vec3::new(0.0, -2.45, 0.0), 1e-5));
    assert_eq!(vel[1], Vec3::ZERO);
    assert_eq!(pos[1], Vec3::X);

    // Disabling gravity stops acceleration.
    let toggle = g.field(id, fields::GRAVITY_ENABLED).unwrap();
    g.set_value(toggle, false).unwrap();
    g.step().unwrap();
    let vel = g.with_value(v, |a: &DeviceArray<Vec3>| a.to_host()).unwrap();
    assert!(vel[0].abs_diff_eq(Vec3::new(0.0, -4.9, 0.0), 1e-5));
}

#[test]
fn surface_samples_follow_bodies() {
    let mut sys = RigidBodySystem::new();
    sphere_body(&mut sys, Vec3::ZERO);
    sphere_body(&mut sys, Vec3::new(5.0, 0.0, 0.0));
    sys.set_surface_samples(vec![Vec3::Y * 0.1, -Vec3::Y * 0.1], vec![Vec3::Y, -Vec3::Y])
        .unwrap();
    let mut g = Graph::default();
    let id = g.add_node(sys).unwrap();
    g.reset().unwrap();

    let sys = g.node_ref::<RigidBodySystem>(id).unwrap();
    assert_eq!(sys.sampling_point_size(), 2);
    assert_eq!((sys.samples().nx(), sys.samples().ny()), (2, 2));
    assert!(sys.samples().get(0, 1).unwrap().abs_diff_eq(Vec3::new(5.0, 0.1, 0.0), 1e-6));
    assert_eq!(*sys.normals().get(1, 0).unwrap(), -Vec3::Y);
}

#[test]
fn vehicle_instances_track_bound_bodies() {
    let mut v = Vehicle::new();
    let a = sphere_body(v.system_mut(), Vec3::new(0.0, 1.0, 0.0));
    let b = sphere_body(v.system_mut(), Vec3::new(2.0, 1.0, 0.0));
    v.bind(&a, (0, 0)).unwrap();
    v.bind(&b, (0, 1)).unwrap();

    let mut g = Graph::default();
    let id = g.add_node(v).unwrap();
    g.step().unwrap();

    let f = g.field(id, vehicle_fields::INSTANCE_TRANSFORM).unwrap();
    let centers = g
        .with_value(g.field(id, fields::CENTER).unwrap(), |c: &DeviceArray<Vec3>| c.to_host())
        .unwrap();
    g.with_value(f, |l: &DeviceArrayList<Transform>| {
        let wheels = l.list(0).unwrap();
        assert_eq!(wheels.len(), 2);
        assert_eq!(wheels[0].translation, centers[0]);
        assert_eq!(wheels[1].translation, centers[1]);
        assert!(wheels[1].rotation.abs_diff_eq(Mat3::IDENTITY, 1e-6));
    })
    .unwrap();

    let tags = g.field(id, vehicle_fields::BINDING_TAG).unwrap();
    assert_eq!(
        g.with_value(tags, |t: &DeviceArray<i32>| t.to_host()).unwrap(),
        vec![0, 1]
    );
}

proptest! {
    /// Actor indices count up from zero in registration order.
    #[test]
    fn actor_indices_strictly_increase(kinds in prop::collection::vec(0u8..3, 1..24)) {
        let mut sys = RigidBodySystem::new();
        let body = RigidBodyInfo::default();
        for (expected, kind) in kinds.into_iter().enumerate() {
            let actor = match kind {
                0 => sys.add_sphere(&SphereInfo::new(0.5), &body, DEFAULT_DENSITY),
                1 => sys.add_box(&BoxInfo::default(), &body, DEFAULT_DENSITY),
                _ => sys.add_tet(&Default::default(), &body, DEFAULT_DENSITY),
            }
            .unwrap();
            prop_assert_eq!(actor.idx, expected as i32);
        }
    }

    /// A fixed joint fails exactly when one of its actors is unset.
    #[test]
    fn fixed_joint_invalid_iff_unset(first_set in any::<bool>(), second_set in any::<bool>()) {
        let mut sys = RigidBodySystem::new();
        let a = sphere_body(&mut sys, Vec3::ZERO);
        let b = sphere_body(&mut sys, Vec3::X);
        let a = if first_set { a } else { Actor::unset() };
        let b = if second_set { b } else { Actor::unset() };

        let result = sys.create_fixed_joint(&a, &b).map(|j| (j.body_idx1, j.body_idx2));
        if first_set && second_set {
            prop_assert_eq!(result, Ok((0, 1)));
            prop_assert_eq!(sys.joints::<FixedJoint>().len(), 1);
        } else {
            prop_assert_eq!(result, Err(RigidError::InvalidActor { idx: -1 }));
            prop_assert!(sys.joints::<FixedJoint>().is_empty());
        }
    }
}
