//! Particle systems stepping inside a static boundary.

use glam::Vec3;
use nodyn_array::DeviceArray;
use nodyn_core::{FieldError, GraphError};
use nodyn_graph::{Graph, SceneConfig};
use nodyn_particles::{add_particle_system, fields, BoundarySet, ParticleSystem, StaticBoundary};
use nodyn_test_utils::{event_log, RecordingModule};
use proptest::prelude::*;

fn positions(g: &Graph, node: nodyn_core::NodeId) -> Vec<Vec3> {
    let f = g.field(node, fields::POSITION).unwrap();
    g.with_value(f, |a: &DeviceArray<Vec3>| a.to_host()).unwrap()
}

fn scene(points: &[(Vec3, Vec3, f32)]) -> (Graph, nodyn_core::NodeId, nodyn_core::NodeId) {
    let mut g = Graph::default();
    let mut boundary = StaticBoundary::new();
    boundary
        .load_cube(Vec3::ZERO, Vec3::ONE, 0.01, true)
        .unwrap();
    let b = g.add_node(boundary).unwrap();
    let mut ps = ParticleSystem::new();
    for &(lo, hi, spacing) in points {
        ps.load_particles(lo, hi, spacing).unwrap();
    }
    let p = g.add_node(ps).unwrap();
    add_particle_system(&mut g, b, p).unwrap();
    (g, b, p)
}

#[test]
fn particles_fall_and_rest_on_floor() {
    let (mut g, b, p) = scene(&[(Vec3::splat(0.4), Vec3::splat(0.6), 0.1)]);
    assert_eq!(g.children(b).unwrap(), &[p]);
    assert_eq!(g.traversal_order().unwrap(), [b, p]);

    g.run(200).unwrap();
    for x in positions(&g, p) {
        assert_eq!(x.y, 0.01, "{x:?}");
        assert!(x.x >= 0.01 && x.x <= 0.99);
    }
    let v = g.field(p, fields::VELOCITY).unwrap();
    let vel = g.with_value(v, |a: &DeviceArray<Vec3>| a.to_host()).unwrap();
    // The floor removed the downward velocity gained this step.
    for u in vel {
        assert_eq!(u.y, 0.0, "{u:?}");
    }
}

#[test]
fn unconnected_system_falls_freely() {
    let config = SceneConfig {
        dt: 0.1,
        ..SceneConfig::default()
    };
    let mut g = Graph::new(config).unwrap();
    let mut ps = ParticleSystem::new();
    ps.load_particles(Vec3::ZERO, Vec3::splat(0.5), 1.0).unwrap();
    let p = g.add_node(ps).unwrap();
    g.run(2).unwrap();
    // v1 = -0.98, x1 = -0.098; v2 = -1.96, x2 = -0.294.
    assert!((positions(&g, p)[0].y + 0.294).abs() < 1e-5);
}

#[test]
fn boundary_value_reaches_child_input() {
    let (mut g, _, p) = scene(&[(Vec3::splat(0.5), Vec3::splat(0.5), 0.1)]);
    g.reset().unwrap();
    let input = g.field(p, fields::BOUNDARY).unwrap();
    let set = g.value::<BoundarySet>(input).unwrap();
    assert_eq!(set.cubes.len(), 1);
    assert!(set.cubes[0].inverted);
}

#[test]
fn attaching_twice_is_rejected_unchanged() {
    let (mut g, b, p) = scene(&[]);
    let err = add_particle_system(&mut g, b, p).unwrap_err();
    assert!(matches!(err, GraphError::Field(FieldError::AlreadyConnected { .. })));
    assert_eq!(g.node_ref::<StaticBoundary>(b).unwrap().particle_systems(), &[p]);
}

#[test]
fn external_modules_join_the_pipeline() {
    let log = event_log();
    let (mut g, _, p) = scene(&[]);
    g.push_module(p, Box::new(RecordingModule::new("render", log.clone())))
        .unwrap();
    assert_eq!(
        g.pipeline(p).unwrap().names(),
        ["ParticleIntegrator", "BoundaryConstraint", "render"]
    );
    g.step().unwrap();
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("render #1@0"));
}

proptest! {
    /// Every particle stays within the container after any number of steps.
    #[test]
    fn particles_never_leave_container(
        start in prop::array::uniform3(0.05f32..0.95),
        speed in prop::array::uniform3(-20.0f32..20.0),
        steps in 1u64..40,
    ) {
        let (mut g, _, p) = scene(&[]);
        let start = Vec3::from_array(start);
        g.node_mut::<ParticleSystem>(p).unwrap()
            .load_particles(start, start + Vec3::splat(0.01), 0.02).unwrap();
        g.reset().unwrap();
        let v = g.field(p, fields::VELOCITY).unwrap();
        g.update_value(v, |a: &mut DeviceArray<Vec3>| {
            a.par_for_each_mut(|_, u| *u = Vec3::from_array(speed));
        }).unwrap();
        g.run(steps).unwrap();
        for x in positions(&g, p) {
            prop_assert!(x.cmpge(Vec3::splat(0.01 - 1e-5)).all(), "{:?}", x);
            prop_assert!(x.cmple(Vec3::splat(0.99 + 1e-5)).all(), "{:?}", x);
        }
    }
}
