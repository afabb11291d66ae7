//! Criterion micro-benchmarks for host → device synchronization.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use nodyn_array::DualArray;
use nodyn_bench::rigid_scene;

/// Full rigid-system synchronize via reset, 1000 bodies and 999 joints.
fn bench_rigid_reset_1k(c: &mut Criterion) {
    let (mut graph, _) = rigid_scene(1000).unwrap();
    c.bench_function("rigid_reset_1k", |b| {
        b.iter(|| {
            graph.reset().unwrap();
            black_box(graph.step_id());
        });
    });
}

/// Mirror a stale 100K-element host vector onto the device.
fn bench_dual_array_sync_100k(c: &mut Criterion) {
    let mut array = DualArray::new();
    for i in 0..100_000 {
        array.push(Vec3::splat(i as f32));
    }
    c.bench_function("dual_array_sync_100k", |b| {
        b.iter(|| {
            array.push(Vec3::ZERO);
            array.sync();
            black_box(array.device_len());
        });
    });
}

criterion_group!(benches, bench_rigid_reset_1k, bench_dual_array_sync_100k);
criterion_main!(benches);
