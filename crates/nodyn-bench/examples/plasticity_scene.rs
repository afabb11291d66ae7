//! Two particle blocks settling in a unit container.
//!
//! Demonstrates: build scene → attach particle systems to a boundary → step
//! → read positions. Set `RUST_LOG=nodyn_graph=debug` for per-node logs.

use glam::Vec3;
use nodyn_array::DeviceArray;
use nodyn_bench::plasticity_scene;
use nodyn_graph::SceneConfig;
use nodyn_particles::fields::POSITION;
use tracing_subscriber::EnvFilter;

const STEPS: u64 = 300;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== nodyn Plasticity Scene ===\n");

    let (mut graph, systems) = plasticity_scene(SceneConfig::default()).unwrap();
    graph.reset().unwrap();

    for step in 0..STEPS {
        let metrics = graph.step().unwrap();

        if step % 50 == 0 || step == STEPS - 1 {
            for (k, &node) in systems.iter().enumerate() {
                let field = graph.field(node, POSITION).unwrap();
                let (count, lowest, mean) = graph
                    .with_value(field, |p: &DeviceArray<Vec3>| {
                        let host = p.to_host();
                        let lowest = host.iter().map(|x| x.y).fold(f32::INFINITY, f32::min);
                        let mean = host.iter().copied().sum::<Vec3>() / host.len().max(1) as f32;
                        (host.len(), lowest, mean)
                    })
                    .unwrap();
                println!(
                    "  step {:>3} block {}: particles={:>5}, lowest_y={:>7.4}, mean=({:>6.3}, {:>6.3}, {:>6.3}), nodes={}, time={:>6}μs",
                    step + 1,
                    k,
                    count,
                    lowest,
                    mean.x,
                    mean.y,
                    mean.z,
                    metrics.nodes_visited(),
                    metrics.total_us,
                );
            }
        }
    }

    println!("\nsimulated {:.3}s in {} steps", graph.time(), graph.step_id().0);
}
