//! nodyn: node-based physics simulation with rigid multibodies and particles.
//!
//! This is the top-level facade crate that re-exports the public API of the
//! nodyn sub-crates. Most users only need `nodyn` as a single dependency.
//!
//! # Quick start
//!
//! ```rust
//! use nodyn::prelude::*;
//!
//! let mut graph = Graph::default();
//!
//! let mut system = RigidBodySystem::new();
//! let body = RigidBodyInfo::at(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
//! system.add_box(&BoxInfo::new(Vec3::splat(0.1)), &body, DEFAULT_DENSITY).unwrap();
//! let rigid = graph.add_node(system).unwrap();
//!
//! graph.run(10).unwrap();
//!
//! let center = graph.field(rigid, nodyn::rigid::fields::CENTER).unwrap();
//! let y = graph.with_value(center, |c: &DeviceArray<Vec3>| c.to_host()[0].y).unwrap();
//! assert!(y < 1.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `nodyn-core` | IDs, field descriptors, error types |
//! | [`array`] | `nodyn-array` | Device arrays and host/device mirrors |
//! | [`graph`] | `nodyn-graph` | Graph runtime, nodes, modules, factory |
//! | [`rigid`] | `nodyn-rigid` | Rigid-body system, shapes, joints, vehicle |
//! | [`particles`] | `nodyn-particles` | Particle systems and static boundaries |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// IDs, field descriptors and errors (`nodyn-core`).
pub use nodyn_core as core;

/// Device-resident arrays (`nodyn-array`).
///
/// [`array::DualArray`] pairs a host vector with its device mirror;
/// [`array::DeviceArray`] is the per-element storage nodes read and write.
pub use nodyn_array as array;

/// Graph runtime (`nodyn-graph`).
///
/// [`graph::Graph`] owns nodes and steps them in dependency order; the
/// [`graph::Node`] and [`graph::Module`] traits are the extension points.
pub use nodyn_graph as graph;

/// Rigid multibody subsystem (`nodyn-rigid`).
pub use nodyn_rigid as rigid;

/// Particle systems (`nodyn-particles`).
pub use nodyn_particles as particles;

/// Re-exported math types.
pub use glam;

/// Register every built-in node with `factory`.
pub fn register_builtin_nodes(factory: &mut graph::NodeFactory) {
    rigid::register_nodes(factory);
    particles::register_nodes(factory);
}

/// Common imports for typical nodyn usage.
///
/// ```rust
/// use nodyn::prelude::*;
/// ```
pub mod prelude {
    // Math
    pub use glam::{Mat3, Quat, Vec3};

    // Core types
    pub use nodyn_core::{FieldRef, NodeId, StepId};

    // Errors
    pub use nodyn_core::{FieldError, GraphError, ModuleError, StepError};

    // Arrays
    pub use nodyn_array::{DeviceArray, DeviceArray2D, DeviceArrayList, DualArray};

    // Graph
    pub use nodyn_graph::{
        FieldDecl, FieldTable, Graph, GraphStack, Module, Node, NodeContext, NodeFactory,
        Pipeline, SceneConfig, StepMetrics,
    };

    // Rigid bodies
    pub use nodyn_rigid::{
        Actor, BallAndSocketJoint, BoxInfo, CapsuleInfo, FixedJoint, HingeJoint, MotionType,
        PointJoint, RigidBodyInfo, RigidBodySystem, RigidError, SliderJoint, SphereInfo, TetInfo,
        Vehicle, DEFAULT_DENSITY,
    };

    // Particles
    pub use nodyn_particles::{add_particle_system, ParticleError, ParticleSystem, StaticBoundary};
}
