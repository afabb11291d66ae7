//! Rigid multibody system for nodyn.
//!
//! Bodies are authored on a [`RigidBodySystem`] node as [`Actor`]s, each
//! carrying one primitive shape. Joints between actors are appended to a
//! per-kind registry. At reset (or an explicit
//! [`synchronize`](RigidBodySystem::synchronize)) the host records are
//! flattened into device arrays that solver modules consume each step.
//!
//! The built-in [`RigidBodyIntegrator`] advances poses under gravity;
//! contact and joint resolution are left to modules pushed after it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor;
pub mod body;
pub mod elements;
pub mod error;
pub mod factory;
pub mod inertia;
pub mod integrator;
pub mod joint;
pub mod shape;
pub mod system;
pub mod vehicle;

pub use actor::Actor;
pub use body::{Attribute, CollisionMask, MotionType, RigidBodyInfo};
pub use elements::{DiscreteElements, ShapeSet};
pub use error::RigidError;
pub use factory::register_nodes;
pub use inertia::point_inertia;
pub use integrator::RigidBodyIntegrator;
pub use joint::{
    BallAndSocketJoint, FixedJoint, HingeJoint, JointKind, JointRecord, JointRegistry, PointJoint,
    SliderJoint,
};
pub use shape::{BoxInfo, CapsuleInfo, MassProperties, Shape, ShapeType, SphereInfo, TetInfo};
pub use system::{fields, RigidBodySystem, DEFAULT_DENSITY};
pub use vehicle::{BindingPair, Transform, Vehicle};
