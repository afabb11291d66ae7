//! Node graph runtime for nodyn.
//!
//! A [`Graph`] owns simulation [`Node`]s. Each node declares typed fields
//! into a [`FieldTable`]; inputs connect to outputs of other nodes and read
//! through the connection on demand. Every [`Graph::step`] visits nodes in
//! dependency order and runs, per node, `update_topology`, the node's
//! [`Pipeline`] of [`Module`]s, and `update_states`.
//!
//! ```text
//!   ┌──────────── Graph ─────────────┐
//!   │ nodes:  [Node + Pipeline] ...  │
//!   │ tables: [FieldTable]      ...  │──▶ NodeContext (one node's view)
//!   └────────────────────────────────┘
//! ```
//!
//! The active graph is the top of a [`GraphStack`]; node constructors are
//! cataloged in a [`NodeFactory`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod factory;
pub mod field;
pub mod graph;
pub mod metrics;
pub mod module;
pub mod node;
pub mod stack;

pub use config::{ConfigError, SceneConfig};
pub use context::NodeContext;
pub use factory::{NodeAction, NodeCreator, NodeFactory, NodeGroup};
pub use field::{FieldDecl, FieldTable};
pub use graph::Graph;
pub use metrics::StepMetrics;
pub use module::{Module, Pipeline};
pub use node::{downcast_node, downcast_node_mut, AsAny, Node, NodeState};
pub use stack::{GraphStack, SharedGraph};
