//! Test utilities and mock nodes for nodyn development.
//!
//! Provides small [`Node`](nodyn_graph::Node) and
//! [`Module`](nodyn_graph::Module) implementations used by the
//! integration tests and benches of the other crates.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    event_log, EventLog, FailingModule, IndexSinkNode, RecordingModule, SinkNode, SourceNode,
};
