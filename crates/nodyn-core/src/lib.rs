//! Core types for the nodyn simulation graph.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! strongly-typed identifiers, field descriptors, and the error taxonomy
//! shared by every other crate in the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;

pub use error::{FieldError, GraphError, ModuleError, StepError};
pub use field::{validate_connection, FieldDescriptor, FieldKind, Residency, ValueType};
pub use id::{FieldRef, GraphId, NodeId, NodeList, StepId};
