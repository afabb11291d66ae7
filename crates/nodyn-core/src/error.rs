//! Error types for the nodyn simulation graph.
//!
//! Organized by subsystem: field declaration and connection, graph
//! structure, module execution, and the per-step driver.

use std::error::Error;
use std::fmt;

use crate::field::FieldKind;
use crate::id::{FieldRef, NodeId, NodeList};

/// Errors from field declaration, connection, and access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// A field with this name is already declared on the node.
    DuplicateFieldName {
        /// The repeated name.
        name: String,
    },
    /// No field with this name (or slot) exists on the node.
    UnknownField {
        /// The requested name.
        name: String,
    },
    /// Value types differ; there is no implicit coercion.
    TypeMismatch {
        /// The field whose type was expected.
        field: String,
        /// Type the field holds.
        expected: &'static str,
        /// Type that was offered.
        found: &'static str,
    },
    /// The target input already has an upstream source.
    AlreadyConnected {
        /// The input field.
        target: FieldRef,
        /// Its current source.
        source: FieldRef,
    },
    /// `disconnect` on an input that has no source.
    NotConnected {
        /// The input field.
        target: FieldRef,
    },
    /// Connection from an input, or into a non-input.
    InvalidDirection {
        /// Name of the proposed source.
        source: String,
        /// Kind of the proposed source.
        source_kind: FieldKind,
        /// Name of the proposed target.
        target: String,
        /// Kind of the proposed target.
        target_kind: FieldKind,
    },
    /// The field is already borrowed in a conflicting way.
    BorrowConflict {
        /// The field being accessed.
        name: String,
    },
    /// Inputs are written only by their upstream source.
    ReadOnlyInput {
        /// The input field.
        name: String,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFieldName { name } => write!(f, "field '{name}' already declared"),
            Self::UnknownField { name } => write!(f, "unknown field '{name}'"),
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "type mismatch on field '{field}': expected {expected}, found {found}"
            ),
            Self::AlreadyConnected { target, source } => {
                write!(f, "input {target} is already connected to {source}")
            }
            Self::NotConnected { target } => write!(f, "input {target} is not connected"),
            Self::InvalidDirection {
                source,
                source_kind,
                target,
                target_kind,
            } => write!(
                f,
                "cannot connect '{source}' ({source_kind}) to '{target}' ({target_kind})"
            ),
            Self::BorrowConflict { name } => write!(f, "field '{name}' is already borrowed"),
            Self::ReadOnlyInput { name } => write!(f, "input '{name}' cannot be written by its node"),
        }
    }
}

impl Error for FieldError {}

/// Errors from graph structure and node lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// No node with this id exists in the graph.
    UnknownNode {
        /// The requested node.
        node: NodeId,
    },
    /// The node exists but is not of the requested concrete type.
    NodeTypeMismatch {
        /// The node.
        node: NodeId,
        /// The requested type.
        expected: &'static str,
    },
    /// The dependency graph has no topological order.
    CyclicGraph {
        /// Nodes that could not be ordered.
        nodes: NodeList,
    },
    /// The node was torn down.
    NodeDestroyed {
        /// The node.
        node: NodeId,
    },
    /// A field-level failure.
    Field(FieldError),
    /// The active-graph stack is empty.
    NoActiveGraph,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::NodeTypeMismatch { node, expected } => {
                write!(f, "node {node} is not a {expected}")
            }
            Self::CyclicGraph { nodes } => {
                write!(f, "cyclic graph: no topological order for nodes [")?;
                for (i, n) in nodes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{n}")?;
                }
                write!(f, "]")
            }
            Self::NodeDestroyed { node } => write!(f, "node {node} has been destroyed"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::NoActiveGraph => write!(f, "no active graph"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for GraphError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

/// Errors from a node hook or a pipeline module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// Generic failure with a description.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A field access failed.
    Field(FieldError),
    /// A device array's length disagrees with its family; the step cannot
    /// proceed until the owner re-synchronizes.
    StaleDeviceArray {
        /// Name of the offending array.
        array: String,
        /// Length required by the family.
        expected: usize,
        /// Length found.
        found: usize,
    },
    /// An actor index is unset or out of range.
    InvalidActor {
        /// The offending index.
        idx: i32,
    },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::StaleDeviceArray {
                array,
                expected,
                found,
            } => write!(
                f,
                "stale device array '{array}': expected length {expected}, found {found}"
            ),
            Self::InvalidActor { idx } => write!(f, "invalid actor index {idx}"),
        }
    }
}

impl Error for ModuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for ModuleError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

/// Errors from one simulation step of a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// Structural failure found before any module ran.
    Graph(GraphError),
    /// A node hook or module failed; the graph now needs a reset.
    ModuleFailed {
        /// Node being updated.
        node: NodeId,
        /// Name of the failing module or hook.
        module: String,
        /// The underlying error.
        reason: ModuleError,
    },
    /// A previous step failed; call `reset()` before stepping again.
    ResetRequired,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "graph: {e}"),
            Self::ModuleFailed {
                node,
                module,
                reason,
            } => write!(f, "module '{module}' on node {node} failed: {reason}"),
            Self::ResetRequired => write!(f, "simulation state undefined; reset required"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(e) => Some(e),
            Self::ModuleFailed { reason, .. } => Some(reason),
            Self::ResetRequired => None,
        }
    }
}

impl From<GraphError> for StepError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn cyclic_graph_lists_nodes() {
        let e = GraphError::CyclicGraph {
            nodes: smallvec![NodeId(1), NodeId(2)],
        };
        assert_eq!(
            e.to_string(),
            "cyclic graph: no topological order for nodes [#1, #2]"
        );
    }

    #[test]
    fn step_error_chains_source() {
        let e = StepError::ModuleFailed {
            node: NodeId(0),
            module: "integrator".into(),
            reason: ModuleError::StaleDeviceArray {
                array: "Mass".into(),
                expected: 3,
                found: 2,
            },
        };
        let src = e.source().map(|s| s.to_string());
        assert_eq!(
            src.as_deref(),
            Some("stale device array 'Mass': expected length 3, found 2")
        );
    }

    #[test]
    fn field_error_converts_into_graph_error() {
        let g: GraphError = FieldError::UnknownField { name: "x".into() }.into();
        assert!(matches!(g, GraphError::Field(FieldError::UnknownField { .. })));
        assert!(g.source().is_some());
    }
}
