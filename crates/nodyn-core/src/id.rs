//! Strongly-typed identifiers for nodes, fields, steps, and graphs.

use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a node within a graph.
///
/// Nodes are stored in an arena owned by the graph; `NodeId(n)` is the
/// n-th node added. Ids are never reused within one graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Address of one field: the owning node plus the slot index in that
/// node's field table (declaration order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// Node that declared the field.
    pub node: NodeId,
    /// Position of the field in the node's declaration order.
    pub slot: u32,
}

impl FieldRef {
    /// Construct a field reference.
    pub fn new(node: NodeId, slot: u32) -> Self {
        Self { node, slot }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.slot)
    }
}

/// Monotonically increasing step counter.
///
/// Incremented each time the graph completes one simulation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`GraphId`] allocation.
static GRAPH_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a graph.
///
/// Allocated from a monotonic atomic counter. Used by the active-graph
/// stack to tell pushed graphs apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl GraphId {
    /// Allocate a fresh, unique graph ID. Thread-safe.
    pub fn next() -> Self {
        Self(GRAPH_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph-{}", self.0)
    }
}

/// Small ordered list of node ids (children, cycle members).
///
/// Inline for up to 4 entries, which covers typical composite nodes.
pub type NodeList = SmallVec<[NodeId; 4]>;
