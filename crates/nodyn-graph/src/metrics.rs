//! Per-step timing collected by [`Graph::step`](crate::Graph::step).

use nodyn_core::{NodeId, StepId};

/// Timing for a single completed step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Step index after completion.
    pub step: StepId,
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Per-node update time, in traversal order.
    pub node_us: Vec<(NodeId, u64)>,
}

impl StepMetrics {
    /// Number of nodes visited.
    pub fn nodes_visited(&self) -> usize {
        self.node_us.len()
    }
}
