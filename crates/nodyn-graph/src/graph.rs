//! The simulation graph: node arena, connections, and per-step traversal.

use std::any::{type_name, Any};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use nodyn_core::{
    validate_connection, FieldDescriptor, FieldError, FieldRef, GraphError, GraphId, ModuleError,
    NodeId, NodeList, StepError, StepId,
};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SceneConfig};
use crate::context::NodeContext;
use crate::field::{resolve, slot_of, FieldTable};
use crate::metrics::StepMetrics;
use crate::module::{Module, Pipeline};
use crate::node::{downcast_node, downcast_node_mut, Node, NodeState};

struct NodeEntry {
    node: Box<dyn Node>,
    pipeline: Pipeline,
    state: NodeState,
    parent: Option<NodeId>,
    children: NodeList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    /// No reset since construction or teardown.
    Fresh,
    Running,
    /// A hook or module failed; state is undefined until `reset()`.
    Poisoned,
}

/// A directed graph of simulation nodes.
///
/// Nodes live in an arena indexed by [`NodeId`]; their fields live in a
/// parallel arena of [`FieldTable`]s so that a node can be updated while
/// every other node's fields stay readable through connections.
///
/// Each [`step()`](Graph::step) visits live nodes in a topological order of
/// the dependency graph (field connections plus parent → child edges),
/// breaking ties by `NodeId`.
pub struct Graph {
    id: GraphId,
    config: SceneConfig,
    nodes: Vec<NodeEntry>,
    tables: Vec<FieldTable>,
    time: f64,
    step: StepId,
    status: Status,
    last_metrics: StepMetrics,
}

impl Graph {
    /// Create an empty graph after validating `config`.
    pub fn new(config: SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: GraphId::next(),
            config,
            nodes: Vec::new(),
            tables: Vec::new(),
            time: 0.0,
            step: StepId(0),
            status: Status::Fresh,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Process-unique identity.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Scene configuration.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps since the last reset.
    pub fn step_id(&self) -> StepId {
        self.step
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Whether a failed step left the graph waiting for `reset()`.
    pub fn is_poisoned(&self) -> bool {
        self.status == Status::Poisoned
    }

    /// Total nodes ever added, including destroyed ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Add a node, declaring its fields and building its pipeline.
    ///
    /// The node is `Configured` on return and becomes `Active` at the next
    /// reset (or the next step, for graphs already running). A node whose
    /// field declaration fails is not added.
    pub fn add_node<N: Node>(&mut self, node: N) -> Result<NodeId, GraphError> {
        self.add_boxed(Box::new(node))
    }

    /// Add an already boxed node, e.g. one produced by a factory action.
    pub fn add_boxed(&mut self, node: Box<dyn Node>) -> Result<NodeId, GraphError> {
        let id = NodeId(self.nodes.len() as u32);
        let mut table = FieldTable::new(id);
        node.declare_fields(&mut table)?;
        let mut pipeline = Pipeline::new();
        node.build_pipeline(&mut pipeline);
        debug!(
            graph = %self.id,
            node = %id,
            class = node.class_name(),
            fields = table.len(),
            modules = pipeline.len(),
            "node configured"
        );
        self.nodes.push(NodeEntry {
            node,
            pipeline,
            state: NodeState::Configured,
            parent: None,
            children: NodeList::new(),
        });
        self.tables.push(table);
        Ok(id)
    }

    fn check_live(&self, id: NodeId) -> Result<(), GraphError> {
        match self.nodes.get(id.index()) {
            None => Err(GraphError::UnknownNode { node: id }),
            Some(e) if e.state == NodeState::Destroyed => {
                Err(GraphError::NodeDestroyed { node: id })
            }
            Some(_) => Ok(()),
        }
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry, GraphError> {
        self.check_live(id)?;
        Ok(&self.nodes[id.index()])
    }

    /// Lifecycle state of a node.
    pub fn node_state(&self, id: NodeId) -> Result<NodeState, GraphError> {
        self.nodes
            .get(id.index())
            .map(|e| e.state)
            .ok_or(GraphError::UnknownNode { node: id })
    }

    /// Class name of a node.
    pub fn class_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.entry(id)?.node.class_name())
    }

    /// Ids of all nodes that have not been destroyed.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state != NodeState::Destroyed)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Typed shared access to a node.
    pub fn node_ref<N: Node>(&self, id: NodeId) -> Result<&N, GraphError> {
        downcast_node::<N>(&*self.entry(id)?.node).ok_or(GraphError::NodeTypeMismatch {
            node: id,
            expected: type_name::<N>(),
        })
    }

    /// Typed mutable access to a node, without field access.
    pub fn node_mut<N: Node>(&mut self, id: NodeId) -> Result<&mut N, GraphError> {
        self.check_live(id)?;
        downcast_node_mut::<N>(&mut *self.nodes[id.index()].node).ok_or(
            GraphError::NodeTypeMismatch {
                node: id,
                expected: type_name::<N>(),
            },
        )
    }

    /// Run `f` with typed mutable access to a node and a context over its
    /// fields.
    ///
    /// This is the authoring entry point for node-specific operations that
    /// touch both host-side node data and field values.
    pub fn node_scope<N, R, F>(&mut self, id: NodeId, f: F) -> Result<R, GraphError>
    where
        N: Node,
        F: FnOnce(&mut N, &NodeContext<'_>) -> R,
    {
        self.check_live(id)?;
        let ctx = NodeContext::new(id, &self.tables, &self.config, self.time, self.step);
        let entry = &mut self.nodes[id.index()];
        let node = downcast_node_mut::<N>(&mut *entry.node).ok_or(GraphError::NodeTypeMismatch {
            node: id,
            expected: type_name::<N>(),
        })?;
        Ok(f(node, &ctx))
    }

    /// Record `child` as a child of `parent`.
    ///
    /// Children are updated after their parent. A child has at most one
    /// parent; re-parenting detaches it from the previous one.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.check_live(parent)?;
        self.check_live(child)?;
        if parent == child {
            return Err(GraphError::CyclicGraph {
                nodes: NodeList::from_slice(&[parent]),
            });
        }
        if let Some(old) = self.nodes[child.index()].parent.take() {
            self.nodes[old.index()].children.retain(|c| *c != child);
        }
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Children of a node, in insertion order.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.entry(id)?.children)
    }

    /// Parent of a node, if any.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, GraphError> {
        Ok(self.entry(id)?.parent)
    }

    /// Append an externally supplied module to a node's pipeline.
    ///
    /// The module is initialized at the next reset.
    pub fn push_module(&mut self, id: NodeId, module: Box<dyn Module>) -> Result<(), GraphError> {
        self.check_live(id)?;
        self.nodes[id.index()].pipeline.push(module);
        Ok(())
    }

    /// A node's pipeline.
    pub fn pipeline(&self, id: NodeId) -> Result<&Pipeline, GraphError> {
        Ok(&self.entry(id)?.pipeline)
    }

    // ── Fields ─────────────────────────────────────────────────────

    /// A node's field table.
    pub fn fields(&self, id: NodeId) -> Result<&FieldTable, GraphError> {
        self.check_live(id)?;
        Ok(&self.tables[id.index()])
    }

    /// Reference to a node's field by name.
    pub fn field(&self, id: NodeId, name: &str) -> Result<FieldRef, GraphError> {
        self.fields(id)?
            .field_ref(name)
            .ok_or_else(|| GraphError::Field(FieldError::UnknownField { name: name.to_string() }))
    }

    /// Descriptor of a field.
    pub fn descriptor(&self, field: FieldRef) -> Result<&FieldDescriptor, GraphError> {
        self.check_live(field.node)?;
        Ok(&slot_of(&self.tables, field)?.descriptor)
    }

    /// Connect `source` (an output or state) to `target` (an input).
    ///
    /// Fails without modifying the graph if the direction is wrong, the
    /// value types differ, or `target` already has a source.
    pub fn connect(&mut self, source: FieldRef, target: FieldRef) -> Result<(), GraphError> {
        self.check_live(source.node)?;
        self.check_live(target.node)?;
        {
            let src = slot_of(&self.tables, source)?;
            let tgt = slot_of(&self.tables, target)?;
            validate_connection(&src.descriptor, &tgt.descriptor)?;
            if let Some(existing) = tgt.source {
                return Err(FieldError::AlreadyConnected {
                    target,
                    source: existing,
                }
                .into());
            }
        }
        let tgt = self.tables[target.node.index()].slot_at_mut(target.slot)?;
        tgt.source = Some(source);
        tgt.forget_observation();
        self.tables[source.node.index()]
            .slot_at_mut(source.slot)?
            .sinks
            .push(target);
        debug!(graph = %self.id, %source, %target, "fields connected");
        Ok(())
    }

    /// Connect two fields by node and name.
    pub fn connect_named(
        &mut self,
        source_node: NodeId,
        source_name: &str,
        target_node: NodeId,
        target_name: &str,
    ) -> Result<(), GraphError> {
        let source = self.field(source_node, source_name)?;
        let target = self.field(target_node, target_name)?;
        self.connect(source, target)
    }

    /// Remove `target`'s connection, returning its former source.
    pub fn disconnect(&mut self, target: FieldRef) -> Result<FieldRef, GraphError> {
        self.check_live(target.node)?;
        let tgt = self.tables[target.node.index()].slot_at_mut(target.slot)?;
        let source = tgt
            .source
            .take()
            .ok_or(FieldError::NotConnected { target })?;
        tgt.forget_observation();
        if let Some(table) = self.tables.get_mut(source.node.index()) {
            if let Ok(src) = table.slot_at_mut(source.slot) {
                src.sinks.retain(|s| *s != target);
            }
        }
        debug!(graph = %self.id, %source, %target, "fields disconnected");
        Ok(source)
    }

    /// Upstream source of an input, if connected.
    pub fn source_of(&self, target: FieldRef) -> Result<Option<FieldRef>, GraphError> {
        self.check_live(target.node)?;
        Ok(slot_of(&self.tables, target)?.source)
    }

    /// Inputs fed by `source`.
    pub fn sinks_of(&self, source: FieldRef) -> Result<&[FieldRef], GraphError> {
        self.check_live(source.node)?;
        Ok(&slot_of(&self.tables, source)?.sinks)
    }

    /// Whether `target` has an upstream source.
    pub fn is_connected(&self, target: FieldRef) -> Result<bool, GraphError> {
        Ok(self.source_of(target)?.is_some())
    }

    /// Apply `f` to the current value of a field.
    ///
    /// Connected inputs resolve to their source's current value.
    pub fn with_value<T: Any, R>(
        &self,
        field: FieldRef,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, GraphError> {
        self.check_live(field.node)?;
        let own = slot_of(&self.tables, field)?;
        let value = resolve(&self.tables, own)?.borrow::<T>()?;
        Ok(f(&*value))
    }

    /// Copy of the current value of a field.
    pub fn value<T: Any + Clone>(&self, field: FieldRef) -> Result<T, GraphError> {
        self.with_value(field, T::clone)
    }

    /// Mutate a field's own stored value in place.
    ///
    /// On an input this edits the local default, which is shadowed while
    /// the input is connected.
    pub fn update_value<T: Any, R>(
        &mut self,
        field: FieldRef,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, GraphError> {
        self.check_live(field.node)?;
        let mut value = slot_of(&self.tables, field)?.borrow_mut::<T>()?;
        Ok(f(&mut *value))
    }

    /// Replace a field's own stored value.
    ///
    /// Fails with [`FieldError::TypeMismatch`] and leaves the field
    /// untouched if `T` is not the declared value type.
    pub fn set_value<T: Any>(&mut self, field: FieldRef, value: T) -> Result<(), GraphError> {
        self.update_value(field, |v: &mut T| *v = value)
    }

    // ── Traversal ──────────────────────────────────────────────────

    /// Topological order of live nodes.
    ///
    /// Edges run from a connection's source node to its target node and
    /// from parent to child. Among ready nodes the smallest `NodeId` goes
    /// first, so the order is deterministic.
    pub fn traversal_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let n = self.nodes.len();
        let live: Vec<bool> = self
            .nodes
            .iter()
            .map(|e| e.state != NodeState::Destroyed)
            .collect();
        let mut indegree = vec![0usize; n];
        let mut out: Vec<NodeList> = vec![NodeList::new(); n];

        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
        for (i, table) in self.tables.iter().enumerate() {
            for slot in table.slots() {
                if let Some(src) = slot.source {
                    edges.push((src.node, NodeId(i as u32)));
                }
            }
        }
        for (i, entry) in self.nodes.iter().enumerate() {
            for &child in &entry.children {
                edges.push((NodeId(i as u32), child));
            }
        }
        for (from, to) in edges {
            // Reading a node's own output is not an inter-node dependency.
            if from == to || !live[from.index()] || !live[to.index()] {
                continue;
            }
            out[from.index()].push(to);
            indegree[to.index()] += 1;
        }

        let mut ready: BTreeSet<NodeId> = (0..n)
            .filter(|&i| live[i] && indegree[i] == 0)
            .map(|i| NodeId(i as u32))
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for &next in &out[id.index()] {
                indegree[next.index()] -= 1;
                if indegree[next.index()] == 0 {
                    ready.insert(next);
                }
            }
        }

        let live_count = live.iter().filter(|l| **l).count();
        if order.len() < live_count {
            let nodes: NodeList = (0..n)
                .filter(|&i| live[i] && indegree[i] > 0)
                .map(|i| NodeId(i as u32))
                .collect();
            return Err(GraphError::CyclicGraph { nodes });
        }
        Ok(order)
    }

    fn module_failed(id: NodeId, module: &str, reason: ModuleError) -> StepError {
        StepError::ModuleFailed {
            node: id,
            module: module.to_string(),
            reason,
        }
    }

    fn poison(&mut self, err: StepError) -> StepError {
        warn!(graph = %self.id, step = self.step.0, error = %err, "step failed; reset required");
        self.status = Status::Poisoned;
        err
    }

    fn reset_node(&mut self, id: NodeId) -> Result<(), StepError> {
        let ctx = NodeContext::new(id, &self.tables, &self.config, self.time, self.step);
        let entry = &mut self.nodes[id.index()];
        if let Err(reason) = entry.node.reset_states(&ctx) {
            return Err(Self::module_failed(id, "reset_states", reason));
        }
        for module in entry.pipeline.iter_mut() {
            if let Err(reason) = module.initialize(&ctx) {
                return Err(Self::module_failed(id, module.name(), reason));
            }
        }
        entry.state = NodeState::Active;
        Ok(())
    }

    fn update_node(&mut self, id: NodeId) -> Result<(), StepError> {
        let ctx = NodeContext::new(id, &self.tables, &self.config, self.time, self.step);
        let entry = &mut self.nodes[id.index()];
        debug!(node = %id, class = entry.node.class_name(), step = self.step.0, "updating node");

        // 1. Derived structure.
        if let Err(reason) = entry.node.update_topology(&ctx) {
            return Err(Self::module_failed(id, "update_topology", reason));
        }
        // 2. Pipeline, in declared order.
        for module in entry.pipeline.iter_mut() {
            if let Err(reason) = module.execute(&ctx) {
                return Err(Self::module_failed(id, module.name(), reason));
            }
        }
        // 3. Post-pipeline hook.
        if let Err(reason) = entry.node.update_states(&ctx) {
            return Err(Self::module_failed(id, "update_states", reason));
        }
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Restart the simulation: rewind the clock, run every node's
    /// `reset_states` and initialize every module, in traversal order.
    ///
    /// Clears a poisoned state on success.
    pub fn reset(&mut self) -> Result<(), StepError> {
        let order = self.traversal_order()?;
        self.time = 0.0;
        self.step = StepId(0);
        for &id in &order {
            if let Err(e) = self.reset_node(id) {
                return Err(self.poison(e));
            }
        }
        self.status = Status::Running;
        info!(graph = %self.id, nodes = order.len(), "graph reset");
        Ok(())
    }

    /// Advance the simulation by one step.
    ///
    /// Resets first if the graph was never reset. A cycle is reported
    /// before any module runs. If any hook or module fails the step stops
    /// there and every later step returns [`StepError::ResetRequired`]
    /// until [`reset()`](Graph::reset) succeeds.
    pub fn step(&mut self) -> Result<StepMetrics, StepError> {
        let step_start = Instant::now();

        // 0. A failed step leaves state undefined.
        match self.status {
            Status::Poisoned => return Err(StepError::ResetRequired),
            Status::Fresh => self.reset()?,
            Status::Running => {}
        }

        // 1. Order nodes; a cycle aborts before any module runs.
        let order = self.traversal_order()?;

        // 2. Nodes added since the last reset are reset now.
        for &id in &order {
            if self.nodes[id.index()].state == NodeState::Configured {
                if let Err(e) = self.reset_node(id) {
                    return Err(self.poison(e));
                }
            }
        }

        // 3. Visit every node.
        let mut node_us = Vec::with_capacity(order.len());
        for &id in &order {
            let node_start = Instant::now();
            if let Err(e) = self.update_node(id) {
                return Err(self.poison(e));
            }
            node_us.push((id, node_start.elapsed().as_micros() as u64));
        }

        // 4. Advance the clock.
        self.step = StepId(self.step.0 + 1);
        self.time += f64::from(self.config.dt);

        let metrics = StepMetrics {
            step: self.step,
            total_us: step_start.elapsed().as_micros() as u64,
            node_us,
        };
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Run `steps` steps, stopping at the first failure.
    pub fn run(&mut self, steps: u64) -> Result<(), StepError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Destroy every node and release all field storage.
    ///
    /// Node ids stay reserved; lookups of destroyed nodes return
    /// [`GraphError::NodeDestroyed`]. New nodes may still be added.
    pub fn teardown(&mut self) {
        let mut destroyed = 0usize;
        for (entry, table) in self.nodes.iter_mut().zip(self.tables.iter_mut()) {
            if entry.state != NodeState::Destroyed {
                entry.state = NodeState::Destroyed;
                entry.pipeline = Pipeline::new();
                entry.children.clear();
                entry.parent = None;
                table.release();
                destroyed += 1;
            }
        }
        self.time = 0.0;
        self.step = StepId(0);
        self.status = Status::Fresh;
        info!(graph = %self.id, nodes = destroyed, "graph torn down");
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            id: GraphId::next(),
            config: SceneConfig::default(),
            nodes: Vec::new(),
            tables: Vec::new(),
            time: 0.0,
            step: StepId(0),
            status: Status::Fresh,
            last_metrics: StepMetrics::default(),
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("step", &self.step)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDecl;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Emits a counter that increments every step.
    struct Counter {
        log: Log,
    }

    impl Node for Counter {
        fn class_name(&self) -> &str {
            "Counter"
        }
        fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
            fields.declare(FieldDecl::var("count", 0i64))?;
            Ok(())
        }
        fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
            ctx.set("count", 0i64)?;
            Ok(())
        }
        fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
            *ctx.write::<i64>("count")? += 1;
            self.log.lock().unwrap().push(format!("counter {}", ctx.node()));
            Ok(())
        }
    }

    /// Reads a counter through an input.
    struct Reader {
        log: Log,
    }

    impl Node for Reader {
        fn class_name(&self) -> &str {
            "Reader"
        }
        fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
            fields.declare(FieldDecl::var_in("count", -1i64))?;
            fields.declare(FieldDecl::var("seen", -1i64))?;
            Ok(())
        }
        fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
            let v = ctx.get::<i64>("count")?;
            ctx.set("seen", v)?;
            self.log.lock().unwrap().push(format!("reader {}", ctx.node()));
            Ok(())
        }
    }

    struct Failing;

    impl Module for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn execute(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
            Err(ModuleError::ExecutionFailed {
                reason: "boom".into(),
            })
        }
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = SceneConfig {
            dt: 0.0,
            ..SceneConfig::default()
        };
        assert!(matches!(Graph::new(cfg), Err(ConfigError::InvalidDt { .. })));
    }

    #[test]
    fn add_node_configures() {
        let mut g = Graph::default();
        let id = g.add_node(Counter { log: log() }).unwrap();
        assert_eq!(g.node_state(id).unwrap(), NodeState::Configured);
        assert_eq!(g.class_name(id).unwrap(), "Counter");
        g.reset().unwrap();
        assert_eq!(g.node_state(id).unwrap(), NodeState::Active);
    }

    #[test]
    fn unconnected_input_reads_default() {
        let mut g = Graph::default();
        let r = g.add_node(Reader { log: log() }).unwrap();
        let f = g.field(r, "count").unwrap();
        assert_eq!(g.value::<i64>(f).unwrap(), -1);
    }

    #[test]
    fn downstream_observes_upstream_in_same_step() {
        let log = log();
        let mut g = Graph::default();
        // Reader added first: ordering must come from the connection.
        let r = g.add_node(Reader { log: log.clone() }).unwrap();
        let c = g.add_node(Counter { log: log.clone() }).unwrap();
        g.connect_named(c, "count", r, "count").unwrap();

        g.step().unwrap();
        g.step().unwrap();
        let seen = g.field(r, "seen").unwrap();
        assert_eq!(g.value::<i64>(seen).unwrap(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            ["counter #1", "reader #0", "counter #1", "reader #0"]
        );
    }

    #[test]
    fn connect_wrong_type_leaves_graph_unchanged() {
        struct F32Out;
        impl Node for F32Out {
            fn class_name(&self) -> &str {
                "F32Out"
            }
            fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
                fields.declare(FieldDecl::var("count", 0.0f32))?;
                Ok(())
            }
        }
        let mut g = Graph::default();
        let src = g.add_node(F32Out).unwrap();
        let dst = g.add_node(Reader { log: log() }).unwrap();
        let err = g.connect_named(src, "count", dst, "count").unwrap_err();
        assert!(matches!(err, GraphError::Field(FieldError::TypeMismatch { .. })));
        let target = g.field(dst, "count").unwrap();
        assert_eq!(g.source_of(target).unwrap(), None);
        assert!(g.sinks_of(g.field(src, "count").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn second_connection_rejected() {
        let mut g = Graph::default();
        let a = g.add_node(Counter { log: log() }).unwrap();
        let b = g.add_node(Counter { log: log() }).unwrap();
        let r = g.add_node(Reader { log: log() }).unwrap();
        g.connect_named(a, "count", r, "count").unwrap();
        let err = g.connect_named(b, "count", r, "count").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Field(FieldError::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn disconnect_restores_default() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        let r = g.add_node(Reader { log: log() }).unwrap();
        g.connect_named(c, "count", r, "count").unwrap();
        let target = g.field(r, "count").unwrap();
        g.set_value(g.field(c, "count").unwrap(), 7i64).unwrap();
        assert_eq!(g.value::<i64>(target).unwrap(), 7);

        let src = g.disconnect(target).unwrap();
        assert_eq!(src, g.field(c, "count").unwrap());
        assert_eq!(g.value::<i64>(target).unwrap(), -1);
        assert!(matches!(
            g.disconnect(target),
            Err(GraphError::Field(FieldError::NotConnected { .. }))
        ));
    }

    #[test]
    fn set_value_type_checked() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        let f = g.field(c, "count").unwrap();
        assert!(g.set_value(f, 1.0f64).is_err());
        assert_eq!(g.value::<i64>(f).unwrap(), 0);
    }

    #[test]
    fn parent_updates_before_child() {
        let log = log();
        let mut g = Graph::default();
        let child = g.add_node(Counter { log: log.clone() }).unwrap();
        let parent = g.add_node(Counter { log: log.clone() }).unwrap();
        g.add_child(parent, child).unwrap();
        assert_eq!(g.traversal_order().unwrap(), [parent, child]);
        assert_eq!(g.children(parent).unwrap(), &[child]);
        assert_eq!(g.parent(child).unwrap(), Some(parent));
    }

    #[test]
    fn cycle_detected_before_any_module_runs() {
        let log = log();
        let mut g = Graph::default();
        let a = g.add_node(Counter { log: log.clone() }).unwrap();
        let b = g.add_node(Counter { log: log.clone() }).unwrap();
        g.add_child(a, b).unwrap();
        // a keeps b as a child, so this closes a loop.
        g.add_child(b, a).unwrap();
        match g.step() {
            Err(StepError::Graph(GraphError::CyclicGraph { nodes })) => {
                assert_eq!(nodes.as_slice(), &[a, b]);
            }
            other => panic!("expected CyclicGraph, got {other:?}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_module_poisons_until_reset() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        g.push_module(c, Box::new(Failing)).unwrap();
        match g.step() {
            Err(StepError::ModuleFailed { node, module, .. }) => {
                assert_eq!(node, c);
                assert_eq!(module, "failing");
            }
            other => panic!("expected ModuleFailed, got {other:?}"),
        }
        assert!(g.is_poisoned());
        assert_eq!(g.step().unwrap_err(), StepError::ResetRequired);
        g.reset().unwrap();
        assert!(!g.is_poisoned());
    }

    #[test]
    fn clock_advances_per_step() {
        let mut g = Graph::default();
        g.add_node(Counter { log: log() }).unwrap();
        g.run(3).unwrap();
        assert_eq!(g.step_id(), StepId(3));
        assert!((g.time() - 3.0 * f64::from(0.016f32)).abs() < 1e-12);
        assert_eq!(g.last_metrics().nodes_visited(), 1);
    }

    #[test]
    fn node_scope_downcasts() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        let v = g
            .node_scope(c, |_: &mut Counter, ctx| ctx.get::<i64>("count"))
            .unwrap()
            .unwrap();
        assert_eq!(v, 0);
        assert!(matches!(
            g.node_scope(c, |_: &mut Reader, _| ()),
            Err(GraphError::NodeTypeMismatch { .. })
        ));
    }

    #[test]
    fn teardown_destroys_nodes() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        g.step().unwrap();
        g.teardown();
        assert_eq!(g.node_state(c).unwrap(), NodeState::Destroyed);
        assert!(matches!(
            g.field(c, "count"),
            Err(GraphError::NodeDestroyed { .. })
        ));
        assert_eq!(g.live_nodes().count(), 0);
        assert_eq!(g.step_id(), StepId(0));
    }

    #[test]
    fn node_added_while_running_is_reset_on_next_step() {
        let mut g = Graph::default();
        g.add_node(Counter { log: log() }).unwrap();
        g.step().unwrap();
        let late = g.add_node(Counter { log: log() }).unwrap();
        assert_eq!(g.node_state(late).unwrap(), NodeState::Configured);
        g.step().unwrap();
        assert_eq!(g.node_state(late).unwrap(), NodeState::Active);
        assert_eq!(g.value::<i64>(g.field(late, "count").unwrap()).unwrap(), 1);
    }

    #[test]
    fn writing_an_input_is_rejected() {
        let mut g = Graph::default();
        let r = g.add_node(Reader { log: log() }).unwrap();
        let res = g.node_scope(r, |_: &mut Reader, ctx| ctx.set("count", 3i64)).unwrap();
        assert!(matches!(res, Err(FieldError::ReadOnlyInput { .. })));
    }

    #[test]
    fn input_changed_tracks_source_writes() {
        let mut g = Graph::default();
        let c = g.add_node(Counter { log: log() }).unwrap();
        let r = g.add_node(Reader { log: log() }).unwrap();
        let changed = |g: &mut Graph| {
            g.node_scope(r, |_: &mut Reader, ctx| ctx.input_changed("count"))
                .unwrap()
                .unwrap()
        };
        assert!(changed(&mut g));
        assert!(!changed(&mut g));
        g.connect_named(c, "count", r, "count").unwrap();
        assert!(changed(&mut g));
        assert!(!changed(&mut g));
        g.set_value(g.field(c, "count").unwrap(), 5i64).unwrap();
        assert!(changed(&mut g));
    }
}
