//! Reusable node and module fixtures.
//!
//! - [`SourceNode`]: publishes a counter and a device array each step.
//! - [`SinkNode`]: copies whatever its inputs resolve to.
//! - [`IndexSinkNode`]: an integer array input and nothing else.
//! - [`RecordingModule`]: appends an entry to a shared log per call.
//! - [`FailingModule`]: fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nodyn_array::DeviceArray;
use nodyn_core::{FieldError, ModuleError};
use nodyn_graph::{FieldDecl, FieldTable, Module, Node, NodeContext};

/// Shared, append-only event log.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// A fresh empty log.
pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &EventLog, entry: String) {
    if let Ok(mut l) = log.lock() {
        l.push(entry);
    }
}

/// Publishes `value: f32` (a `Var`) and `values: DeviceArray<f32>` (an
/// `ArrayState` of `len` elements).
///
/// `reset_states` zeroes both; each step `update_states` adds one to
/// `value` and fills `values` with it.
pub struct SourceNode {
    pub len: usize,
    pub log: Option<EventLog>,
}

impl SourceNode {
    pub fn new(len: usize) -> Self {
        Self { len, log: None }
    }

    pub fn logged(len: usize, log: EventLog) -> Self {
        Self {
            len,
            log: Some(log),
        }
    }
}

impl Node for SourceNode {
    fn class_name(&self) -> &str {
        "SourceNode"
    }

    fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
        fields.declare(FieldDecl::var("value", 0.0f32))?;
        fields.declare(FieldDecl::array_state::<f32>("values"))?;
        Ok(())
    }

    fn reset_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        ctx.set("value", 0.0f32)?;
        ctx.write::<DeviceArray<f32>>("values")?.fill_new(self.len, 0.0);
        Ok(())
    }

    fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let v = {
            let mut value = ctx.write::<f32>("value")?;
            *value += 1.0;
            *value
        };
        ctx.write::<DeviceArray<f32>>("values")?
            .par_for_each_mut(|_, x| *x = v);
        if let Some(log) = &self.log {
            record(log, format!("source {}", ctx.node()));
        }
        Ok(())
    }
}

/// Mirrors its inputs: `value: f32` (`VarIn`, default `-1`) and
/// `values: DeviceArray<f32>` (`ArrayIn`) into `observed` and
/// `observed_sum`.
pub struct SinkNode {
    pub log: Option<EventLog>,
}

impl SinkNode {
    pub fn new() -> Self {
        Self { log: None }
    }

    pub fn logged(log: EventLog) -> Self {
        Self { log: Some(log) }
    }
}

impl Default for SinkNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for SinkNode {
    fn class_name(&self) -> &str {
        "SinkNode"
    }

    fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
        fields.declare(FieldDecl::var_in("value", -1.0f32))?;
        fields.declare(FieldDecl::array_in::<f32>("values"))?;
        fields.declare(FieldDecl::var("observed", f32::NAN))?;
        fields.declare(FieldDecl::var("observed_sum", 0.0f32))?;
        Ok(())
    }

    fn update_states(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let v = ctx.get::<f32>("value")?;
        let sum: f32 = ctx.read::<DeviceArray<f32>>("values")?.iter().sum();
        ctx.set("observed", v)?;
        ctx.set("observed_sum", sum)?;
        if let Some(log) = &self.log {
            record(log, format!("sink {}", ctx.node()));
        }
        Ok(())
    }
}

/// Declares a single `indices: DeviceArray<i32>` (`ArrayIn`) and does
/// nothing else.
#[derive(Default)]
pub struct IndexSinkNode;

impl Node for IndexSinkNode {
    fn class_name(&self) -> &str {
        "IndexSinkNode"
    }

    fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
        fields.declare(FieldDecl::array_in::<i32>("indices"))?;
        Ok(())
    }
}

/// Appends `"init <name>"` on initialize and `"<name> <node>@<step>"` on
/// every execute.
pub struct RecordingModule {
    pub name: String,
    pub log: EventLog,
}

impl RecordingModule {
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

impl Module for RecordingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        record(&self.log, format!("init {}", self.name));
        Ok(())
    }

    fn execute(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        record(
            &self.log,
            format!("{} {}@{}", self.name, ctx.node(), ctx.step_id()),
        );
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful calls.
///
/// The call counter is shared through an `Arc` so tests can inspect it
/// after the module moved into a pipeline.
pub struct FailingModule {
    pub name: String,
    pub succeed_count: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingModule {
    /// A module that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            succeed_count,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the call counter.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(ModuleError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(())
    }
}
