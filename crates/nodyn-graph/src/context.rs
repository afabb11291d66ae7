//! Per-node field access during hooks and module execution.
//!
//! [`NodeContext`] is handed to every lifecycle hook and pipeline module.
//! It scopes field access to one node: reads of inputs resolve through the
//! input's connection to the upstream value (pull semantics, no cached
//! copies), writes go to the node's own output and state fields.

use std::any::Any;
use std::cell::{Ref, RefMut};

use nodyn_core::{FieldDescriptor, FieldError, NodeId, StepId};

use crate::config::SceneConfig;
use crate::field::{resolve, FieldTable};

/// Field access and step timing for one node.
pub struct NodeContext<'g> {
    node: NodeId,
    tables: &'g [FieldTable],
    config: &'g SceneConfig,
    time: f64,
    step: StepId,
}

impl<'g> NodeContext<'g> {
    pub(crate) fn new(
        node: NodeId,
        tables: &'g [FieldTable],
        config: &'g SceneConfig,
        time: f64,
        step: StepId,
    ) -> Self {
        Self {
            node,
            tables,
            config,
            time,
            step,
        }
    }

    /// The node being updated.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Scene configuration of the owning graph.
    pub fn config(&self) -> &'g SceneConfig {
        self.config
    }

    /// Configured time step in seconds.
    pub fn dt(&self) -> f32 {
        self.config.dt
    }

    /// Simulated time at the start of the current step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Index of the step in progress.
    pub fn step_id(&self) -> StepId {
        self.step
    }

    fn table(&self) -> Result<&'g FieldTable, FieldError> {
        self.tables
            .get(self.node.index())
            .ok_or_else(|| FieldError::UnknownField {
                name: format!("{}.*", self.node),
            })
    }

    /// Descriptor of one of this node's fields.
    pub fn descriptor(&self, name: &str) -> Result<&'g FieldDescriptor, FieldError> {
        Ok(&self.table()?.slot(name)?.descriptor)
    }

    /// Shared borrow of a field's current value.
    ///
    /// Connected inputs resolve to the upstream value; unconnected inputs
    /// yield their declared default.
    pub fn read<T: Any>(&self, name: &str) -> Result<Ref<'g, T>, FieldError> {
        let own = self.table()?.slot(name)?;
        let slot = resolve(self.tables, own)?;
        if slot.descriptor.value_type != own.descriptor.value_type {
            return Err(FieldError::TypeMismatch {
                field: own.descriptor.name.clone(),
                expected: own.descriptor.value_type.name(),
                found: slot.descriptor.value_type.name(),
            });
        }
        slot.borrow::<T>()
    }

    /// Copy of a field's current value.
    pub fn get<T: Any + Clone>(&self, name: &str) -> Result<T, FieldError> {
        self.read::<T>(name).map(|v| v.clone())
    }

    /// Mutable borrow of an output or state field.
    ///
    /// Counts as a write: downstream inputs observe the change on their
    /// next read. Inputs are owned by their source and are rejected with
    /// [`FieldError::ReadOnlyInput`].
    pub fn write<T: Any>(&self, name: &str) -> Result<RefMut<'g, T>, FieldError> {
        let slot = self.table()?.slot(name)?;
        if slot.descriptor.kind.is_input() {
            return Err(FieldError::ReadOnlyInput {
                name: name.to_string(),
            });
        }
        slot.borrow_mut::<T>()
    }

    /// Replace the value of an output or state field.
    pub fn set<T: Any>(&self, name: &str, value: T) -> Result<(), FieldError> {
        *self.write::<T>(name)? = value;
        Ok(())
    }

    /// Whether an input currently has an upstream source.
    pub fn is_connected(&self, name: &str) -> Result<bool, FieldError> {
        Ok(self.table()?.slot(name)?.source.is_some())
    }

    /// Whether the value seen through `name` changed since this node last
    /// asked. The first call, and the first call after a connection
    /// change, report `true`.
    pub fn input_changed(&self, name: &str) -> Result<bool, FieldError> {
        let own = self.table()?.slot(name)?;
        let version = resolve(self.tables, own)?.version();
        Ok(own.observe(version))
    }
}
