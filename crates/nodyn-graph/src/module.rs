//! Pipeline modules: the per-step computation units of a node.

use nodyn_core::ModuleError;

use crate::context::NodeContext;

/// A computation unit executed once per step inside a node's pipeline.
///
/// Modules hold no field storage of their own; they read and write the
/// owning node's fields through the [`NodeContext`]. Per-element work is
/// expected to go through the parallel passes of
/// [`DeviceArray`](nodyn_array::DeviceArray).
///
/// # Object safety
///
/// Used as `Box<dyn Module>`; modules must be `Send` so the graph can move
/// between threads.
pub trait Module: Send {
    /// Human-readable name for logging and error reports.
    fn name(&self) -> &str;

    /// Called once per module at simulation (re)start, after the owning
    /// node's `reset_states`.
    fn initialize(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Advance the node's state by one step.
    fn execute(&mut self, ctx: &NodeContext<'_>) -> Result<(), ModuleError>;
}

/// An ordered list of modules executed in declaration order.
#[derive(Default)]
pub struct Pipeline {
    modules: Vec<Box<dyn Module>>,
}

impl Pipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module to the end of the pipeline.
    pub fn push(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the pipeline has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Module>> {
        self.modules.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Module for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn execute(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[test]
    fn modules_keep_push_order() {
        let mut p = Pipeline::new();
        p.push(Box::new(Named("integrate")));
        p.push(Box::new(Named("constrain")));
        assert_eq!(p.names(), ["integrate", "constrain"]);
        assert_eq!(p.len(), 2);
    }
}
