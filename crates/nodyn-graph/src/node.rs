//! The [`Node`] trait and node lifecycle states.

use std::any::Any;
use std::fmt;

use nodyn_core::{FieldError, ModuleError};

use crate::context::NodeContext;
use crate::field::FieldTable;
use crate::module::Pipeline;

/// Lifecycle of a node inside a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Constructed but not yet added to a graph.
    Uninitialized,
    /// Fields declared and pipeline built; awaiting its first reset.
    Configured,
    /// Participating in traversal.
    Active,
    /// Torn down; field storage released.
    Destroyed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Configured => "configured",
            Self::Active => "active",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Downcasting support for boxed nodes.
///
/// Implemented for every `'static` type; node authors never implement it
/// by hand.
pub trait AsAny {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A simulation entity in the graph.
///
/// A node declares its fields once, when added to a graph, and builds its
/// pipeline of [`Module`](crate::Module)s. Each step the graph calls, in
/// order, [`update_topology`](Node::update_topology), every pipeline
/// module, then [`update_states`](Node::update_states).
///
/// Node-specific authoring (adding bodies, loading particles) happens on
/// the concrete type, reached through
/// [`Graph::node_scope`](crate::Graph::node_scope).
pub trait Node: AsAny + Send + 'static {
    /// Class name shown in logs and catalogs.
    fn class_name(&self) -> &str;

    /// Register this node's fields.
    fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError>;

    /// Append the node's built-in modules.
    fn build_pipeline(&self, _pipeline: &mut Pipeline) {}

    /// Bring state fields to their initial values at simulation (re)start.
    fn reset_states(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Refresh derived structure before the pipeline runs.
    ///
    /// Called every step; implementations use
    /// [`NodeContext::input_changed`] to stay idempotent when nothing
    /// upstream changed.
    fn update_topology(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Post-pipeline work for the step.
    fn update_states(&mut self, _ctx: &NodeContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Downcast a node trait object to its concrete type.
pub fn downcast_node<N: Node>(node: &dyn Node) -> Option<&N> {
    <dyn Node as AsAny>::as_any(node).downcast_ref::<N>()
}

/// Mutable variant of [`downcast_node`].
pub fn downcast_node_mut<N: Node>(node: &mut dyn Node) -> Option<&mut N> {
    <dyn Node as AsAny>::as_any_mut(node).downcast_mut::<N>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDecl;

    struct Plain;

    impl Node for Plain {
        fn class_name(&self) -> &str {
            "Plain"
        }
        fn declare_fields(&self, fields: &mut FieldTable) -> Result<(), FieldError> {
            fields.declare(FieldDecl::var("x", 0.0f32))?;
            Ok(())
        }
    }

    struct Other;

    impl Node for Other {
        fn class_name(&self) -> &str {
            "Other"
        }
        fn declare_fields(&self, _fields: &mut FieldTable) -> Result<(), FieldError> {
            Ok(())
        }
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn Node> = Box::new(Plain);
        assert!(downcast_node::<Plain>(boxed.as_ref()).is_some());
        assert!(downcast_node::<Other>(boxed.as_ref()).is_none());
    }

    #[test]
    fn state_display() {
        assert_eq!(NodeState::Active.to_string(), "active");
    }
}
