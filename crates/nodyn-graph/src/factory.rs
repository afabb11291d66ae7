//! Catalog of node constructors, grouped for presentation.
//!
//! A [`NodeFactory`] holds named groups; each group lists actions that
//! construct a fresh node. Front ends (toolbars, scripting) enumerate the
//! catalog and add the produced nodes to a graph with
//! [`Graph::add_boxed`](crate::Graph::add_boxed).

use std::fmt;
use std::sync::{Mutex, OnceLock};

use indexmap::IndexMap;

use crate::node::Node;

/// Zero-argument node constructor.
pub type NodeCreator = Box<dyn Fn() -> Box<dyn Node> + Send + Sync>;

/// One catalog entry.
pub struct NodeAction {
    caption: String,
    icon: String,
    creator: NodeCreator,
}

impl NodeAction {
    /// Display caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Icon resource path.
    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// Construct a fresh node.
    pub fn create(&self) -> Box<dyn Node> {
        (self.creator)()
    }
}

impl fmt::Debug for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAction")
            .field("caption", &self.caption)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

/// A named group of actions.
#[derive(Debug)]
pub struct NodeGroup {
    caption: String,
    tooltip: String,
    icon: String,
    actions: Vec<NodeAction>,
}

impl NodeGroup {
    /// Group caption.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Tooltip text.
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    /// Icon resource path.
    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// Actions in registration order.
    pub fn actions(&self) -> &[NodeAction] {
        &self.actions
    }

    /// Register an action. Returns the group for chaining.
    pub fn add_action<F>(&mut self, caption: &str, icon: &str, creator: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Node> + Send + Sync + 'static,
    {
        self.actions.push(NodeAction {
            caption: caption.to_string(),
            icon: icon.to_string(),
            creator: Box::new(creator),
        });
        self
    }

    /// Action with the given caption.
    pub fn action(&self, caption: &str) -> Option<&NodeAction> {
        self.actions.iter().find(|a| a.caption == caption)
    }
}

/// Grouped catalog of node constructors.
#[derive(Debug, Default)]
pub struct NodeFactory {
    groups: IndexMap<String, NodeGroup>,
}

impl NodeFactory {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog.
    pub fn instance() -> &'static Mutex<NodeFactory> {
        static INSTANCE: OnceLock<Mutex<NodeFactory>> = OnceLock::new();
        INSTANCE.get_or_init(|| Mutex::new(NodeFactory::new()))
    }

    /// The group called `caption`, created with `tooltip` and `icon` if it
    /// does not exist yet.
    pub fn add_group(&mut self, caption: &str, tooltip: &str, icon: &str) -> &mut NodeGroup {
        self.groups
            .entry(caption.to_string())
            .or_insert_with(|| NodeGroup {
                caption: caption.to_string(),
                tooltip: tooltip.to_string(),
                icon: icon.to_string(),
                actions: Vec::new(),
            })
    }

    /// Group by caption.
    pub fn group(&self, caption: &str) -> Option<&NodeGroup> {
        self.groups.get(caption)
    }

    /// All groups in registration order.
    pub fn groups(&self) -> impl Iterator<Item = &NodeGroup> {
        self.groups.values()
    }

    /// Look up an action by group and action caption.
    pub fn find(&self, group: &str, action: &str) -> Option<&NodeAction> {
        self.group(group)?.action(action)
    }
}
