//! The active-graph stack.
//!
//! Scenes are built on "the current graph". Rather than a hidden global
//! singleton, the current graph is the top of an explicit [`GraphStack`];
//! a process-wide stack is available through [`GraphStack::global`] for
//! applications that want one.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use nodyn_core::GraphError;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SceneConfig};
use crate::graph::Graph;

/// A graph shared between the stack and its users.
pub type SharedGraph = Arc<Mutex<Graph>>;

type Creator = Box<dyn Fn() -> Graph + Send + Sync>;

/// A stack of graphs whose top is the active graph.
#[derive(Default)]
pub struct GraphStack {
    graphs: Vec<SharedGraph>,
    default_creator: Option<Creator>,
}

impl GraphStack {
    /// An empty stack with no default creator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide stack.
    pub fn global() -> &'static Mutex<GraphStack> {
        static GLOBAL: OnceLock<Mutex<GraphStack>> = OnceLock::new();
        GLOBAL.get_or_init(|| Mutex::new(GraphStack::new()))
    }

    /// Create a graph from `config`, push it, and return it.
    pub fn create_scene(&mut self, config: SceneConfig) -> Result<SharedGraph, ConfigError> {
        let graph = Arc::new(Mutex::new(Graph::new(config)?));
        self.push(graph.clone());
        Ok(graph)
    }

    /// Make `graph` the active graph.
    pub fn push(&mut self, graph: SharedGraph) {
        if let Ok(g) = graph.lock() {
            debug!(graph = %g.id(), depth = self.graphs.len() + 1, "graph pushed");
        }
        self.graphs.push(graph);
    }

    /// Remove and return the active graph; the one below becomes active.
    pub fn pop(&mut self) -> Option<SharedGraph> {
        self.graphs.pop()
    }

    /// The active graph.
    ///
    /// If the stack is empty and a default creator is set, a graph is
    /// created with it and pushed. Otherwise fails with
    /// [`GraphError::NoActiveGraph`].
    pub fn active(&mut self) -> Result<SharedGraph, GraphError> {
        if self.graphs.is_empty() {
            let creator = self.default_creator.as_ref().ok_or(GraphError::NoActiveGraph)?;
            let graph = Arc::new(Mutex::new(creator()));
            self.push(graph);
        }
        self.graphs.last().cloned().ok_or(GraphError::NoActiveGraph)
    }

    /// Set the constructor used by [`active`](GraphStack::active) when the
    /// stack is empty.
    pub fn set_default_creator(&mut self, creator: impl Fn() -> Graph + Send + Sync + 'static) {
        self.default_creator = Some(Box::new(creator));
    }

    /// Number of graphs on the stack.
    pub fn depth(&self) -> usize {
        self.graphs.len()
    }

    /// Tear down and drop every graph on the stack.
    pub fn clear(&mut self) {
        let count = self.graphs.len();
        for graph in self.graphs.drain(..) {
            match graph.lock() {
                Ok(mut g) => g.teardown(),
                Err(_) => warn!("graph mutex poisoned; dropping without teardown"),
            }
        }
        info!(graphs = count, "graph stack cleared");
    }
}

impl fmt::Debug for GraphStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStack")
            .field("depth", &self.graphs.len())
            .field("default_creator", &self.default_creator.is_some())
            .finish()
    }
}
