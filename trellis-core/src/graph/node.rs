//! Graph Nodes
//!
//! This module defines the handles and arena entries that live in the
//! dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::reactive::Recompute;

/// Unique identifier for a dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    /// Generate a new unique graph ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Handle to a node in a dependency graph.
///
/// A `NodeId` is an index into the graph's arena, tagged with the graph it
/// was issued by so that handles cannot silently cross graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    graph: GraphId,
    index: u32,
}

impl NodeId {
    pub(crate) fn new(graph: GraphId, index: u32) -> Self {
        Self { graph, index }
    }

    /// The graph this handle belongs to.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Position of the node in its graph's arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.graph, self.index)
    }
}

/// Staleness of a node's cached output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// The cached output reflects the current values of every publisher.
    Fresh,

    /// The cached output may be out of date. Every node starts here.
    Stale,
}

/// Publisher lists are usually short; keep them inline.
pub(crate) type Publishers = SmallVec<[NodeId; 4]>;

/// An arena entry in the dependency graph.
pub(crate) struct NodeEntry {
    /// Optional human-readable name, used in logs and snapshots.
    label: Option<String>,

    /// Current staleness.
    state: NodeState,

    /// Nodes this node reads from, in declaration order.
    publishers: Publishers,

    /// Nodes that read from this node. Registration is idempotent.
    subscribers: IndexSet<NodeId>,

    /// The node's recompute step.
    recompute: Arc<dyn Recompute>,

    /// How many times `recompute` has run.
    recompute_count: u64,
}

impl NodeEntry {
    pub(crate) fn new(
        label: Option<String>,
        publishers: Publishers,
        recompute: Arc<dyn Recompute>,
    ) -> Self {
        Self {
            label,
            state: NodeState::Stale,
            publishers,
            subscribers: IndexSet::new(),
            recompute,
            recompute_count: 0,
        }
    }

    pub(crate) fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn state(&self) -> NodeState {
        self.state
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.state == NodeState::Stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.state = NodeState::Stale;
    }

    /// Record a completed recompute.
    pub(crate) fn mark_fresh(&mut self) {
        self.state = NodeState::Fresh;
        self.recompute_count += 1;
    }

    pub(crate) fn publishers(&self) -> &[NodeId] {
        &self.publishers
    }

    pub(crate) fn push_publisher(&mut self, publisher: NodeId) {
        self.publishers.push(publisher);
    }

    pub(crate) fn subscribers(&self) -> &IndexSet<NodeId> {
        &self.subscribers
    }

    /// Returns `false` if `subscriber` was already registered.
    pub(crate) fn add_subscriber(&mut self, subscriber: NodeId) -> bool {
        self.subscribers.insert(subscriber)
    }

    pub(crate) fn recompute(&self) -> Arc<dyn Recompute> {
        Arc::clone(&self.recompute)
    }

    pub(crate) fn recompute_count(&self) -> u64 {
        self.recompute_count
    }
}

impl fmt::Debug for NodeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEntry")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("publishers", &self.publishers)
            .field("subscribers", &self.subscribers)
            .field("recompute_count", &self.recompute_count)
            .finish()
    }
}
