//! Error types for graph construction.

use super::node::{GraphId, NodeId};

/// Errors raised while building or configuring a dependency graph.
///
/// Traversals never fail: every graph that passed registration is acyclic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The handle does not name a node of this graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The handle was issued by a different graph.
    #[error("node {node} belongs to another graph (expected {graph})")]
    ForeignNode { node: NodeId, graph: GraphId },

    /// Registering `publisher` as a publisher of `subscriber` would close a cycle.
    #[error("cyclic dependency: {subscriber} is already a publisher of {publisher}")]
    Cycle { subscriber: NodeId, publisher: NodeId },

    /// The arena cannot address another node.
    #[error("graph is full ({0} nodes)")]
    CapacityExceeded(usize),

    /// A configuration document could not be parsed.
    #[error("invalid graph config: {0}")]
    Config(String),
}

/// Result alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
