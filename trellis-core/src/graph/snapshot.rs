//! Serializable dumps of a graph's shape and state.

use serde::{Deserialize, Serialize};

use super::node::{GraphId, NodeId, NodeState};

/// Point-in-time view of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub state: NodeState,
    pub publishers: Vec<NodeId>,
    pub subscribers: Vec<NodeId>,
    pub recompute_count: u64,
}

/// Point-in-time view of a whole graph, in arena order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub graph: GraphId,
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    /// Nodes whose cached output may be out of date.
    pub fn stale_nodes(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes.iter().filter(|n| n.state == NodeState::Stale)
    }

    /// Look a node up by its handle.
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.get(id.index()).filter(|n| n.id == id)
    }

    /// Pretty-printed JSON, for debugging and logs.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
