//! Update Scheduler
//!
//! The scheduler owns the node arena and decides which nodes change state,
//! and in which order stale nodes recompute. It never runs user code itself;
//! the [`Graph`](crate::reactive::Graph) drives recomputation from the plans
//! produced here.
//!
//! # Algorithm
//!
//! Invalidation (forward, toward subscribers):
//!
//! 1. If the changed node is already stale, stop. A stale node's subscribers
//!    are stale too, so there is nothing left to do.
//! 2. Otherwise mark it stale and push its subscribers onto a worklist.
//! 3. Repeat until the worklist is empty. The stale flag doubles as the
//!    visited set, so diamonds are walked once.
//!
//! Refresh (backward, toward publishers):
//!
//! 1. Starting from the read node, walk stale publishers depth-first in
//!    declaration order with an explicit stack.
//! 2. Emit each node after all of its stale publishers (post-order). Fresh
//!    publishers are not descended into.
//! 3. Each node appears in the plan at most once, so a node reachable along
//!    several paths recomputes once per sweep.
//!
//! Both walks use heap-allocated worklists, so graph depth is bounded by
//! memory rather than by the call stack.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use super::error::{GraphError, Result};
use super::node::{GraphId, NodeEntry, NodeId, NodeState, Publishers};
use super::snapshot::{GraphSnapshot, NodeSnapshot};
use crate::reactive::Recompute;

/// Outcome of [`UpdateScheduler::extend_publishers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendOutcome {
    /// Publishers that were not already declared.
    pub added: usize,

    /// A stale publisher was attached to a fresh node. Without a later
    /// invalidation of the extended node, changes to that publisher will not
    /// reach it.
    pub stale_publisher_on_fresh_node: bool,
}

/// The arena of nodes and the traversal algorithms over it.
pub struct UpdateScheduler {
    /// The graph every handle in this arena is tagged with.
    id: GraphId,

    /// All nodes, indexed by `NodeId::index`.
    nodes: Vec<NodeEntry>,
}

impl UpdateScheduler {
    /// Create an empty scheduler for the given graph.
    pub fn new(id: GraphId, capacity: usize) -> Self {
        Self {
            id,
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Validate that `node` names an entry of this arena.
    pub fn check(&self, node: NodeId) -> Result<()> {
        if node.graph() != self.id {
            return Err(GraphError::ForeignNode {
                node,
                graph: self.id,
            });
        }
        if node.index() >= self.nodes.len() {
            return Err(GraphError::UnknownNode(node));
        }
        Ok(())
    }

    pub(crate) fn entry(&self, node: NodeId) -> Result<&NodeEntry> {
        self.check(node)?;
        Ok(&self.nodes[node.index()])
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry> {
        self.check(node)?;
        Ok(&mut self.nodes[node.index()])
    }

    /// Add a node that reads from `publishers`.
    ///
    /// The new node starts stale and is registered as a subscriber of each
    /// publisher. A brand new node has no subscribers, so this cannot form a
    /// cycle.
    pub(crate) fn add_node(
        &mut self,
        label: Option<String>,
        publishers: &[NodeId],
        recompute: Arc<dyn Recompute>,
    ) -> Result<NodeId> {
        for &publisher in publishers {
            self.check(publisher)?;
        }

        let index = u32::try_from(self.nodes.len())
            .map_err(|_| GraphError::CapacityExceeded(self.nodes.len()))?;
        let id = NodeId::new(self.id, index);

        let declared: Publishers = publishers.iter().copied().collect();
        self.nodes.push(NodeEntry::new(label, declared, recompute));

        for &publisher in publishers {
            self.nodes[publisher.index()].add_subscriber(id);
        }

        Ok(id)
    }

    /// Append publishers to an existing node.
    ///
    /// Every addition is validated before anything is mutated: on error the
    /// graph is unchanged. Publishers the node already declares are skipped.
    pub(crate) fn extend_publishers(
        &mut self,
        node: NodeId,
        additional: &[NodeId],
    ) -> Result<ExtendOutcome> {
        self.check(node)?;
        for &publisher in additional {
            self.check(publisher)?;
            if self.reaches_publisher(publisher, node) {
                return Err(GraphError::Cycle {
                    subscriber: node,
                    publisher,
                });
            }
        }

        let mut outcome = ExtendOutcome::default();
        let node_is_fresh = !self.nodes[node.index()].is_stale();

        for &publisher in additional {
            if self.nodes[node.index()].publishers().contains(&publisher) {
                continue;
            }
            self.nodes[node.index()].push_publisher(publisher);
            self.nodes[publisher.index()].add_subscriber(node);
            outcome.added += 1;

            if node_is_fresh && self.nodes[publisher.index()].is_stale() {
                outcome.stale_publisher_on_fresh_node = true;
            }
        }

        if outcome.stale_publisher_on_fresh_node {
            warn!(
                node = %node,
                "attached a stale publisher to a fresh node; its changes will not propagate until the node is invalidated"
            );
        }

        Ok(outcome)
    }

    /// Whether `target` is reachable from `start` along publisher edges,
    /// `start` itself included.
    fn reaches_publisher(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.extend(self.nodes[node.index()].publishers().iter().copied());
        }

        false
    }

    /// Mark `start` and its downstream closure stale.
    ///
    /// Returns the number of nodes that changed from fresh to stale.
    pub(crate) fn mark_stale(&mut self, start: NodeId) -> Result<usize> {
        self.check(start)?;

        let mut marked = 0;
        let mut worklist = vec![start];

        while let Some(node) = worklist.pop() {
            let entry = &mut self.nodes[node.index()];
            if entry.is_stale() {
                continue;
            }
            entry.mark_stale();
            marked += 1;
            worklist.extend(entry.subscribers().iter().copied());
        }

        Ok(marked)
    }

    /// Stale nodes that must recompute before `start` is fresh, publishers
    /// first. Empty if `start` is already fresh.
    pub(crate) fn refresh_plan(&self, start: NodeId) -> Result<Vec<NodeId>> {
        if !self.entry(start)?.is_stale() {
            return Ok(Vec::new());
        }

        let mut plan = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(start);

        // Each frame is a node and the position of the next publisher to visit.
        let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            match self.nodes[node.index()].publishers().get(cursor) {
                Some(&publisher) => {
                    frame.1 += 1;
                    if self.nodes[publisher.index()].is_stale() && visited.insert(publisher) {
                        stack.push((publisher, 0));
                    }
                }
                None => {
                    stack.pop();
                    plan.push(node);
                }
            }
        }

        Ok(plan)
    }

    /// Record that `node` finished recomputing.
    pub(crate) fn mark_fresh(&mut self, node: NodeId) -> Result<()> {
        self.entry_mut(node)?.mark_fresh();
        Ok(())
    }

    /// Current state of `node`.
    pub fn state(&self, node: NodeId) -> Result<NodeState> {
        Ok(self.entry(node)?.state())
    }

    /// Declared publishers of `node`, in order.
    pub fn publishers(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.entry(node)?.publishers().to_vec())
    }

    /// Registered subscribers of `node`, in registration order.
    pub fn subscribers(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.entry(node)?.subscribers().iter().copied().collect())
    }

    /// Dump the graph shape and node states.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, entry)| NodeSnapshot {
                id: NodeId::new(self.id, index as u32),
                label: entry.label().map(str::to_owned),
                state: entry.state(),
                publishers: entry.publishers().to_vec(),
                subscribers: entry.subscribers().iter().copied().collect(),
                recompute_count: entry.recompute_count(),
            })
            .collect();

        GraphSnapshot {
            graph: self.id,
            nodes,
        }
    }
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("id", &self.id)
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> UpdateScheduler {
        UpdateScheduler::new(GraphId::new(), 0)
    }

    fn add(scheduler: &mut UpdateScheduler, publishers: &[NodeId]) -> NodeId {
        scheduler.add_node(None, publishers, Arc::new(|| {})).unwrap()
    }

    fn refresh_all(scheduler: &mut UpdateScheduler, node: NodeId) -> Vec<NodeId> {
        let plan = scheduler.refresh_plan(node).unwrap();
        for &id in &plan {
            scheduler.mark_fresh(id).unwrap();
        }
        plan
    }

    #[test]
    fn add_node_registers_subscribers() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a, a]);

        assert_eq!(scheduler.node_count(), 2);
        assert_eq!(scheduler.subscribers(a).unwrap(), vec![b]);
        assert_eq!(scheduler.publishers(b).unwrap(), vec![a, a]);
        assert_eq!(scheduler.state(b).unwrap(), NodeState::Stale);
    }

    #[test]
    fn rejects_foreign_and_unknown_nodes() {
        let mut first = scheduler();
        let mut second = scheduler();
        let foreign = add(&mut second, &[]);

        let err = first.add_node(None, &[foreign], Arc::new(|| {})).unwrap_err();
        assert!(matches!(err, GraphError::ForeignNode { .. }));

        let unknown = NodeId::new(first.id, 3);
        assert_eq!(first.state(unknown), Err(GraphError::UnknownNode(unknown)));
        assert_eq!(first.node_count(), 0);
    }

    #[test]
    fn refresh_plan_is_publisher_first() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a]);
        let c = add(&mut scheduler, &[b]);

        assert_eq!(refresh_all(&mut scheduler, c), vec![a, b, c]);
        assert!(scheduler.refresh_plan(c).unwrap().is_empty());
    }

    #[test]
    fn refresh_plan_skips_fresh_publishers() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a]);
        let c = add(&mut scheduler, &[b]);
        refresh_all(&mut scheduler, c);

        scheduler.mark_stale(b).unwrap();
        assert_eq!(scheduler.refresh_plan(c).unwrap(), vec![b, c]);
    }

    #[test]
    fn diamond_visits_shared_node_once() {
        let mut scheduler = scheduler();
        let root = add(&mut scheduler, &[]);
        let p1 = add(&mut scheduler, &[root]);
        let p2 = add(&mut scheduler, &[root]);
        let sink = add(&mut scheduler, &[p1, p2]);

        let plan = refresh_all(&mut scheduler, sink);
        assert_eq!(plan, vec![root, p1, p2, sink]);

        assert_eq!(scheduler.mark_stale(root).unwrap(), 4);
        assert_eq!(scheduler.mark_stale(root).unwrap(), 0);
    }

    #[test]
    fn mark_stale_stops_at_stale_nodes() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a]);
        refresh_all(&mut scheduler, b);

        assert_eq!(scheduler.mark_stale(b).unwrap(), 1);
        assert_eq!(scheduler.state(a).unwrap(), NodeState::Fresh);
        assert_eq!(scheduler.mark_stale(a).unwrap(), 1);
    }

    #[test]
    fn extend_rejects_cycles_without_mutating() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a]);
        let c = add(&mut scheduler, &[b]);
        let d = add(&mut scheduler, &[]);

        let err = scheduler.extend_publishers(a, &[d, c]).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle {
                subscriber: a,
                publisher: c
            }
        );
        assert!(scheduler.publishers(a).unwrap().is_empty());
        assert!(scheduler.subscribers(d).unwrap().is_empty());

        let err = scheduler.extend_publishers(a, &[a]).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn extend_appends_and_reports_hazard() {
        let mut scheduler = scheduler();
        let a = add(&mut scheduler, &[]);
        let b = add(&mut scheduler, &[a]);
        refresh_all(&mut scheduler, b);
        let late = add(&mut scheduler, &[]);

        let outcome = scheduler.extend_publishers(b, &[late, a]).unwrap();
        assert_eq!(outcome.added, 1);
        assert!(outcome.stale_publisher_on_fresh_node);
        assert_eq!(scheduler.publishers(b).unwrap(), vec![a, late]);
        assert_eq!(scheduler.subscribers(late).unwrap(), vec![b]);
        assert_eq!(scheduler.state(b).unwrap(), NodeState::Fresh);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut scheduler = scheduler();
        let mut last = add(&mut scheduler, &[]);
        let first = last;
        for _ in 0..50_000 {
            last = add(&mut scheduler, &[last]);
        }

        assert_eq!(refresh_all(&mut scheduler, last).len(), 50_001);
        assert_eq!(scheduler.mark_stale(first).unwrap(), 50_001);
    }

    #[test]
    fn snapshot_reflects_shape() {
        let mut scheduler = scheduler();
        let a = scheduler.add_node(Some("a".into()), &[], Arc::new(|| {})).unwrap();
        let b = add(&mut scheduler, &[a]);

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].label.as_deref(), Some("a"));
        assert_eq!(snapshot.nodes[0].subscribers, vec![b]);
        assert_eq!(snapshot.nodes[1].publishers, vec![a]);
    }
}
