//! Graph Runtime
//!
//! The runtime is the central coordinator that connects typed nodes to the
//! dependency graph. It owns the node arena and runs the two sweeps:
//!
//! 1. When an input reports a change, the runtime marks the input and its
//!    downstream closure stale. Nothing is recomputed yet.
//!
//! 2. When an output is read, the runtime asks the scheduler for the stale
//!    nodes the read depends on, recomputes them publishers first, and marks
//!    each one fresh.
//!
//! # Thread Safety
//!
//! A [`Graph`] is a cheap handle and may be shared across threads. All graph
//! state sits behind one re-entrant lock which is held for the whole of a
//! sweep, so sweeps never interleave. The lock is re-entrant because a
//! recompute reads its publishers through their getters, which re-enter the
//! runtime on the same thread.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, trace, warn};

use super::context::RecomputeContext;
use super::recompute::Recompute;
use crate::graph::{
    ExtendOutcome, ExtendPolicy, GraphConfig, GraphId, GraphSnapshot, NodeId, NodeState, Result,
    UpdateScheduler,
};

struct GraphShared {
    id: GraphId,
    config: GraphConfig,
    scheduler: ReentrantMutex<RefCell<UpdateScheduler>>,
}

type SchedulerGuard<'a> = ReentrantMutexGuard<'a, RefCell<UpdateScheduler>>;

/// A push-invalidate / pull-update dependency graph.
///
/// Cloning a `Graph` yields another handle to the same graph.
#[derive(Clone)]
pub struct Graph {
    shared: Arc<GraphShared>,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph.
    pub fn with_config(config: GraphConfig) -> Self {
        let id = GraphId::new();
        let scheduler = UpdateScheduler::new(id, config.initial_capacity);
        Self {
            shared: Arc::new(GraphShared {
                id,
                config,
                scheduler: ReentrantMutex::new(RefCell::new(scheduler)),
            }),
        }
    }

    /// The graph's unique ID. Every [`NodeId`] it issues carries it.
    pub fn id(&self) -> GraphId {
        self.shared.id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.shared.config
    }

    fn lock(&self) -> SchedulerGuard<'_> {
        self.shared.scheduler.lock()
    }

    /// Add a node that reads from `publishers`.
    ///
    /// The node starts stale; its first read runs `recompute`. Publishers
    /// must already exist in this graph.
    pub fn add_node(
        &self,
        publishers: &[NodeId],
        recompute: Arc<dyn Recompute>,
    ) -> Result<NodeHandle> {
        self.insert(None, publishers, recompute)
    }

    /// Like [`add_node`](Self::add_node), with a name for logs and snapshots.
    pub fn add_labeled_node(
        &self,
        label: impl Into<String>,
        publishers: &[NodeId],
        recompute: Arc<dyn Recompute>,
    ) -> Result<NodeHandle> {
        self.insert(Some(label.into()), publishers, recompute)
    }

    fn insert(
        &self,
        label: Option<String>,
        publishers: &[NodeId],
        recompute: Arc<dyn Recompute>,
    ) -> Result<NodeHandle> {
        let guard = self.lock();
        let id = guard.borrow_mut().add_node(label, publishers, recompute)?;
        trace!(node = %id, publishers = publishers.len(), "added node");
        Ok(NodeHandle {
            graph: self.clone(),
            id,
        })
    }

    /// Declare more publishers for an existing node.
    ///
    /// Rejected with [`GraphError::Cycle`](crate::graph::GraphError::Cycle)
    /// if any addition would make the graph cyclic, in which case nothing is
    /// changed. What happens to the node's staleness is decided by the
    /// graph's [`ExtendPolicy`].
    pub fn extend_publishers(&self, node: NodeId, additional: &[NodeId]) -> Result<ExtendOutcome> {
        let guard = self.lock();
        let outcome = guard.borrow_mut().extend_publishers(node, additional)?;

        if self.shared.config.extend_policy == ExtendPolicy::Invalidate && outcome.added > 0 {
            let marked = guard.borrow_mut().mark_stale(node)?;
            debug!(node = %node, marked, "invalidated extended node");
        }

        Ok(outcome)
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.lock().borrow().node_count()
    }

    pub fn state(&self, node: NodeId) -> Result<NodeState> {
        self.lock().borrow().state(node)
    }

    pub fn is_stale(&self, node: NodeId) -> Result<bool> {
        Ok(self.state(node)? == NodeState::Stale)
    }

    /// Declared publishers of `node`, in declaration order.
    pub fn publishers(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.lock().borrow().publishers(node)
    }

    /// Subscribers of `node`, in registration order.
    pub fn subscribers(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.lock().borrow().subscribers(node)
    }

    pub fn label(&self, node: NodeId) -> Result<Option<String>> {
        Ok(self.lock().borrow().entry(node)?.label().map(str::to_owned))
    }

    /// How many times `node` has recomputed.
    pub fn recompute_count(&self, node: NodeId) -> Result<u64> {
        Ok(self.lock().borrow().entry(node)?.recompute_count())
    }

    /// Dump the graph's shape and node states.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.lock().borrow().snapshot()
    }

    /// Mark `node` and everything downstream of it stale.
    fn invalidate(&self, node: NodeId) {
        let guard = self.lock();
        let result = guard.borrow_mut().mark_stale(node);
        match result {
            Ok(0) => {}
            Ok(marked) => debug!(node = %node, marked, "invalidated"),
            Err(err) => warn!(node = %node, %err, "invalidate on a node outside the graph"),
        }
    }

    /// Recompute whatever `node` needs so that it is fresh.
    fn ensure_fresh(&self, node: NodeId) {
        let guard = self.lock();

        let plan = match guard.borrow().refresh_plan(node) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(node = %node, %err, "refresh of a node outside the graph");
                return;
            }
        };
        if plan.is_empty() {
            return;
        }

        debug!(node = %node, stale = plan.len(), "refreshing");
        for id in plan {
            self.run_recompute(&guard, id);
        }
    }

    fn run_recompute(&self, guard: &SchedulerGuard<'_>, id: NodeId) {
        // A recompute that reads outside its declared publishers may already
        // have refreshed this node through a nested sweep.
        let recompute = match guard.borrow().entry(id) {
            Ok(entry) if entry.is_stale() => entry.recompute(),
            _ => return,
        };

        trace!(node = %id, "recompute");
        {
            let _ctx = RecomputeContext::enter(id);
            recompute.recompute();
        }

        let result = guard.borrow_mut().mark_fresh(id);
        if let Err(err) = result {
            warn!(node = %id, %err, "lost track of recomputed node");
        }
    }

    /// Warn if the running recompute reads a node it never declared.
    fn check_declared_read(&self, node: NodeId) {
        if !self.shared.config.warn_undeclared_reads {
            return;
        }
        let Some(reader) = RecomputeContext::current() else {
            return;
        };
        if reader == node || reader.graph() != self.shared.id {
            return;
        }

        let declared = self
            .lock()
            .borrow()
            .entry(reader)
            .map(|entry| entry.publishers().contains(&node))
            .unwrap_or(true);
        if !declared {
            warn!(
                reader = %reader,
                node = %node,
                "recompute read a node that is not one of its publishers; its changes will not invalidate the reader"
            );
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.shared.id)
            .field("node_count", &self.node_count())
            .finish()
    }
}

/// A node's connection to its graph.
///
/// Concrete node types hold one of these and route their accessors through
/// it: setters through [`report_changed`](Self::report_changed) or
/// [`update_input`](Self::update_input), getters through
/// [`read_with_freshness`](Self::read_with_freshness).
#[derive(Clone)]
pub struct NodeHandle {
    graph: Graph,
    id: NodeId,
}

impl NodeHandle {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Input side of the accessor contract.
    ///
    /// Invalidates this node and its downstream closure when `changed` is
    /// true. Returns `changed`.
    pub fn report_changed(&self, changed: bool) -> bool {
        if changed {
            if let Some(reader) = RecomputeContext::current() {
                warn!(
                    reader = %reader,
                    node = %self.id,
                    "input changed during a recompute"
                );
            }
            self.graph.invalidate(self.id);
        }
        changed
    }

    /// Invalidate unconditionally.
    pub fn report_changed_always(&self) {
        self.report_changed(true);
    }

    /// Apply a write and report whether it changed the value.
    ///
    /// The graph lock is held across `write` and the invalidation, so no
    /// sweep on another thread observes the new value before its dependents
    /// are marked stale.
    pub fn update_input<F>(&self, write: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let _guard = self.graph.lock();
        let changed = write();
        self.report_changed(changed)
    }

    /// Output side of the accessor contract.
    ///
    /// Makes this node fresh, recomputing whatever is stale upstream, then
    /// runs `read` and returns its result.
    pub fn read_with_freshness<T, F>(&self, read: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.graph.check_declared_read(self.id);
        let _guard = self.graph.lock();
        self.graph.ensure_fresh(self.id);
        read()
    }

    pub fn is_stale(&self) -> bool {
        self.graph.is_stale(self.id).unwrap_or(true)
    }

    pub fn recompute_count(&self) -> u64 {
        self.graph.recompute_count(self.id).unwrap_or(0)
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("stale", &self.is_stale())
            .finish()
    }
}
