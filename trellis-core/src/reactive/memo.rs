//! Derived Nodes
//!
//! A [`Derived`] is a cached value computed from its publishers.
//!
//! # How Derived Nodes Work
//!
//! 1. On creation the node is stale and nothing is computed.
//!
//! 2. On first read, every stale publisher is refreshed, then the compute
//!    function runs and its result is cached.
//!
//! 3. Further reads return the cache until a publisher is invalidated.
//!
//! 4. Invalidation only flips the stale flag; the next read recomputes.
//!
//! # Why This Matters
//!
//! Work is proportional to what is read, not to what changed:
//!
//! - An input changes
//! - 10 derived nodes depend on it
//! - Only the ones actually read will recompute
//! - The rest stay stale (no wasted work)
//!
//! The compute function must declare every node it reads as a publisher;
//! the graph only invalidates along declared edges.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::{Graph, NodeHandle};
use crate::graph::{NodeId, Result};

/// A cached derived value that recomputes only when a publisher changes.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Derived, Graph, Input};
///
/// let graph = Graph::new();
/// let a = Input::new(&graph, 3.0_f64).unwrap();
/// let b = Input::new(&graph, 5.3).unwrap();
///
/// let (a2, b2) = (a.clone(), b.clone());
/// let sum = Derived::new(&graph, &[a.id(), b.id()], move || a2.get() + b2.get()).unwrap();
///
/// assert!((sum.get() - 8.3).abs() < 1e-9);
/// a.set(5.0);
/// assert!((sum.get() - 10.3).abs() < 1e-9);
/// ```
///
/// Only inputs invalidate. A derived node keeps its handle to itself:
///
/// ```compile_fail
/// use trellis_core::reactive::{Derived, Graph};
///
/// let graph = Graph::new();
/// let constant = Derived::new(&graph, &[], || 1).unwrap();
/// constant.handle().report_changed_always();
/// ```
pub struct Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The node's place in the graph.
    handle: NodeHandle,

    /// The cached value (None if never computed).
    value: Arc<RwLock<Option<T>>>,
}

impl<T> Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a derived node reading from `publishers`.
    ///
    /// The computation is not run immediately. It runs on first read.
    pub fn new<F>(graph: &Graph, publishers: &[NodeId], compute: F) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(graph, None, publishers, compute)
    }

    /// Create a derived node with a name for logs and snapshots.
    pub fn labeled<F>(
        graph: &Graph,
        label: impl Into<String>,
        publishers: &[NodeId],
        compute: F,
    ) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(graph, Some(label.into()), publishers, compute)
    }

    fn build<F>(
        graph: &Graph,
        label: Option<String>,
        publishers: &[NodeId],
        compute: F,
    ) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let value: Arc<RwLock<Option<T>>> = Arc::new(RwLock::new(None));

        let cache = Arc::clone(&value);
        let recompute = Arc::new(move || {
            let next = compute();
            *cache.write() = Some(next);
        });

        let handle = match label {
            Some(label) => graph.add_labeled_node(label, publishers, recompute)?,
            None => graph.add_node(publishers, recompute)?,
        };

        Ok(Self { handle, value })
    }

    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub(crate) fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Whether the next read will recompute.
    pub fn is_stale(&self) -> bool {
        self.handle.is_stale()
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        self.handle.read_with_freshness(|| {
            self.value
                .read()
                .clone()
                .expect("fresh derived node should have a value")
        })
    }

    /// The cached value, stale or not, without touching the graph.
    pub fn get_untracked(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Check if the node has ever computed a value.
    pub fn has_value(&self) -> bool {
        self.value.read().is_some()
    }

    /// Number of times the compute function has run.
    pub fn recompute_count(&self) -> u64 {
        self.handle.recompute_count()
    }
}

impl<T> Clone for Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Derived<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.id())
            .field("stale", &self.is_stale())
            .field("value", &self.get_untracked())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
