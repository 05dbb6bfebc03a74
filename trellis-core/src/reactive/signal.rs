//! Input Nodes
//!
//! An [`Input`] is a source node: it holds a value set from outside the graph
//! and has no publishers. Writing a different value invalidates every node
//! downstream; reading it goes through the freshness check like any other
//! output, which for an input only clears its own stale flag.
//!
//! # Change Detection
//!
//! [`Input::set`] compares the new value with the stored one and only
//! invalidates when they differ, so rewriting the same value costs nothing
//! downstream. [`Input::set_always`] skips the comparison for types without
//! `PartialEq` or when every write should count.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::{Graph, NodeHandle};
use crate::graph::{NodeId, Result};

/// A reactive input holding a value of type T.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Graph, Input};
///
/// let graph = Graph::new();
/// let rate = Input::new(&graph, 0.05).unwrap();
///
/// assert!(rate.set(0.07));
/// assert!(!rate.set(0.07)); // unchanged, nothing invalidated
/// assert_eq!(rate.get(), 0.07);
/// ```
pub struct Input<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The node's place in the graph.
    handle: NodeHandle,

    /// The current value.
    value: Arc<RwLock<T>>,
}

impl<T> Input<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new input node with the given initial value.
    pub fn new(graph: &Graph, value: T) -> Result<Self> {
        Self::build(graph, None, value)
    }

    /// Create a new input node with a name for logs and snapshots.
    pub fn labeled(graph: &Graph, label: impl Into<String>, value: T) -> Result<Self> {
        Self::build(graph, Some(label.into()), value)
    }

    fn build(graph: &Graph, label: Option<String>, value: T) -> Result<Self> {
        // Inputs have nothing to recompute: their value is the write itself.
        let recompute = Arc::new(|| {});
        let handle = match label {
            Some(label) => graph.add_labeled_node(label, &[], recompute)?,
            None => graph.add_node(&[], recompute)?,
        };

        Ok(Self {
            handle,
            value: Arc::new(RwLock::new(value)),
        })
    }

    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.handle
            .read_with_freshness(|| self.value.read().clone())
    }

    /// Get the current value without touching the graph.
    ///
    /// Safe inside the recompute of a subscriber, whose publishers are
    /// already fresh.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Store a value and invalidate dependents unconditionally.
    pub fn set_always(&self, value: T) {
        self.handle.update_input(|| {
            *self.value.write() = value;
            true
        });
    }

    /// Store a value computed from the current one.
    ///
    /// `f` runs with no lock on the value held, so it may read this input.
    /// Returns whether the value changed.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
        T: PartialEq,
    {
        self.handle.update_input(|| {
            let current = self.value.read().clone();
            let next = f(&current);
            if current == next {
                return false;
            }
            *self.value.write() = next;
            true
        })
    }
}

impl<T> Input<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Store a value, invalidating dependents only if it differs from the
    /// current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        self.handle.update_input(|| {
            let mut guard = self.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
            true
        })
    }
}

impl<T> Clone for Input<T>
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

impl<T> Debug for Input<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
