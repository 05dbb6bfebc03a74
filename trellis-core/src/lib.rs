//! Trellis Core
//!
//! This crate provides a small push-invalidate / pull-update dependency
//! graph for lazy incremental computation. It implements:
//!
//! - A node arena with publisher/subscriber edges and staleness flags
//! - Forward invalidation when an input changes
//! - Backward, publisher-first recomputation when an output is read
//! - Cycle rejection at registration time
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `graph`: node handles, the arena, traversal plans, config and errors
//! - `reactive`: the shared [`Graph`](reactive::Graph) runtime, the accessor
//!   contract, and the [`Input`](reactive::Input) and
//!   [`Derived`](reactive::Derived) node types
//!
//! # Example
//!
//! ```rust
//! use trellis_core::reactive::{Derived, Graph, Input};
//!
//! let graph = Graph::new();
//! let count = Input::new(&graph, 2).unwrap();
//!
//! let count_clone = count.clone();
//! let doubled = Derived::new(&graph, &[count.id()], move || count_clone.get() * 2).unwrap();
//!
//! assert_eq!(doubled.get(), 4);
//!
//! // Marks `doubled` stale; nothing runs until it is read again.
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod graph;
pub mod reactive;

pub use graph::{GraphConfig, GraphError, NodeId, Result};
pub use reactive::{Derived, Graph, Input, NodeHandle, Recompute};
