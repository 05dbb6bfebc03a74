//! Dependency Graph
//!
//! This module implements the bookkeeping half of the engine: the node arena,
//! staleness flags, publisher/subscriber edges, and the traversal plans.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are units of computation with a cached output owned elsewhere
//! - If B reads from A, A is a *publisher* of B and B a *subscriber* of A
//!
//! When an input changes, we walk subscriber edges and mark the downstream
//! closure stale. When an output is read, we walk publisher edges and collect
//! the stale nodes that must recompute first.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena and are referred to by [`NodeId`] handles, which
//!    makes cycle checks and snapshots plain graph walks.
//!
//! 2. Cycles are rejected when an edge is registered, so traversals are total.
//!
//! 3. We keep both publisher and subscriber edges to traverse efficiently in
//!    both directions.

mod config;
mod error;
mod node;
mod scheduler;
mod snapshot;

pub use config::{ExtendPolicy, GraphConfig};
pub use error::{GraphError, Result};
pub use node::{GraphId, NodeId, NodeState};
pub use scheduler::ExtendOutcome;
pub(crate) use scheduler::UpdateScheduler;
pub use snapshot::{GraphSnapshot, NodeSnapshot};
