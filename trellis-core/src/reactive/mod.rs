//! Reactive Nodes
//!
//! This module implements the runtime half of the engine: the [`Graph`]
//! handle that runs sweeps, the accessor contract every node goes through,
//! and two ready-made node types.
//!
//! # Concepts
//!
//! ## Inputs
//!
//! An [`Input`] holds a value written from outside the graph. A write that
//! changes the value invalidates everything downstream of the input. Nothing
//! is recomputed at write time.
//!
//! ## Derived nodes
//!
//! A [`Derived`] caches a value computed from its publishers. Reading it
//! refreshes the stale part of its upstream, publishers first, then
//! recomputes it if needed.
//!
//! ## Custom nodes
//!
//! Any type can join a graph by implementing [`Recompute`] and routing its
//! accessors through a [`NodeHandle`]:
//!
//! - setters call [`NodeHandle::report_changed`] (or
//!   [`NodeHandle::update_input`]) with whether the value changed;
//! - getters wrap their read in [`NodeHandle::read_with_freshness`].
//!
//! # Implementation Notes
//!
//! Dependencies are declared, not discovered: a node lists its publishers
//! when it is created. A thread-local [`RecomputeContext`] records which node
//! is recomputing so that reads outside the declared publishers can be
//! reported.

mod context;
mod memo;
mod recompute;
mod runtime;
mod signal;

pub use context::RecomputeContext;
pub use memo::Derived;
pub use recompute::Recompute;
pub use runtime::{Graph, NodeHandle};
pub use signal::Input;
