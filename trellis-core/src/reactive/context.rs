//! Recompute Context
//!
//! The recompute context tracks which node is currently recomputing on this
//! thread. It is used for diagnostics only: reads of undeclared publishers and
//! input writes from inside a recompute are contract violations the engine
//! cannot prevent, but can report.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a recompute pushes the node; the
//! returned guard pops it when dropped, even if the recompute panics. Nested
//! entries appear when a recompute reads a node that was not part of the
//! current sweep's plan.

use std::cell::RefCell;

use crate::graph::NodeId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<NodeId>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct RecomputeContext {
    node: NodeId,
}

impl RecomputeContext {
    /// Enter the recompute of `node`.
    pub fn enter(node: NodeId) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(node));
        Self { node }
    }

    /// Check if any recompute is running on this thread.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost node currently recomputing, if any.
    pub fn current() -> Option<NodeId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied())
    }

    /// Number of nested recomputes on this thread.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for RecomputeContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(
                popped,
                Some(self.node),
                "RecomputeContext mismatch: expected {:?}, got {:?}",
                self.node,
                popped
            );
        });
    }
}
