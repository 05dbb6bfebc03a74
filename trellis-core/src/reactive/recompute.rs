//! The recompute capability.
//!
//! A recompute step is the only thing a concrete node supplies to the engine.
//! It reads the current values of the node's publishers and writes the node's
//! own cached output. The engine guarantees every direct publisher is fresh
//! when it runs.

/// A node's recompute step.
///
/// Implemented for any `Fn() + Send + Sync` closure, so most nodes just pass a
/// closure that captures their publishers and their own value cell.
pub trait Recompute: Send + Sync {
    /// Recompute the node's cached output from its publishers.
    ///
    /// Should only touch the node's own cached state.
    fn recompute(&self);
}

impl<F> Recompute for F
where
    F: Fn() + Send + Sync,
{
    fn recompute(&self) {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    struct Counter {
        runs: AtomicI32,
    }

    impl Recompute for Counter {
        fn recompute(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn closures_are_recompute_steps() {
        let called = Arc::new(AtomicI32::new(0));
        let called_clone = called.clone();

        let step: Arc<dyn Recompute> = Arc::new(move || {
            called_clone.fetch_add(1, Ordering::SeqCst);
        });

        step.recompute();
        step.recompute();
        assert_eq!(called.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn structs_are_recompute_steps() {
        let counter = Arc::new(Counter {
            runs: AtomicI32::new(0),
        });
        let step: Arc<dyn Recompute> = counter.clone();

        step.recompute();
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);
    }
}
