//! Startup barrier (component F): the one-time rendezvous every process thread
//! must clear before the input loop begins accepting requests.
//!
//! Grounded directly on the original probe's `pthread_barrier_wait(&th_barrier)`
//! call, which every probe thread (input, signal handler, etc.) performs before
//! proceeding. `std::sync::Barrier` provides the same rendezvous; it has no
//! notion of a poisoned party, so — unlike `pthread_barrier_wait`, which can
//! return an error — a panicked sibling before rendezvous is not observable
//! through this type alone (see the design's Open Question on this point).

use std::sync::Barrier as StdBarrier;

/// Whether this thread was the "serial" party selected by the underlying
/// barrier, mirroring `PTHREAD_BARRIER_SERIAL_THREAD`. At most one waiter per
/// rendezvous observes `Leader`; every other observes `Follower`. Neither
/// variant should be relied on for correctness — the barrier's only contract is
/// that all parties have reached it once every `wait` call has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    Leader,
    Follower,
}

/// A named wrapper around `std::sync::Barrier` for the probe startup rendezvous.
pub struct StartupBarrier {
    inner: StdBarrier,
}

impl StartupBarrier {
    /// Builds a barrier for exactly `parties` threads.
    pub fn new(parties: usize) -> Self {
        Self {
            inner: StdBarrier::new(parties),
        }
    }

    /// Blocks until all `parties` threads have called `wait`.
    pub fn wait(&self) -> BarrierOutcome {
        if self.inner.wait().is_leader() {
            BarrierOutcome::Leader
        } else {
            BarrierOutcome::Follower
        }
    }
}
