//! In-flight registry (component B): tracks which RIDs currently have a worker
//! evaluating them, enforcing at most one worker per RID.
//!
//! Grounded on the original probe's `rbt_i32_add` red-black-tree registry, whose
//! non-zero return signals "already present" (see the dispatch core's design
//! notes on single-flight per RID). A `HashMap` behind a `Mutex` plays the same
//! role here; a `Condvar` additionally lets [`shutdown`](crate::dispatch) block
//! until the registry drains.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Minimal bookkeeping kept for each in-flight RID.
#[derive(Debug, Clone, Copy)]
pub struct WorkerHandle {
    pub rid: u32,
    pub spawned_at: Instant,
}

struct State {
    workers: HashMap<u32, WorkerHandle>,
}

/// The shared in-flight registry.
pub struct InFlightRegistry {
    state: Mutex<State>,
    drained: Condvar,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                workers: HashMap::new(),
            }),
            drained: Condvar::new(),
        }
    }

    /// Attempts to register `rid` as in-flight.
    ///
    /// Returns `true` if `rid` was not already present and is now registered,
    /// `false` if a worker for `rid` is already in flight — the caller must not
    /// spawn a second one.
    pub fn try_insert(&self, rid: u32) -> bool {
        let mut state = self.state.lock().expect("InFlightRegistry mutex poisoned");
        if state.workers.contains_key(&rid) {
            return false;
        }
        state.workers.insert(
            rid,
            WorkerHandle {
                rid,
                spawned_at: Instant::now(),
            },
        );
        true
    }

    /// Removes `rid` from the registry, marking its worker retired.
    ///
    /// Wakes any thread blocked in [`wait_until_drained`](Self::wait_until_drained)
    /// once the registry becomes empty.
    pub fn remove(&self, rid: u32) {
        let mut state = self.state.lock().expect("InFlightRegistry mutex poisoned");
        state.workers.remove(&rid);
        if state.workers.is_empty() {
            self.drained.notify_all();
        }
    }

    pub fn contains(&self, rid: u32) -> bool {
        self.state
            .lock()
            .expect("InFlightRegistry mutex poisoned")
            .workers
            .contains_key(&rid)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("InFlightRegistry mutex poisoned").workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until the registry is empty or `timeout` elapses.
    ///
    /// Returns `true` if the registry drained within the timeout, `false` if the
    /// timeout elapsed with workers still in flight.
    pub fn wait_until_drained(&self, timeout: Duration) -> bool {
        let state = self.state.lock().expect("InFlightRegistry mutex poisoned");
        if state.workers.is_empty() {
            return true;
        }
        let (state, result) = self
            .drained
            .wait_timeout_while(state, timeout, |state| !state.workers.is_empty())
            .expect("InFlightRegistry mutex poisoned");
        !result.timed_out() && state.workers.is_empty()
    }
}

impl Default for InFlightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
