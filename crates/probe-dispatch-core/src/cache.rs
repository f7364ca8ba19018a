//! Result cache (component C): an OID-keyed, append-only store of evaluation
//! results, shared by every worker thread and the input loop.
//!
//! Entries are never evicted or overwritten — the first worker to finish for a
//! given OID wins, and every later writer for the same OID silently discards its
//! own result in favor of the cached one (see [`ResultCache::insert`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::value::Value;

/// The shared result cache.
pub struct ResultCache {
    entries: Mutex<HashMap<Value, Arc<Value>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached result for `oid`, if any.
    pub fn get(&self, oid: &Value) -> Option<Arc<Value>> {
        self.entries
            .lock()
            .expect("ResultCache mutex poisoned")
            .get(oid)
            .cloned()
    }

    /// Inserts `result` for `oid` if no result is cached yet.
    ///
    /// Returns `true` if this call's `result` became (or already was) the cached
    /// value, `false` if a different worker's result was already present and this
    /// one was discarded. Callers must reply with whatever the cache actually
    /// holds after this call, not with their own `result` unconditionally.
    pub fn insert(&self, oid: Value, result: Arc<Value>) -> Arc<Value> {
        use std::collections::hash_map::Entry;

        let mut entries = self.entries.lock().expect("ResultCache mutex poisoned");
        match entries.entry(oid) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(result).clone(),
        }
    }

    /// Number of cached OIDs. Exposed for tests and metrics only.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("ResultCache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
