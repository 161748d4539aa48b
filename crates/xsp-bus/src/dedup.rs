//! ---
//! xsp_section: "03-bus-collaborators"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Bus transport abstraction and consumer gate."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::sync::Mutex;

/// Consumer-side store of idempotency keys already processed.
///
/// The envelope contract only guarantees the key is reproducible; what to
/// do on a collision (drop, re-acknowledge) is the consumer's call. The
/// gate drops.
pub trait DedupStore: Send + Sync {
    /// Record `key` and report whether it had been seen before.
    fn seen(&self, key: &str) -> bool;
}

/// Unbounded in-memory dedup store.
///
/// Suitable for tests and short-lived consumers; long-running deployments
/// want a time-bounded or external store behind the same trait.
#[derive(Default)]
pub struct InMemoryDedupStore {
    keys: Mutex<HashSet<String>>,
}

impl InMemoryDedupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys recorded.
    pub fn len(&self) -> usize {
        self.keys.lock().expect("key set poisoned").len()
    }

    /// True when no key has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupStore for InMemoryDedupStore {
    fn seen(&self, key: &str) -> bool {
        let mut guard = self.keys.lock().expect("key set poisoned");
        !guard.insert(key.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let store = InMemoryDedupStore::new();
        assert!(!store.seen("key-1"));
        assert!(store.seen("key-1"));
        assert!(!store.seen("key-2"));
        assert_eq!(store.len(), 2);
    }
}
