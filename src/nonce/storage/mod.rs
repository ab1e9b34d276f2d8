//! In-memory nonce-count storage.
//!
//! Two structures live here and are only eventually consistent with each
//! other:
//!
//! - a concurrent map from nonce to the last client nonce-count, read and
//!   updated without any global lock;
//! - an expiry queue telling the purge sweep which map entries may go.
//!
//! The only path that touches both is first-time registration of a nonce,
//! which holds the queue lock so that a nonce enters the queue at most once.
//! Later updates to a registered nonce go straight to the map. Concurrent
//! updates for the same nonce are last-write-wins; a lost update only makes
//! the client resubmit.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

mod expiry;
use expiry::ExpiryQueue;

/// Statistics about the nonce-count store.
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Nonces with a recorded count
    pub tracked_nonces: usize,
    /// Entries waiting in the expiry queue
    pub queued_nonces: usize,
    /// Additional backend-specific information
    pub backend_info: String,
}

/// Nonce-count map plus the expiry queue that bounds its size.
///
/// Time is passed in by the caller as milliseconds since the epoch, so the
/// store itself never reads a clock.
#[derive(Debug, Default)]
pub struct NonceCountStore {
    counts: DashMap<String, u64>,
    queue: Mutex<ExpiryQueue>,
}

impl NonceCountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` nonces.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: DashMap::with_capacity(capacity),
            queue: Mutex::new(ExpiryQueue::with_capacity(capacity)),
        }
    }

    /// Returns the last count recorded for `nonce`.
    ///
    /// Takes no global lock; may observe a value that is being replaced.
    pub fn get(&self, nonce: &str) -> Option<u64> {
        self.counts.get(nonce).map(|count| *count)
    }

    /// Records `count` for `nonce`.
    ///
    /// If the nonce is not yet tracked it is registered in the expiry queue
    /// to expire at `expires_at`, after first purging up to `purge_limit`
    /// expired entries. Returns `true` when this call registered the nonce.
    pub fn set(
        &self,
        nonce: &str,
        count: u64,
        expires_at: u128,
        now: u128,
        purge_limit: usize,
    ) -> bool {
        if let Some(mut current) = self.counts.get_mut(nonce) {
            *current = count;
            return false;
        }

        let mut queue = self.queue.lock();
        self.purge_locked(&mut queue, now, purge_limit);
        match self.counts.entry(nonce.to_string()) {
            // Registered by a concurrent caller between the check and the lock
            Entry::Occupied(mut current) => {
                current.insert(count);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(count);
                queue.push(nonce.to_string(), expires_at);
                true
            }
        }
    }

    /// Removes expired nonces from the head of the queue.
    ///
    /// Stops at the first live entry, or after `limit` removals when a limit
    /// is given. Returns the number of nonces removed.
    pub fn purge_expired(&self, now: u128, limit: Option<usize>) -> usize {
        let mut queue = self.queue.lock();
        let limit = limit.unwrap_or_else(|| queue.len());
        self.purge_locked(&mut queue, now, limit)
    }

    fn purge_locked(&self, queue: &mut ExpiryQueue, now: u128, limit: usize) -> usize {
        let mut purged = 0;
        while purged < limit {
            let Some(nonce) = queue.pop_expired(now) else {
                break;
            };
            self.counts.remove(&nonce);
            purged += 1;
        }
        if purged > 0 {
            tracing::debug!(purged, remaining = queue.len(), "purged expired nonces");
        }
        purged
    }

    /// Returns statistics about the store.
    pub fn stats(&self) -> StorageStats {
        let tracked_nonces = self.counts.len();
        let queued_nonces = self.queue.lock().len();
        StorageStats {
            tracked_nonces,
            queued_nonces,
            backend_info: format!(
                "In-memory DashMap counts with expiry heap (~{} bytes)",
                tracked_nonces * std::mem::size_of::<(String, u64)>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_count_store_basic_operations() {
        let store = NonceCountStore::new();
        assert_eq!(store.get("nonce"), None);

        assert!(store.set("nonce", 1, 1_000, 0, 10));
        assert_eq!(store.get("nonce"), Some(1));

        // Updates do not register again
        assert!(!store.set("nonce", 7, 1_000, 0, 10));
        assert_eq!(store.get("nonce"), Some(7));

        let stats = store.stats();
        assert_eq!(stats.tracked_nonces, 1);
        assert_eq!(stats.queued_nonces, 1);
        assert!(stats.backend_info.contains("In-memory"));
    }

    #[test]
    fn test_counts_are_not_validated() {
        let store = NonceCountStore::new();
        store.set("nonce", 10, 1_000, 0, 10);
        store.set("nonce", 3, 1_000, 0, 10);
        assert_eq!(store.get("nonce"), Some(3));
    }

    #[test]
    fn test_purge_only_removes_expired() {
        let store = NonceCountStore::new();
        store.set("old", 1, 100, 0, 10);
        store.set("new", 1, 500, 0, 10);

        assert_eq!(store.purge_expired(99, None), 0);
        assert_eq!(store.get("old"), Some(1));

        assert_eq!(store.purge_expired(100, None), 1);
        assert_eq!(store.get("old"), None);
        assert_eq!(store.get("new"), Some(1));
        assert_eq!(store.stats().queued_nonces, 1);
    }

    #[test]
    fn test_purge_respects_limit() {
        let store = NonceCountStore::new();
        for i in 0..5 {
            store.set(&format!("nonce-{i}"), 1, 100, 0, 10);
        }

        assert_eq!(store.purge_expired(1_000, Some(2)), 2);
        assert_eq!(store.stats().tracked_nonces, 3);
        assert_eq!(store.purge_expired(1_000, None), 3);
        assert_eq!(store.stats().tracked_nonces, 0);
    }

    #[test]
    fn test_registration_purges_opportunistically() {
        let store = NonceCountStore::new();
        for i in 0..15 {
            store.set(&format!("stale-{i}"), 1, 100, 0, 10);
        }

        // Registering a new nonce after expiry sweeps at most ten stale ones
        store.set("fresh", 1, 10_000, 1_000, 10);
        let stats = store.stats();
        assert_eq!(stats.tracked_nonces, 6);
        assert_eq!(stats.queued_nonces, 6);

        // Updating an existing nonce never purges
        store.set("fresh", 2, 10_000, 1_000, 10);
        assert_eq!(store.stats().tracked_nonces, 6);
    }

    #[test]
    fn test_concurrent_registration_is_queued_once() {
        let store = Arc::new(NonceCountStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..100 {
                        store.set("shared", i * 100 + n, 1_000, 0, 10);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = store.stats();
        assert_eq!(stats.tracked_nonces, 1);
        assert_eq!(stats.queued_nonces, 1);
        assert!(store.get("shared").is_some());
    }
}
