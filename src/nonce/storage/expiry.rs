//! Expiry bookkeeping for tracked nonces.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    expires_at: u128,
    nonce: String,
}

/// Min-heap of tracked nonces keyed by their absolute expiry instant.
///
/// Keying by the decoded timestamp rather than insertion order keeps the
/// head of the queue the next nonce to expire even when nonces issued
/// concurrently are registered out of order.
#[derive(Debug, Default)]
pub(crate) struct ExpiryQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl ExpiryQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Adds a nonce expiring at `expires_at` milliseconds since the epoch.
    pub(crate) fn push(&mut self, nonce: String, expires_at: u128) {
        self.heap.push(Reverse(QueueEntry { expires_at, nonce }));
    }

    /// Removes and returns the head of the queue if it has expired at `now`.
    pub(crate) fn pop_expired(&mut self, now: u128) -> Option<String> {
        let Reverse(head) = self.heap.peek()?;
        if head.expires_at > now {
            return None;
        }
        self.heap.pop().map(|Reverse(entry)| entry.nonce)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_expiry_order() {
        let mut queue = ExpiryQueue::default();
        queue.push("late".to_string(), 300);
        queue.push("early".to_string(), 100);
        queue.push("middle".to_string(), 200);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop_expired(1_000).as_deref(), Some("early"));
        assert_eq!(queue.pop_expired(1_000).as_deref(), Some("middle"));
        assert_eq!(queue.pop_expired(1_000).as_deref(), Some("late"));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_stops_at_first_live_entry() {
        let mut queue = ExpiryQueue::with_capacity(4);
        queue.push("a".to_string(), 100);
        queue.push("b".to_string(), 500);

        assert_eq!(queue.pop_expired(200).as_deref(), Some("a"));
        assert_eq!(queue.pop_expired(200), None);
        assert_eq!(queue.len(), 1);

        // The boundary instant counts as expired
        assert_eq!(queue.pop_expired(500).as_deref(), Some("b"));
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = ExpiryQueue::default();
        assert_eq!(queue.pop_expired(u128::MAX), None);
    }
}
