//! Offline operation queue.
//!
//! Board operations produced while the sync channel is down are held here in
//! arrival order and replayed on reconnect. The queue is bounded; when full,
//! the oldest entry is dropped so recent edits survive a long outage.

use crate::storage::SettingsStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Maximum queued operations before the oldest is evicted.
pub const MAX_QUEUE_SIZE: usize = 100;

/// Settings key under which the queue is persisted.
pub const QUEUE_SETTINGS_KEY: &str = "offline.queue";

/// One operation waiting for the connection to come back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub room_id: String,
    pub payload: Value,
    /// When the operation was produced, in milliseconds.
    pub timestamp: u64,
}

/// Bounded FIFO of operations produced while disconnected.
#[derive(Debug, Clone, Default)]
pub struct OfflineQueue {
    queue: VecDeque<PendingOperation>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append an operation, evicting the oldest entry when full.
    pub fn enqueue(&mut self, op: PendingOperation) {
        if self.queue.len() >= MAX_QUEUE_SIZE {
            self.queue.pop_front();
            log::warn!("Offline queue full, dropping oldest operation");
        }
        self.queue.push_back(op);
    }

    /// Take every queued operation in arrival order.
    pub fn drain(&mut self) -> Vec<PendingOperation> {
        self.queue.drain(..).collect()
    }

    /// Persist the queue so edits survive an app restart while offline.
    pub fn persist(&self, store: &dyn SettingsStore) {
        match serde_json::to_string(&self.queue) {
            Ok(json) => {
                if let Err(e) = store.set(QUEUE_SETTINGS_KEY, &json) {
                    log::warn!("Failed to persist offline queue: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize offline queue: {}", e),
        }
    }

    /// Restore a previously persisted queue. Malformed data is discarded.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let queue = store
            .get(QUEUE_SETTINGS_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        Self { queue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn op(n: u64) -> PendingOperation {
        PendingOperation {
            room_id: "room-1".to_string(),
            payload: serde_json::json!({ "n": n }),
            timestamp: n,
        }
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(op(1));
        queue.enqueue(op(2));
        queue.enqueue(op(3));

        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].payload["n"], 1);
        assert_eq!(drained[2].payload["n"], 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut queue = OfflineQueue::new();
        for n in 0..(MAX_QUEUE_SIZE as u64 + 5) {
            queue.enqueue(op(n));
        }
        assert_eq!(queue.len(), MAX_QUEUE_SIZE);

        let drained = queue.drain();
        assert_eq!(drained[0].payload["n"], 5);
        assert_eq!(
            drained.last().unwrap().payload["n"],
            MAX_QUEUE_SIZE as u64 + 4
        );
    }

    #[test]
    fn test_persistence_round_trip() {
        let store = MemoryStorage::new();
        let mut queue = OfflineQueue::new();
        queue.enqueue(op(7));
        queue.persist(&store);

        let mut restored = OfflineQueue::load(&store);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.drain()[0].payload["n"], 7);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = MemoryStorage::new();
        assert!(OfflineQueue::load(&store).is_empty());
    }
}
