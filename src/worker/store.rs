//! In-memory shard store
//!
//! Two write paths. The direct path (`set`/`delete`) mutates the live map
//! immediately and serves normal client traffic. The staged path
//! (`queue_operations`/`apply_operations`) buffers migration intents without
//! touching the live map, then replays them in FIFO order in one commit step.
//! Keeping migration writes out of the live map until every node has its
//! batch staged is what lets a rebalance pass commit near-simultaneously
//! across the cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::common::{Entry, EntryAction, EntryOperation, Error, Result};

pub struct MemStore {
    worker_id: String,
    data: RwLock<HashMap<String, Vec<u8>>>,
    ops_queue: Mutex<Vec<EntryOperation>>,
}

impl MemStore {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            data: RwLock::new(HashMap::new()),
            ops_queue: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        self.data.write().unwrap().insert(key.into(), value);
    }

    pub fn delete(&self, key: &str) {
        self.data.write().unwrap().remove(key);
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.data
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no value found for key: {}", key)))
    }

    pub fn object_count(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Appends migration intents to the staged queue. The live map is not
    /// touched until `apply_operations` runs.
    pub fn queue_operations(&self, operations: Vec<EntryOperation>) {
        let mut queue = self.ops_queue.lock().unwrap();
        for op in operations {
            debug!(
                worker = %self.worker_id,
                action = ?op.action,
                key = %op.entry.key,
                "staged operation"
            );
            queue.push(op);
        }
    }

    /// Replays the staged queue into the live map in FIFO order, then clears
    /// it. Calling this with an already-drained queue is a safe no-op;
    /// calling it twice on the same unflushed batch would double-apply and is
    /// a caller contract violation.
    pub fn apply_operations(&self) {
        // lock order: operations queue before data; this is the only path
        // that holds both
        let mut queue = self.ops_queue.lock().unwrap();
        let mut data = self.data.write().unwrap();

        debug!(
            worker = %self.worker_id,
            staged = queue.len(),
            held = data.len(),
            "applying staged operations"
        );

        for op in queue.drain(..) {
            match op.action {
                EntryAction::Set => {
                    data.insert(op.entry.key, op.entry.value);
                }
                EntryAction::Delete => {
                    data.remove(&op.entry.key);
                }
            }
        }

        debug!(worker = %self.worker_id, held = data.len(), "staged operations applied");
    }

    /// Streams the store's entries one at a time through a bounded channel;
    /// the producer blocks until the consumer accepts the next item.
    ///
    /// The key list is captured up front but values are resolved lazily, so
    /// there is no snapshot isolation: entries written or deleted while the
    /// stream drains may or may not be observed.
    pub fn stream_entries(self: &Arc<Self>) -> mpsc::Receiver<Entry> {
        let (tx, rx) = mpsc::channel(1);
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let keys: Vec<String> = store.data.read().unwrap().keys().cloned().collect();
            for key in keys {
                let value = store.data.read().unwrap().get(&key).cloned();
                let Some(value) = value else {
                    continue; // deleted while streaming
                };
                if tx.send(Entry { key, value }).await.is_err() {
                    return; // consumer stopped draining
                }
            }
        });
        rx
    }
}
