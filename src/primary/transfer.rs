//! Buffered queue of planned key moves
//!
//! A rebalance pass can touch every key in the cluster; sending one RPC per
//! key would dominate the pass with network round-trips. The queue buffers
//! planned moves and hands them to its sink in batches, flushing itself when
//! the buffer fills. Callers must flush explicitly once the pass is done.

use crate::common::{Entry, Result};
use crate::primary::registry::Node;

/// Buffered moves per automatic flush.
pub(crate) const TRANSFER_BUFFER_SIZE: usize = 50;

/// A planned move of one entry from its current holder to its new owner.
#[derive(Debug, Clone)]
pub(crate) struct TransferOperation {
    pub source: Node,
    pub target: Node,
    pub entry: Entry,
}

/// Receives full batches from the queue. A dispatch failure is fatal to the
/// enclosing rebalance pass; there is no partial retry.
pub(crate) trait TransferSink {
    async fn dispatch(&mut self, batch: Vec<TransferOperation>) -> Result<()>;
}

pub(crate) struct TransferQueue<S> {
    sink: S,
    items: Vec<TransferOperation>,
    capacity: usize,
}

impl<S: TransferSink> TransferQueue<S> {
    pub(crate) fn with_capacity(capacity: usize, sink: S) -> Self {
        Self {
            sink,
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends one move, flushing automatically when the buffer fills.
    pub(crate) async fn push(&mut self, op: TransferOperation) -> Result<()> {
        self.items.push(op);
        if self.items.len() >= self.capacity {
            self.flush().await?;
        }
        Ok(())
    }

    /// Hands the buffered batch to the sink and clears the buffer. Safe
    /// no-op when the buffer is empty.
    pub(crate) async fn flush(&mut self) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.items);
        self.sink.dispatch(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;

    #[derive(Default)]
    struct RecordingSink {
        batches: Vec<Vec<TransferOperation>>,
    }

    impl TransferSink for RecordingSink {
        async fn dispatch(&mut self, batch: Vec<TransferOperation>) -> Result<()> {
            self.batches.push(batch);
            Ok(())
        }
    }

    struct FailingSink;

    impl TransferSink for FailingSink {
        async fn dispatch(&mut self, _batch: Vec<TransferOperation>) -> Result<()> {
            Err(Error::Transport("worker is gone".to_string()))
        }
    }

    fn sample_op(i: usize) -> TransferOperation {
        TransferOperation {
            source: Node::new("w0", "127.0.0.1:8001"),
            target: Node::new("w1", "127.0.0.1:8002"),
            entry: Entry {
                key: format!("key-{}", i),
                value: b"v".to_vec(),
            },
        }
    }

    #[tokio::test]
    async fn test_flush_empty_is_noop() {
        let mut queue = TransferQueue::with_capacity(4, RecordingSink::default());
        queue.flush().await.unwrap();
        assert!(queue.sink.batches.is_empty());
    }

    #[tokio::test]
    async fn test_push_below_capacity_does_not_flush() {
        let mut queue = TransferQueue::with_capacity(4, RecordingSink::default());
        for i in 0..3 {
            queue.push(sample_op(i)).await.unwrap();
        }
        assert!(queue.sink.batches.is_empty());
    }

    #[tokio::test]
    async fn test_push_at_capacity_flushes_exactly_once() {
        let mut queue = TransferQueue::with_capacity(4, RecordingSink::default());
        for i in 0..4 {
            queue.push(sample_op(i)).await.unwrap();
        }
        assert_eq!(queue.sink.batches.len(), 1);
        assert_eq!(queue.sink.batches[0].len(), 4);

        // explicit flush afterwards has nothing left to send
        queue.flush().await.unwrap();
        assert_eq!(queue.sink.batches.len(), 1);
    }

    #[tokio::test]
    async fn test_trailing_items_flush_explicitly() {
        let mut queue = TransferQueue::with_capacity(4, RecordingSink::default());
        for i in 0..6 {
            queue.push(sample_op(i)).await.unwrap();
        }
        queue.flush().await.unwrap();
        assert_eq!(queue.sink.batches.len(), 2);
        assert_eq!(queue.sink.batches[0].len(), 4);
        assert_eq!(queue.sink.batches[1].len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let mut queue = TransferQueue::with_capacity(1, FailingSink);
        assert!(queue.push(sample_op(0)).await.is_err());
    }
}
