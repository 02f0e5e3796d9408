//! Key migration on membership change
//!
//! Whenever the topology changes, every key's owner is recomputed against the
//! new node count and misplaced entries are moved. The pass stages all moves
//! on the workers first (queue-operations) and only then tells every node of
//! the new topology to replay its queue (apply-operations), so reads against
//! live data are not disturbed until the final commit step.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::common::{partition_key, EntryOperation, Error, Result};
use crate::primary::client::WorkerClient;
use crate::primary::registry::{Node, Topology};
use crate::primary::transfer::{
    TransferOperation, TransferQueue, TransferSink, TRANSFER_BUFFER_SIZE,
};

pub(crate) enum RebalanceOp {
    /// A node joined; every existing node may hold keys that now belong
    /// elsewhere.
    Add,
    /// The given node is leaving; its entire key space must move.
    Remove(Node),
}

/// Runs one full migration pass against `topology`, which is the state the
/// cluster is moving TO. An empty successor topology has nowhere to put data,
/// so the pass is a no-op.
pub(crate) async fn run(
    http: &reqwest::Client,
    topology: &Topology,
    op: &RebalanceOp,
) -> Result<()> {
    if topology.is_empty() {
        return Ok(());
    }
    let num_nodes = topology.len();
    info!(nodes = num_nodes, "rebalance started");

    let sink = BatchSink { http: http.clone() };
    let mut queue = TransferQueue::with_capacity(TRANSFER_BUFFER_SIZE, sink);

    // On Add every node is scanned against the new partition count; on
    // Remove only the departing node holds misplaced keys, and it is
    // streamed exactly once.
    let sources = match op {
        RebalanceOp::Add => topology.nodes_by_index(),
        RebalanceOp::Remove(departing) => vec![departing.clone()],
    };

    for source in &sources {
        let client = WorkerClient::new(source.url(), http.clone());
        let (mut entries, done) = client.stream_entries();

        while let Some(entry) = entries.recv().await {
            let index = partition_key(&entry.key, num_nodes)?;
            let target = topology
                .node_by_index(index)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("failed to find node index: {}", index)))?;
            if target.id == source.id {
                continue;
            }
            queue
                .push(TransferOperation {
                    source: source.clone(),
                    target,
                    entry,
                })
                .await?;
        }

        done.await
            .map_err(|_| Error::Internal("entry stream ended without a result".to_string()))??;
    }

    queue.flush().await?;

    // commit: every node of the new topology replays its staged queue
    for node in topology.nodes_by_index() {
        let client = WorkerClient::new(node.url(), http.clone());
        client.apply_operations().await?;
    }

    info!(nodes = num_nodes, "rebalance done");
    Ok(())
}

/// Turns a batch of planned moves into staged worker operations: a delete on
/// each entry's source and a set on its target, grouped so every worker gets
/// one queue-operations call per batch. Per-node order within the batch is
/// preserved.
struct BatchSink {
    http: reqwest::Client,
}

impl TransferSink for BatchSink {
    async fn dispatch(&mut self, batch: Vec<TransferOperation>) -> Result<()> {
        let mut staged: HashMap<String, Vec<EntryOperation>> = HashMap::new();
        for op in batch {
            debug!(
                key = %op.entry.key,
                from = %op.source.id,
                to = %op.target.id,
                "staging move"
            );
            staged
                .entry(op.source.url())
                .or_default()
                .push(EntryOperation::delete(op.entry.key.clone()));
            staged
                .entry(op.target.url())
                .or_default()
                .push(EntryOperation::set(op.entry));
        }

        for (url, operations) in staged {
            let client = WorkerClient::new(url, self.http.clone());
            client.queue_operations(&operations).await?;
        }
        Ok(())
    }
}
