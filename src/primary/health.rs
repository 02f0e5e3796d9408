//! Periodic worker health probes

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::primary::client::WorkerClient;
use crate::primary::registry::NodeRegistry;

/// Spawns the background poller. Each tick probes every registered worker's
/// `/health` endpoint and records the outcome on the node; failures are
/// logged but never remove the node from the topology.
pub fn spawn(registry: Arc<NodeRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for node in registry.get_nodes().await {
                let client = WorkerClient::new(node.url(), registry.http().clone());
                let outcome = client.health().await;
                if let Err(e) = &outcome {
                    warn!(node = %node.id, address = %node.address, error = %e, "health check failed");
                }
                registry
                    .record_health(&node.id, outcome.err().map(|e| e.to_string()))
                    .await;
            }
        }
    })
}
