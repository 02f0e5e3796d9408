//! Node registry
//!
//! Membership table for the cluster's workers. Live nodes always occupy the
//! dense index set {0..N-1}; the partition function maps keys onto exactly
//! that range, so every mutation re-indexes and triggers a full rebalance
//! pass before the new topology is visible to request routing.
//!
//! One write lock guards both the mutation and the rebalance it triggers.
//! No request can route against a half-updated topology, at the cost of
//! blocking all registry access for the duration of a migration. That
//! trade-off is deliberate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::common::{partition_key, Error, NodeStats, Result};
use crate::primary::rebalance::{self, RebalanceOp};

/// One registered worker, as tracked by the primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub last_health_check_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_health_check_error: Option<String>,
    #[serde(default)]
    pub stats: NodeStats,
}

impl Node {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            index: 0,
            last_health_check_time: None,
            last_health_check_error: None,
            stats: NodeStats::default(),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }
}

/// An immutable membership snapshot: id → node plus index → id.
#[derive(Debug, Clone, Default)]
pub(crate) struct Topology {
    nodes: HashMap<String, Node>,
    indexes: HashMap<usize, String>,
}

impl Topology {
    pub(crate) fn len(&self) -> usize {
        self.indexes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub(crate) fn node_by_index(&self, index: usize) -> Option<&Node> {
        self.indexes.get(&index).and_then(|id| self.nodes.get(id))
    }

    /// All nodes, ordered by index.
    pub(crate) fn nodes_by_index(&self) -> Vec<Node> {
        (0..self.len())
            .filter_map(|i| self.node_by_index(i).cloned())
            .collect()
    }

    /// A new topology with `node` appended at the next dense index.
    /// Re-registering a known id leaves the topology unchanged.
    pub(crate) fn with_node(&self, mut node: Node) -> Topology {
        let mut next = self.clone();
        if next.nodes.contains_key(&node.id) {
            return next;
        }
        node.index = next.nodes.len();
        next.indexes.insert(node.index, node.id.clone());
        next.nodes.insert(node.id.clone(), node);
        next
    }

    /// A new topology without `id`; every higher index shifts down by one so
    /// the index set stays dense.
    pub(crate) fn without_node(&self, id: &str) -> Topology {
        let mut next = self.clone();
        let Some(removed) = next.nodes.remove(id) else {
            return next;
        };
        for node in next.nodes.values_mut() {
            if node.index > removed.index {
                node.index -= 1;
            }
        }
        next.indexes = next
            .nodes
            .values()
            .map(|n| (n.index, n.id.clone()))
            .collect();
        next
    }
}

/// The primary's membership service. All access goes through this object;
/// there is no ambient singleton.
pub struct NodeRegistry {
    topology: RwLock<Topology>,
    http: reqwest::Client,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            topology: RwLock::new(Topology::default()),
            http,
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Registers a worker and rebalances the cluster onto the new topology.
    ///
    /// The rebalance runs synchronously inside the registry's write lock. If
    /// it fails, the error is returned but the new topology is installed
    /// anyway: routing follows the registry from that point on, and any keys
    /// the failed pass left behind stay misplaced until a later pass moves
    /// them. This partial-failure window is a documented property, not a
    /// guarantee of convergence.
    pub async fn register(&self, mut node: Node) -> Result<()> {
        // registration counts as a successful health check
        node.last_health_check_time = Some(Utc::now());

        let mut topology = self.topology.write().await;
        let next = topology.with_node(node);
        let outcome = rebalance::run(&self.http, &next, &RebalanceOp::Add).await;
        *topology = next;
        outcome
    }

    /// Removes a worker, draining its entire key space onto the survivors.
    /// Fails with NotFound for an unknown id. The same partial-failure
    /// window as `register` applies.
    pub async fn unregister(&self, id: &str) -> Result<()> {
        let mut topology = self.topology.write().await;
        let departing = topology
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("failed to find node: {}", id)))?;

        let next = topology.without_node(id);
        let outcome = rebalance::run(&self.http, &next, &RebalanceOp::Remove(departing)).await;
        *topology = next;
        outcome
    }

    /// Independent copies of all nodes, ordered by index.
    pub async fn get_nodes(&self) -> Vec<Node> {
        self.topology.read().await.nodes_by_index()
    }

    pub async fn get_node_by_index(&self, index: usize) -> Result<Node> {
        self.topology
            .read()
            .await
            .node_by_index(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("failed to find node index: {}", index)))
    }

    pub async fn num_nodes(&self) -> usize {
        self.topology.read().await.len()
    }

    /// Resolves the worker owning `key` under the current topology.
    pub async fn route(&self, key: &str) -> Result<Node> {
        let topology = self.topology.read().await;
        if topology.is_empty() {
            return Err(Error::NoNodes);
        }
        let index = partition_key(key, topology.len())?;
        topology
            .node_by_index(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("failed to find node index: {}", index)))
    }

    /// Records the outcome of a health probe. Unknown ids are ignored (the
    /// node may have been unregistered while the probe was in flight).
    pub async fn record_health(&self, id: &str, error: Option<String>) {
        let mut topology = self.topology.write().await;
        if let Some(node) = topology.nodes.get_mut(id) {
            node.last_health_check_time = Some(Utc::now());
            node.last_health_check_error = error;
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
