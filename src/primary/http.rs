//! Primary HTTP API
//!
//! Client-facing key routes plus the cluster management surface. Key
//! operations resolve the owning worker through the registry and proxy the
//! call; management routes mutate membership, which rebalances inline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::common::{streamer, Result};
use crate::primary::client::WorkerClient;
use crate::primary::registry::{Node, NodeRegistry};

#[derive(Clone)]
pub struct PrimaryState {
    pub registry: Arc<NodeRegistry>,
}

pub fn create_router(state: PrimaryState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/nodes", get(get_nodes).post(register_node))
        .route("/nodes/:id", axum::routing::delete(unregister_node))
        .route(
            "/keys/:key",
            post(set_key).get(get_key).delete(delete_key),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct RegisterNodeBody {
    id: String,
    port: String,
}

/// Registers the calling worker. The advertised address is the peer IP of
/// this request combined with the port the worker reports listening on.
async fn register_node(
    State(state): State<PrimaryState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(body): Json<RegisterNodeBody>,
) -> Result<impl IntoResponse> {
    let address = format!("{}:{}", peer.ip(), body.port);
    info!(id = %body.id, %address, "registering node");
    let node = Node::new(body.id, address);
    state.registry.register(node).await?;
    Ok(Json(json!({ "status": "registered" })))
}

async fn unregister_node(
    State(state): State<PrimaryState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    info!(%id, "unregistering node");
    state.registry.unregister(&id).await?;
    Ok(Json(json!({ "status": "unregistered" })))
}

/// Lists the topology with live per-worker stats. A worker that cannot be
/// reached keeps the stats last recorded on its registry entry.
async fn get_nodes(State(state): State<PrimaryState>) -> Result<impl IntoResponse> {
    let mut nodes = state.registry.get_nodes().await;
    for node in &mut nodes {
        let client = WorkerClient::new(node.url(), state.registry.http().clone());
        if let Ok(stats) = client.get_stats().await {
            node.stats = stats;
        }
    }
    Ok(Json(json!({ "nodes": nodes })))
}

async fn set_key(
    State(state): State<PrimaryState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    streamer::validate_key(&key)?;
    let node = state.registry.route(&key).await?;
    let client = WorkerClient::new(node.url(), state.registry.http().clone());
    client.set_key(&key, body.to_vec()).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn get_key(
    State(state): State<PrimaryState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let node = state.registry.route(&key).await?;
    let client = WorkerClient::new(node.url(), state.registry.http().clone());
    let value = client.get_key(&key).await?;
    Ok(Bytes::from(value))
}

async fn delete_key(
    State(state): State<PrimaryState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let node = state.registry.route(&key).await?;
    let client = WorkerClient::new(node.url(), state.registry.http().clone());
    client.delete_key(&key).await?;
    Ok(Json(json!({ "status": "ok" })))
}
