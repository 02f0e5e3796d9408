//! HTTP API for a worker
//!
//! Key routes serve direct client traffic; `/stream-entries`,
//! `/queue-operations`, and `/apply-operations` are the migration surface
//! used by the primary's rebalance coordinator.

use async_stream::stream;
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::common::streamer;
use crate::common::{EntryOperation, Error, NodeStats};
use crate::worker::store::MemStore;

/// Shared worker state for HTTP handlers.
#[derive(Clone)]
pub struct WorkerState {
    pub store: Arc<MemStore>,
}

/// Creates the HTTP router with all worker endpoints.
pub fn create_router(state: WorkerState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/keys/:key", axum::routing::post(set_key))
        .route("/keys/:key", axum::routing::get(get_key))
        .route("/keys/:key", axum::routing::delete(delete_key))
        .route("/stats", axum::routing::get(get_stats))
        .route("/stream-entries", axum::routing::get(stream_entries))
        .route("/queue-operations", axum::routing::post(queue_operations))
        .route("/apply-operations", axum::routing::post(apply_operations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn set_key(
    State(state): State<WorkerState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<&'static str, Error> {
    streamer::validate_key(&key)?;
    state.store.set(key, body.to_vec());
    Ok("ok")
}

async fn get_key(
    State(state): State<WorkerState>,
    Path(key): Path<String>,
) -> Result<Vec<u8>, Error> {
    state.store.get(&key)
}

async fn delete_key(State(state): State<WorkerState>, Path(key): Path<String>) -> &'static str {
    state.store.delete(&key);
    "ok"
}

async fn get_stats(State(state): State<WorkerState>) -> Json<serde_json::Value> {
    let stats = NodeStats {
        object_count: state.store.object_count(),
    };
    Json(json!({ "stats": stats }))
}

/// Enumerates the full key space as a chunked, explicitly unsized body, one
/// encoded entry per line. Entries are pulled off the store's bounded
/// channel, so a slow consumer backpressures the producer.
async fn stream_entries(State(state): State<WorkerState>) -> impl IntoResponse {
    let mut entries = state.store.stream_entries();
    let body = stream! {
        while let Some(entry) = entries.recv().await {
            match streamer::encode_entry(&entry) {
                Ok(line) => yield Ok::<Bytes, axum::Error>(Bytes::from(line)),
                Err(e) => {
                    // a key holding the separator slipped past validation;
                    // abort the stream so the consumer fails loudly
                    yield Err(axum::Error::new(e));
                    return;
                }
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
}

async fn queue_operations(
    State(state): State<WorkerState>,
    Json(operations): Json<Vec<EntryOperation>>,
) -> &'static str {
    state.store.queue_operations(operations);
    "ok"
}

async fn apply_operations(State(state): State<WorkerState>) -> &'static str {
    state.store.apply_operations();
    "ok"
}
