//! Worker server

use std::sync::Arc;
use std::time::Duration;

use crate::common::{shutdown_signal, Result, WorkerConfig};
use crate::worker::http::{create_router, WorkerState};
use crate::worker::store::MemStore;

pub struct WorkerServer {
    config: WorkerConfig,
    worker_id: String,
}

impl WorkerServer {
    pub fn new(config: WorkerConfig, worker_id: String) -> Self {
        Self { config, worker_id }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting worker: {}", self.worker_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Primary:  {}", self.config.primary_url);

        let store = Arc::new(MemStore::new(self.worker_id.clone()));
        let router = create_router(WorkerState { store });

        // bind before registering: the primary streams our (empty) key space
        // as part of accepting the registration
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        let port = listener.local_addr()?.port();

        let registration = tokio::spawn(register_with_primary(
            self.config.primary_url.clone(),
            self.worker_id.clone(),
            port,
        ));

        tracing::info!("✓ Worker ready");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        registration.abort();
        Ok(())
    }
}

/// Announces this worker to the primary, retrying until accepted. The
/// primary rebalances synchronously inside the call, so a slow response here
/// is normal on a populated cluster.
async fn register_with_primary(primary_url: String, worker_id: String, port: u16) {
    let client = reqwest::Client::new();
    let body = serde_json::json!({ "id": worker_id, "port": port.to_string() });
    let url = format!("{}/nodes", primary_url);

    loop {
        match client.post(&url).json(&body).send().await {
            Ok(res) if res.status().is_success() => {
                tracing::info!(primary = %primary_url, "registered with primary");
                return;
            }
            Ok(res) => {
                let reason = res.text().await.unwrap_or_default();
                tracing::warn!(primary = %primary_url, %reason, "registration rejected, retrying");
            }
            Err(e) => {
                tracing::warn!(primary = %primary_url, error = %e, "primary unreachable, retrying");
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
