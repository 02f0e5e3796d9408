//! Primary server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{shutdown_signal, PrimaryConfig, Result};
use crate::primary::health;
use crate::primary::http::{create_router, PrimaryState};
use crate::primary::registry::NodeRegistry;

pub struct Primary {
    config: PrimaryConfig,
}

impl Primary {
    pub fn new(config: PrimaryConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting primary");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);

        let registry = Arc::new(NodeRegistry::new());
        let poller = health::spawn(
            registry.clone(),
            Duration::from_secs(self.config.health_check_interval_secs),
        );

        let router = create_router(PrimaryState { registry });
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("✓ Primary ready");
        // ConnectInfo gives register_node the worker's peer address
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        poller.abort();
        Ok(())
    }
}
