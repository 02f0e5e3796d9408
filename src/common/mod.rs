//! Common types shared by the primary and workers

pub mod config;
pub mod entry;
pub mod error;
pub mod partition;
pub mod streamer;

pub use config::{Config, PrimaryConfig, WorkerConfig};
pub use entry::{Entry, EntryAction, EntryOperation, NodeStats};
pub use error::{Error, Result};
pub use partition::partition_key;

/// Resolves when the process receives a shutdown signal.
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
