//! Configuration for shardkv processes

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Global configuration, one optional section per role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<PrimaryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,
}

impl Config {
    /// Load from `shardkv.toml` (if present) with `SHARDKV_*` environment
    /// overrides. CLI arguments are applied on top by the binaries.
    pub fn load() -> Self {
        let loaded = config::Config::builder()
            .add_source(config::File::with_name("shardkv").required(false))
            .add_source(config::Environment::with_prefix("SHARDKV").separator("__"))
            .build()
            .and_then(|c| c.try_deserialize());

        match loaded {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to load configuration: {}", e);
                Config::default()
            }
        }
    }
}

/// Primary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_primary_bind")]
    pub bind_addr: SocketAddr,

    /// Seconds between worker health probes
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_primary_bind(),
            health_check_interval_secs: default_health_check_interval(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_worker_bind")]
    pub bind_addr: SocketAddr,

    /// Base URL of the primary to register with
    #[serde(default = "default_primary_url")]
    pub primary_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_worker_bind(),
            primary_url: default_primary_url(),
        }
    }
}

fn default_primary_bind() -> SocketAddr {
    "0.0.0.0:8000".parse().unwrap()
}

fn default_health_check_interval() -> u64 {
    5
}

fn default_worker_bind() -> SocketAddr {
    "0.0.0.0:8001".parse().unwrap()
}

fn default_primary_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let primary = PrimaryConfig::default();
        assert_eq!(primary.bind_addr.port(), 8000);
        assert_eq!(primary.health_check_interval_secs, 5);

        let worker = WorkerConfig::default();
        assert_eq!(worker.bind_addr.port(), 8001);
        assert_eq!(worker.primary_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[worker]\nprimary_url = \"http://10.0.0.1:8000\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let worker = config.worker.unwrap();
        assert_eq!(worker.primary_url, "http://10.0.0.1:8000");
        assert_eq!(worker.bind_addr.port(), 8001);
        assert!(config.primary.is_none());
    }
}
