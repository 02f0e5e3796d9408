//! # shardkv
//!
//! A sharded, in-memory key-value cluster:
//! - a primary routes client key operations to the owning worker,
//! - workers each hold one shard of the total key space,
//! - keys are redistributed automatically when workers join or leave.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                Primary                   │
//! │  (node registry + rebalance coordinator) │
//! └───────────┬──────────────────────────────┘
//!             │ HTTP
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐  ┌─────▼──────┐  ┌───▼────────┐
//! │ Worker 0   │  │ Worker 1   │  │ Worker 2   │
//! │ (shard 0)  │  │ (shard 1)  │  │ (shard 2)  │
//! └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! A key belongs to the worker at index `partition_key(key, N)`, where N is
//! the current number of workers. Exactly one copy of each key exists at a
//! time; there is no replication and no persistence.
//!
//! ## Usage
//!
//! ### Start a primary
//! ```bash
//! shardkv-primary --bind 0.0.0.0:8000
//! ```
//!
//! ### Start a worker
//! ```bash
//! shardkv-worker --bind 0.0.0.0:8001 --primary http://localhost:8000
//! ```
//!
//! ### Talk to the cluster
//! ```bash
//! curl -X POST localhost:8000/keys/greeting -d 'hello'
//! curl localhost:8000/keys/greeting
//! curl localhost:8000/nodes
//! ```

pub mod common;
pub mod primary;
pub mod worker;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use primary::Primary;
pub use worker::WorkerServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
