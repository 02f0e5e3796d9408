//! Primary process: client routing, node registry, rebalance coordination

pub mod client;
pub mod health;
pub mod http;
pub(crate) mod rebalance;
pub mod registry;
pub mod server;
pub(crate) mod transfer;

pub use client::WorkerClient;
pub use registry::{Node, NodeRegistry};
pub use server::Primary;
