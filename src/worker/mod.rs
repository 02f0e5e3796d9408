//! Worker process: holds one shard of the key space

pub mod http;
pub mod server;
pub mod store;

pub use server::WorkerServer;
pub use store::MemStore;
