//! Deterministic key-to-shard assignment
//!
//! The partition function is an additive checksum of the key's bytes modulo
//! the partition count. It is deliberately weak: distribution is only
//! approximately fair, but the function is pure, stable for a fixed count,
//! and cheap. Note the consequence of mod-N sharding: changing N invalidates
//! the ownership of potentially every key, not just one node's keys, which
//! is why a membership change triggers a full rebalance pass.

use crate::common::{Error, Result};

/// Returns the index of the partition owning `key`.
pub fn partition_key(key: &str, num_partitions: usize) -> Result<usize> {
    if num_partitions == 0 {
        return Err(Error::Validation(
            "number of partitions must be greater than zero".to_string(),
        ));
    }
    let sum: u64 = key.bytes().map(u64::from).sum();
    Ok((sum % num_partitions as u64) as usize)
}
