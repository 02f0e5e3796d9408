//! Key-value entries and the staged operations applied to them

use serde::{Deserialize, Serialize};

/// One key-value pair held by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    #[serde(default)]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    Set,
    Delete,
}

/// A staged mutation, queued on a worker and applied later in FIFO order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOperation {
    pub action: EntryAction,
    pub entry: Entry,
}

impl EntryOperation {
    pub fn set(entry: Entry) -> Self {
        Self {
            action: EntryAction::Set,
            entry,
        }
    }

    /// A delete carries no value.
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            action: EntryAction::Delete,
            entry: Entry {
                key: key.into(),
                value: Vec::new(),
            },
        }
    }
}

/// Per-worker counters reported by `GET /stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    pub object_count: usize,
}
