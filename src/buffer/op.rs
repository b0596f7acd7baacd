//! Write buffer data types: operations, batches, statistics.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Mutation kind against the backing store
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OpType {
    CreateEntry,
    UpdateEntry,
    DeleteEntry,
    CreateLink,
    DeleteLink,
}

/// Write priority tier.
///
/// High is reserved for identity/auth/consent writes that must never
/// silently drop; it bypasses the backpressure gate and flushes on arrival.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WritePriority {
    Bulk = 0,
    Normal = 1,
    High = 2,
}

/// One queued mutation. Owned by the buffer from enqueue until commit or
/// permanent failure; callers only hold copies returned in batches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteOperation {
    /// Caller-supplied unique id
    pub op_id: String,
    pub op_type: OpType,
    /// Opaque serialized payload
    pub payload: Bytes,
    pub priority: WritePriority,
    pub queued_at: u64,
    pub retry_count: u32,
    /// Collapses superseding writes to the same logical target before flush
    pub dedup_key: Option<String>,
}

impl WriteOperation {
    pub fn new(
        op_id: impl Into<String>,
        op_type: OpType,
        payload: Bytes,
        priority: WritePriority,
    ) -> WriteOperation {
        WriteOperation {
            op_id: op_id.into(),
            op_type,
            payload,
            priority,
            queued_at: crate::current_time_ms(),
            retry_count: 0,
            dedup_key: None,
        }
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> WriteOperation {
        self.dedup_key = Some(key.into());
        self
    }
}

/// A group of operations released together. Ephemeral: created by
/// `get_pending_batch`, destroyed by the outcome report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteBatch {
    /// Buffer-generated, monotonic
    pub batch_id: String,
    pub operations: Vec<WriteOperation>,
    pub created_at: u64,
    /// Highest priority among the batch's operations
    pub priority: WritePriority,
}

impl WriteBatch {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Cumulative write buffer counters (since construction or `reset_stats`).
///
/// Conservation: `ops_enqueued` always equals queued + in-flight +
/// `ops_committed` + `ops_failed` + `ops_deduplicated` + `ops_drained`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BufferStats {
    /// Operations accepted by `queue_write` (rejected enqueues not included)
    pub ops_enqueued: u64,
    pub ops_committed: u64,
    /// Operations dropped after exhausting the retry budget
    pub ops_failed: u64,
    /// Older operations replaced by a newer write with the same dedup key
    pub ops_deduplicated: u64,
    /// Non-High enqueues refused by the backpressure gate
    pub ops_rejected: u64,
    /// Operations handed to the host by `drain_all`
    pub ops_drained: u64,
    pub batches_formed: u64,
    pub batches_committed: u64,
    pub batches_failed: u64,
}
