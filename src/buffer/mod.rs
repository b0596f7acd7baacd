//! Write buffer - priority-tiered queue of pending backing-store mutations.
//!
//! Sits between application code and the conductor client, absorbing write
//! bursts during bulk seeding, sync, and recovery. Operations live in one of
//! four queues (High, Normal, Bulk, Retry) until pulled into a batch, then
//! are tracked in-flight by batch id until the host reports the outcome.
//!
//! ```text
//! Queued(tier) -> InFlight(batch) -> Committed
//!                                 -> Retrying -> Queued(Retry, retry+1)
//!                                 -> PermanentlyFailed (budget exhausted)
//! ```
//!
//! The buffer performs no I/O and holds no timers: the host loop polls
//! `should_flush`, submits batches from `get_pending_batch` to the conductor,
//! and reports back via `mark_batch_committed` / `mark_batch_failed` /
//! `mark_operations_failed`. Single-writer access assumed; hosts running
//! multiple tasks against one instance must serialize calls.

mod op;

pub use op::{BufferStats, OpType, WriteBatch, WriteOperation, WritePriority};

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::config::WriteBufferConfig;

/// Prioritized, deduplicating write buffer with bounded retry
pub struct WriteBuffer {
    config: WriteBufferConfig,

    high: VecDeque<WriteOperation>,
    normal: VecDeque<WriteOperation>,
    bulk: VecDeque<WriteOperation>,
    retry: VecDeque<WriteOperation>,

    // dedup_key -> op_id of the queued (not in-flight) operation owning it
    dedup_index: HashMap<String, String>,

    // batch_id -> batch handed to the host, awaiting an outcome report
    in_flight: HashMap<String, WriteBatch>,

    batch_seq: u64,
    last_flush_at: u64,
    stats: BufferStats,
}

impl WriteBuffer {
    pub fn new(config: WriteBufferConfig) -> WriteBuffer {
        WriteBuffer {
            config,
            high: VecDeque::new(),
            normal: VecDeque::new(),
            bulk: VecDeque::new(),
            retry: VecDeque::new(),
            dedup_index: HashMap::new(),
            in_flight: HashMap::new(),
            batch_seq: 0,
            last_flush_at: 0,
            stats: BufferStats::default(),
        }
    }

    pub fn with_defaults() -> WriteBuffer {
        WriteBuffer::new(WriteBufferConfig::default())
    }

    pub fn config(&self) -> &WriteBufferConfig {
        &self.config
    }

    // ========================================================================
    // Enqueue
    // ========================================================================

    /// Queue a mutation. Returns `false` when the backpressure gate refuses
    /// it (queue full and priority below High); High is never rejected.
    ///
    /// If the operation carries a dedup key owned by an older queued
    /// operation, the older one is replaced - latest write wins.
    pub fn queue_write(&mut self, op: WriteOperation) -> bool {
        if op.priority != WritePriority::High && self.total_queued() >= self.config.max_queue_size {
            self.stats.ops_rejected += 1;
            debug!(
                op_id = %op.op_id,
                queued = self.total_queued(),
                "Write rejected: queue full"
            );
            return false;
        }

        if let Some(key) = op.dedup_key.clone() {
            if let Some(old_id) = self.dedup_index.get(&key).cloned() {
                if self.remove_queued(&old_id) {
                    self.stats.ops_deduplicated += 1;
                    debug!(dedup_key = %key, superseded = %old_id, "Write superseded");
                }
            }
            self.dedup_index.insert(key, op.op_id.clone());
        }

        self.stats.ops_enqueued += 1;
        match op.priority {
            WritePriority::High => self.high.push_back(op),
            WritePriority::Normal => self.normal.push_back(op),
            WritePriority::Bulk => self.bulk.push_back(op),
        }
        true
    }

    /// Convenience: attach a dedup key and queue
    pub fn queue_write_with_dedup(
        &mut self,
        op: WriteOperation,
        dedup_key: impl Into<String>,
    ) -> bool {
        self.queue_write(op.with_dedup_key(dedup_key))
    }

    // ========================================================================
    // Flush decision & batch formation
    // ========================================================================

    /// Whether the host should pull a batch now: High or Retry pending,
    /// a queue reached batch size, or the flush interval elapsed with
    /// anything queued.
    pub fn should_flush(&self, now_ms: u64) -> bool {
        if !self.high.is_empty() || !self.retry.is_empty() {
            return true;
        }
        if self.normal.len() >= self.config.batch_size || self.bulk.len() >= self.config.batch_size
        {
            return true;
        }
        self.total_queued() > 0
            && now_ms.saturating_sub(self.last_flush_at) >= self.config.flush_interval_ms
    }

    /// Form the next batch: High > Retry > Normal > Bulk. High drains fully;
    /// the others take up to `batch_size` in FIFO order. Batches are
    /// homogeneous in source queue so failure attribution stays unambiguous.
    ///
    /// Returns `None` when nothing is queued.
    pub fn get_pending_batch(&mut self, now_ms: u64) -> Option<WriteBatch> {
        let operations: Vec<WriteOperation> = if !self.high.is_empty() {
            self.high.drain(..).collect()
        } else if !self.retry.is_empty() {
            self.take_up_to_batch_size(Source::Retry)
        } else if !self.normal.is_empty() {
            self.take_up_to_batch_size(Source::Normal)
        } else if !self.bulk.is_empty() {
            self.take_up_to_batch_size(Source::Bulk)
        } else {
            return None;
        };

        // In-flight operations are no longer subject to supersession
        for op in &operations {
            if let Some(key) = &op.dedup_key {
                if self.dedup_index.get(key) == Some(&op.op_id) {
                    self.dedup_index.remove(key);
                }
            }
        }

        let priority = operations
            .iter()
            .map(|op| op.priority)
            .max()
            .unwrap_or(WritePriority::Bulk);

        self.batch_seq += 1;
        let batch = WriteBatch {
            batch_id: format!("batch-{:08}", self.batch_seq),
            operations,
            created_at: now_ms,
            priority,
        };

        debug!(
            batch_id = %batch.batch_id,
            ops = batch.len(),
            priority = ?batch.priority,
            remaining = self.total_queued(),
            "Batch formed"
        );

        self.in_flight.insert(batch.batch_id.clone(), batch.clone());
        self.last_flush_at = now_ms;
        self.stats.batches_formed += 1;
        Some(batch)
    }

    // ========================================================================
    // Outcome reporting
    // ========================================================================

    /// Commit a batch. Unknown batch ids are benign no-ops (duplicate or
    /// late delivery). Returns the number of operations committed.
    pub fn mark_batch_committed(&mut self, batch_id: &str) -> usize {
        let Some(batch) = self.in_flight.remove(batch_id) else {
            debug!(batch_id = batch_id, "Commit report for unknown batch ignored");
            return 0;
        };

        let committed = batch.len();
        self.stats.ops_committed += committed as u64;
        self.stats.batches_committed += 1;
        debug!(batch_id = batch_id, ops = committed, "Batch committed");
        committed
    }

    /// Fail a whole batch: every operation re-queues with `retry_count + 1`,
    /// or drops as permanently failed past `max_retries`. Unknown batch ids
    /// are no-ops. Returns the number of operations re-queued.
    pub fn mark_batch_failed(&mut self, batch_id: &str, error: &str) -> usize {
        let Some(batch) = self.in_flight.remove(batch_id) else {
            debug!(batch_id = batch_id, "Failure report for unknown batch ignored");
            return 0;
        };

        warn!(batch_id = batch_id, ops = batch.len(), error = error, "Batch failed");
        self.stats.batches_failed += 1;

        let mut requeued = 0;
        for op in batch.operations {
            if self.requeue_failed(op) {
                requeued += 1;
            }
        }
        requeued
    }

    /// Partial failure: operations named in `failed_op_ids` follow the
    /// retry-or-drop rule, the rest are committed. Unknown batch ids are
    /// no-ops. Returns `(committed, requeued)`.
    pub fn mark_operations_failed(
        &mut self,
        batch_id: &str,
        failed_op_ids: &[String],
    ) -> (usize, usize) {
        let Some(batch) = self.in_flight.remove(batch_id) else {
            debug!(batch_id = batch_id, "Partial-failure report for unknown batch ignored");
            return (0, 0);
        };

        let failed: HashSet<&str> = failed_op_ids.iter().map(String::as_str).collect();

        let mut committed = 0;
        let mut requeued = 0;
        let mut any_failed = false;
        for op in batch.operations {
            if failed.contains(op.op_id.as_str()) {
                any_failed = true;
                if self.requeue_failed(op) {
                    requeued += 1;
                }
            } else {
                committed += 1;
            }
        }
        self.stats.ops_committed += committed as u64;

        // A report naming no operation in the batch is a full commit
        if any_failed {
            self.stats.batches_failed += 1;
        } else {
            self.stats.batches_committed += 1;
        }

        debug!(
            batch_id = batch_id,
            committed = committed,
            requeued = requeued,
            "Partial batch outcome applied"
        );
        (committed, requeued)
    }

    /// Push every in-flight operation through the retry-or-drop rule.
    ///
    /// Graceful-shutdown hook: call before `drain_all` so in-flight work is
    /// either persisted (via the retry queue) or counted failed, instead of
    /// silently lost. Returns the number of operations processed.
    pub fn force_fail_all_in_flight(&mut self) -> usize {
        if self.in_flight.is_empty() {
            return 0;
        }

        let batches: Vec<WriteBatch> = self.in_flight.drain().map(|(_, b)| b).collect();
        let mut processed = 0;
        for batch in batches {
            warn!(batch_id = %batch.batch_id, ops = batch.len(), "Force-failing in-flight batch");
            self.stats.batches_failed += 1;
            for op in batch.operations {
                self.requeue_failed(op);
                processed += 1;
            }
        }
        processed
    }

    // ========================================================================
    // Backpressure
    // ========================================================================

    /// Queue fill ratio as 0-100. Advisory: producers should throttle bulk
    /// work when high; only the enqueue gate is enforced.
    pub fn backpressure(&self) -> u8 {
        if self.config.max_queue_size == 0 {
            return 100;
        }
        let pct = (self.total_queued() as f64 / self.config.max_queue_size as f64) * 100.0;
        pct.round().min(100.0) as u8
    }

    pub fn is_backpressured(&self) -> bool {
        self.backpressure() >= 80
    }

    // ========================================================================
    // Durability across restart
    // ========================================================================

    /// Empty every queue (Retry included, in-flight excluded) and hand the
    /// operations to the host for external persistence. In-flight batches
    /// are not covered - call `force_fail_all_in_flight` first during
    /// graceful shutdown.
    pub fn drain_all(&mut self) -> Vec<WriteOperation> {
        let mut drained = Vec::with_capacity(self.total_queued());
        drained.extend(self.high.drain(..));
        drained.extend(self.retry.drain(..));
        drained.extend(self.normal.drain(..));
        drained.extend(self.bulk.drain(..));
        self.dedup_index.clear();
        self.stats.ops_drained += drained.len() as u64;
        debug!(ops = drained.len(), "Queues drained for persistence");
        drained
    }

    /// Re-admit previously drained operations: anything with a retry count
    /// goes to the Retry queue, the rest to their priority queue. Rebuilds
    /// the dedup index.
    pub fn restore(&mut self, operations: Vec<WriteOperation>) {
        let count = operations.len();
        for op in operations {
            if let Some(key) = op.dedup_key.clone() {
                self.dedup_index.insert(key, op.op_id.clone());
            }
            self.stats.ops_enqueued += 1;
            if op.retry_count > 0 {
                self.retry.push_back(op);
            } else {
                match op.priority {
                    WritePriority::High => self.high.push_back(op),
                    WritePriority::Normal => self.normal.push_back(op),
                    WritePriority::Bulk => self.bulk.push_back(op),
                }
            }
        }
        debug!(ops = count, "Operations restored");
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Operations waiting in any queue (Retry included)
    pub fn total_queued(&self) -> usize {
        self.high.len() + self.normal.len() + self.bulk.len() + self.retry.len()
    }

    pub fn queued_at_priority(&self, priority: WritePriority) -> usize {
        match priority {
            WritePriority::High => self.high.len(),
            WritePriority::Normal => self.normal.len(),
            WritePriority::Bulk => self.bulk.len(),
        }
    }

    pub fn retry_queued(&self) -> usize {
        self.retry.len()
    }

    pub fn in_flight_batch_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight_operation_count(&self) -> usize {
        self.in_flight.values().map(WriteBatch::len).sum()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats.clone()
    }

    pub fn reset_stats(&mut self) {
        self.stats = BufferStats::default();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn take_up_to_batch_size(&mut self, source: Source) -> Vec<WriteOperation> {
        let queue = match source {
            Source::Retry => &mut self.retry,
            Source::Normal => &mut self.normal,
            Source::Bulk => &mut self.bulk,
        };
        let n = queue.len().min(self.config.batch_size);
        queue.drain(..n).collect()
    }

    /// Retry-or-drop: increments the retry count, re-queues within budget,
    /// counts the operation permanently failed otherwise.
    fn requeue_failed(&mut self, mut op: WriteOperation) -> bool {
        op.retry_count += 1;
        if op.retry_count > self.config.max_retries {
            self.stats.ops_failed += 1;
            warn!(
                op_id = %op.op_id,
                retries = op.retry_count - 1,
                "Operation dropped: retry budget exhausted"
            );
            false
        } else {
            self.retry.push_back(op);
            true
        }
    }

    /// Remove a queued (not in-flight) operation by id. Scans all four
    /// queues; sizes are small by construction.
    fn remove_queued(&mut self, op_id: &str) -> bool {
        for queue in [
            &mut self.high,
            &mut self.normal,
            &mut self.bulk,
            &mut self.retry,
        ] {
            if let Some(pos) = queue.iter().position(|op| op.op_id == op_id) {
                queue.remove(pos);
                return true;
            }
        }
        false
    }
}

enum Source {
    Retry,
    Normal,
    Bulk,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn op(id: &str, priority: WritePriority) -> WriteOperation {
        WriteOperation::new(id, OpType::CreateEntry, Bytes::from_static(b"{}"), priority)
    }

    fn small_buffer() -> WriteBuffer {
        WriteBuffer::new(WriteBufferConfig {
            batch_size: 5,
            flush_interval_ms: 100,
            max_retries: 2,
            max_queue_size: 10,
        })
    }

    #[test]
    fn test_high_priority_never_rejected() {
        let mut buffer = small_buffer();
        for i in 0..10 {
            assert!(buffer.queue_write(op(&format!("bulk-{i}"), WritePriority::Bulk)));
        }

        // Queue is at max: Normal and Bulk bounce, High always lands
        assert!(!buffer.queue_write(op("n", WritePriority::Normal)));
        assert!(!buffer.queue_write(op("b", WritePriority::Bulk)));
        assert!(buffer.queue_write(op("h", WritePriority::High)));

        assert_eq!(buffer.stats().ops_rejected, 2);
        assert_eq!(buffer.total_queued(), 11);
    }

    #[test]
    fn test_dedup_latest_write_wins() {
        let mut buffer = small_buffer();
        let first = op("op-1", WritePriority::Normal).with_dedup_key("entry:abc");
        let second = op("op-2", WritePriority::Normal).with_dedup_key("entry:abc");

        assert!(buffer.queue_write(first));
        assert!(buffer.queue_write(second));

        assert_eq!(buffer.total_queued(), 1);
        assert_eq!(buffer.stats().ops_deduplicated, 1);

        let batch = buffer.get_pending_batch(1000).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.operations[0].op_id, "op-2");
    }

    #[test]
    fn test_dedup_released_once_in_flight() {
        let mut buffer = small_buffer();
        buffer.queue_write(op("op-1", WritePriority::Normal).with_dedup_key("entry:abc"));
        let batch = buffer.get_pending_batch(1000).unwrap();

        // op-1 is in flight: a new write with the same key must not count a
        // dedup nor touch the in-flight batch
        buffer.queue_write(op("op-2", WritePriority::Normal).with_dedup_key("entry:abc"));
        assert_eq!(buffer.stats().ops_deduplicated, 0);
        assert_eq!(buffer.in_flight_operation_count(), 1);
        assert_eq!(buffer.total_queued(), 1);

        buffer.mark_batch_committed(&batch.batch_id);
    }

    #[test]
    fn test_should_flush_conditions() {
        let mut buffer = WriteBuffer::with_defaults();
        assert!(!buffer.should_flush(1000));

        // Interval elapsed with anything queued
        buffer.queue_write(op("n-1", WritePriority::Normal));
        assert!(!buffer.should_flush(50));
        assert!(buffer.should_flush(150));

        // High flushes on arrival
        buffer.queue_write(op("h-1", WritePriority::High));
        assert!(buffer.should_flush(0));
    }

    #[test]
    fn test_should_flush_on_batch_size() {
        let mut buffer = small_buffer();
        for i in 0..4 {
            buffer.queue_write(op(&format!("b-{i}"), WritePriority::Bulk));
        }
        assert!(!buffer.should_flush(50));
        buffer.queue_write(op("b-4", WritePriority::Bulk));
        assert!(buffer.should_flush(50));
    }

    #[test]
    fn test_batch_precedence_and_homogeneity() {
        let mut buffer = small_buffer();
        buffer.queue_write(op("b-1", WritePriority::Bulk));
        buffer.queue_write(op("n-1", WritePriority::Normal));
        buffer.queue_write(op("h-1", WritePriority::High));
        buffer.queue_write(op("h-2", WritePriority::High));

        // High first, drained fully
        let batch = buffer.get_pending_batch(100).unwrap();
        assert_eq!(batch.priority, WritePriority::High);
        assert_eq!(batch.len(), 2);

        // Fail the normal write so the retry queue takes precedence next
        let normal_batch = buffer.get_pending_batch(200).unwrap();
        assert_eq!(normal_batch.priority, WritePriority::Normal);
        buffer.mark_batch_failed(&normal_batch.batch_id, "conductor timeout");

        let retry_batch = buffer.get_pending_batch(300).unwrap();
        assert_eq!(retry_batch.operations[0].op_id, "n-1");
        assert_eq!(retry_batch.operations[0].retry_count, 1);

        // Bulk comes last
        buffer.mark_batch_committed(&retry_batch.batch_id);
        let bulk_batch = buffer.get_pending_batch(400).unwrap();
        assert_eq!(bulk_batch.priority, WritePriority::Bulk);
    }

    #[test]
    fn test_high_batch_never_capped() {
        let mut buffer = small_buffer();
        for i in 0..12 {
            buffer.queue_write(op(&format!("h-{i}"), WritePriority::High));
        }
        let batch = buffer.get_pending_batch(100).unwrap();
        assert_eq!(batch.len(), 12); // batch_size is 5, High drains fully
    }

    #[test]
    fn test_retry_bound_drops_exactly_once() {
        let mut buffer = small_buffer(); // max_retries = 2
        buffer.queue_write(op("doomed", WritePriority::Normal));

        for round in 0..3 {
            let batch = buffer.get_pending_batch(100 * (round + 1)).unwrap();
            buffer.mark_batch_failed(&batch.batch_id, "transient");
        }

        // retry_count went 1, 2, 3 > max_retries: dropped, not re-queued
        assert_eq!(buffer.total_queued(), 0);
        assert_eq!(buffer.stats().ops_failed, 1);
        assert!(buffer.get_pending_batch(1000).is_none());
    }

    #[test]
    fn test_partial_failure() {
        let mut buffer = small_buffer();
        for i in 0..3 {
            buffer.queue_write(op(&format!("n-{i}"), WritePriority::Normal));
        }
        let batch = buffer.get_pending_batch(100).unwrap();

        let (committed, requeued) =
            buffer.mark_operations_failed(&batch.batch_id, &["n-1".to_string()]);
        assert_eq!(committed, 2);
        assert_eq!(requeued, 1);
        assert_eq!(buffer.retry_queued(), 1);
        assert_eq!(buffer.stats().ops_committed, 2);
    }

    #[test]
    fn test_partial_failure_with_no_failures_is_a_commit() {
        let mut buffer = small_buffer();
        for i in 0..2 {
            buffer.queue_write(op(&format!("n-{i}"), WritePriority::Normal));
        }
        let batch = buffer.get_pending_batch(100).unwrap();

        let (committed, requeued) = buffer.mark_operations_failed(&batch.batch_id, &[]);
        assert_eq!((committed, requeued), (2, 0));

        let stats = buffer.stats();
        assert_eq!(stats.batches_failed, 0);
        assert_eq!(stats.batches_committed, 1);
        assert_eq!(stats.ops_committed, 2);
    }

    #[test]
    fn test_unknown_batch_reports_are_noops() {
        let mut buffer = small_buffer();
        buffer.queue_write(op("n-1", WritePriority::Normal));
        let batch = buffer.get_pending_batch(100).unwrap();

        assert_eq!(buffer.mark_batch_committed("batch-99999999"), 0);
        assert_eq!(buffer.mark_batch_failed("batch-99999999", "late"), 0);
        assert_eq!(
            buffer.mark_operations_failed("batch-99999999", &[]),
            (0, 0)
        );

        // Duplicate delivery of a real outcome is also benign
        assert_eq!(buffer.mark_batch_committed(&batch.batch_id), 1);
        assert_eq!(buffer.mark_batch_committed(&batch.batch_id), 0);
        assert_eq!(buffer.stats().ops_committed, 1);
    }

    #[test]
    fn test_backpressure_signal() {
        let mut buffer = small_buffer(); // max_queue_size = 10
        assert_eq!(buffer.backpressure(), 0);
        assert!(!buffer.is_backpressured());

        for i in 0..8 {
            buffer.queue_write(op(&format!("b-{i}"), WritePriority::Bulk));
        }
        assert_eq!(buffer.backpressure(), 80);
        assert!(buffer.is_backpressured());

        for i in 8..20 {
            buffer.queue_write(op(&format!("h-{i}"), WritePriority::High));
        }
        assert_eq!(buffer.backpressure(), 100); // capped
    }

    #[test]
    fn test_drain_and_restore() {
        let mut buffer = small_buffer();
        buffer.queue_write(op("h-1", WritePriority::High));
        buffer.queue_write(op("n-1", WritePriority::Normal).with_dedup_key("entry:n"));
        buffer.queue_write(op("b-1", WritePriority::Bulk));

        // Put one op through a failure so it carries a retry count
        let batch = buffer.get_pending_batch(100).unwrap(); // drains High
        buffer.mark_batch_failed(&batch.batch_id, "transient");

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 3);
        assert_eq!(buffer.total_queued(), 0);

        let mut restored = WriteBuffer::new(buffer.config().clone());
        restored.restore(drained);
        assert_eq!(restored.total_queued(), 3);
        assert_eq!(restored.retry_queued(), 1); // the failed High op

        // Dedup index was rebuilt: superseding n-1 still works
        restored.queue_write(op("n-2", WritePriority::Normal).with_dedup_key("entry:n"));
        assert_eq!(restored.stats().ops_deduplicated, 1);
    }

    #[test]
    fn test_force_fail_all_in_flight_before_drain() {
        let mut buffer = small_buffer();
        for i in 0..3 {
            buffer.queue_write(op(&format!("n-{i}"), WritePriority::Normal));
        }
        let batch = buffer.get_pending_batch(100).unwrap();
        assert_eq!(buffer.in_flight_operation_count(), 3);

        assert_eq!(buffer.force_fail_all_in_flight(), 3);
        assert_eq!(buffer.in_flight_batch_count(), 0);
        assert_eq!(buffer.retry_queued(), 3);

        // The drained set now includes the formerly in-flight work
        assert_eq!(buffer.drain_all().len(), 3);
        let _ = batch;
    }

    #[test]
    fn test_conservation_invariant() {
        let mut buffer = small_buffer();

        buffer.queue_write(op("a", WritePriority::Normal).with_dedup_key("k"));
        buffer.queue_write(op("b", WritePriority::Normal).with_dedup_key("k")); // dedups a
        buffer.queue_write(op("c", WritePriority::Bulk));
        buffer.queue_write(op("d", WritePriority::High));

        let batch = buffer.get_pending_batch(100).unwrap(); // High: d
        buffer.mark_batch_committed(&batch.batch_id);

        let batch = buffer.get_pending_batch(200).unwrap(); // Normal: b
        buffer.mark_batch_failed(&batch.batch_id, "transient"); // b -> retry

        let stats = buffer.stats();
        let accounted = buffer.total_queued() as u64
            + buffer.in_flight_operation_count() as u64
            + stats.ops_committed
            + stats.ops_failed
            + stats.ops_deduplicated
            + stats.ops_drained;
        assert_eq!(stats.ops_enqueued, accounted);
    }
}
