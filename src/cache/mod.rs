//! Cache tiers: blob (priority-aware LRU), chunk (TTL), and reach-aware
//! composition.
//!
//! Each tier ships in two conformance-tested flavors selected by
//! [`crate::backend`]: an indexed implementation with O(log n) eviction and
//! cleanup, and a portable scan-based reference implementation. Both follow
//! the same eviction policy, including the tie order, so their observable
//! behavior is identical.

pub mod blob;
pub mod chunk;
pub mod portable;
pub mod reach;

/// Sortable eviction key for an entry's priority score.
///
/// Scores are non-negative (NaN maps to 0.0), and `f64::to_bits` preserves
/// ordering for non-negative floats, so the raw bits sort correctly inside
/// a `BTreeMap` key.
pub(crate) fn priority_key(priority: f64) -> u64 {
    priority.max(0.0).to_bits()
}
