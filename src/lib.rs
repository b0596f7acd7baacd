//! Reach Cache Core - Content-Reach Aware Caching & Write Buffering
//!
//! Client-side content layer for the Elohim Protocol: content is replicated
//! across reach levels (private → commons) and a local node caches it while
//! protecting the conductor from write bursts during seeding, sync, and
//! recovery.
//!
//! ## Components
//!
//! - **Priority model**: pure scoring of retention priority from reach level,
//!   custodian proximity, bandwidth class, steward tier, affinity, and age
//! - **Blob cache**: bounded LRU keyed by content hash with priority-aware
//!   eviction
//! - **Chunk cache**: bounded TTL store for transient transport chunks
//! - **Reach-aware cache**: eight isolated blob caches, one per reach level,
//!   so private and commons content never evict each other
//! - **Write buffer**: priority-tiered queue of pending conductor mutations
//!   with dedup, batching, backpressure, and bounded retry
//! - **Backend selector**: indexed (O(log n)) vs portable (scan-based)
//!   implementations behind shared traits, conformance-tested for parity
//!
//! The core is single-threaded and synchronous: no internal timers, no I/O,
//! no suspension points. An external host loop drives `should_flush`,
//! `cleanup`, and batch submission, and serializes access if it runs more
//! than one task against an instance.

pub mod backend;
pub mod buffer;
pub mod cache;
pub mod config;
pub mod error;
pub mod priority;
pub mod types;

pub use backend::{select_backend, AnyBlobCache, AnyChunkCache, BackendKind, SelectedBackend};
pub use backend::{BlobCacheBackend, ChunkCacheBackend};
pub use buffer::{BufferStats, OpType, WriteBatch, WriteBuffer, WriteOperation, WritePriority};
pub use cache::blob::IndexedBlobCache;
pub use cache::chunk::IndexedChunkCache;
pub use cache::portable::{PortableBlobCache, PortableChunkCache};
pub use cache::reach::ReachAwareCache;
pub use config::{CacheConfig, WriteBufferConfig};
pub use error::{CoreError, Result};
pub use priority::{priority, PriorityParams};
pub use types::{BandwidthClass, CacheEntryMetadata, CacheStats, ReachLevel, StewardTier};

use sha2::{Digest, Sha256};

/// Compute the content-addressed identity for a payload (hex SHA256).
pub fn compute_content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Get current wall-clock time in milliseconds since the Unix epoch.
///
/// Hosts pass this into the explicit-`now` entry points (`should_flush`,
/// `get_pending_batch`, `cleanup`, the `*_at` cache methods) so that tests
/// can substitute deterministic timestamps.
pub fn current_time_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_hex() {
        let h = compute_content_hash(b"lamad-path-1");
        assert_eq!(h.len(), 64);
        assert_eq!(h, compute_content_hash(b"lamad-path-1"));
        assert_ne!(h, compute_content_hash(b"lamad-path-2"));
    }
}
