//! Indexed chunk cache - bounded TTL store for transient transport chunks.
//!
//! Every entry expires at `inserted_at + ttl_millis`. Lookups lazily evict
//! expired entries; `cleanup` sweeps eagerly via a BTreeMap range over
//! insertion times, O(k) in the number of expired entries. Space eviction
//! uses insertion order (oldest first) - chunk data is transient by
//! construction, so no priority is tracked.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::types::CacheStats;

/// One cached chunk. Chunks carry no reach or priority metadata.
#[derive(Clone, Debug)]
pub(crate) struct ChunkEntry {
    pub size_bytes: u64,
    pub inserted_at: u64,
}

/// TTL cache with O(k) cleanup
pub struct IndexedChunkCache {
    // Primary storage: hash -> entry
    entries: HashMap<String, ChunkEntry>,

    // Insertion-time index: inserted_at -> hashes, for cleanup and
    // oldest-first eviction
    insert_index: BTreeMap<u64, Vec<String>>,

    total_size: u64,
    max_size: u64,
    ttl_millis: u64,

    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
    cleanup_count: u64,
}

impl IndexedChunkCache {
    /// Create new chunk cache with a byte budget and TTL
    pub fn new(max_size_bytes: u64, ttl_millis: u64) -> IndexedChunkCache {
        IndexedChunkCache {
            entries: HashMap::new(),
            insert_index: BTreeMap::new(),
            total_size: 0,
            max_size: max_size_bytes,
            ttl_millis,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
            cleanup_count: 0,
        }
    }

    /// Insert a chunk, sweeping expired entries first and evicting
    /// oldest-inserted chunks if space is still needed. Returns the number
    /// evicted for space (expired removals count toward `cleanup` instead).
    pub fn put_at(&mut self, hash: &str, size_bytes: u64, now_ms: u64) -> u32 {
        self.cleanup(now_ms);

        if size_bytes > self.max_size {
            debug!(hash = hash, size = size_bytes, "Chunk larger than cache budget, skipped");
            return 0;
        }

        // Replacing an existing chunk frees its space first
        self.remove_entry(hash);

        let evicted = self.evict_until_fits(size_bytes);

        self.total_size += size_bytes;
        self.insert_index
            .entry(now_ms)
            .or_default()
            .push(hash.to_string());
        self.entries.insert(
            hash.to_string(),
            ChunkEntry {
                size_bytes,
                inserted_at: now_ms,
            },
        );

        evicted
    }

    /// Wall-clock variant of [`IndexedChunkCache::put_at`]
    pub fn put(&mut self, hash: &str, size_bytes: u64) -> u32 {
        self.put_at(hash, size_bytes, crate::current_time_ms())
    }

    /// Check presence. An expired entry is treated as absent and removed.
    pub fn has_at(&mut self, hash: &str, now_ms: u64) -> bool {
        self.lookup(hash, now_ms)
    }

    /// Wall-clock variant of [`IndexedChunkCache::has_at`]
    pub fn has(&mut self, hash: &str) -> bool {
        self.has_at(hash, crate::current_time_ms())
    }

    /// Revalidate a chunk. Same expiry behavior as `has_at`; chunks carry no
    /// recency state since space eviction is insertion-ordered.
    pub fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        self.lookup(hash, now_ms)
    }

    /// Wall-clock variant of [`IndexedChunkCache::touch_at`]
    pub fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }

    /// Remove a chunk
    pub fn delete(&mut self, hash: &str) -> bool {
        self.remove_entry(hash)
    }

    /// Eager full sweep of expired entries. O(k) in expired count; safe to
    /// call from a host timer without holding up request paths.
    pub fn cleanup(&mut self, now_ms: u64) -> u32 {
        let mut cleaned = 0u32;
        let cutoff = match now_ms.checked_sub(self.ttl_millis) {
            Some(c) => c,
            None => return 0, // nothing can be expired yet
        };

        // Expired means age strictly greater than TTL, matching `has`/`touch`
        let expired_times: Vec<u64> = self
            .insert_index
            .range(..cutoff)
            .map(|(&t, _)| t)
            .collect();

        for time in expired_times {
            if let Some(hashes) = self.insert_index.remove(&time) {
                for hash in hashes {
                    if let Some(entry) = self.entries.remove(&hash) {
                        self.total_size -= entry.size_bytes;
                        cleaned += 1;
                    }
                }
            }
        }

        if cleaned > 0 {
            debug!(removed = cleaned, "Chunk cleanup sweep");
        }
        self.cleanup_count += u64::from(cleaned);
        cleaned
    }

    pub fn size(&self) -> u64 {
        self.total_size
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Live statistics snapshot
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            item_count: self.entries.len(),
            total_bytes: self.total_size,
            max_bytes: self.max_size,
            eviction_count: self.eviction_count,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
        }
    }

    /// Cumulative count of entries removed by `cleanup` sweeps
    pub fn cleanup_count(&self) -> u64 {
        self.cleanup_count
    }

    /// Drop all chunks. Cumulative counters survive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insert_index.clear();
        self.total_size = 0;
    }

    fn lookup(&mut self, hash: &str, now_ms: u64) -> bool {
        let expired = match self.entries.get(hash) {
            Some(entry) => now_ms.saturating_sub(entry.inserted_at) > self.ttl_millis,
            None => {
                self.miss_count += 1;
                return false;
            }
        };

        if expired {
            self.remove_entry(hash);
            self.miss_count += 1;
            false
        } else {
            self.hit_count += 1;
            true
        }
    }

    /// Evict oldest-inserted chunks until `required` bytes fit
    fn evict_until_fits(&mut self, required: u64) -> u32 {
        let mut evicted = 0u32;

        while self.total_size + required > self.max_size {
            let Some((&oldest, _)) = self.insert_index.iter().next() else {
                break;
            };
            let Some(mut hashes) = self.insert_index.remove(&oldest) else {
                break;
            };
            // Deterministic tie order within a bucket
            hashes.sort();

            let mut idx = 0;
            while idx < hashes.len() && self.total_size + required > self.max_size {
                if let Some(entry) = self.entries.remove(&hashes[idx]) {
                    self.total_size -= entry.size_bytes;
                    self.eviction_count += 1;
                    evicted += 1;
                }
                idx += 1;
            }

            if idx < hashes.len() {
                self.insert_index.insert(oldest, hashes.split_off(idx));
            }
        }

        evicted
    }

    fn remove_entry(&mut self, hash: &str) -> bool {
        let Some(entry) = self.entries.remove(hash) else {
            return false;
        };
        self.total_size -= entry.size_bytes;
        if let Some(hashes) = self.insert_index.get_mut(&entry.inserted_at) {
            hashes.retain(|h| h != hash);
            if hashes.is_empty() {
                self.insert_index.remove(&entry.inserted_at);
            }
        }
        true
    }
}
