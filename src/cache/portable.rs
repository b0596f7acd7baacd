//! Portable reference caches - scan-based, always available.
//!
//! Same contracts and the same eviction policy (including tie order) as the
//! indexed implementations in [`super::blob`] and [`super::chunk`], but
//! victims are found by scanning the entry table instead of maintaining
//! ordering indexes. O(n) per eviction, which is the conformance baseline
//! the indexed implementations are tested against.

use std::collections::HashMap;
use tracing::debug;

use super::chunk::ChunkEntry;
use super::priority_key;
use crate::types::{CacheEntryMetadata, CacheStats};

/// Scan-based priority-aware LRU cache
pub struct PortableBlobCache {
    entries: HashMap<String, CacheEntryMetadata>,
    total_size: u64,
    max_size: u64,
    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
}

impl PortableBlobCache {
    pub fn new(max_size_bytes: u64) -> PortableBlobCache {
        PortableBlobCache {
            entries: HashMap::new(),
            total_size: 0,
            max_size: max_size_bytes,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
        }
    }

    /// Insert an entry. Identical policy to `IndexedBlobCache::put_at`:
    /// ascending `(priority, last_accessed_at, hash)` eviction among entries
    /// of priority <= incoming, rejection when room cannot be made.
    pub fn put_at(
        &mut self,
        hash: &str,
        size_bytes: u64,
        reach_level: u8,
        domain: &str,
        epic: &str,
        priority: f64,
        now_ms: u64,
    ) -> u32 {
        let pk = priority_key(priority);

        let old_size = self.entries.get(hash).map(|e| e.size_bytes).unwrap_or(0);
        let occupied = self.total_size - old_size;

        if occupied + size_bytes > self.max_size {
            let need = occupied + size_bytes - self.max_size;
            let reclaim: u64 = self
                .entries
                .values()
                .filter(|e| e.hash != hash && priority_key(e.priority) <= pk)
                .map(|e| e.size_bytes)
                .sum();
            if reclaim < need {
                debug!(
                    hash = hash,
                    size = size_bytes,
                    "Put rejected: remaining space held by higher-priority entries"
                );
                return 0;
            }
        }

        if let Some(old) = self.entries.remove(hash) {
            self.total_size -= old.size_bytes;
        }

        let evicted = self.evict_until_fits(size_bytes, pk);

        self.total_size += size_bytes;
        self.entries.insert(
            hash.to_string(),
            CacheEntryMetadata {
                hash: hash.to_string(),
                size_bytes,
                created_at: now_ms,
                last_accessed_at: now_ms,
                access_count: 0,
                reach_level,
                domain: domain.to_string(),
                epic: epic.to_string(),
                priority,
            },
        );

        evicted
    }

    #[allow(clippy::too_many_arguments)]
    pub fn put(
        &mut self,
        hash: &str,
        size_bytes: u64,
        reach_level: u8,
        domain: &str,
        epic: &str,
        priority: f64,
    ) -> u32 {
        self.put_at(
            hash,
            size_bytes,
            reach_level,
            domain,
            epic,
            priority,
            crate::current_time_ms(),
        )
    }

    pub fn has(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        match self.entries.get_mut(hash) {
            Some(entry) => {
                self.hit_count += 1;
                entry.last_accessed_at = now_ms;
                entry.access_count += 1;
                true
            }
            None => {
                self.miss_count += 1;
                false
            }
        }
    }

    pub fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }

    pub fn delete(&mut self, hash: &str) -> bool {
        match self.entries.remove(hash) {
            Some(entry) => {
                self.total_size -= entry.size_bytes;
                true
            }
            None => false,
        }
    }

    pub fn metadata(&self, hash: &str) -> Option<&CacheEntryMetadata> {
        self.entries.get(hash)
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

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    fn evict_until_fits(&mut self, required: u64, max_pk: u64) -> u32 {
        let mut evicted = 0u32;

        while self.total_size + required > self.max_size {
            // Full scan for the least valuable candidate at or below max_pk
            let victim = self
                .entries
                .values()
                .filter(|e| priority_key(e.priority) <= max_pk)
                .min_by(|a, b| {
                    (priority_key(a.priority), a.last_accessed_at, &a.hash)
                        .cmp(&(priority_key(b.priority), b.last_accessed_at, &b.hash))
                })
                .map(|e| e.hash.clone());

            let Some(hash) = victim else { break };
            if let Some(entry) = self.entries.remove(&hash) {
                self.total_size -= entry.size_bytes;
                self.eviction_count += 1;
                evicted += 1;
                debug!(hash = %hash, size = entry.size_bytes, "Evicted for space");
            }
        }

        evicted
    }
}

/// Scan-based TTL chunk cache
pub struct PortableChunkCache {
    entries: HashMap<String, ChunkEntry>,
    total_size: u64,
    max_size: u64,
    ttl_millis: u64,
    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
    cleanup_count: u64,
}

impl PortableChunkCache {
    pub fn new(max_size_bytes: u64, ttl_millis: u64) -> PortableChunkCache {
        PortableChunkCache {
            entries: HashMap::new(),
            total_size: 0,
            max_size: max_size_bytes,
            ttl_millis,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
            cleanup_count: 0,
        }
    }

    pub fn put_at(&mut self, hash: &str, size_bytes: u64, now_ms: u64) -> u32 {
        self.cleanup(now_ms);

        if size_bytes > self.max_size {
            debug!(hash = hash, size = size_bytes, "Chunk larger than cache budget, skipped");
            return 0;
        }

        if let Some(old) = self.entries.remove(hash) {
            self.total_size -= old.size_bytes;
        }

        let evicted = self.evict_until_fits(size_bytes);

        self.total_size += size_bytes;
        self.entries.insert(
            hash.to_string(),
            ChunkEntry {
                size_bytes,
                inserted_at: now_ms,
            },
        );

        evicted
    }

    pub fn put(&mut self, hash: &str, size_bytes: u64) -> u32 {
        self.put_at(hash, size_bytes, crate::current_time_ms())
    }

    pub fn has_at(&mut self, hash: &str, now_ms: u64) -> bool {
        self.lookup(hash, now_ms)
    }

    pub fn has(&mut self, hash: &str) -> bool {
        self.has_at(hash, crate::current_time_ms())
    }

    pub fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        self.lookup(hash, now_ms)
    }

    pub fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }

    pub fn delete(&mut self, hash: &str) -> bool {
        match self.entries.remove(hash) {
            Some(entry) => {
                self.total_size -= entry.size_bytes;
                true
            }
            None => false,
        }
    }

    /// Eager full sweep. O(n) here, unlike the indexed range sweep.
    pub fn cleanup(&mut self, now_ms: u64) -> u32 {
        let ttl = self.ttl_millis;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now_ms.saturating_sub(e.inserted_at) > ttl)
            .map(|(h, _)| h.clone())
            .collect();

        let mut cleaned = 0u32;
        for hash in expired {
            if let Some(entry) = self.entries.remove(&hash) {
                self.total_size -= entry.size_bytes;
                cleaned += 1;
            }
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

    pub fn cleanup_count(&self) -> u64 {
        self.cleanup_count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
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
            self.delete(hash);
            self.miss_count += 1;
            false
        } else {
            self.hit_count += 1;
            true
        }
    }

    fn evict_until_fits(&mut self, required: u64) -> u32 {
        let mut evicted = 0u32;

        while self.total_size + required > self.max_size {
            let victim = self
                .entries
                .iter()
                .min_by(|(ha, a), (hb, b)| (a.inserted_at, ha).cmp(&(b.inserted_at, hb)))
                .map(|(h, _)| h.clone());

            let Some(hash) = victim else { break };
            if let Some(entry) = self.entries.remove(&hash) {
                self.total_size -= entry.size_bytes;
                self.eviction_count += 1;
                evicted += 1;
            }
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portable_blob_priority_eviction() {
        let mut cache = PortableBlobCache::new(300);
        cache.put_at("low", 100, 7, "lamad", "governance", 0.1, 10);
        cache.put_at("high", 100, 7, "lamad", "governance", 0.9, 20);
        cache.put_at("mid", 100, 7, "lamad", "governance", 0.5, 30);

        let evicted = cache.put_at("new", 100, 7, "lamad", "governance", 0.5, 40);
        assert_eq!(evicted, 1);
        assert!(!cache.has("low"));
        assert!(cache.has("high"));
        assert!(cache.has("mid"));
    }

    #[test]
    fn test_portable_blob_rejects_against_higher_priority() {
        let mut cache = PortableBlobCache::new(100);
        cache.put_at("precious", 100, 0, "lamad", "identity", 0.9, 10);

        assert_eq!(cache.put_at("filler", 50, 7, "lamad", "governance", 0.1, 20), 0);
        assert!(cache.has("precious"));
        assert!(!cache.has("filler"));
    }

    #[test]
    fn test_portable_chunk_ttl_and_eviction() {
        let mut cache = PortableChunkCache::new(200, 1000);
        cache.put_at("a", 100, 0);
        cache.put_at("b", 100, 10);

        // Oldest-first space eviction
        let evicted = cache.put_at("c", 100, 20);
        assert_eq!(evicted, 1);
        assert!(!cache.has_at("a", 20));

        // TTL expiry
        assert!(!cache.has_at("b", 1011));
        assert_eq!(cache.cleanup(1015), 0); // "b" already lazily removed
        assert!(cache.has_at("c", 1015));
        assert_eq!(cache.cleanup(2000), 1); // "c" swept eagerly
        assert_eq!(cache.count(), 0);
    }
}
