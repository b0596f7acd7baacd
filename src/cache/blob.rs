//! Indexed blob cache - bounded LRU with priority-aware eviction.
//!
//! Uses a BTreeMap keyed by `(priority, last_accessed_at)` so the least
//! valuable entry is found in O(log n) instead of scanning the whole cache.
//!
//! ## Eviction policy
//!
//! Victims are taken in ascending `(priority, last_accessed_at)` order -
//! true LRU within equal priority, ties on both broken by hash for
//! determinism. An incoming entry may only displace entries whose priority
//! is less than or equal to its own: if evicting every such entry still
//! cannot make room, the put is **rejected** (returns 0 evicted, nothing
//! stored) rather than disturbing higher-priority content.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::priority_key;
use crate::types::{CacheEntryMetadata, CacheStats};

/// Priority-aware LRU cache with O(log n) eviction
pub struct IndexedBlobCache {
    // Primary storage: hash -> entry
    entries: HashMap<String, CacheEntryMetadata>,

    // Eviction index: (priority, last_accessed_at) -> hashes with that key
    evict_index: BTreeMap<(u64, u64), Vec<String>>,

    total_size: u64,
    max_size: u64,

    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
}

impl IndexedBlobCache {
    /// Create new blob cache with a byte budget
    pub fn new(max_size_bytes: u64) -> IndexedBlobCache {
        IndexedBlobCache {
            entries: HashMap::new(),
            evict_index: BTreeMap::new(),
            total_size: 0,
            max_size: max_size_bytes,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
        }
    }

    /// Insert an entry, evicting lower-priority entries if necessary.
    ///
    /// Returns the number of entries evicted for space. Re-putting an
    /// existing hash replaces the old entry before space accounting.
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

        // Space the old copy of this hash holds is reclaimed unconditionally
        let old_size = self.entries.get(hash).map(|e| e.size_bytes).unwrap_or(0);
        let occupied = self.total_size - old_size;

        if occupied + size_bytes > self.max_size {
            let need = occupied + size_bytes - self.max_size;
            if self.reclaimable_up_to(pk, hash, need) < need {
                debug!(
                    hash = hash,
                    size = size_bytes,
                    "Put rejected: remaining space held by higher-priority entries"
                );
                return 0;
            }
        }

        // Presence check, not a size check: a zero-size entry still owns an
        // index key that must be dropped before reinsertion
        if self.entries.contains_key(hash) {
            self.remove_entry(hash);
        }

        let evicted = self.evict_until_fits(size_bytes, pk);

        self.total_size += size_bytes;
        self.evict_index
            .entry((pk, now_ms))
            .or_default()
            .push(hash.to_string());
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

    /// Wall-clock variant of [`IndexedBlobCache::put_at`]
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

    /// Check if an entry exists. Does not count toward hit/miss stats;
    /// `touch` is the read-path hook.
    pub fn has(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// Record an access: bumps `last_accessed_at` and `access_count`
    /// without altering priority. Drives both LRU recency and hit/miss
    /// accounting.
    pub fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        match self.entries.get_mut(hash) {
            Some(entry) => {
                self.hit_count += 1;
                let old_key = (priority_key(entry.priority), entry.last_accessed_at);
                entry.last_accessed_at = now_ms;
                entry.access_count += 1;

                let new_key = (old_key.0, now_ms);
                if let Some(hashes) = self.evict_index.get_mut(&old_key) {
                    hashes.retain(|h| h != hash);
                    if hashes.is_empty() {
                        self.evict_index.remove(&old_key);
                    }
                }
                self.evict_index
                    .entry(new_key)
                    .or_default()
                    .push(hash.to_string());
                true
            }
            None => {
                self.miss_count += 1;
                false
            }
        }
    }

    /// Wall-clock variant of [`IndexedBlobCache::touch_at`]
    pub fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }

    /// Remove an entry. Explicit deletes are not counted as evictions.
    pub fn delete(&mut self, hash: &str) -> bool {
        self.remove_entry(hash).is_some()
    }

    /// Get entry metadata without touching recency
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

    /// Drop all entries. Cumulative counters survive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evict_index.clear();
        self.total_size = 0;
    }

    /// Bytes reclaimable from entries with priority <= `max_pk`, capped at
    /// `need`. Walks only the candidate range of the index.
    fn reclaimable_up_to(&self, max_pk: u64, skip_hash: &str, need: u64) -> u64 {
        let mut reclaim = 0u64;
        for (_, hashes) in self.evict_index.range(..=(max_pk, u64::MAX)) {
            for h in hashes {
                if h == skip_hash {
                    continue;
                }
                if let Some(entry) = self.entries.get(h) {
                    reclaim += entry.size_bytes;
                    if reclaim >= need {
                        return reclaim;
                    }
                }
            }
        }
        reclaim
    }

    /// Evict ascending `(priority, last_accessed_at)` until `required` bytes
    /// fit, never touching entries above `max_pk`.
    fn evict_until_fits(&mut self, required: u64, max_pk: u64) -> u32 {
        let mut evicted = 0u32;

        while self.total_size + required > self.max_size {
            let Some((&key, _)) = self.evict_index.iter().next() else {
                break;
            };
            if key.0 > max_pk {
                break;
            }
            let Some(mut hashes) = self.evict_index.remove(&key) else {
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
                    debug!(hash = %entry.hash, size = entry.size_bytes, "Evicted for space");
                }
                idx += 1;
            }

            // Space reached mid-bucket: keep the remainder indexed
            if idx < hashes.len() {
                self.evict_index.insert(key, hashes.split_off(idx));
            }
        }

        evicted
    }

    fn remove_entry(&mut self, hash: &str) -> Option<CacheEntryMetadata> {
        let entry = self.entries.remove(hash)?;
        self.total_size -= entry.size_bytes;
        let key = (priority_key(entry.priority), entry.last_accessed_at);
        if let Some(hashes) = self.evict_index.get_mut(&key) {
            hashes.retain(|h| h != hash);
            if hashes.is_empty() {
                self.evict_index.remove(&key);
            }
        }
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_priority_evicted_first() {
        let mut cache = IndexedBlobCache::new(450);

        cache.put_at("low", 150, 7, "lamad", "governance", 0.2, 10);
        cache.put_at("mid", 150, 7, "lamad", "governance", 0.5, 20);
        cache.put_at("high", 150, 7, "lamad", "governance", 0.9, 30);

        // Needs 100 bytes: the lowest-priority entry goes, not the oldest
        let evicted = cache.put_at("new", 100, 7, "lamad", "governance", 0.6, 40);
        assert_eq!(evicted, 1);
        assert!(!cache.has("low"));
        assert!(cache.has("mid"));
        assert!(cache.has("high"));
        assert!(cache.has("new"));
    }

    #[test]
    fn test_lru_within_equal_priority() {
        let mut cache = IndexedBlobCache::new(300);

        cache.put_at("a", 100, 7, "lamad", "governance", 0.5, 10);
        cache.put_at("b", 100, 7, "lamad", "governance", 0.5, 20);
        cache.put_at("c", 100, 7, "lamad", "governance", 0.5, 30);

        // "a" is oldest, but touching it makes "b" the LRU victim
        assert!(cache.touch_at("a", 40));
        let evicted = cache.put_at("d", 100, 7, "lamad", "governance", 0.5, 50);
        assert_eq!(evicted, 1);
        assert!(cache.has("a"));
        assert!(!cache.has("b"));
    }

    #[test]
    fn test_put_rejected_when_only_higher_priority_holds_space() {
        let mut cache = IndexedBlobCache::new(200);

        cache.put_at("precious", 200, 0, "lamad", "identity", 0.95, 10);

        // Incoming is strictly lower priority and nothing below it can be
        // evicted: rejected, cache untouched.
        let evicted = cache.put_at("filler", 50, 7, "lamad", "governance", 0.1, 20);
        assert_eq!(evicted, 0);
        assert!(!cache.has("filler"));
        assert!(cache.has("precious"));
        assert_eq!(cache.size(), 200);
    }

    #[test]
    fn test_lowest_priority_incoming_stored_if_it_fits_after_evicting_lower() {
        let mut cache = IndexedBlobCache::new(200);

        cache.put_at("old-low", 200, 7, "lamad", "governance", 0.1, 10);

        // Equal-priority space is reclaimable: latest write wins the budget
        let evicted = cache.put_at("new-low", 150, 7, "lamad", "governance", 0.1, 20);
        assert_eq!(evicted, 1);
        assert!(cache.has("new-low"));
        assert!(!cache.has("old-low"));
    }

    #[test]
    fn test_oversized_put_rejected() {
        let mut cache = IndexedBlobCache::new(100);
        cache.put_at("small", 60, 7, "lamad", "governance", 0.2, 10);

        let evicted = cache.put_at("huge", 500, 7, "lamad", "governance", 0.9, 20);
        assert_eq!(evicted, 0);
        assert!(!cache.has("huge"));
        assert!(cache.has("small"));
    }

    #[test]
    fn test_replace_same_hash_updates_size() {
        let mut cache = IndexedBlobCache::new(300);
        cache.put_at("doc", 200, 3, "lamad", "scenario", 0.5, 10);
        cache.put_at("doc", 100, 3, "lamad", "scenario", 0.5, 20);

        assert_eq!(cache.count(), 1);
        assert_eq!(cache.size(), 100);
    }

    #[test]
    fn test_zero_size_reput_reindexes_priority() {
        let mut cache = IndexedBlobCache::new(100);

        // A zero-size entry re-put at a higher priority must move in the
        // eviction index, not linger under its old low-priority key
        cache.put_at("marker", 0, 7, "lamad", "governance", 0.1, 10);
        cache.put_at("marker", 0, 7, "lamad", "governance", 0.9, 20);
        cache.put_at("bulk", 100, 7, "lamad", "governance", 0.2, 30);

        let evicted = cache.put_at("next", 100, 7, "lamad", "governance", 0.3, 40);
        assert_eq!(evicted, 1);
        assert!(!cache.has("bulk"));
        assert!(cache.has("marker"));
        assert_eq!(
            cache.metadata("marker").map(|e| e.priority.to_bits()),
            Some(0.9f64.to_bits())
        );
    }

    #[test]
    fn test_touch_drives_stats() {
        let mut cache = IndexedBlobCache::new(1000);
        cache.put_at("doc", 100, 7, "lamad", "governance", 0.5, 10);

        assert!(cache.touch_at("doc", 20));
        assert!(!cache.touch_at("missing", 30));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(cache.metadata("doc").map(|e| e.access_count), Some(1));
    }

    #[test]
    fn test_clear_keeps_cumulative_counters() {
        let mut cache = IndexedBlobCache::new(100);
        for i in 0..5 {
            cache.put_at(&format!("h{i}"), 60, 7, "lamad", "governance", 0.5, i);
        }
        let evictions_before = cache.stats().eviction_count;
        assert!(evictions_before > 0);

        cache.clear();
        assert_eq!(cache.count(), 0);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().eviction_count, evictions_before);
    }
}
