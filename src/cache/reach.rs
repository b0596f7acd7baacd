//! Reach-aware cache - eight isolated blob caches, one per reach level.
//!
//! Content at different reach levels never evicts each other: private and
//! commons content compete for different trust/storage budgets, not the same
//! physical pool. A flood of commons puts can exhaust only the commons
//! budget.
//!
//! Callers must know the reach level a hash lives at; there is no reverse
//! index and no cross-level search. This is a deliberate simplicity choice -
//! a hash may legitimately exist at several levels as independent entries.

use std::collections::HashMap;
use tracing::debug;

use crate::backend::BlobCacheBackend;
use crate::types::{CacheEntryMetadata, CacheStats, REACH_LEVEL_COUNT};

/// Multi-reach blob cache, generic over the blob backend
pub struct ReachAwareCache<B> {
    // One cache per reach level (0-7), each with its own byte budget
    levels: Vec<B>,
    max_size_per_reach: u64,

    // Advisory index: "domain:epic" -> hashes put under that tag pair.
    // Entries evicted for space may linger here until deleted; callers
    // re-check `has` before acting on a listed hash.
    domain_epic_index: HashMap<String, Vec<String>>,
}

impl<B: BlobCacheBackend> ReachAwareCache<B> {
    /// Create a reach-aware cache, constructing each level through `make`
    pub fn new_with(max_size_per_reach: u64, mut make: impl FnMut(u64) -> B) -> Self {
        let levels = (0..REACH_LEVEL_COUNT)
            .map(|_| make(max_size_per_reach))
            .collect();
        ReachAwareCache {
            levels,
            max_size_per_reach,
            domain_epic_index: HashMap::new(),
        }
    }

    /// Insert at the cache for `reach_level`; eviction stays inside that
    /// level. Returns entries evicted there.
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
        let level = Self::level_index(reach_level);
        let evicted =
            self.levels[level].put_at(hash, size_bytes, reach_level, domain, epic, priority, now_ms);

        if self.levels[level].has(hash) {
            let key = Self::tag_key(domain, epic);
            let hashes = self.domain_epic_index.entry(key).or_default();
            if !hashes.iter().any(|h| h == hash) {
                hashes.push(hash.to_string());
            }
        } else {
            debug!(
                hash = hash,
                reach = reach_level,
                "Put rejected by reach-level budget"
            );
        }

        evicted
    }

    /// Wall-clock variant of [`ReachAwareCache::put_at`]
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

    pub fn has(&self, hash: &str, reach_level: u8) -> bool {
        self.levels[Self::level_index(reach_level)].has(hash)
    }

    pub fn touch_at(&mut self, hash: &str, reach_level: u8, now_ms: u64) -> bool {
        self.levels[Self::level_index(reach_level)].touch_at(hash, now_ms)
    }

    pub fn touch(&mut self, hash: &str, reach_level: u8) -> bool {
        self.touch_at(hash, reach_level, crate::current_time_ms())
    }

    pub fn delete(&mut self, hash: &str, reach_level: u8) -> bool {
        let level = Self::level_index(reach_level);

        // Grab the tag pair before the entry goes away
        let tag_key = self.levels[level]
            .metadata(hash)
            .map(|e| Self::tag_key(&e.domain, &e.epic));

        let deleted = self.levels[level].delete(hash);
        if deleted {
            if let Some(key) = tag_key {
                if let Some(hashes) = self.domain_epic_index.get_mut(&key) {
                    hashes.retain(|h| h != hash);
                    if hashes.is_empty() {
                        self.domain_epic_index.remove(&key);
                    }
                }
            }
        }
        deleted
    }

    pub fn metadata(&self, hash: &str, reach_level: u8) -> Option<&CacheEntryMetadata> {
        self.levels[Self::level_index(reach_level)].metadata(hash)
    }

    /// Statistics for a single reach level
    pub fn stats_for_reach(&self, reach_level: u8) -> CacheStats {
        self.levels[Self::level_index(reach_level)].stats()
    }

    /// Item count across all reach levels
    pub fn total_count(&self) -> usize {
        self.levels.iter().map(|c| c.count()).sum()
    }

    /// Bytes across all reach levels
    pub fn total_size(&self) -> u64 {
        self.levels.iter().map(|c| c.size()).sum()
    }

    pub fn max_size_per_reach(&self) -> u64 {
        self.max_size_per_reach
    }

    /// Hashes put under a domain/epic tag pair (advisory - re-check `has`)
    pub fn hashes_for_domain_epic(&self, domain: &str, epic: &str) -> Vec<String> {
        self.domain_epic_index
            .get(&Self::tag_key(domain, epic))
            .cloned()
            .unwrap_or_default()
    }

    /// Clear every level and the tag index
    pub fn clear_all(&mut self) {
        for cache in &mut self.levels {
            cache.clear();
        }
        self.domain_epic_index.clear();
    }

    fn level_index(reach_level: u8) -> usize {
        (reach_level as usize).min(REACH_LEVEL_COUNT - 1)
    }

    fn tag_key(domain: &str, epic: &str) -> String {
        format!("{domain}:{epic}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::blob::IndexedBlobCache;

    fn test_cache(per_reach: u64) -> ReachAwareCache<IndexedBlobCache> {
        ReachAwareCache::new_with(per_reach, IndexedBlobCache::new)
    }

    #[test]
    fn test_reach_isolation() {
        let mut cache = test_cache(300);

        cache.put_at("private-doc", 200, 0, "lamad", "identity", 0.3, 10);

        // Flood commons far past its budget
        for i in 0..20 {
            cache.put_at(&format!("commons-{i}"), 100, 7, "lamad", "governance", 0.9, 20 + i);
        }

        // Private content survives untouched; commons stayed within budget
        assert!(cache.has("private-doc", 0));
        assert_eq!(cache.stats_for_reach(0).eviction_count, 0);
        assert!(cache.stats_for_reach(7).total_bytes <= 300);
        assert!(cache.stats_for_reach(7).eviction_count > 0);
    }

    #[test]
    fn test_same_hash_at_multiple_levels() {
        let mut cache = test_cache(1000);

        cache.put_at("shared", 100, 0, "lamad", "scenario", 0.5, 10);
        cache.put_at("shared", 100, 7, "lamad", "scenario", 0.5, 20);

        assert!(cache.has("shared", 0));
        assert!(cache.has("shared", 7));
        assert_eq!(cache.total_count(), 2);

        // Independent lifecycles
        assert!(cache.delete("shared", 0));
        assert!(!cache.has("shared", 0));
        assert!(cache.has("shared", 7));
    }

    #[test]
    fn test_lookup_requires_correct_level() {
        let mut cache = test_cache(1000);
        cache.put_at("doc", 100, 3, "lamad", "path", 0.5, 10);

        assert!(cache.has("doc", 3));
        assert!(!cache.has("doc", 4));
        assert!(!cache.touch_at("doc", 4, 20));
        assert!(cache.touch_at("doc", 3, 20));
    }

    #[test]
    fn test_domain_epic_index() {
        let mut cache = test_cache(1000);
        cache.put_at("a", 100, 7, "lamad", "governance", 0.5, 10);
        cache.put_at("b", 100, 7, "lamad", "governance", 0.5, 20);
        cache.put_at("c", 100, 7, "fct", "governance", 0.5, 30);

        let mut hashes = cache.hashes_for_domain_epic("lamad", "governance");
        hashes.sort();
        assert_eq!(hashes, vec!["a".to_string(), "b".to_string()]);

        cache.delete("a", 7);
        assert_eq!(
            cache.hashes_for_domain_epic("lamad", "governance"),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn test_totals_aggregate_levels() {
        let mut cache = test_cache(1000);
        cache.put_at("p", 100, 0, "lamad", "x", 0.5, 10);
        cache.put_at("m", 200, 4, "lamad", "x", 0.5, 20);
        cache.put_at("c", 300, 7, "lamad", "x", 0.5, 30);

        assert_eq!(cache.total_count(), 3);
        assert_eq!(cache.total_size(), 600);

        cache.clear_all();
        assert_eq!(cache.total_count(), 0);
        assert_eq!(cache.total_size(), 0);
        assert!(cache.hashes_for_domain_epic("lamad", "x").is_empty());
    }
}
