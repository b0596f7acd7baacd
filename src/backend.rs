//! Backend selection - indexed vs portable cache implementations behind
//! shared contracts.
//!
//! One trait per cache component, two conformance-tested implementations.
//! The factory picks the indexed backend when its self-check probe passes,
//! with the portable backend always available as fallback; call sites
//! depend only on the traits. A shared property suite (`tests/conformance.rs`)
//! runs against both implementations to guarantee behavioral parity.
//!
//! Selection order: explicit override in code, then the
//! `REACH_CACHE_BACKEND` environment variable (`indexed` / `portable`),
//! then the probe.

use tracing::{info, warn};

use crate::cache::blob::IndexedBlobCache;
use crate::cache::chunk::IndexedChunkCache;
use crate::cache::portable::{PortableBlobCache, PortableChunkCache};
use crate::cache::reach::ReachAwareCache;
use crate::error::{CoreError, Result};
use crate::types::{CacheEntryMetadata, CacheStats};

/// Contract for the priority-aware blob cache (one instance per reach level)
pub trait BlobCacheBackend {
    /// Insert with an explicit timestamp; returns entries evicted for space
    /// (0 when the put was rejected - check `has` to distinguish)
    fn put_at(
        &mut self,
        hash: &str,
        size_bytes: u64,
        reach_level: u8,
        domain: &str,
        epic: &str,
        priority: f64,
        now_ms: u64,
    ) -> u32;
    fn has(&self, hash: &str) -> bool;
    fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool;
    fn delete(&mut self, hash: &str) -> bool;
    fn metadata(&self, hash: &str) -> Option<&CacheEntryMetadata>;
    fn size(&self) -> u64;
    fn count(&self) -> usize;
    fn max_size(&self) -> u64;
    fn stats(&self) -> CacheStats;
    fn clear(&mut self);

    /// Wall-clock insert
    #[allow(clippy::too_many_arguments)]
    fn put(
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

    /// Wall-clock access
    fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }
}

/// Contract for the TTL chunk cache
pub trait ChunkCacheBackend {
    fn put_at(&mut self, hash: &str, size_bytes: u64, now_ms: u64) -> u32;
    fn has_at(&mut self, hash: &str, now_ms: u64) -> bool;
    fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool;
    fn delete(&mut self, hash: &str) -> bool;
    fn cleanup(&mut self, now_ms: u64) -> u32;
    fn size(&self) -> u64;
    fn count(&self) -> usize;
    fn max_size(&self) -> u64;
    fn stats(&self) -> CacheStats;
    fn clear(&mut self);

    fn put(&mut self, hash: &str, size_bytes: u64) -> u32 {
        self.put_at(hash, size_bytes, crate::current_time_ms())
    }

    fn has(&mut self, hash: &str) -> bool {
        self.has_at(hash, crate::current_time_ms())
    }

    fn touch(&mut self, hash: &str) -> bool {
        self.touch_at(hash, crate::current_time_ms())
    }
}

macro_rules! delegate_blob_backend {
    ($ty:ty) => {
        impl BlobCacheBackend for $ty {
            fn put_at(
                &mut self,
                hash: &str,
                size_bytes: u64,
                reach_level: u8,
                domain: &str,
                epic: &str,
                priority: f64,
                now_ms: u64,
            ) -> u32 {
                <$ty>::put_at(
                    self, hash, size_bytes, reach_level, domain, epic, priority, now_ms,
                )
            }
            fn has(&self, hash: &str) -> bool {
                <$ty>::has(self, hash)
            }
            fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
                <$ty>::touch_at(self, hash, now_ms)
            }
            fn delete(&mut self, hash: &str) -> bool {
                <$ty>::delete(self, hash)
            }
            fn metadata(&self, hash: &str) -> Option<&CacheEntryMetadata> {
                <$ty>::metadata(self, hash)
            }
            fn size(&self) -> u64 {
                <$ty>::size(self)
            }
            fn count(&self) -> usize {
                <$ty>::count(self)
            }
            fn max_size(&self) -> u64 {
                <$ty>::max_size(self)
            }
            fn stats(&self) -> CacheStats {
                <$ty>::stats(self)
            }
            fn clear(&mut self) {
                <$ty>::clear(self)
            }
        }
    };
}

macro_rules! delegate_chunk_backend {
    ($ty:ty) => {
        impl ChunkCacheBackend for $ty {
            fn put_at(&mut self, hash: &str, size_bytes: u64, now_ms: u64) -> u32 {
                <$ty>::put_at(self, hash, size_bytes, now_ms)
            }
            fn has_at(&mut self, hash: &str, now_ms: u64) -> bool {
                <$ty>::has_at(self, hash, now_ms)
            }
            fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
                <$ty>::touch_at(self, hash, now_ms)
            }
            fn delete(&mut self, hash: &str) -> bool {
                <$ty>::delete(self, hash)
            }
            fn cleanup(&mut self, now_ms: u64) -> u32 {
                <$ty>::cleanup(self, now_ms)
            }
            fn size(&self) -> u64 {
                <$ty>::size(self)
            }
            fn count(&self) -> usize {
                <$ty>::count(self)
            }
            fn max_size(&self) -> u64 {
                <$ty>::max_size(self)
            }
            fn stats(&self) -> CacheStats {
                <$ty>::stats(self)
            }
            fn clear(&mut self) {
                <$ty>::clear(self)
            }
        }
    };
}

delegate_blob_backend!(IndexedBlobCache);
delegate_blob_backend!(PortableBlobCache);
delegate_chunk_backend!(IndexedChunkCache);
delegate_chunk_backend!(PortableChunkCache);

/// Which cache implementation family is in use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// BTreeMap-indexed, O(log n) eviction and cleanup
    Indexed,
    /// Scan-based reference implementation
    Portable,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Indexed => write!(f, "indexed"),
            BackendKind::Portable => write!(f, "portable"),
        }
    }
}

/// A blob cache of either backend kind, usable wherever the trait is
pub enum AnyBlobCache {
    Indexed(IndexedBlobCache),
    Portable(PortableBlobCache),
}

impl BlobCacheBackend for AnyBlobCache {
    fn put_at(
        &mut self,
        hash: &str,
        size_bytes: u64,
        reach_level: u8,
        domain: &str,
        epic: &str,
        priority: f64,
        now_ms: u64,
    ) -> u32 {
        match self {
            AnyBlobCache::Indexed(c) => {
                c.put_at(hash, size_bytes, reach_level, domain, epic, priority, now_ms)
            }
            AnyBlobCache::Portable(c) => {
                c.put_at(hash, size_bytes, reach_level, domain, epic, priority, now_ms)
            }
        }
    }
    fn has(&self, hash: &str) -> bool {
        match self {
            AnyBlobCache::Indexed(c) => c.has(hash),
            AnyBlobCache::Portable(c) => c.has(hash),
        }
    }
    fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        match self {
            AnyBlobCache::Indexed(c) => c.touch_at(hash, now_ms),
            AnyBlobCache::Portable(c) => c.touch_at(hash, now_ms),
        }
    }
    fn delete(&mut self, hash: &str) -> bool {
        match self {
            AnyBlobCache::Indexed(c) => c.delete(hash),
            AnyBlobCache::Portable(c) => c.delete(hash),
        }
    }
    fn metadata(&self, hash: &str) -> Option<&CacheEntryMetadata> {
        match self {
            AnyBlobCache::Indexed(c) => c.metadata(hash),
            AnyBlobCache::Portable(c) => c.metadata(hash),
        }
    }
    fn size(&self) -> u64 {
        match self {
            AnyBlobCache::Indexed(c) => c.size(),
            AnyBlobCache::Portable(c) => c.size(),
        }
    }
    fn count(&self) -> usize {
        match self {
            AnyBlobCache::Indexed(c) => c.count(),
            AnyBlobCache::Portable(c) => c.count(),
        }
    }
    fn max_size(&self) -> u64 {
        match self {
            AnyBlobCache::Indexed(c) => c.max_size(),
            AnyBlobCache::Portable(c) => c.max_size(),
        }
    }
    fn stats(&self) -> CacheStats {
        match self {
            AnyBlobCache::Indexed(c) => c.stats(),
            AnyBlobCache::Portable(c) => c.stats(),
        }
    }
    fn clear(&mut self) {
        match self {
            AnyBlobCache::Indexed(c) => c.clear(),
            AnyBlobCache::Portable(c) => c.clear(),
        }
    }
}

/// A chunk cache of either backend kind
pub enum AnyChunkCache {
    Indexed(IndexedChunkCache),
    Portable(PortableChunkCache),
}

impl ChunkCacheBackend for AnyChunkCache {
    fn put_at(&mut self, hash: &str, size_bytes: u64, now_ms: u64) -> u32 {
        match self {
            AnyChunkCache::Indexed(c) => c.put_at(hash, size_bytes, now_ms),
            AnyChunkCache::Portable(c) => c.put_at(hash, size_bytes, now_ms),
        }
    }
    fn has_at(&mut self, hash: &str, now_ms: u64) -> bool {
        match self {
            AnyChunkCache::Indexed(c) => c.has_at(hash, now_ms),
            AnyChunkCache::Portable(c) => c.has_at(hash, now_ms),
        }
    }
    fn touch_at(&mut self, hash: &str, now_ms: u64) -> bool {
        match self {
            AnyChunkCache::Indexed(c) => c.touch_at(hash, now_ms),
            AnyChunkCache::Portable(c) => c.touch_at(hash, now_ms),
        }
    }
    fn delete(&mut self, hash: &str) -> bool {
        match self {
            AnyChunkCache::Indexed(c) => c.delete(hash),
            AnyChunkCache::Portable(c) => c.delete(hash),
        }
    }
    fn cleanup(&mut self, now_ms: u64) -> u32 {
        match self {
            AnyChunkCache::Indexed(c) => c.cleanup(now_ms),
            AnyChunkCache::Portable(c) => c.cleanup(now_ms),
        }
    }
    fn size(&self) -> u64 {
        match self {
            AnyChunkCache::Indexed(c) => c.size(),
            AnyChunkCache::Portable(c) => c.size(),
        }
    }
    fn count(&self) -> usize {
        match self {
            AnyChunkCache::Indexed(c) => c.count(),
            AnyChunkCache::Portable(c) => c.count(),
        }
    }
    fn max_size(&self) -> u64 {
        match self {
            AnyChunkCache::Indexed(c) => c.max_size(),
            AnyChunkCache::Portable(c) => c.max_size(),
        }
    }
    fn stats(&self) -> CacheStats {
        match self {
            AnyChunkCache::Indexed(c) => c.stats(),
            AnyChunkCache::Portable(c) => c.stats(),
        }
    }
    fn clear(&mut self) {
        match self {
            AnyChunkCache::Indexed(c) => c.clear(),
            AnyChunkCache::Portable(c) => c.clear(),
        }
    }
}

/// Selected backend: the kind plus constructors for each component
#[derive(Clone, Copy, Debug)]
pub struct SelectedBackend {
    pub kind: BackendKind,
}

impl SelectedBackend {
    pub fn blob_cache(&self, max_size_bytes: u64) -> AnyBlobCache {
        match self.kind {
            BackendKind::Indexed => AnyBlobCache::Indexed(IndexedBlobCache::new(max_size_bytes)),
            BackendKind::Portable => AnyBlobCache::Portable(PortableBlobCache::new(max_size_bytes)),
        }
    }

    pub fn chunk_cache(&self, max_size_bytes: u64, ttl_millis: u64) -> AnyChunkCache {
        match self.kind {
            BackendKind::Indexed => {
                AnyChunkCache::Indexed(IndexedChunkCache::new(max_size_bytes, ttl_millis))
            }
            BackendKind::Portable => {
                AnyChunkCache::Portable(PortableChunkCache::new(max_size_bytes, ttl_millis))
            }
        }
    }

    pub fn reach_cache(&self, max_size_per_reach: u64) -> ReachAwareCache<AnyBlobCache> {
        let kind = *self;
        ReachAwareCache::new_with(max_size_per_reach, move |max| kind.blob_cache(max))
    }
}

/// Select a cache backend: env override first, then self-check probe with
/// portable fallback.
pub fn select_backend() -> SelectedBackend {
    if let Ok(val) = std::env::var("REACH_CACHE_BACKEND") {
        match force_backend(&val) {
            Ok(selected) => return selected,
            Err(e) => warn!(value = %val, error = %e, "Ignoring REACH_CACHE_BACKEND"),
        }
    }

    if probe_indexed() {
        info!(backend = %BackendKind::Indexed, "Cache backend selected");
        SelectedBackend {
            kind: BackendKind::Indexed,
        }
    } else {
        warn!("Indexed cache backend failed self-check, falling back to portable");
        SelectedBackend {
            kind: BackendKind::Portable,
        }
    }
}

/// Force a specific backend by name (`indexed` / `portable`)
pub fn force_backend(name: &str) -> Result<SelectedBackend> {
    match name.to_ascii_lowercase().as_str() {
        "indexed" => {
            if !probe_indexed() {
                return Err(CoreError::BackendUnavailable(
                    "indexed backend failed self-check probe".into(),
                ));
            }
            Ok(SelectedBackend {
                kind: BackendKind::Indexed,
            })
        }
        "portable" => Ok(SelectedBackend {
            kind: BackendKind::Portable,
        }),
        other => Err(CoreError::BackendUnavailable(format!(
            "unknown backend '{other}'"
        ))),
    }
}

/// Micro-workload self-check: run the same eviction scenario through both
/// implementations and compare the observable outcome.
fn probe_indexed() -> bool {
    let mut indexed = IndexedBlobCache::new(300);
    let mut portable = PortableBlobCache::new(300);

    for (hash, priority, ts) in [
        ("probe-a", 0.2, 10),
        ("probe-b", 0.8, 20),
        ("probe-c", 0.5, 30),
        ("probe-d", 0.5, 40),
    ] {
        let a = indexed.put_at(hash, 100, 7, "probe", "probe", priority, ts);
        let b = portable.put_at(hash, 100, 7, "probe", "probe", priority, ts);
        if a != b {
            return false;
        }
    }

    for hash in ["probe-a", "probe-b", "probe-c", "probe-d"] {
        if indexed.has(hash) != portable.has(hash) {
            return false;
        }
    }

    indexed.size() == portable.size() && indexed.count() == portable.count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_passes() {
        assert!(probe_indexed());
    }

    #[test]
    fn test_force_backend_names() {
        assert_eq!(force_backend("indexed").unwrap().kind, BackendKind::Indexed);
        assert_eq!(
            force_backend("PORTABLE").unwrap().kind,
            BackendKind::Portable
        );
        assert!(force_backend("hybrid").is_err());
    }

    #[test]
    fn test_any_wrappers_delegate() {
        let selected = SelectedBackend {
            kind: BackendKind::Portable,
        };
        let mut blob = selected.blob_cache(1000);
        blob.put_at("h", 100, 7, "lamad", "governance", 0.5, 10);
        assert!(blob.has("h"));
        assert_eq!(blob.size(), 100);

        let mut chunk = selected.chunk_cache(1000, 500);
        chunk.put_at("c", 100, 0);
        assert!(chunk.has_at("c", 100));
        assert!(!chunk.has_at("c", 501 + 1));
    }
}
