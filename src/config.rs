//! Configuration for the cache tiers and the write buffer.
//!
//! Struct-with-defaults plus environment variable overrides, with presets
//! bundling the write buffer options for common operating modes.

use crate::error::{CoreError, Result};

/// Configuration for the cache tiers
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Standalone blob cache max bytes (default: 256 MiB)
    pub max_size_bytes: u64,
    /// Per-reach-level budget for the reach-aware cache (default: 64 MiB)
    pub max_size_per_reach: u64,
    /// Chunk cache max bytes (default: 128 MiB)
    pub chunk_max_bytes: u64,
    /// Chunk TTL in milliseconds (default: 30 seconds)
    pub ttl_millis: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 256 * 1024 * 1024,
            max_size_per_reach: 64 * 1024 * 1024,
            chunk_max_bytes: 128 * 1024 * 1024,
            ttl_millis: 30_000,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REACH_CACHE_MAX_MB") {
            if let Ok(mb) = val.parse::<u64>() {
                config.max_size_bytes = mb * 1024 * 1024;
            }
        }

        if let Ok(val) = std::env::var("REACH_CACHE_PER_REACH_MB") {
            if let Ok(mb) = val.parse::<u64>() {
                config.max_size_per_reach = mb * 1024 * 1024;
            }
        }

        if let Ok(val) = std::env::var("REACH_CACHE_CHUNK_MAX_MB") {
            if let Ok(mb) = val.parse::<u64>() {
                config.chunk_max_bytes = mb * 1024 * 1024;
            }
        }

        if let Ok(val) = std::env::var("REACH_CACHE_CHUNK_TTL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.ttl_millis = ms;
            }
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(CoreError::Config("max_size_bytes must be non-zero".into()));
        }
        if self.max_size_per_reach == 0 {
            return Err(CoreError::Config(
                "max_size_per_reach must be non-zero".into(),
            ));
        }
        if self.chunk_max_bytes == 0 {
            return Err(CoreError::Config("chunk_max_bytes must be non-zero".into()));
        }
        if self.ttl_millis == 0 {
            return Err(CoreError::Config("ttl_millis must be non-zero".into()));
        }
        Ok(())
    }
}

/// Configuration for the write buffer
#[derive(Debug, Clone)]
pub struct WriteBufferConfig {
    /// Operations per batch for Retry/Normal/Bulk sources (default: 50)
    pub batch_size: usize,
    /// Interval-based flush trigger in milliseconds (default: 100)
    pub flush_interval_ms: u64,
    /// Retry budget before an operation is dropped as failed (default: 3)
    pub max_retries: u32,
    /// Backpressure gate for non-High enqueues (default: batch_size * 100)
    pub max_queue_size: usize,
}

impl Default for WriteBufferConfig {
    fn default() -> Self {
        let batch_size = 50;
        Self {
            batch_size,
            flush_interval_ms: 100,
            max_retries: 3,
            max_queue_size: batch_size * 100,
        }
    }
}

impl WriteBufferConfig {
    /// Bulk import: large batches, relaxed latency, deep queue
    pub fn seeding() -> Self {
        Self {
            batch_size: 200,
            flush_interval_ms: 500,
            max_retries: 3,
            max_queue_size: 20_000,
        }
    }

    /// Live UI: small batches, tight flush latency
    pub fn interactive() -> Self {
        Self {
            batch_size: 20,
            flush_interval_ms: 50,
            max_retries: 3,
            max_queue_size: 2_000,
        }
    }

    /// Crash recovery: generous retry budget, moderate batches
    pub fn recovery() -> Self {
        Self {
            batch_size: 100,
            flush_interval_ms: 200,
            max_retries: 8,
            max_queue_size: 10_000,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WRITE_BUFFER_BATCH_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.batch_size = n;
                config.max_queue_size = n * 100;
            }
        }

        if let Ok(val) = std::env::var("WRITE_BUFFER_FLUSH_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.flush_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("WRITE_BUFFER_MAX_RETRIES") {
            if let Ok(n) = val.parse::<u32>() {
                config.max_retries = n;
            }
        }

        if let Ok(val) = std::env::var("WRITE_BUFFER_MAX_QUEUE_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_queue_size = n;
            }
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CoreError::Config("batch_size must be non-zero".into()));
        }
        if self.flush_interval_ms == 0 {
            return Err(CoreError::Config(
                "flush_interval_ms must be non-zero".into(),
            ));
        }
        if self.max_queue_size < self.batch_size {
            return Err(CoreError::Config(
                "max_queue_size must be at least batch_size".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffer_config() {
        let config = WriteBufferConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval_ms, 100);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_queue_size, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_trade_batch_size_against_latency() {
        let seeding = WriteBufferConfig::seeding();
        let interactive = WriteBufferConfig::interactive();
        assert!(seeding.batch_size > interactive.batch_size);
        assert!(seeding.flush_interval_ms > interactive.flush_interval_ms);
        assert!(WriteBufferConfig::recovery().max_retries > seeding.max_retries);

        for preset in [seeding, interactive, WriteBufferConfig::recovery()] {
            assert!(preset.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let config = CacheConfig {
            max_size_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WriteBufferConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WriteBufferConfig {
            batch_size: 100,
            max_queue_size: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
