//! Error types for the cache core.
//!
//! The hot paths (cache puts, buffer enqueue, outcome reporting) never return
//! errors: all failure there is expressed through return values and counters
//! so the write path stays non-blocking. `CoreError` covers the cold paths
//! only: configuration validation and backend selection.

use thiserror::Error;

/// Error types for cache core setup
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A forced backend failed its self-check probe
    #[error("Cache backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
