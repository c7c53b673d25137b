//! Error handling for the cache and metrics engine
//!
//! Steady-state operations (`get`, `set`, `record_request`, aggregation
//! queries) never surface these errors to callers; disk failures are logged
//! and absorbed. Construction is the one place an error is worth raising
//! loudly, e.g. when the cache directory cannot be created.

use thiserror::Error;

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for the cache and metrics engine
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Disk shadow store errors
    #[error("Storage error: {0}")]
    Storage(String),
}
