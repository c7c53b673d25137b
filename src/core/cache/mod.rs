//! Two-tier response cache with TTL expiration and size-bounded eviction
//!
//! The in-memory index owns resident entries; a one-file-per-entry disk
//! shadow survives restarts and is always best effort.

pub mod manager;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::ResponseCache;
pub use types::{CacheEntry, CacheStats, EntrySummary};
