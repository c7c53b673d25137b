//! Response cache type definitions
//!
//! Entries carry wall-clock timestamps (not `Instant`) because the disk
//! shadow serializes the full entry and must stay valid across restarts.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One cached AI response plus its bookkeeping metadata.
///
/// `expires_at` is fixed at creation; only `hit_count` mutates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Opaque caller-constructed key
    pub key: String,
    /// The cached payload
    pub data: serde_json::Value,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// TTL the entry was inserted with
    pub ttl_seconds: u64,
    /// When the entry expires (`created_at + ttl_seconds`)
    pub expires_at: DateTime<Utc>,
    /// Incremented on every successful read
    pub hit_count: u64,
    /// Serialized payload size, computed once at insertion
    pub size_bytes: usize,
}

impl CacheEntry {
    /// Create a new entry expiring `ttl_seconds` from now.
    pub fn new(key: String, data: serde_json::Value, ttl_seconds: u64, size_bytes: usize) -> Self {
        let now = Utc::now();
        Self {
            key,
            data,
            created_at: now,
            ttl_seconds,
            expires_at: now + Duration::seconds(ttl_seconds as i64),
            hit_count: 0,
            size_bytes,
        }
    }

    /// An entry is live strictly before `expires_at`; TTL 0 is dead on arrival.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Milliseconds since creation
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }

    /// Milliseconds until expiry (negative once expired)
    pub fn expires_in_ms(&self) -> i64 {
        (self.expires_at - Utc::now()).num_milliseconds()
    }

    /// Eviction ranking: lower scores are evicted first.
    ///
    /// Recency+frequency hybrid rather than strict LRU: each hit is worth
    /// one second of age, so a young entry with no hits loses to an older
    /// entry the callers keep coming back to.
    pub fn eviction_score(&self) -> i64 {
        self.created_at.timestamp_millis() + self.hit_count as i64 * 1000
    }
}

/// Lock-free hit/miss counters for the hot path
#[derive(Debug, Default)]
pub struct AtomicCacheCounters {
    /// Successful reads
    pub hits: AtomicU64,
    /// Total misses (absent, expired, or unloadable)
    pub misses: AtomicU64,
}

impl AtomicCacheCounters {
    /// Reset both counters
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Cache statistics snapshot returned to callers
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Cumulative hits
    pub hits: u64,
    /// Cumulative misses
    pub misses: u64,
    /// Current resident size in bytes
    pub size_bytes: usize,
    /// Current resident entry count
    pub entries: usize,
    /// `hits / (hits + misses) * 100`, zero when no lookups yet
    pub hit_rate: f64,
    /// Rolling average over the last observed operation latencies
    pub avg_latency_ms: f64,
}

/// One row of [`super::ResponseCache::entries_summary`]
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    /// Entry key
    pub key: String,
    /// Serialized payload size
    pub size_bytes: usize,
    /// Read count
    pub hit_count: u64,
    /// Milliseconds until expiry (negative once expired)
    pub expires_in_ms: i64,
    /// Milliseconds since creation
    pub age_ms: i64,
}
