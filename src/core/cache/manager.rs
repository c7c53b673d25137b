//! Response cache implementation
//!
//! Two tiers: an in-memory index (authoritative while an entry is resident)
//! and a one-file-per-entry disk shadow that survives restarts. Eviction is
//! an approximate-LRU ranked by `created_at + hit_count * 1000`; background
//! timers sweep expired entries and flush dirty ones to disk.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{AtomicCacheCounters, CacheEntry, CacheStats, EntrySummary};
use crate::config::CacheConfig;
use crate::storage::DiskStore;
use crate::utils::error::Result;

/// How many observed operation latencies feed `CacheStats::avg_latency_ms`
const LATENCY_WINDOW: usize = 100;

/// Prompt prefix length that participates in key generation
const KEY_PROMPT_PREFIX: usize = 500;

/// In-memory index guarded by a single lock.
///
/// Never held across an await point; disk I/O happens outside the lock.
#[derive(Debug, Default)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    size_bytes: usize,
    latencies: VecDeque<f64>,
}

/// Two-tier (memory + disk) cache for AI responses.
///
/// Cheap to clone; clones share the same index, counters, and shadow store.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    config: CacheConfig,
    index: Arc<Mutex<CacheIndex>>,
    counters: Arc<AtomicCacheCounters>,
    store: DiskStore,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ResponseCache {
    /// Open the cache: create the shadow directory and load what survived
    /// the last run, up to the memory budget. Expired files are deleted on
    /// sight and corrupt ones skipped.
    ///
    /// Directory creation is the one failure surfaced to the caller; after
    /// construction the cache is fully functional with zero disk.
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let store = DiskStore::new(&config.dir).await?;

        let cache = Self {
            config,
            index: Arc::new(Mutex::new(CacheIndex::default())),
            counters: Arc::new(AtomicCacheCounters::default()),
            store,
            tasks: Arc::new(Mutex::new(Vec::new())),
        };

        match cache.store.scan().await {
            Ok(entries) => {
                let mut loaded = 0usize;
                for entry in entries {
                    if cache.insert_entry(entry) {
                        loaded += 1;
                    }
                }
                if loaded > 0 {
                    info!("Loaded {} cache entries from disk", loaded);
                }
            }
            Err(e) => warn!("Cache startup scan failed: {}", e),
        }

        Ok(cache)
    }

    /// Deterministic cache key for an AI call.
    ///
    /// SHA-256 over the operation, the first 500 characters of the prompt,
    /// and the JSON-serialized parameters, rendered as
    /// `"<operation>-<first 16 hex chars>"`. Identical inputs always yield
    /// the identical key; params with different serialization order hash
    /// differently (no canonicalization is done).
    pub fn generate_key(operation: &str, prompt: &str, params: &serde_json::Value) -> String {
        let prefix: String = prompt.chars().take(KEY_PROMPT_PREFIX).collect();

        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(b":");
        hasher.update(prefix.as_bytes());
        hasher.update(b":");
        hasher.update(params.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());

        format!("{}-{}", operation, &digest[..16])
    }

    /// Start the background expiry sweep and disk flush timers.
    pub fn start(&self) {
        let cache = self.clone();
        let sweep = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(cache.config.sweep_interval_secs.max(1)));
            loop {
                interval.tick().await;
                cache.sweep_expired();
            }
        });

        let cache = self.clone();
        let flush = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(cache.config.flush_interval_secs.max(1)));
            loop {
                interval.tick().await;
                cache.flush_to_disk().await;
            }
        });

        self.tasks.lock().extend([sweep, flush]);
    }

    /// Look up a cached response.
    ///
    /// Memory first; a resident live entry bumps its hit count. A resident
    /// expired entry is lazily removed and the lookup falls through to the
    /// disk shadow, which is promoted back into memory when it fits.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let mut index = self.index.lock();
            if let Some(entry) = index.entries.get_mut(key) {
                if !entry.is_expired() {
                    entry.hit_count += 1;
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for key {}", key);
                    return Some(entry.data.clone());
                }
                let size = entry.size_bytes;
                index.entries.remove(key);
                index.size_bytes = index.size_bytes.saturating_sub(size);
                debug!("Lazily expired cache entry {}", key);
            }
        }

        match self.store.read(key).await {
            Ok(Some(mut entry)) if !entry.is_expired() => {
                let value = entry.data.clone();
                entry.hit_count += 1;
                let promoted = self.insert_entry(entry);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Disk hit for key {} (promoted: {})", key, promoted);
                return Some(value);
            }
            Ok(Some(_)) => {
                if let Err(e) = self.store.remove(key).await {
                    warn!("Failed to delete expired shadow for {}: {}", key, e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Disk read failed for {}: {}", key, e),
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a response, evicting lower-scored entries first if the memory
    /// budget would be exceeded. The disk write is queued fire-and-forget;
    /// its failure is logged, never surfaced.
    pub async fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) {
        let ttl = ttl_seconds.unwrap_or(self.config.default_ttl_seconds);
        let size_bytes = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(1024);

        if size_bytes > self.config.max_size_bytes {
            warn!(
                "Refusing to cache {}: {} bytes exceeds the {} byte budget",
                key, size_bytes, self.config.max_size_bytes
            );
            return;
        }

        let entry = CacheEntry::new(key.to_string(), value, ttl, size_bytes);
        let shadow = entry.clone();

        {
            let mut index = self.index.lock();

            if let Some(previous) = index.entries.remove(key) {
                index.size_bytes = index.size_bytes.saturating_sub(previous.size_bytes);
            }

            while index.size_bytes + size_bytes > self.config.max_size_bytes {
                let victim = index
                    .entries
                    .values()
                    .min_by_key(|e| e.eviction_score())
                    .map(|e| e.key.clone());
                match victim {
                    Some(victim_key) => {
                        if let Some(evicted) = index.entries.remove(&victim_key) {
                            index.size_bytes =
                                index.size_bytes.saturating_sub(evicted.size_bytes);
                            debug!(
                                "Evicted {} ({} bytes, {} hits) to make room",
                                evicted.key, evicted.size_bytes, evicted.hit_count
                            );
                        }
                    }
                    None => break,
                }
            }

            index.size_bytes += size_bytes;
            index.entries.insert(key.to_string(), entry);
        }

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.write(&shadow).await {
                warn!("Failed to write cache shadow for {}: {}", shadow.key, e);
            }
        });
    }

    /// Remove one entry from memory and (best effort) from disk.
    /// Returns whether a memory entry existed.
    pub async fn delete(&self, key: &str) -> bool {
        let existed = {
            let mut index = self.index.lock();
            match index.entries.remove(key) {
                Some(entry) => {
                    index.size_bytes = index.size_bytes.saturating_sub(entry.size_bytes);
                    true
                }
                None => false,
            }
        };

        if let Err(e) = self.store.remove(key).await {
            warn!("Failed to delete shadow for {}: {}", key, e);
        }

        existed
    }

    /// Empty the index and statistics, and best-effort delete every shadow
    /// file.
    pub async fn clear(&self) {
        {
            let mut index = self.index.lock();
            index.entries.clear();
            index.size_bytes = 0;
            index.latencies.clear();
        }
        self.counters.reset();

        match self.store.clear().await {
            Ok(removed) => info!("Cache cleared ({} shadow files removed)", removed),
            Err(e) => warn!("Failed to clear cache directory: {}", e),
        }
    }

    /// Remove every entry whose key matches `pattern`, in memory and on
    /// disk. Returns how many memory entries were removed.
    pub async fn clear_by_pattern(&self, pattern: &Regex) -> usize {
        let removed_keys: Vec<String> = {
            let mut index = self.index.lock();
            let keys: Vec<String> = index
                .entries
                .keys()
                .filter(|k| pattern.is_match(k))
                .cloned()
                .collect();
            for key in &keys {
                if let Some(entry) = index.entries.remove(key) {
                    index.size_bytes = index.size_bytes.saturating_sub(entry.size_bytes);
                }
            }
            keys
        };

        for key in &removed_keys {
            if let Err(e) = self.store.remove(key).await {
                warn!("Failed to delete shadow for {}: {}", key, e);
            }
        }

        debug!(
            "Cleared {} entries matching pattern {}",
            removed_keys.len(),
            pattern
        );
        removed_keys.len()
    }

    /// Statistics snapshot
    pub fn get_stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        let index = self.index.lock();
        let avg_latency_ms = if index.latencies.is_empty() {
            0.0
        } else {
            index.latencies.iter().sum::<f64>() / index.latencies.len() as f64
        };

        CacheStats {
            hits,
            misses,
            size_bytes: index.size_bytes,
            entries: index.entries.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64 * 100.0
            },
            avg_latency_ms,
        }
    }

    /// Per-entry summary, most-hit entries first
    pub fn entries_summary(&self) -> Vec<EntrySummary> {
        let index = self.index.lock();
        let mut rows: Vec<EntrySummary> = index
            .entries
            .values()
            .map(|entry| EntrySummary {
                key: entry.key.clone(),
                size_bytes: entry.size_bytes,
                hit_count: entry.hit_count,
                expires_in_ms: entry.expires_in_ms(),
                age_ms: entry.age_ms(),
            })
            .collect();
        rows.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));
        rows
    }

    /// Feed one observed operation latency into the rolling stats window.
    pub fn record_latency(&self, latency_ms: f64) {
        let mut index = self.index.lock();
        index.latencies.push_back(latency_ms);
        while index.latencies.len() > LATENCY_WINDOW {
            index.latencies.pop_front();
        }
    }

    /// Stop the background timers and run one final best-effort flush.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            handle.abort();
        }
        self.flush_to_disk().await;
        info!("Response cache shut down");
    }

    /// Insert an entry if it fits within the memory budget without eviction.
    /// Used by the startup load and disk promotion. Returns whether it was
    /// inserted.
    pub(crate) fn insert_entry(&self, entry: CacheEntry) -> bool {
        let mut index = self.index.lock();
        if index.size_bytes + entry.size_bytes > self.config.max_size_bytes {
            return false;
        }
        if let Some(previous) = index.entries.remove(&entry.key) {
            index.size_bytes = index.size_bytes.saturating_sub(previous.size_bytes);
        }
        index.size_bytes += entry.size_bytes;
        index.entries.insert(entry.key.clone(), entry);
        true
    }

    /// Drop every expired entry from memory.
    fn sweep_expired(&self) {
        let mut removed = 0usize;
        let mut freed = 0usize;
        {
            let mut index = self.index.lock();
            index.entries.retain(|_, entry| {
                if entry.is_expired() {
                    removed += 1;
                    freed += entry.size_bytes;
                    false
                } else {
                    true
                }
            });
            index.size_bytes = index.size_bytes.saturating_sub(freed);
        }
        if removed > 0 {
            info!("Swept {} expired cache entries, freed {} bytes", removed, freed);
        }
    }

    /// Write every unexpired resident entry to disk. Covers hit-count
    /// mutations and anything the per-set write missed.
    async fn flush_to_disk(&self) {
        let snapshot: Vec<CacheEntry> = {
            let index = self.index.lock();
            index
                .entries
                .values()
                .filter(|entry| !entry.is_expired())
                .cloned()
                .collect()
        };

        let mut failures = 0usize;
        let total = snapshot.len();
        for entry in snapshot {
            if let Err(e) = self.store.write(&entry).await {
                warn!("Flush failed for {}: {}", entry.key, e);
                failures += 1;
            }
        }
        if total > 0 {
            debug!("Flushed {} cache entries ({} failures)", total, failures);
        }
    }
}
