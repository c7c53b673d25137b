//! On-disk shadow store for cache entries
//!
//! One JSON file per entry, named after the sanitized cache key. The store
//! is a best-effort mirror: callers treat every failure here as recoverable
//! and the in-memory index stays authoritative.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::core::cache::types::CacheEntry;
use crate::utils::error::{CacheError, Result};

/// File-per-entry shadow store rooted at one directory.
///
/// The directory is owned by exactly one store; no file locking is done,
/// so two instances sharing a directory is unsupported.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open the store, creating the directory if absent.
    ///
    /// This is the one operation whose failure is surfaced to the caller.
    pub async fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).await.map_err(|e| {
            CacheError::Storage(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        debug!("Cache shadow store opened at {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Read one entry by key. `Ok(None)` when no shadow file exists.
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        Ok(Some(entry))
    }

    /// Write one entry, replacing any existing shadow file.
    pub async fn write(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(&entry.key);
        let bytes = serde_json::to_vec(entry)?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Remove one shadow file. Returns whether a file was deleted.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every shadow file. Returns how many were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            if item.path().extension().is_some_and(|ext| ext == "json")
                && fs::remove_file(item.path()).await.is_ok()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Scan the directory once, returning every live entry.
    ///
    /// Files that fail to parse are skipped with a warning; files holding
    /// an already-expired entry are deleted on sight.
    pub async fn scan(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read cache file {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) if entry.is_expired() => {
                    debug!("Deleting expired cache file {}", path.display());
                    if let Err(e) = fs::remove_file(&path).await {
                        warn!("Failed to delete expired cache file {}: {}", path.display(), e);
                    }
                }
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Skipping corrupt cache file {}: {}", path.display(), e);
                }
            }
        }

        Ok(entries)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Replace path-hostile characters so any key maps to a safe file name.
///
/// Keys produced by `ResponseCache::generate_key` are already safe; this
/// covers caller-constructed keys.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("chat-a1b2c3"), "chat-a1b2c3");
        assert_eq!(sanitize_key("a/b\\c:d"), "a_b_c_d");
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).await.unwrap();

        let entry = CacheEntry::new("k1".to_string(), json!({"a": 1}), 3600, 16);
        store.write(&entry).await.unwrap();

        let loaded = store.read("k1").await.unwrap().unwrap();
        assert_eq!(loaded.key, "k1");
        assert_eq!(loaded.data, json!({"a": 1}));

        assert!(store.remove("k1").await.unwrap());
        assert!(!store.remove("k1").await.unwrap());
        assert!(store.read("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).await.unwrap();

        let entry = CacheEntry::new("good".to_string(), json!("value"), 3600, 8);
        store.write(&entry).await.unwrap();
        tokio::fs::write(dir.path().join("bad.json"), b"{not json")
            .await
            .unwrap();

        let entries = store.scan().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "good");
    }

    #[tokio::test]
    async fn test_scan_deletes_expired_files() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).await.unwrap();

        let entry = CacheEntry::new("stale".to_string(), json!("value"), 0, 8);
        store.write(&entry).await.unwrap();

        let entries = store.scan().await.unwrap();
        assert!(entries.is_empty());
        assert!(store.read("stale").await.unwrap().is_none());
    }
}
