//! End-to-end tests exercising the cache across simulated restarts and
//! under concurrent access, through the public API only.

use llm_cache_rs::{CacheConfig, ResponseCache};
use serde_json::json;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        dir: dir.path().to_path_buf(),
        ..CacheConfig::default()
    }
}

#[tokio::test]
async fn entries_survive_a_process_restart() {
    let dir = TempDir::new().unwrap();

    {
        let cache = ResponseCache::new(config_for(&dir)).await.unwrap();
        cache.set("k2", json!({"b": 2}), Some(3600)).await;
        cache
            .set("short-lived", json!({"c": 3}), Some(0))
            .await;
        cache.shutdown().await;
    }

    // "restart": a fresh instance over the same directory
    let cache = ResponseCache::new(config_for(&dir)).await.unwrap();
    assert_eq!(cache.get("k2").await, Some(json!({"b": 2})));
    assert_eq!(cache.get("short-lived").await, None);
}

#[tokio::test]
async fn restart_preserves_nothing_after_clear() {
    let dir = TempDir::new().unwrap();

    {
        let cache = ResponseCache::new(config_for(&dir)).await.unwrap();
        cache.set("k1", json!(1), Some(3600)).await;
        cache.shutdown().await;
        // let the queued per-set shadow write land before clearing
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cache.clear().await;
    }

    let cache = ResponseCache::new(config_for(&dir)).await.unwrap();
    assert_eq!(cache.get("k1").await, None);
    assert_eq!(cache.get_stats().entries, 0);
}

#[tokio::test]
async fn concurrent_readers_and_writers_do_not_corrupt_the_index() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size_bytes: 4096,
        ..CacheConfig::default()
    };
    let cache = ResponseCache::new(config).await.unwrap();

    let mut handles = Vec::new();
    for task in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("k{}", (task * 50 + i) % 20);
                cache.set(&key, json!("v".repeat(64)), Some(60)).await;
                cache.get(&key).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = cache.get_stats();
    assert!(stats.size_bytes <= 4096);
    assert!(stats.entries <= 20);
    assert!(stats.hits + stats.misses >= 1);
}
