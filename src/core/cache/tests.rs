//! Response cache tests

use chrono::{Duration as ChronoDuration, Utc};
use regex::Regex;
use serde_json::json;
use tempfile::TempDir;

use super::manager::ResponseCache;
use super::types::CacheEntry;
use crate::config::CacheConfig;

fn test_config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        dir: dir.path().to_path_buf(),
        ..CacheConfig::default()
    }
}

/// Give fire-and-forget shadow writes time to land before the test
/// manipulates the disk directory underneath them.
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}

#[test]
fn test_generate_key_is_deterministic() {
    let params = json!({"temperature": 0.2, "max_tokens": 512});
    let a = ResponseCache::generate_key("chat", "Hello there", &params);
    let b = ResponseCache::generate_key("chat", "Hello there", &params);
    assert_eq!(a, b);

    // operation prefix plus 16 hex chars
    let (prefix, digest) = a.split_once('-').unwrap();
    assert_eq!(prefix, "chat");
    assert_eq!(digest.len(), 16);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_generate_key_varies_with_inputs() {
    let params = json!({"temperature": 0.2});
    let base = ResponseCache::generate_key("chat", "Hello", &params);

    assert_ne!(
        base,
        ResponseCache::generate_key("embed", "Hello", &params)
    );
    assert_ne!(
        base,
        ResponseCache::generate_key("chat", "Goodbye", &params)
    );
    assert_ne!(
        base,
        ResponseCache::generate_key("chat", "Hello", &json!({"temperature": 0.9}))
    );
}

#[test]
fn test_generate_key_ignores_prompt_past_500_chars() {
    let long_a = format!("{}{}", "x".repeat(500), "tail one");
    let long_b = format!("{}{}", "x".repeat(500), "tail two");
    let params = json!({});
    assert_eq!(
        ResponseCache::generate_key("chat", &long_a, &params),
        ResponseCache::generate_key("chat", &long_b, &params)
    );
}

#[tokio::test]
async fn test_round_trip_within_ttl() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("k1", json!({"a": 1}), Some(60)).await;
    assert_eq!(cache.get("k1").await, Some(json!({"a": 1})));

    let stats = cache.get_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_expired_entry_misses_exactly_once() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    // Entry created 61 seconds ago with a 60 second TTL
    let mut entry = CacheEntry::new("k1".to_string(), json!({"a": 1}), 60, 16);
    entry.created_at = Utc::now() - ChronoDuration::seconds(61);
    entry.expires_at = entry.created_at + ChronoDuration::seconds(60);
    assert!(cache.insert_entry(entry));

    let misses_before = cache.get_stats().misses;
    assert_eq!(cache.get("k1").await, None);
    assert_eq!(cache.get_stats().misses, misses_before + 1);

    // lazy expiry removed it from the index
    assert_eq!(cache.get_stats().entries, 0);
}

#[tokio::test]
async fn test_zero_ttl_is_dead_on_arrival() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("k1", json!(1), Some(0)).await;
    assert_eq!(cache.get("k1").await, None);
    assert_eq!(cache.get_stats().misses, 1);
}

#[tokio::test]
async fn test_capacity_bound_holds() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size_bytes: 256,
        ..CacheConfig::default()
    };
    let cache = ResponseCache::new(config).await.unwrap();

    for i in 0..50 {
        let payload = json!("v".repeat(40));
        cache.set(&format!("k{}", i), payload, Some(60)).await;
        assert!(cache.get_stats().size_bytes <= 256);
    }
}

#[tokio::test]
async fn test_eviction_prefers_lower_score() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        dir: dir.path().to_path_buf(),
        max_size_bytes: 1000,
        ..CacheConfig::default()
    };
    let cache = ResponseCache::new(config).await.unwrap();

    // A: older, never hit. B: newer, hit five times. A's score is lower
    // (100s of age outweighs 5 hits worth 5s), so A goes first.
    let mut a = CacheEntry::new("a".to_string(), json!(0), 3600, 400);
    a.created_at = Utc::now() - ChronoDuration::seconds(100);
    let mut b = CacheEntry::new("b".to_string(), json!(0), 3600, 400);
    b.hit_count = 5;
    assert!(a.eviction_score() < b.eviction_score());
    assert!(cache.insert_entry(a));
    assert!(cache.insert_entry(b));

    // ~400 byte payload forces one eviction
    cache.set("c", json!("x".repeat(390)), Some(60)).await;

    let keys: Vec<String> = cache
        .entries_summary()
        .into_iter()
        .map(|row| row.key)
        .collect();
    assert!(!keys.contains(&"a".to_string()));
    assert!(keys.contains(&"b".to_string()));
    assert!(keys.contains(&"c".to_string()));
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("k1", json!(1), Some(60)).await;
    settle().await;
    assert!(cache.delete("k1").await);
    assert!(!cache.delete("k1").await);
    assert_eq!(cache.get("k1").await, None);
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("k1", json!(1), Some(60)).await;
    cache.get("k1").await;
    cache.clear().await;

    let stats = cache.get_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.size_bytes, 0);
    assert!(cache.entries_summary().is_empty());

    cache.clear().await;
    assert_eq!(cache.get_stats().entries, 0);
}

#[tokio::test]
async fn test_clear_by_pattern() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("chat-1", json!(1), Some(60)).await;
    cache.set("chat-2", json!(2), Some(60)).await;
    cache.set("embed-1", json!(3), Some(60)).await;
    settle().await;

    let pattern = Regex::new("^chat-").unwrap();
    assert_eq!(cache.clear_by_pattern(&pattern).await, 2);
    assert_eq!(cache.get("chat-1").await, None);
    assert_eq!(cache.get("embed-1").await, Some(json!(3)));
}

#[tokio::test]
async fn test_entries_summary_sorted_by_hits() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.set("cold", json!(1), Some(60)).await;
    cache.set("hot", json!(2), Some(60)).await;
    cache.get("hot").await;
    cache.get("hot").await;

    let summary = cache.entries_summary();
    assert_eq!(summary[0].key, "hot");
    assert_eq!(summary[0].hit_count, 2);
    assert_eq!(summary[1].key, "cold");
}

#[tokio::test]
async fn test_survives_restart_via_disk() {
    let dir = TempDir::new().unwrap();

    {
        let cache = ResponseCache::new(test_config(&dir)).await.unwrap();
        cache.set("k2", json!({"b": 2}), Some(3600)).await;
        // shutdown flushes, so the fire-and-forget write cannot be lost
        cache.shutdown().await;
    }

    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();
    assert_eq!(cache.get("k2").await, Some(json!({"b": 2})));
}

#[tokio::test]
async fn test_latency_window_feeds_stats() {
    let dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(test_config(&dir)).await.unwrap();

    cache.record_latency(10.0);
    cache.record_latency(30.0);
    assert!((cache.get_stats().avg_latency_ms - 20.0).abs() < f64::EPSILON);
}
