//! # llm-cache-rs
//!
//! A response cache and request-metrics engine for AI calls. Sits in front
//! of expensive LLM requests and provides:
//!
//! - **ResponseCache**: two-tier (memory + disk) caching with TTL
//!   expiration, size-bounded eviction, and restart survival via a
//!   one-file-per-entry JSON shadow directory
//! - **MetricsCollector**: per-request samples aggregated over sliding
//!   windows (latency percentiles, success and cache-hit rates), token and
//!   USD cost tracking, and threshold-based alerting
//!
//! Both components are designed for a single process with many concurrent
//! requests sharing one instance each. Neither depends on the other; the
//! dispatch layer that owns them records a metric per call annotated with
//! whether the cache produced a hit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_cache_rs::{Config, MetricsCollector, ResponseCache};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!
//!     let cache = ResponseCache::new(config.cache).await?;
//!     cache.start();
//!     let metrics = MetricsCollector::new(config.metrics);
//!     metrics.start();
//!
//!     let key = ResponseCache::generate_key("chat", "Hello", &json!({"temperature": 0.2}));
//!     let cached = cache.get(&key).await;
//!     if cached.is_none() {
//!         // ... perform the expensive AI call ...
//!         cache.set(&key, json!({"text": "Hi!"}), None).await;
//!     }
//!     metrics
//!         .record_request("anthropic", "claude-3", "chat", 840.0, true, cached.is_some(), None, None)
//!         .await;
//!
//!     // on process exit
//!     cache.shutdown().await;
//!     metrics.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

pub use crate::config::{
    AlertThresholds, CacheConfig, Config, MetricsConfig, PricingConfig, ProviderPricing,
};
pub use crate::core::cache::{CacheEntry, CacheStats, EntrySummary, ResponseCache};
pub use crate::core::metrics::{
    AggregatedMetrics, AlertEvent, AlertKind, AlertSeverity, CostBreakdown, ExportFormat,
    HealthStatus, HealthSummary, MetricSample, MetricsCollector, ProviderBreakdown, TokenUsage,
};
pub use crate::utils::error::{CacheError, Result};
