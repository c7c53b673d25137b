//! Configuration models and environment loader
//!
//! Every section deserializes with per-field defaults so a partial config
//! (or none at all) yields a working instance. `Config::from_env` overlays
//! `LLM_*` environment variables on top of the defaults.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::error::{CacheError, Result};

/// Top-level configuration for the cache and metrics engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Metrics collector configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one JSON shadow file per entry
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Maximum in-memory size in bytes
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: usize,
    /// Default TTL in seconds applied when `set` passes none
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
    /// Interval of the expired-entry sweep, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Interval of the memory-to-disk flush, in seconds
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            max_size_bytes: default_max_size_bytes(),
            default_ttl_seconds: default_ttl_seconds(),
            sweep_interval_secs: default_sweep_interval(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

/// Metrics collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Hard cap on retained samples (ring-buffer semantics)
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Interval of the periodic alert-threshold check, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Alert thresholds
    #[serde(default)]
    pub thresholds: AlertThresholds,
    /// Whether to derive USD cost from token counts
    #[serde(default = "default_true")]
    pub cost_tracking: bool,
    /// Per-provider per-token price table
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Daily cost budget in USD; breaching it raises an alert
    #[serde(default)]
    pub daily_cost_budget_usd: Option<f64>,
    /// Weekly cost budget in USD; breaching it raises an alert
    #[serde(default)]
    pub weekly_cost_budget_usd: Option<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
            check_interval_secs: default_check_interval(),
            thresholds: AlertThresholds::default(),
            cost_tracking: true,
            pricing: PricingConfig::default(),
            daily_cost_budget_usd: None,
            weekly_cost_budget_usd: None,
        }
    }
}

/// Thresholds evaluated by the periodic alert check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Maximum tolerated error rate, percent
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate_pct: f64,
    /// Maximum tolerated average latency, milliseconds
    #[serde(default = "default_max_latency")]
    pub max_avg_latency_ms: f64,
    /// Minimum expected cache hit rate, percent
    #[serde(default = "default_min_cache_hit_rate")]
    pub min_cache_hit_rate_pct: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_error_rate_pct: default_max_error_rate(),
            max_avg_latency_ms: default_max_latency(),
            min_cache_hit_rate_pct: default_min_cache_hit_rate(),
        }
    }
}

/// Per-token pricing for one provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProviderPricing {
    /// USD per prompt token
    pub input_cost_per_token: f64,
    /// USD per completion token
    pub output_cost_per_token: f64,
}

/// Price table keyed by provider name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Provider name -> per-token prices. Providers absent from the table
    /// simply get no cost figures recorded.
    pub providers: HashMap<String, ProviderPricing>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderPricing {
                input_cost_per_token: 0.0000025,
                output_cost_per_token: 0.00001,
            },
        );
        providers.insert(
            "anthropic".to_string(),
            ProviderPricing {
                input_cost_per_token: 0.000003,
                output_cost_per_token: 0.000015,
            },
        );
        providers.insert(
            "bedrock".to_string(),
            ProviderPricing {
                input_cost_per_token: 0.000003,
                output_cost_per_token: 0.000015,
            },
        );
        Self { providers }
    }
}

impl PricingConfig {
    /// Look up prices for a provider
    pub fn get(&self, provider: &str) -> Option<ProviderPricing> {
        self.providers.get(provider).copied()
    }
}

impl Config {
    /// Load configuration from environment variables, overlaying defaults
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment variables");

        let mut config = Self::default();

        // Cache configuration
        if let Ok(dir) = env::var("LLM_CACHE_DIR") {
            config.cache.dir = PathBuf::from(dir);
        }
        if let Ok(max_bytes) = env::var("LLM_CACHE_MAX_BYTES") {
            config.cache.max_size_bytes = max_bytes
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid max cache size: {}", e)))?;
        }
        if let Ok(ttl) = env::var("LLM_CACHE_DEFAULT_TTL") {
            config.cache.default_ttl_seconds = ttl
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid default TTL: {}", e)))?;
        }
        if let Ok(interval) = env::var("LLM_CACHE_SWEEP_INTERVAL") {
            config.cache.sweep_interval_secs = interval
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid sweep interval: {}", e)))?;
        }
        if let Ok(interval) = env::var("LLM_CACHE_FLUSH_INTERVAL") {
            config.cache.flush_interval_secs = interval
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid flush interval: {}", e)))?;
        }

        // Metrics configuration
        if let Ok(max_samples) = env::var("LLM_METRICS_MAX_SAMPLES") {
            config.metrics.max_samples = max_samples
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid max samples: {}", e)))?;
        }
        if let Ok(interval) = env::var("LLM_METRICS_INTERVAL") {
            config.metrics.check_interval_secs = interval
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid metrics interval: {}", e)))?;
        }
        if let Ok(rate) = env::var("LLM_ALERT_MAX_ERROR_RATE") {
            config.metrics.thresholds.max_error_rate_pct = rate
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid max error rate: {}", e)))?;
        }
        if let Ok(latency) = env::var("LLM_ALERT_MAX_LATENCY_MS") {
            config.metrics.thresholds.max_avg_latency_ms = latency
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid max latency: {}", e)))?;
        }
        if let Ok(rate) = env::var("LLM_ALERT_MIN_CACHE_HIT_RATE") {
            config.metrics.thresholds.min_cache_hit_rate_pct = rate
                .parse()
                .map_err(|e| CacheError::Config(format!("Invalid min cache hit rate: {}", e)))?;
        }

        // Cost tracking
        if let Ok(enabled) = env::var("LLM_COST_TRACKING") {
            config.metrics.cost_tracking = matches!(enabled.to_lowercase().as_str(), "true" | "1");
        }
        if let Ok(budget) = env::var("LLM_COST_DAILY_BUDGET") {
            config.metrics.daily_cost_budget_usd = Some(
                budget
                    .parse()
                    .map_err(|e| CacheError::Config(format!("Invalid daily budget: {}", e)))?,
            );
        }
        if let Ok(budget) = env::var("LLM_COST_WEEKLY_BUDGET") {
            config.metrics.weekly_cost_budget_usd = Some(
                budget
                    .parse()
                    .map_err(|e| CacheError::Config(format!("Invalid weekly budget: {}", e)))?,
            );
        }

        debug!("Configuration loaded from environment variables");
        Ok(config)
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache/llm")
}

fn default_max_size_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_flush_interval() -> u64 {
    60
}

fn default_max_samples() -> usize {
    10_000
}

fn default_check_interval() -> u64 {
    60
}

fn default_max_error_rate() -> f64 {
    10.0
}

fn default_max_latency() -> f64 {
    10_000.0
}

fn default_min_cache_hit_rate() -> f64 {
    20.0
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.max_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.cache.default_ttl_seconds, 3600);
        assert_eq!(config.metrics.max_samples, 10_000);
        assert!(config.metrics.cost_tracking);
        assert!(config.metrics.pricing.get("anthropic").is_some());
        assert!(config.metrics.pricing.get("unknown-provider").is_none());
    }

    #[test]
    fn test_partial_deserialization() {
        let config: Config =
            serde_json::from_str(r#"{"cache": {"max_size_bytes": 1024}}"#).unwrap();
        assert_eq!(config.cache.max_size_bytes, 1024);
        assert_eq!(config.cache.default_ttl_seconds, 3600);
        assert_eq!(config.metrics.thresholds.max_error_rate_pct, 10.0);
    }
}
