//! Type definitions for request metrics and alerts

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token counts for one AI call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt: u64,
    /// Completion tokens
    pub completion: u64,
    /// Total tokens
    pub total: u64,
}

impl TokenUsage {
    /// Build from prompt and completion counts
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// One data point per completed AI request.
///
/// Immutable once appended; the collector only ever trims the oldest
/// samples when the retention cap overflows. `provider`, `model`, and
/// `operation` are free-form strings — any value is accepted, there is no
/// registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// Provider name (e.g. "anthropic", "bedrock")
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Caller-defined operation name
    pub operation: String,
    /// End-to-end latency in milliseconds
    pub latency_ms: f64,
    /// Whether the request succeeded
    pub success: bool,
    /// Whether the response came from the cache
    pub cached: bool,
    /// When the sample was recorded
    pub timestamp: DateTime<Utc>,
    /// Token counts, when the provider reported them
    pub tokens: Option<TokenUsage>,
    /// Derived USD cost, when tokens and a price entry were available
    pub cost_usd: Option<f64>,
    /// Error reason for failed requests
    pub error: Option<String>,
}

/// Aggregated view over a window of samples.
///
/// An empty window yields the all-zero default rather than an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedMetrics {
    /// Samples in the window
    pub total_requests: u64,
    /// Successful requests
    pub success_count: u64,
    /// Failed requests
    pub failure_count: u64,
    /// Cache-served requests
    pub cached_count: u64,
    /// Percent successful
    pub success_rate: f64,
    /// Percent cache-served
    pub cache_hit_rate: f64,
    /// Mean latency
    pub avg_latency_ms: f64,
    /// Median latency (nearest rank)
    pub p50_latency_ms: f64,
    /// 95th percentile latency
    pub p95_latency_ms: f64,
    /// 99th percentile latency
    pub p99_latency_ms: f64,
    /// Fastest request
    pub min_latency_ms: f64,
    /// Slowest request
    pub max_latency_ms: f64,
    /// Sum of token totals
    pub total_tokens: u64,
    /// Sum of derived costs
    pub total_cost_usd: f64,
    /// Error message -> occurrence count
    pub errors: HashMap<String, u64>,
    /// `count / max(span_ms, 1000) * 60000` over the window span
    pub requests_per_minute: f64,
}

/// Per-provider aggregation with a nested per-model breakdown
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderBreakdown {
    /// Aggregation over everything the provider served
    pub metrics: AggregatedMetrics,
    /// Model name -> aggregation
    pub models: HashMap<String, AggregatedMetrics>,
}

/// Cost sums over fixed lookback windows from "now"
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CostWindow {
    /// Last 24 hours
    pub daily: f64,
    /// Last 7 days
    pub weekly: f64,
    /// Last 30 days
    pub monthly: f64,
}

/// Cost totals: current windows plus per-provider and per-operation sums
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBreakdown {
    /// Fixed-lookback window sums
    pub current: CostWindow,
    /// Provider -> total cost over retained samples
    pub providers: HashMap<String, f64>,
    /// Operation -> total cost over retained samples
    pub operations: HashMap<String, f64>,
}

/// Derived health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Operable one-glance summary of AI-call health
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    /// Overall status derived from the configured thresholds
    pub status: HealthStatus,
    /// Seconds since the collector was created
    pub uptime_secs: u64,
    /// Requests in the default aggregation window
    pub total_requests: u64,
    /// Percent successful
    pub success_rate: f64,
    /// Percent cache-served
    pub cache_hit_rate: f64,
    /// Mean latency
    pub avg_latency_ms: f64,
    /// Requests in the last 60 seconds
    pub current_rpm: u64,
    /// Five most frequent error strings across all retained samples
    pub top_errors: Vec<(String, u64)>,
    /// Alerts raised by the most recent check cycle
    pub alerts: Vec<AlertEvent>,
}

/// What threshold an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ErrorRate,
    Latency,
    CacheHitRate,
    CostBudget,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One threshold breach found by a periodic check cycle.
///
/// Alerts are level-triggered: a still-breaching threshold produces a fresh
/// event every cycle, with no de-duplication.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// Unique event id
    pub id: String,
    /// Which threshold was breached
    pub kind: AlertKind,
    /// Severity
    pub severity: AlertSeverity,
    /// Human-readable description
    pub message: String,
    /// Observed metric value
    pub value: f64,
    /// Configured threshold
    pub threshold: f64,
    /// When the check ran
    pub timestamp: DateTime<Utc>,
}

/// Export formats for the raw sample dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}
