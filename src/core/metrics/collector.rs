//! Metrics collection and aggregation
//!
//! One `MetricSample` per completed AI request, retained in a ring buffer
//! and aggregated on demand over sliding windows. Aggregations are pure
//! reads over whatever snapshot of the buffer exists at query time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::types::{
    AggregatedMetrics, AlertEvent, CostBreakdown, ExportFormat, HealthStatus, HealthSummary,
    MetricSample, ProviderBreakdown, TokenUsage,
};
use crate::config::MetricsConfig;

/// Callback invoked for every alert raised by a periodic check cycle
pub type AlertCallback = Box<dyn Fn(&AlertEvent) + Send + Sync>;

/// Collects per-request samples and serves aggregated views, cost
/// breakdowns, and threshold alerts.
///
/// Cheap to clone; clones share the same sample buffer and callbacks.
#[derive(Clone)]
pub struct MetricsCollector {
    pub(super) config: MetricsConfig,
    pub(super) samples: Arc<RwLock<VecDeque<MetricSample>>>,
    pub(super) callbacks: Arc<parking_lot::RwLock<Vec<AlertCallback>>>,
    pub(super) recent_alerts: Arc<parking_lot::Mutex<Vec<AlertEvent>>>,
    started_at: Instant,
    tasks: Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
}

impl MetricsCollector {
    /// Create a new collector. Call [`start`](Self::start) to run the
    /// periodic alert check.
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            samples: Arc::new(RwLock::new(VecDeque::new())),
            callbacks: Arc::new(parking_lot::RwLock::new(Vec::new())),
            recent_alerts: Arc::new(parking_lot::Mutex::new(Vec::new())),
            started_at: Instant::now(),
            tasks: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Start the periodic alert-threshold check.
    pub fn start(&self) {
        let collector = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                collector.config.check_interval_secs.max(1),
            ));
            loop {
                interval.tick().await;
                collector.check_thresholds().await;
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Append one sample for a completed request.
    ///
    /// When token counts are present, cost tracking is on, and the provider
    /// has a price entry, `cost_usd = prompt * input_price + completion *
    /// output_price` is derived; a missing price entry silently skips cost.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_request(
        &self,
        provider: &str,
        model: &str,
        operation: &str,
        latency_ms: f64,
        success: bool,
        cached: bool,
        tokens: Option<TokenUsage>,
        error: Option<String>,
    ) {
        let cost_usd = if self.config.cost_tracking {
            tokens.as_ref().and_then(|usage| {
                self.config.pricing.get(provider).map(|price| {
                    usage.prompt as f64 * price.input_cost_per_token
                        + usage.completion as f64 * price.output_cost_per_token
                })
            })
        } else {
            None
        };

        let sample = MetricSample {
            provider: provider.to_string(),
            model: model.to_string(),
            operation: operation.to_string(),
            latency_ms,
            success,
            cached,
            timestamp: Utc::now(),
            tokens,
            cost_usd,
            error,
        };

        self.push_sample(sample).await;
    }

    /// Append a pre-built sample and trim the buffer to its cap.
    pub(crate) async fn push_sample(&self, sample: MetricSample) {
        let mut samples = self.samples.write().await;
        samples.push_back(sample);
        while samples.len() > self.config.max_samples {
            samples.pop_front();
        }
    }

    /// Aggregate samples recorded at or after `since` (default: one hour
    /// ago). An empty window yields all zeros.
    pub async fn get_metrics(&self, since: Option<DateTime<Utc>>) -> AggregatedMetrics {
        let since = since.unwrap_or_else(|| Utc::now() - Duration::hours(1));
        let samples = self.samples.read().await;
        aggregate(samples.iter().filter(|s| s.timestamp >= since))
    }

    /// Same aggregation grouped by provider, with a nested per-model
    /// breakdown under each.
    pub async fn provider_metrics(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> HashMap<String, ProviderBreakdown> {
        let since = since.unwrap_or_else(|| Utc::now() - Duration::hours(1));
        let samples = self.samples.read().await;

        let mut grouped: HashMap<String, Vec<&MetricSample>> = HashMap::new();
        for sample in samples.iter().filter(|s| s.timestamp >= since) {
            grouped.entry(sample.provider.clone()).or_default().push(sample);
        }

        grouped
            .into_iter()
            .map(|(provider, provider_samples)| {
                let mut models: HashMap<String, Vec<&MetricSample>> = HashMap::new();
                for sample in provider_samples.iter().copied() {
                    models.entry(sample.model.clone()).or_default().push(sample);
                }
                let breakdown = ProviderBreakdown {
                    metrics: aggregate(provider_samples.iter().copied()),
                    models: models
                        .into_iter()
                        .map(|(model, model_samples)| {
                            (model, aggregate(model_samples.into_iter()))
                        })
                        .collect(),
                };
                (provider, breakdown)
            })
            .collect()
    }

    /// Same aggregation grouped by operation.
    pub async fn operation_metrics(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> HashMap<String, AggregatedMetrics> {
        let since = since.unwrap_or_else(|| Utc::now() - Duration::hours(1));
        let samples = self.samples.read().await;

        let mut grouped: HashMap<String, Vec<&MetricSample>> = HashMap::new();
        for sample in samples.iter().filter(|s| s.timestamp >= since) {
            grouped
                .entry(sample.operation.clone())
                .or_default()
                .push(sample);
        }

        grouped
            .into_iter()
            .map(|(operation, group)| (operation, aggregate(group.into_iter())))
            .collect()
    }

    /// Cost sums: fixed 24h/7d/30d lookback windows from now, plus
    /// per-provider and per-operation totals over all retained samples.
    ///
    /// The window-filtered view over the sample buffer is the single source
    /// of truth for "current" cost; there is no separately reset
    /// accumulator.
    pub async fn cost_breakdown(&self) -> CostBreakdown {
        let now = Utc::now();
        let day_ago = now - Duration::hours(24);
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);

        let samples = self.samples.read().await;
        let mut breakdown = CostBreakdown::default();

        for sample in samples.iter() {
            let Some(cost) = sample.cost_usd else { continue };

            if sample.timestamp >= day_ago {
                breakdown.current.daily += cost;
            }
            if sample.timestamp >= week_ago {
                breakdown.current.weekly += cost;
            }
            if sample.timestamp >= month_ago {
                breakdown.current.monthly += cost;
            }

            *breakdown
                .providers
                .entry(sample.provider.clone())
                .or_insert(0.0) += cost;
            *breakdown
                .operations
                .entry(sample.operation.clone())
                .or_insert(0.0) += cost;
        }

        breakdown
    }

    /// One-glance health summary over the default aggregation window.
    pub async fn summary(&self) -> HealthSummary {
        let metrics = self.get_metrics(None).await;
        let thresholds = &self.config.thresholds;

        let status = if metrics.total_requests == 0 {
            HealthStatus::Healthy
        } else if metrics.success_rate < 90.0 {
            HealthStatus::Critical
        } else if metrics.success_rate < 95.0
            || metrics.avg_latency_ms > thresholds.max_avg_latency_ms
            || metrics.cache_hit_rate < thresholds.min_cache_hit_rate_pct
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        let samples = self.samples.read().await;
        let minute_ago = Utc::now() - Duration::seconds(60);
        let current_rpm = samples.iter().filter(|s| s.timestamp >= minute_ago).count() as u64;

        let mut error_counts: HashMap<&str, u64> = HashMap::new();
        for sample in samples.iter() {
            if let Some(error) = &sample.error {
                *error_counts.entry(error.as_str()).or_insert(0) += 1;
            }
        }
        let mut top_errors: Vec<(String, u64)> = error_counts
            .into_iter()
            .map(|(error, count)| (error.to_string(), count))
            .collect();
        top_errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_errors.truncate(5);

        HealthSummary {
            status,
            uptime_secs: self.started_at.elapsed().as_secs(),
            total_requests: metrics.total_requests,
            success_rate: metrics.success_rate,
            cache_hit_rate: metrics.cache_hit_rate,
            avg_latency_ms: metrics.avg_latency_ms,
            current_rpm,
            top_errors,
            alerts: self.recent_alerts.lock().clone(),
        }
    }

    /// Register a callback for threshold alerts. Callbacks fire once per
    /// breaching threshold per check cycle, with no de-duplication across
    /// cycles.
    pub fn on_alert<F>(&self, callback: F)
    where
        F: Fn(&AlertEvent) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Box::new(callback));
    }

    /// Dump every retained sample, unaggregated.
    pub async fn export(&self, format: ExportFormat) -> String {
        let samples = self.samples.read().await;
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&samples.iter().collect::<Vec<_>>())
                    .unwrap_or_else(|_| "[]".to_string())
            }
            ExportFormat::Csv => {
                let mut out = String::from(
                    "timestamp,provider,model,operation,latency_ms,success,cached,\
                     prompt_tokens,completion_tokens,total_tokens,cost_usd,error\n",
                );
                for s in samples.iter() {
                    let (prompt, completion, total) = s
                        .tokens
                        .map(|t| (t.prompt, t.completion, t.total))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{},{},{},{},{}\n",
                        s.timestamp.to_rfc3339(),
                        s.provider,
                        s.model,
                        s.operation,
                        s.latency_ms,
                        s.success,
                        s.cached,
                        prompt,
                        completion,
                        total,
                        s.cost_usd.map(|c| c.to_string()).unwrap_or_default(),
                        s.error
                            .as_deref()
                            .unwrap_or_default()
                            .replace([',', '\n'], ";"),
                    ));
                }
                out
            }
        }
    }

    /// Discard every retained sample and the last check cycle's alerts.
    pub async fn clear(&self) {
        self.samples.write().await.clear();
        self.recent_alerts.lock().clear();
        debug!("Metrics cleared");
    }

    /// Stop the periodic alert check.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            handle.abort();
        }
        info!("Metrics collector shut down");
    }
}

/// Aggregate an iterator of samples into one view.
fn aggregate<'a, I>(samples: I) -> AggregatedMetrics
where
    I: Iterator<Item = &'a MetricSample>,
{
    let samples: Vec<&MetricSample> = samples.collect();
    if samples.is_empty() {
        return AggregatedMetrics::default();
    }

    let total = samples.len() as u64;
    let success_count = samples.iter().filter(|s| s.success).count() as u64;
    let cached_count = samples.iter().filter(|s| s.cached).count() as u64;

    let mut latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut errors: HashMap<String, u64> = HashMap::new();
    for sample in &samples {
        if let Some(error) = &sample.error {
            *errors.entry(error.clone()).or_insert(0) += 1;
        }
    }

    let oldest = samples.iter().map(|s| s.timestamp).min().unwrap_or_default();
    let newest = samples.iter().map(|s| s.timestamp).max().unwrap_or_default();
    let span_ms = (newest - oldest).num_milliseconds().max(1000) as f64;

    AggregatedMetrics {
        total_requests: total,
        success_count,
        failure_count: total - success_count,
        cached_count,
        success_rate: success_count as f64 / total as f64 * 100.0,
        cache_hit_rate: cached_count as f64 / total as f64 * 100.0,
        avg_latency_ms: latencies.iter().sum::<f64>() / latencies.len() as f64,
        p50_latency_ms: percentile(&latencies, 0.50),
        p95_latency_ms: percentile(&latencies, 0.95),
        p99_latency_ms: percentile(&latencies, 0.99),
        min_latency_ms: latencies.first().copied().unwrap_or(0.0),
        max_latency_ms: latencies.last().copied().unwrap_or(0.0),
        total_tokens: samples
            .iter()
            .filter_map(|s| s.tokens.map(|t| t.total))
            .sum(),
        total_cost_usd: samples.iter().filter_map(|s| s.cost_usd).sum(),
        errors,
        requests_per_minute: total as f64 / span_ms * 60_000.0,
    }
}

/// Nearest-rank percentile over a sorted slice: `sorted[ceil(n * p) - 1]`,
/// zero-based. For latencies 1..=100 this gives p50 = 50 and p99 = 99.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() as f64 * p).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}
