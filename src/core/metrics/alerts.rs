//! Periodic alert-threshold evaluation
//!
//! Runs every check cycle over the default aggregation window plus the
//! cost windows. Level-triggered: a threshold that stays breached produces
//! one fresh alert object per cycle.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::collector::MetricsCollector;
use super::types::{AlertEvent, AlertKind, AlertSeverity};

impl MetricsCollector {
    /// Evaluate every configured threshold and fire registered callbacks
    /// for each breach found in this cycle.
    pub(crate) async fn check_thresholds(&self) {
        let metrics = self.get_metrics(None).await;
        let thresholds = self.config.thresholds.clone();
        let mut alerts = Vec::new();

        if metrics.total_requests > 0 {
            let error_rate = 100.0 - metrics.success_rate;
            if error_rate > thresholds.max_error_rate_pct {
                alerts.push(make_alert(
                    AlertKind::ErrorRate,
                    AlertSeverity::Critical,
                    format!(
                        "Error rate {:.1}% exceeds threshold {:.1}%",
                        error_rate, thresholds.max_error_rate_pct
                    ),
                    error_rate,
                    thresholds.max_error_rate_pct,
                ));
            }

            if metrics.avg_latency_ms > thresholds.max_avg_latency_ms {
                alerts.push(make_alert(
                    AlertKind::Latency,
                    AlertSeverity::Warning,
                    format!(
                        "Average latency {:.0}ms exceeds threshold {:.0}ms",
                        metrics.avg_latency_ms, thresholds.max_avg_latency_ms
                    ),
                    metrics.avg_latency_ms,
                    thresholds.max_avg_latency_ms,
                ));
            }

            if metrics.cache_hit_rate < thresholds.min_cache_hit_rate_pct {
                alerts.push(make_alert(
                    AlertKind::CacheHitRate,
                    AlertSeverity::Warning,
                    format!(
                        "Cache hit rate {:.1}% below threshold {:.1}%",
                        metrics.cache_hit_rate, thresholds.min_cache_hit_rate_pct
                    ),
                    metrics.cache_hit_rate,
                    thresholds.min_cache_hit_rate_pct,
                ));
            }
        }

        let costs = self.cost_breakdown().await;
        if let Some(budget) = self.config.daily_cost_budget_usd {
            if costs.current.daily > budget {
                alerts.push(make_alert(
                    AlertKind::CostBudget,
                    AlertSeverity::Critical,
                    format!(
                        "Daily cost ${:.4} exceeds budget ${:.4}",
                        costs.current.daily, budget
                    ),
                    costs.current.daily,
                    budget,
                ));
            }
        }
        if let Some(budget) = self.config.weekly_cost_budget_usd {
            if costs.current.weekly > budget {
                alerts.push(make_alert(
                    AlertKind::CostBudget,
                    AlertSeverity::Critical,
                    format!(
                        "Weekly cost ${:.4} exceeds budget ${:.4}",
                        costs.current.weekly, budget
                    ),
                    costs.current.weekly,
                    budget,
                ));
            }
        }

        if alerts.is_empty() {
            debug!("Alert check: all thresholds within bounds");
        } else {
            for alert in &alerts {
                warn!("[{}] {}", alert.severity, alert.message);
            }
        }

        *self.recent_alerts.lock() = alerts.clone();

        let callbacks = self.callbacks.read();
        for alert in &alerts {
            for callback in callbacks.iter() {
                callback(alert);
            }
        }
    }
}

fn make_alert(
    kind: AlertKind,
    severity: AlertSeverity,
    message: String,
    value: f64,
    threshold: f64,
) -> AlertEvent {
    AlertEvent {
        id: Uuid::new_v4().to_string(),
        kind,
        severity,
        message,
        value,
        threshold,
        timestamp: Utc::now(),
    }
}
