//! Request metrics: sample collection, sliding-window aggregation, cost
//! breakdowns, and threshold alerts

pub mod collector;
pub mod types;

mod alerts;


pub use collector::{AlertCallback, MetricsCollector};
pub use types::{
    AggregatedMetrics, AlertEvent, AlertKind, AlertSeverity, CostBreakdown, CostWindow,
    ExportFormat, HealthStatus, HealthSummary, MetricSample, ProviderBreakdown, TokenUsage,
};
