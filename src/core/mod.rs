//! Core components: the response cache and the metrics collector.
//!
//! The two are independent leaves; callers typically wire them together by
//! recording a metric annotated with whether the cache produced a hit.

pub mod cache;
pub mod metrics;

pub use cache::ResponseCache;
pub use metrics::MetricsCollector;
