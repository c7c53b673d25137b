//! Logging setup
//!
//! Thin wrapper over `tracing-subscriber`. The composition root calls
//! [`init`] once; subsequent calls are ignored so tests can call it freely.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate when unset.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("llm_cache_rs=info"));

        // try_init so an outer subscriber (e.g. in tests) wins quietly
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}
