pub mod metrics;
pub mod tracing;

#[cfg(feature = "axum")]
pub mod diagnostics;

pub use metrics::{
    bench_metrics, gather_metrics, init_metrics, metrics_enabled, BenchMetrics, REGISTRY,
};
pub use tracing::{init_logging, LoggingConfig};

/// Minimal logging setup: human-readable lines on stderr, `info` unless `RUST_LOG`
/// says otherwise. Safe to call more than once.
pub fn init_minimal_logging() {
    let _ = init_logging(&LoggingConfig::default());
}
