use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> =
    LazyLock::new(|| Registry::new_custom(Some("tqbench".into()), None).unwrap());

static METRICS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Counters shared by the server loop and the measurement driver.
pub struct BenchMetrics {
    pub connections_accepted: IntCounter,
    pub connections_failed: IntCounter,
    pub active_connections: IntGauge,
    pub payload_bytes_sent: IntCounter,
    pub trials_completed: IntCounter,
    /// Seconds per trial phase, labelled `handshake` or `transfer`
    pub trial_phase_seconds: HistogramVec,
}

static METRICS: LazyLock<BenchMetrics> = LazyLock::new(|| {
    let connections_accepted = IntCounter::with_opts(Opts::new(
        "connections_accepted_total",
        "Inbound connections handed to a payload writer",
    ))
    .unwrap();
    let connections_failed = IntCounter::with_opts(Opts::new(
        "connections_failed_total",
        "Inbound connections that ended in a handshake or write error",
    ))
    .unwrap();
    let active_connections = IntGauge::with_opts(Opts::new(
        "active_connections",
        "Connections currently receiving the payload",
    ))
    .unwrap();
    let payload_bytes_sent = IntCounter::with_opts(Opts::new(
        "payload_bytes_sent_total",
        "Payload bytes fully written to clients",
    ))
    .unwrap();
    let trials_completed = IntCounter::with_opts(Opts::new(
        "trials_completed_total",
        "Client trials that received the whole payload",
    ))
    .unwrap();
    let trial_phase_seconds = HistogramVec::new(
        HistogramOpts::new("trial_phase_seconds", "Duration of each trial phase").buckets(vec![
            0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["phase"],
    )
    .unwrap();

    REGISTRY
        .register(Box::new(connections_accepted.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(connections_failed.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(active_connections.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(payload_bytes_sent.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(trials_completed.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(trial_phase_seconds.clone()))
        .unwrap();

    BenchMetrics {
        connections_accepted,
        connections_failed,
        active_connections,
        payload_bytes_sent,
        trials_completed,
        trial_phase_seconds,
    }
});

/// Turn metric collection on. Until this is called [`bench_metrics`] returns `None`
/// and instrumented code skips all recording.
pub fn init_metrics() -> &'static BenchMetrics {
    METRICS_ENABLED.store(true, Ordering::Release);
    &METRICS
}

pub fn metrics_enabled() -> bool {
    METRICS_ENABLED.load(Ordering::Acquire)
}

pub fn bench_metrics() -> Option<&'static BenchMetrics> {
    if metrics_enabled() {
        Some(&METRICS)
    } else {
        None
    }
}

/// Render every registered metric in the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut families = REGISTRY.gather();
    families.extend(prometheus::gather());
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
