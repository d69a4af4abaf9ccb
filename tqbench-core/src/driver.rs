//! Measurement driver
//!
//! Runs `warmup + measurement` trials strictly one after another through a
//! [`Dialer`], timing each trial in two phases:
//!
//! ```text
//! t0 ── dial ── t1 ── open inbound stream ── t2 ── drain to EOF ── t3
//!      └──────── handshake = t2 - t0 ───────┘    └ transfer = t3 - t2 ┘
//! ```
//!
//! Opening the inbound stream is charged to the handshake for every protocol.
//! For TLS/TCP it is a no-op, so both protocols' handshake phase ends at the
//! point application bytes can flow.

use crate::stats::{Summary, TrialResult};
use crate::transport::{read_all, Dialer};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;
use tqbench_common::{BenchError, MeasurementConfig, Protocol, Result};
use tracing::{debug, info, info_span, warn, Instrument};

/// Lifecycle of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Idle,
    Dialing,
    HandshakeComplete,
    Transferring,
    Complete,
    Failed,
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Dialing => "dialing",
            Self::HandshakeComplete => "handshake-complete",
            Self::Transferring => "transferring",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Trial results in execution order, split into a discarded warmup prefix and
/// a retained measurement suffix.
#[derive(Debug, Clone, Default)]
pub struct TrialSeries {
    warmup: usize,
    results: Vec<TrialResult>,
}

impl TrialSeries {
    pub fn new(warmup: usize) -> Self {
        Self {
            warmup,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: TrialResult) {
        self.results.push(result);
    }

    /// Every executed trial, warmup included.
    pub fn all(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn warmup(&self) -> &[TrialResult] {
        &self.results[..self.warmup.min(self.results.len())]
    }

    /// Trials that feed the statistics.
    pub fn retained(&self) -> &[TrialResult] {
        &self.results[self.warmup.min(self.results.len())..]
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Byte count of the very first trial, used as the run's bytes-per-trial.
    pub fn bytes_per_trial(&self) -> Option<u64> {
        self.results.first().map(|r| r.bytes_transferred)
    }
}

/// Completed benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub protocol: Protocol,
    pub target: SocketAddr,
    pub series: TrialSeries,
    pub summary: Summary,
}

/// Drives trials against one server through one transport binding.
pub struct MeasurementDriver<D: Dialer> {
    dialer: D,
    protocol: Protocol,
    target: SocketAddr,
    config: MeasurementConfig,
}

impl<D: Dialer> MeasurementDriver<D> {
    pub fn new(
        dialer: D,
        protocol: Protocol,
        target: SocketAddr,
        config: MeasurementConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dialer,
            protocol,
            target,
            config,
        })
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    /// Run every trial. The first failing trial aborts the run; no partial
    /// summary is produced.
    pub async fn run(&self) -> Result<BenchmarkRun> {
        let total = self.config.total_trials();
        info!(
            "Running {} {} trials against {} ({} warmup, {} measured)",
            total,
            self.protocol,
            self.target,
            self.config.warmup_trials,
            self.config.measurement_trials
        );

        let mut series = TrialSeries::new(self.config.warmup_trials);
        let outcome = self.run_all(total, &mut series).await;
        self.dialer.shutdown().await;
        outcome?;

        let summary = Summary::from_trials(series.retained())
            .ok_or_else(|| BenchError::Config("no measurement trials were retained".into()))?;
        for warning in &summary.warnings {
            warn!("{}", warning);
        }

        Ok(BenchmarkRun {
            protocol: self.protocol,
            target: self.target,
            series,
            summary,
        })
    }

    async fn run_all(&self, total: usize, series: &mut TrialSeries) -> Result<()> {
        for index in 0..total {
            let warmup = index < self.config.warmup_trials;
            let span = info_span!("trial", index, warmup);
            let result = self.run_trial().instrument(span).await?;
            series.push(result);

            if index + 1 < total && !self.config.inter_trial_delay.is_zero() {
                tokio::time::sleep(self.config.inter_trial_delay).await;
            }
        }
        Ok(())
    }

    /// Execute one dial → receive → close cycle.
    pub async fn run_trial(&self) -> Result<TrialResult> {
        let mut phase = TrialPhase::Idle;
        let outcome = self.measure(&mut phase).await;
        match outcome {
            Ok(result) => {
                record_metrics(&result);
                Ok(result)
            }
            Err(e) => {
                warn!("Trial failed while {}: {}", phase, e);
                phase = TrialPhase::Failed;
                debug!("Trial is {}", phase);
                Err(e)
            }
        }
    }

    async fn measure(&self, phase: &mut TrialPhase) -> Result<TrialResult> {
        let expected = self.config.payload_size as u64;

        *phase = TrialPhase::Dialing;
        let t0 = Instant::now();
        let session = self.dialer.dial(self.target).await?;
        let t1 = Instant::now();
        *phase = TrialPhase::HandshakeComplete;

        let mut stream = self.dialer.open_inbound_stream(session).await?;
        let t2 = Instant::now();
        debug!(
            "Connected in {:?}, stream ready after {:?}",
            t1 - t0,
            t2 - t1
        );

        *phase = TrialPhase::Transferring;
        let received = read_all(&mut stream, self.dialer.idle_timeout()).await?;
        let t3 = Instant::now();
        self.dialer.close(stream).await;

        if received < expected {
            return Err(BenchError::ShortTransfer { expected, received });
        }
        if received > expected {
            return Err(BenchError::Transfer(format!(
                "received {received} bytes, {} more than the {expected} byte payload",
                received - expected
            )));
        }
        *phase = TrialPhase::Complete;
        debug!("Trial is {}", phase);

        let result = TrialResult {
            bytes_transferred: received,
            handshake: t2 - t0,
            transfer: t3 - t2,
        };
        info!(
            "{} bytes: handshake {:.6}s, transfer {:.6}s, {:.4} Gbps",
            result.bytes_transferred,
            result.handshake.as_secs_f64(),
            result.transfer.as_secs_f64(),
            result.throughput_bps().unwrap_or(0.0) / 1e9
        );
        Ok(result)
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(result: &TrialResult) {
    if let Some(metrics) = tqbench_observability::bench_metrics() {
        metrics.trials_completed.inc();
        metrics
            .trial_phase_seconds
            .with_label_values(&["handshake"])
            .observe(result.handshake.as_secs_f64());
        metrics
            .trial_phase_seconds
            .with_label_values(&["transfer"])
            .observe(result.transfer.as_secs_f64());
    }
}

#[cfg(not(feature = "metrics"))]
fn record_metrics(_result: &TrialResult) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    /// In-memory binding: every dial spawns a writer that sends `serve_bytes`
    /// and closes.
    struct MemoryDialer {
        serve_bytes: usize,
        dials: Arc<AtomicUsize>,
        fail_on_dial: Option<usize>,
    }

    impl MemoryDialer {
        fn new(serve_bytes: usize) -> Self {
            Self {
                serve_bytes,
                dials: Arc::new(AtomicUsize::new(0)),
                fail_on_dial: None,
            }
        }
    }

    impl Dialer for MemoryDialer {
        type Session = DuplexStream;
        type Stream = DuplexStream;

        async fn dial(&self, _addr: SocketAddr) -> Result<Self::Session> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_dial == Some(n) {
                return Err(BenchError::Connect("refused".into()));
            }
            let (client, mut server) = tokio::io::duplex(16 * 1024);
            let len = self.serve_bytes;
            tokio::spawn(async move {
                let _ = server.write_all(&vec![0xAB; len]).await;
                let _ = server.shutdown().await;
            });
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(client)
        }

        async fn open_inbound_stream(&self, session: Self::Session) -> Result<Self::Stream> {
            Ok(session)
        }

        async fn close(&self, _stream: Self::Stream) {}

        fn idle_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    fn config(payload_size: usize, warmup: usize, measured: usize) -> MeasurementConfig {
        MeasurementConfig {
            payload_size,
            warmup_trials: warmup,
            measurement_trials: measured,
            inter_trial_delay: Duration::ZERO,
        }
    }

    fn target() -> SocketAddr {
        "127.0.0.1:4242".parse().unwrap()
    }

    #[tokio::test]
    async fn test_warmup_trials_run_but_are_not_aggregated() {
        let dialer = MemoryDialer::new(8192);
        let dials = dialer.dials.clone();
        let driver =
            MeasurementDriver::new(dialer, Protocol::Tcp, target(), config(8192, 2, 10)).unwrap();

        let run = driver.run().await.unwrap();
        assert_eq!(dials.load(Ordering::SeqCst), 12);
        assert_eq!(run.series.len(), 12);
        assert_eq!(run.series.warmup().len(), 2);
        assert_eq!(run.series.retained().len(), 10);
        assert_eq!(run.summary.trials, 10);
        assert_eq!(run.summary.bytes_per_trial, 8192);
        assert_eq!(run.series.bytes_per_trial(), Some(8192));
    }

    #[tokio::test]
    async fn test_phases_are_positive() {
        let driver = MeasurementDriver::new(
            MemoryDialer::new(4096),
            Protocol::Tcp,
            target(),
            config(4096, 0, 1),
        )
        .unwrap();
        let result = driver.run_trial().await.unwrap();
        assert_eq!(result.bytes_transferred, 4096);
        assert!(result.handshake > Duration::ZERO);
        assert_eq!(result.total(), result.handshake + result.transfer);
    }

    #[tokio::test]
    async fn test_short_transfer_aborts_run() {
        let driver = MeasurementDriver::new(
            MemoryDialer::new(1000),
            Protocol::Quic,
            target(),
            config(4096, 1, 3),
        )
        .unwrap();
        let err = driver.run().await.unwrap_err();
        assert!(matches!(
            err,
            BenchError::ShortTransfer {
                expected: 4096,
                received: 1000
            }
        ));
        assert!(err.is_transfer());
    }

    #[tokio::test]
    async fn test_over_delivery_is_transfer_error() {
        let driver = MeasurementDriver::new(
            MemoryDialer::new(5000),
            Protocol::Tcp,
            target(),
            config(4096, 0, 1),
        )
        .unwrap();
        let err = driver.run_trial().await.unwrap_err();
        assert!(matches!(err, BenchError::Transfer(_)));
        assert!(err.to_string().contains("904 more"));
    }

    #[tokio::test]
    async fn test_connect_failure_mid_run_is_fatal() {
        let mut dialer = MemoryDialer::new(512);
        dialer.fail_on_dial = Some(3);
        let dials = dialer.dials.clone();
        let driver =
            MeasurementDriver::new(dialer, Protocol::Tcp, target(), config(512, 0, 10)).unwrap();

        let err = driver.run().await.unwrap_err();
        assert!(matches!(err, BenchError::Connect(_)));
        assert_eq!(dials.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_rejects_zero_measurement_trials() {
        let result = MeasurementDriver::new(
            MemoryDialer::new(1),
            Protocol::Tcp,
            target(),
            config(1, 3, 0),
        );
        assert!(matches!(result, Err(BenchError::Config(_))));
    }

    #[test]
    fn test_series_partition() {
        let mut series = TrialSeries::new(2);
        assert!(series.retained().is_empty());
        for i in 0..5u64 {
            series.push(TrialResult {
                bytes_transferred: 100 + i,
                handshake: Duration::from_millis(i),
                transfer: Duration::from_millis(i),
            });
        }
        assert_eq!(series.warmup().len(), 2);
        assert_eq!(series.retained().len(), 3);
        assert_eq!(series.retained()[0].bytes_transferred, 102);
        assert_eq!(series.bytes_per_trial(), Some(100));
    }
}
