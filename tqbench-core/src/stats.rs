//! Statistics engine: aggregates retained trials into per-phase mean and
//! population standard deviation, plus the mean of per-trial throughput.

use serde::Serialize;
use std::time::Duration;

/// Outcome of one completed trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialResult {
    pub bytes_transferred: u64,
    pub handshake: Duration,
    pub transfer: Duration,
}

impl TrialResult {
    /// Handshake plus transfer, summed exactly.
    pub fn total(&self) -> Duration {
        self.handshake + self.transfer
    }

    /// Bits per second over the whole trial, or `None` for a zero-length trial.
    pub fn throughput_bps(&self) -> Option<f64> {
        let secs = self.total().as_secs_f64();
        if secs > 0.0 {
            Some(self.bytes_transferred as f64 * 8.0 / secs)
        } else {
            None
        }
    }
}

/// Mean and population standard deviation of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseStats {
    pub mean: Duration,
    pub std_dev: Duration,
}

impl PhaseStats {
    /// Aggregate a non-empty set of durations. The mean is computed on integer
    /// nanoseconds so identical inputs reproduce exactly.
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }
        let n = durations.len() as u128;
        let sum: u128 = durations.iter().map(Duration::as_nanos).sum();
        let mean_nanos = sum / n;

        let mean_f = sum as f64 / n as f64;
        let variance = durations
            .iter()
            .map(|d| {
                let delta = d.as_nanos() as f64 - mean_f;
                delta * delta
            })
            .sum::<f64>()
            / n as f64;

        Self {
            mean: nanos_to_duration(mean_nanos),
            std_dev: Duration::from_nanos(variance.sqrt().round() as u64),
        }
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000) as u64;
    let sub = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, sub)
}

/// Degenerate input the engine tolerated instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsWarning {
    /// Trial at this position of the retained series took zero time and was
    /// left out of the throughput average.
    ZeroDuration { trial: usize },
}

impl std::fmt::Display for StatsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDuration { trial } => write!(
                f,
                "trial {trial} has zero total duration; excluded from throughput"
            ),
        }
    }
}

/// Aggregate statistics over the retained trials of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub trials: usize,
    /// Byte count of the first retained trial; every trial moves the same payload
    pub bytes_per_trial: u64,
    pub handshake: PhaseStats,
    pub transfer: PhaseStats,
    pub total: PhaseStats,
    /// Arithmetic mean of per-trial throughput, `None` if every trial was degenerate
    pub mean_throughput_gbps: Option<f64>,
    pub warnings: Vec<StatsWarning>,
}

impl Summary {
    /// Aggregate `trials`, or `None` when there is nothing to aggregate.
    pub fn from_trials(trials: &[TrialResult]) -> Option<Self> {
        let first = trials.first()?;

        let handshakes: Vec<Duration> = trials.iter().map(|t| t.handshake).collect();
        let transfers: Vec<Duration> = trials.iter().map(|t| t.transfer).collect();
        let totals: Vec<Duration> = trials.iter().map(TrialResult::total).collect();

        let mut warnings = Vec::new();
        let mut throughputs = Vec::with_capacity(trials.len());
        for (i, trial) in trials.iter().enumerate() {
            match trial.throughput_bps() {
                Some(bps) => throughputs.push(bps),
                None => warnings.push(StatsWarning::ZeroDuration { trial: i }),
            }
        }
        let mean_throughput_gbps = if throughputs.is_empty() {
            None
        } else {
            Some(throughputs.iter().sum::<f64>() / throughputs.len() as f64 / 1e9)
        };

        Some(Self {
            trials: trials.len(),
            bytes_per_trial: first.bytes_transferred,
            handshake: PhaseStats::from_durations(&handshakes),
            transfer: PhaseStats::from_durations(&transfers),
            total: PhaseStats::from_durations(&totals),
            mean_throughput_gbps,
            warnings,
        })
    }
}
