//! Benchmark report rendering
//!
//! The text form is one `Label: value` pair per line with fixed labels, so it
//! can be scraped with `grep`/`awk`. Durations are printed in seconds.

use crate::driver::BenchmarkRun;
use crate::stats::{PhaseStats, StatsWarning, Summary};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use tqbench_common::{BenchError, Protocol, Result};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(BenchError::Config(format!(
                "unknown report format '{other}', expected 'text' or 'json'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseReport {
    pub mean_secs: f64,
    pub stddev_secs: f64,
}

impl From<PhaseStats> for PhaseReport {
    fn from(stats: PhaseStats) -> Self {
        Self {
            mean_secs: stats.mean.as_secs_f64(),
            stddev_secs: stats.std_dev.as_secs_f64(),
        }
    }
}

/// Rendered result of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub protocol: Protocol,
    pub target: SocketAddr,
    pub bytes_per_trial: u64,
    pub trials: usize,
    pub warmup_trials: usize,
    pub handshake: PhaseReport,
    pub transfer: PhaseReport,
    pub total: PhaseReport,
    pub throughput_gbps: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StatsWarning>,
}

impl Report {
    pub fn new(
        protocol: Protocol,
        target: SocketAddr,
        warmup_trials: usize,
        summary: &Summary,
    ) -> Self {
        Self {
            protocol,
            target,
            bytes_per_trial: summary.bytes_per_trial,
            trials: summary.trials,
            warmup_trials,
            handshake: summary.handshake.into(),
            transfer: summary.transfer.into(),
            total: summary.total.into(),
            throughput_gbps: summary.mean_throughput_gbps,
            warnings: summary.warnings.clone(),
        }
    }

    pub fn from_run(run: &BenchmarkRun) -> Self {
        Self::new(
            run.protocol,
            run.target,
            run.series.warmup().len(),
            &run.summary,
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BenchError::Config(format!("failed to encode report: {e}")))
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol: {}", self.protocol)?;
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "Bytes per trial: {}", self.bytes_per_trial)?;
        writeln!(f, "Trials: {}", self.trials)?;
        writeln!(f, "Warmup trials: {}", self.warmup_trials)?;
        for (label, phase) in [
            ("Handshake", &self.handshake),
            ("Transfer", &self.transfer),
            ("Total", &self.total),
        ] {
            writeln!(f, "{label} mean: {:.6} s", phase.mean_secs)?;
            writeln!(f, "{label} stddev: {:.6} s", phase.stddev_secs)?;
        }
        match self.throughput_gbps {
            Some(gbps) => writeln!(f, "Throughput mean: {gbps:.4} Gbps"),
            None => writeln!(f, "Throughput mean: n/a"),
        }
    }
}
