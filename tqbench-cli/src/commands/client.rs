//! Client mode

use super::CommonArgs;
use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;
use tqbench_common::constants::{
    DEFAULT_INTER_TRIAL_DELAY, DEFAULT_MEASUREMENT_TRIALS, DEFAULT_WARMUP_TRIALS,
};
use tqbench_common::{MeasurementConfig, Protocol, DEFAULT_CLIENT_TARGET};
use tqbench_core::{
    Dialer, MeasurementDriver, QuicDialer, Report, ReportFormat, TlsTcpDialer,
};
use tracing::info;

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Warmup trials run first and left out of the statistics
    #[arg(long = "warmup", default_value_t = DEFAULT_WARMUP_TRIALS, env = "TQBENCH_WARMUP")]
    warmup_trials: usize,

    /// Measured trials
    #[arg(long = "trials", default_value_t = DEFAULT_MEASUREMENT_TRIALS, env = "TQBENCH_TRIALS")]
    measurement_trials: usize,

    /// Pause between consecutive trials, in milliseconds
    #[arg(
        long,
        default_value_t = DEFAULT_INTER_TRIAL_DELAY.as_millis() as u64,
        env = "TQBENCH_INTER_TRIAL_DELAY_MS"
    )]
    inter_trial_delay_ms: u64,

    /// Report format: text or json
    #[arg(long, default_value = "text", env = "TQBENCH_FORMAT")]
    format: ReportFormat,
}

pub async fn run(common: CommonArgs, args: ClientArgs) -> Result<()> {
    let settings = common.transport_settings()?;
    let target = common.resolve_addr(DEFAULT_CLIENT_TARGET).await?;
    let config = MeasurementConfig {
        payload_size: common.payload_size,
        warmup_trials: args.warmup_trials,
        measurement_trials: args.measurement_trials,
        inter_trial_delay: Duration::from_millis(args.inter_trial_delay_ms),
    };

    common.start_diagnostics().await?;

    let report = match common.proto {
        Protocol::Tcp => {
            let dialer = TlsTcpDialer::new(&settings)?;
            measure(dialer, common.proto, target, config).await?
        }
        Protocol::Quic => {
            let dialer = QuicDialer::new(&settings, target)
                .context("failed to create QUIC client endpoint")?;
            measure(dialer, common.proto, target, config).await?
        }
    };

    println!("{}", report.render(args.format)?.trim_end());
    Ok(())
}

async fn measure<D: Dialer>(
    dialer: D,
    protocol: Protocol,
    target: SocketAddr,
    config: MeasurementConfig,
) -> Result<Report> {
    let driver = MeasurementDriver::new(dialer, protocol, target, config)
        .context("invalid measurement configuration")?;
    let run = driver
        .run()
        .await
        .with_context(|| format!("{protocol} benchmark against {target} failed"))?;
    info!("Completed {} trials", run.series.len());
    Ok(Report::from_run(&run))
}
