//! tqbench
//!
//! Serves a fixed random payload over TLS/TCP or QUIC, or downloads it
//! repeatedly and reports handshake and transfer timings.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::{ClientArgs, CommonArgs, ServerArgs};
use tqbench_observability::{init_logging, LoggingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve the payload to every client until killed
    Server,
    /// Run the measurement trials and print a report
    Client,
}

#[derive(Parser, Debug)]
#[command(
    name = "tqbench",
    author,
    version,
    about = "Bulk-transfer benchmark comparing TLS over TCP with QUIC",
    long_about = "tqbench measures how long it takes to download a fixed payload over \
                  TLS 1.3/TCP and over QUIC.\n\n\
                  Start one process with --mode server, then run --mode client with the \
                  same --proto against it."
)]
struct Cli {
    /// Run as payload server or measuring client
    #[arg(long, value_enum, default_value = "server", env = "TQBENCH_MODE")]
    mode: Mode,

    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    server: ServerArgs,

    #[command(flatten)]
    client: ClientArgs,

    /// Emit logs as JSON lines
    #[arg(long, env = "TQBENCH_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        json: cli.log_json,
        ..LoggingConfig::default()
    })?;

    let outcome = match cli.mode {
        Mode::Server => commands::server::run(cli.common, cli.server).await,
        Mode::Client => commands::client::run(cli.common, cli.client).await,
    };
    if let Err(e) = &outcome {
        tracing::error!("{:#}", e);
    }
    outcome
}
