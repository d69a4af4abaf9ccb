pub mod client;
pub mod server;

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;
use tqbench_common::constants::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SERVER_NAME};
use tqbench_common::{
    Protocol, TransportSettings, ALPN_PROTOCOL, DEFAULT_DIAGNOSTICS_BIND, DEFAULT_PAYLOAD_SIZE,
    DEFAULT_SEGMENT_SIZE,
};
use tqbench_observability::diagnostics::{bind_diagnostics, serve_diagnostics};
use tqbench_observability::init_metrics;
use tracing::error;

pub use client::ClientArgs;
pub use server::ServerArgs;

/// Flags shared by both modes. Client and server must agree on all of them.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Transport under test
    #[arg(long, default_value = "quic", env = "TQBENCH_PROTO")]
    pub proto: Protocol,

    /// Address to listen on (server, default 0.0.0.0:4242) or connect to
    /// (client, default 127.0.0.1:4242)
    #[arg(long, env = "TQBENCH_ADDR")]
    pub addr: Option<String>,

    /// Payload size in bytes
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_SIZE, env = "TQBENCH_PAYLOAD_SIZE")]
    pub payload_size: usize,

    /// TCP maximum segment size and QUIC packet size, in bytes
    #[arg(long, default_value_t = DEFAULT_SEGMENT_SIZE, env = "TQBENCH_SEGMENT_SIZE")]
    pub segment_size: u16,

    /// Handshake, stream-accept and per-read timeout, in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs(),
        env = "TQBENCH_IDLE_TIMEOUT_SECS"
    )]
    pub idle_timeout_secs: u64,

    /// TLS server name sent by the client and put in the self-signed certificate
    #[arg(long, default_value = DEFAULT_SERVER_NAME, env = "TQBENCH_SERVER_NAME")]
    pub server_name: String,

    /// Serve /metrics and /health/ready on the diagnostics address
    #[arg(long, env = "TQBENCH_DIAGNOSTICS")]
    pub diagnostics: bool,

    /// Diagnostics address; must be a loopback address
    #[arg(long, default_value = DEFAULT_DIAGNOSTICS_BIND, env = "TQBENCH_DIAGNOSTICS_BIND")]
    pub diagnostics_bind: SocketAddr,
}

impl CommonArgs {
    pub fn transport_settings(&self) -> Result<TransportSettings> {
        let settings = TransportSettings {
            segment_size: self.segment_size,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            alpn: ALPN_PROTOCOL.to_string(),
            server_name: self.server_name.clone(),
        };
        settings.validate().context("invalid transport settings")?;
        Ok(settings)
    }

    /// Resolve `--addr`, falling back to the mode's default.
    pub async fn resolve_addr(&self, default: &str) -> Result<SocketAddr> {
        let addr = self.addr.as_deref().unwrap_or(default);
        tokio::net::lookup_host(addr)
            .await
            .with_context(|| format!("failed to resolve {addr}"))?
            .next()
            .with_context(|| format!("{addr} resolved to no addresses"))
    }

    /// Start the loopback diagnostics endpoint when requested.
    pub async fn start_diagnostics(&self) -> Result<()> {
        if !self.diagnostics {
            return Ok(());
        }
        init_metrics();
        let listener = bind_diagnostics(self.diagnostics_bind).await?;
        tokio::spawn(async move {
            if let Err(e) = serve_diagnostics(listener).await {
                error!("Diagnostics server error: {}", e);
            }
        });
        Ok(())
    }
}
