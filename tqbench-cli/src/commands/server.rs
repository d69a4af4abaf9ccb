//! Server mode

use super::CommonArgs;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tqbench_common::{IdentitySource, Protocol, ServerConfig, DEFAULT_SERVER_BIND};
use tqbench_core::{
    Listener, Payload, PayloadServer, QuicListener, ServerIdentity, TlsTcpListener,
};
use tracing::info;

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Path to TLS certificate chain (PEM format); self-signed when omitted
    #[arg(long, env = "TQBENCH_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// Path to TLS private key (PEM format)
    #[arg(long, env = "TQBENCH_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,
}

impl ServerArgs {
    fn identity_source(&self) -> IdentitySource {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => IdentitySource::PemFiles {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            },
            _ => IdentitySource::SelfSigned,
        }
    }
}

pub async fn run(common: CommonArgs, args: ServerArgs) -> Result<()> {
    let settings = common.transport_settings()?;
    let config = ServerConfig {
        bind_addr: common.resolve_addr(DEFAULT_SERVER_BIND).await?,
        payload_size: common.payload_size,
        identity: args.identity_source(),
    };
    config.validate().context("invalid server configuration")?;

    common.start_diagnostics().await?;

    info!(
        "Starting tqbench {} server v{}",
        common.proto,
        env!("CARGO_PKG_VERSION")
    );

    let identity = ServerIdentity::load(&config.identity, &settings.server_name)
        .context("failed to load TLS identity")?;
    let payload = Payload::generate(config.payload_size)?;

    match common.proto {
        Protocol::Tcp => {
            let listener = TlsTcpListener::bind(config.bind_addr, &identity, &settings)
                .with_context(|| format!("failed to bind TCP listener on {}", config.bind_addr))?;
            serve(listener, payload).await
        }
        Protocol::Quic => {
            let listener = QuicListener::bind(config.bind_addr, &identity, &settings)
                .with_context(|| format!("failed to bind QUIC endpoint on {}", config.bind_addr))?;
            serve(listener, payload).await
        }
    }
}

async fn serve<L: Listener>(listener: L, payload: Payload) -> Result<()> {
    let server = PayloadServer::new(listener, payload);
    info!("Listening on {}", server.local_addr()?);
    server.run().await?;
    Ok(())
}
