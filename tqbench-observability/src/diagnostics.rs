//! Local-only diagnostics endpoint.
//!
//! Serves `/metrics` (Prometheus text format) and `/health/ready`. The endpoint
//! is independent of the benchmark traffic and refuses to bind anything but a
//! loopback address.

use crate::metrics::gather_metrics;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tqbench_common::BenchError;
use tracing::info;

pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(|| async { gather_metrics() }))
        .route("/health/ready", get(|| async { "OK" }))
}

/// Bind the diagnostics listener. Fails for non-loopback addresses.
pub async fn bind_diagnostics(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    if !addr.ip().is_loopback() {
        return Err(BenchError::Config(format!(
            "diagnostics endpoint must bind a loopback address, got {addr}"
        ))
        .into());
    }
    Ok(TcpListener::bind(addr).await?)
}

/// Serve diagnostics until the listener fails.
pub async fn serve_diagnostics(listener: TcpListener) -> anyhow::Result<()> {
    info!(
        "Diagnostics endpoint listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, router()).await?;
    Ok(())
}
