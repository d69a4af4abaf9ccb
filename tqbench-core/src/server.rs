//! Payload server: accept loop that hands every client the same payload.

use crate::payload::Payload;
use crate::transport::{InboundConnection, Listener};
use std::net::SocketAddr;
use tqbench_common::Result;
use tracing::{debug, info, info_span, warn, Instrument};

pub struct PayloadServer<L: Listener> {
    listener: L,
    payload: Payload,
}

impl<L: Listener> PayloadServer<L> {
    pub fn new(listener: L, payload: Payload) -> Self {
        Self { listener, payload }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Accept until the listener closes. Each connection runs on its own task
    /// and its failure never reaches the loop.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Serving {} byte payload on {}",
            self.payload.len(),
            self.listener.local_addr()?
        );

        while let Some(accepted) = self.listener.accept().await {
            let connection = match accepted {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    record_failure();
                    continue;
                }
            };

            let peer = connection.peer_addr();
            let payload = self.payload.bytes();
            debug!("Accepted connection from {}", peer);
            record_accept();

            tokio::spawn(
                async move {
                    match connection.serve(payload).await {
                        Ok(sent) => {
                            debug!("Sent {} bytes", sent);
                            record_served(sent);
                        }
                        Err(e) => {
                            warn!("Connection error: {}", e);
                            record_failure();
                        }
                    }
                    record_closed();
                }
                .instrument(info_span!("connection", %peer)),
            );
        }

        info!("Listener closed, accept loop finished");
        Ok(())
    }
}

#[cfg(feature = "metrics")]
fn record_accept() {
    if let Some(m) = tqbench_observability::bench_metrics() {
        m.connections_accepted.inc();
        m.active_connections.inc();
    }
}

#[cfg(feature = "metrics")]
fn record_served(sent: u64) {
    if let Some(m) = tqbench_observability::bench_metrics() {
        m.payload_bytes_sent.inc_by(sent);
    }
}

#[cfg(feature = "metrics")]
fn record_failure() {
    if let Some(m) = tqbench_observability::bench_metrics() {
        m.connections_failed.inc();
    }
}

#[cfg(feature = "metrics")]
fn record_closed() {
    if let Some(m) = tqbench_observability::bench_metrics() {
        m.active_connections.dec();
    }
}

#[cfg(not(feature = "metrics"))]
fn record_accept() {}
#[cfg(not(feature = "metrics"))]
fn record_served(_sent: u64) {}
#[cfg(not(feature = "metrics"))]
fn record_failure() {}
#[cfg(not(feature = "metrics"))]
fn record_closed() {}
