#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for tqbench
//!
//! Every test runs a real payload server on an ephemeral loopback port and
//! drives it through the public client API.

mod concurrent_test;
mod measurement_test;
mod roundtrip_test;
mod tls_test;

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tqbench_common::{MeasurementConfig, TransportSettings};
use tqbench_core::{
    Dialer, Listener, Payload, PayloadServer, QuicListener, ServerIdentity, TlsTcpListener,
};

pub fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// Transport settings with a short idle timeout so a broken test fails fast.
pub fn test_settings() -> TransportSettings {
    tqbench_observability::init_minimal_logging();
    TransportSettings {
        idle_timeout: Duration::from_secs(10),
        ..Default::default()
    }
}

pub fn measurement(payload_size: usize, warmup: usize, trials: usize) -> MeasurementConfig {
    MeasurementConfig {
        payload_size,
        warmup_trials: warmup,
        measurement_trials: trials,
        inter_trial_delay: Duration::ZERO,
    }
}

/// Run a payload server in the background and return its bound address.
pub fn spawn_server<L: Listener>(listener: L, payload: Payload) -> (SocketAddr, JoinHandle<()>) {
    let server = PayloadServer::new(listener, payload);
    let addr = server.local_addr().expect("Failed to read server address");
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, handle)
}

pub fn start_tcp_server(payload: Payload) -> (SocketAddr, JoinHandle<()>) {
    let identity = ServerIdentity::self_signed("localhost").expect("Failed to create identity");
    let listener = TlsTcpListener::bind(loopback(), &identity, &test_settings())
        .expect("Failed to bind TCP listener");
    spawn_server(listener, payload)
}

pub fn start_quic_server(payload: Payload) -> (SocketAddr, JoinHandle<()>) {
    let identity = ServerIdentity::self_signed("localhost").expect("Failed to create identity");
    let listener = QuicListener::bind(loopback(), &identity, &test_settings())
        .expect("Failed to bind QUIC endpoint");
    spawn_server(listener, payload)
}

/// Download one payload and return its bytes.
pub async fn download<D: Dialer>(dialer: &D, addr: SocketAddr) -> Vec<u8> {
    let session = dialer.dial(addr).await.expect("Dial failed");
    let mut stream = dialer
        .open_inbound_stream(session)
        .await
        .expect("No inbound stream");
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut received))
        .await
        .expect("Download timed out")
        .expect("Read failed");
    dialer.close(stream).await;
    received
}

/// Generate a self-signed certificate for testing
pub fn generate_self_signed_cert(subject_alt_names: Vec<String>) -> (String, String) {
    let certified = rcgen::generate_simple_self_signed(subject_alt_names)
        .expect("Failed to generate cert");
    (certified.cert.pem(), certified.key_pair.serialize_pem())
}
