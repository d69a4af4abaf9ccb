//! Concurrent clients against one server

use super::{download, start_quic_server, start_tcp_server, test_settings};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tqbench_core::{Dialer, Payload, QuicDialer, TlsTcpDialer};

const PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Read a little, then drop the stream without closing.
async fn abandon<D: Dialer>(dialer: &D, addr: std::net::SocketAddr) {
    let session = dialer.dial(addr).await.unwrap();
    let mut stream = dialer.open_inbound_stream(session).await.unwrap();
    let mut buf = [0u8; 1024];
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await;
    drop(stream);
}

#[tokio::test]
async fn test_tcp_simultaneous_clients_get_identical_payload() {
    let payload = Payload::generate(PAYLOAD_SIZE).unwrap();
    let expected = payload.bytes();
    let (addr, _server) = start_tcp_server(payload);

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let (a, b) = tokio::join!(download(&dialer, addr), download(&dialer, addr));

    assert_eq!(a.len(), PAYLOAD_SIZE);
    assert_eq!(a, b);
    assert_eq!(&a[..], &expected[..]);
}

#[tokio::test]
async fn test_quic_simultaneous_clients_get_identical_payload() {
    let payload = Payload::generate(PAYLOAD_SIZE).unwrap();
    let expected = payload.bytes();
    let (addr, _server) = start_quic_server(payload);

    let dialer = QuicDialer::new(&test_settings(), addr).unwrap();
    let (a, b) = tokio::join!(download(&dialer, addr), download(&dialer, addr));

    assert_eq!(a.len(), PAYLOAD_SIZE);
    assert_eq!(a, b);
    assert_eq!(&a[..], &expected[..]);
    dialer.shutdown().await;
}

#[tokio::test]
async fn test_tcp_abrupt_disconnect_is_isolated() {
    let payload = Payload::generate(PAYLOAD_SIZE).unwrap();
    let (addr, server) = start_tcp_server(payload);

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let ((), full) = tokio::join!(abandon(&dialer, addr), download(&dialer, addr));
    assert_eq!(full.len(), PAYLOAD_SIZE);

    // The server keeps accepting after the failed connection.
    let again = download(&dialer, addr).await;
    assert_eq!(again.len(), PAYLOAD_SIZE);
    assert!(!server.is_finished());
}

#[tokio::test]
async fn test_quic_abrupt_disconnect_is_isolated() {
    let payload = Payload::generate(PAYLOAD_SIZE).unwrap();
    let (addr, server) = start_quic_server(payload);

    let dialer = QuicDialer::new(&test_settings(), addr).unwrap();
    let ((), full) = tokio::join!(abandon(&dialer, addr), download(&dialer, addr));
    assert_eq!(full.len(), PAYLOAD_SIZE);

    let again = download(&dialer, addr).await;
    assert_eq!(again.len(), PAYLOAD_SIZE);
    assert!(!server.is_finished());
    dialer.shutdown().await;
}
