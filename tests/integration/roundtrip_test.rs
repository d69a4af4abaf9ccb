//! Single-trial round trips for both transports

use super::{measurement, start_quic_server, start_tcp_server, test_settings};
use std::time::Duration;
use tqbench_common::Protocol;
use tqbench_core::{MeasurementDriver, Payload, QuicDialer, Report, TlsTcpDialer};

const PAYLOAD_SIZE: usize = 64 * 1024;

#[tokio::test]
async fn test_tcp_round_trip() {
    let (addr, _server) = start_tcp_server(Payload::generate(PAYLOAD_SIZE).unwrap());

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(PAYLOAD_SIZE, 0, 1))
            .unwrap();
    let result = driver.run_trial().await.expect("Trial failed");

    assert_eq!(result.bytes_transferred, 65536);
    assert!(result.handshake > Duration::ZERO);
    assert!(result.transfer > Duration::ZERO);
}

#[tokio::test]
async fn test_quic_round_trip() {
    let (addr, _server) = start_quic_server(Payload::generate(PAYLOAD_SIZE).unwrap());

    let dialer = QuicDialer::new(&test_settings(), addr).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Quic, addr, measurement(PAYLOAD_SIZE, 0, 1))
            .unwrap();
    let run = driver.run().await.expect("Run failed");

    let result = run.series.retained()[0];
    assert_eq!(result.bytes_transferred, 65536);
    assert!(result.handshake > Duration::ZERO);
    assert!(result.transfer > Duration::ZERO);
}

#[tokio::test]
async fn test_report_from_real_run() {
    let (addr, _server) = start_tcp_server(Payload::generate(PAYLOAD_SIZE).unwrap());

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(PAYLOAD_SIZE, 1, 2))
            .unwrap();
    let run = driver.run().await.unwrap();
    let text = Report::from_run(&run).to_string();

    assert!(text.contains("Protocol: tcp"));
    assert!(text.contains("Bytes per trial: 65536"));
    assert!(text.contains("Trials: 2"));
    assert!(text.contains("Throughput mean: "));
    assert!(text.lines().any(|l| l.starts_with("Handshake mean: ")));
}

#[test]
fn test_undersized_segment_is_rejected() {
    let settings = tqbench_common::TransportSettings {
        segment_size: 1000,
        ..test_settings()
    };
    assert!(settings.validate().is_err());
}
