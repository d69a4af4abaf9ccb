//! Measurement driver against real servers

use super::{measurement, start_quic_server, start_tcp_server, test_settings};
use tqbench_common::{BenchError, Protocol};
use tqbench_core::{MeasurementDriver, Payload, QuicDialer, TlsTcpDialer};

#[tokio::test]
async fn test_warmup_trials_are_discarded() {
    let (addr, _server) = start_tcp_server(Payload::generate(16 * 1024).unwrap());

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(16 * 1024, 2, 10))
            .unwrap();
    let run = driver.run().await.unwrap();

    assert_eq!(run.series.len(), 12);
    assert_eq!(run.series.retained().len(), 10);
    assert_eq!(run.summary.trials, 10);
    assert_eq!(run.summary.bytes_per_trial, 16 * 1024);
    for trial in run.series.all() {
        assert_eq!(trial.total(), trial.handshake + trial.transfer);
    }
}

#[tokio::test]
async fn test_tcp_short_transfer_aborts_run() {
    // Server sends 16 KiB, client expects 64 KiB.
    let (addr, _server) = start_tcp_server(Payload::generate(16 * 1024).unwrap());

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(64 * 1024, 0, 3))
            .unwrap();
    let err = driver.run().await.unwrap_err();

    assert!(err.is_transfer());
    assert!(matches!(
        err,
        BenchError::ShortTransfer {
            expected: 65536,
            received: 16384
        }
    ));
}

#[tokio::test]
async fn test_quic_short_transfer_aborts_run() {
    let (addr, _server) = start_quic_server(Payload::generate(16 * 1024).unwrap());

    let dialer = QuicDialer::new(&test_settings(), addr).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Quic, addr, measurement(64 * 1024, 0, 3))
            .unwrap();
    let err = driver.run().await.unwrap_err();

    assert!(matches!(err, BenchError::ShortTransfer { .. }));
}

#[tokio::test]
async fn test_no_server_is_connect_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(1024, 0, 1)).unwrap();
    let err = driver.run().await.unwrap_err();

    assert!(matches!(err, BenchError::Connect(_)));
}
