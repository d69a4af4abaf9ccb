//! TLS identity integration tests

use super::{loopback, measurement, spawn_server, test_settings};
use std::io::Write;
use std::path::{Path, PathBuf};
use tqbench_common::{IdentitySource, Protocol};
use tqbench_core::{
    MeasurementDriver, Payload, QuicDialer, QuicListener, ServerIdentity, TlsTcpDialer,
    TlsTcpListener,
};

/// Write a fresh certificate and key into a unique temp directory.
fn write_pem_files() -> (PathBuf, PathBuf, PathBuf) {
    let temp_dir =
        std::env::temp_dir().join(format!("tqbench_test_tls_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&temp_dir).unwrap();

    let (cert_pem, key_pem) =
        super::generate_self_signed_cert(vec!["localhost".to_string(), "127.0.0.1".to_string()]);

    let cert_path = temp_dir.join("server.crt");
    let key_path = temp_dir.join("server.key");
    std::fs::File::create(&cert_path)
        .unwrap()
        .write_all(cert_pem.as_bytes())
        .unwrap();
    std::fs::File::create(&key_path)
        .unwrap()
        .write_all(key_pem.as_bytes())
        .unwrap();

    (temp_dir, cert_path, key_path)
}

fn load(cert_path: &Path, key_path: &Path) -> ServerIdentity {
    let source = IdentitySource::PemFiles {
        cert_path: cert_path.to_path_buf(),
        key_path: key_path.to_path_buf(),
    };
    ServerIdentity::load(&source, "localhost").expect("Failed to load PEM identity")
}

#[tokio::test]
async fn test_tcp_with_pem_identity() {
    let (temp_dir, cert_path, key_path) = write_pem_files();
    let identity = load(&cert_path, &key_path);

    let listener = TlsTcpListener::bind(loopback(), &identity, &test_settings()).unwrap();
    let (addr, _server) = spawn_server(listener, Payload::generate(8192).unwrap());

    let dialer = TlsTcpDialer::new(&test_settings()).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Tcp, addr, measurement(8192, 0, 2)).unwrap();
    let run = driver.run().await.expect("Run over PEM identity failed");
    assert_eq!(run.summary.bytes_per_trial, 8192);

    let _ = std::fs::remove_dir_all(temp_dir);
}

#[tokio::test]
async fn test_quic_with_pem_identity() {
    let (temp_dir, cert_path, key_path) = write_pem_files();
    let identity = load(&cert_path, &key_path);

    let listener = QuicListener::bind(loopback(), &identity, &test_settings()).unwrap();
    let (addr, _server) = spawn_server(listener, Payload::generate(8192).unwrap());

    let dialer = QuicDialer::new(&test_settings(), addr).unwrap();
    let driver =
        MeasurementDriver::new(dialer, Protocol::Quic, addr, measurement(8192, 0, 2)).unwrap();
    let run = driver.run().await.expect("Run over PEM identity failed");
    assert_eq!(run.summary.trials, 2);

    let _ = std::fs::remove_dir_all(temp_dir);
}

#[test]
fn test_missing_pem_files_are_rejected() {
    let missing = std::env::temp_dir().join(format!("tqbench_missing_{}", uuid::Uuid::new_v4()));
    let result = ServerIdentity::from_pem_files(&missing.join("a.crt"), &missing.join("a.key"));
    assert!(result.is_err());
}
