//! TLS contexts shared by both bindings
//!
//! Both transports negotiate TLS 1.3 with the same ring provider and ALPN
//! identifier. The client skips certificate validation: tqbench
//! is a measurement tool, not a secure channel, and servers present a
//! throwaway self-signed certificate.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::{ClientConfig, DigitallySignedStruct, ServerConfig, SignatureScheme};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use std::path::Path;
use std::sync::Arc;
use tqbench_common::{BenchError, IdentitySource, Result, TransportSettings};
use tracing::info;

/// Certificate chain and private key presented by the server.
#[derive(Debug)]
pub struct ServerIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl ServerIdentity {
    pub fn self_signed(server_name: &str) -> Result<Self> {
        let certified = rcgen::generate_simple_self_signed(vec![server_name.to_string()])
            .map_err(|e| BenchError::Tls(format!("certificate generation failed: {e}")))?;
        let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());
        Ok(Self {
            cert_chain: vec![certified.cert.der().clone()],
            key: PrivateKeyDer::Pkcs8(key),
        })
    }

    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_chain = CertificateDer::pem_file_iter(cert_path)
            .map_err(|e| BenchError::Tls(format!("{}: {e}", cert_path.display())))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BenchError::Tls(format!("{}: {e}", cert_path.display())))?;
        if cert_chain.is_empty() {
            return Err(BenchError::Tls(format!(
                "{}: no certificates found",
                cert_path.display()
            )));
        }
        let key = PrivateKeyDer::from_pem_file(key_path)
            .map_err(|e| BenchError::Tls(format!("{}: {e}", key_path.display())))?;
        Ok(Self { cert_chain, key })
    }

    pub fn load(source: &IdentitySource, server_name: &str) -> Result<Self> {
        match source {
            IdentitySource::SelfSigned => {
                info!("Generating self-signed certificate for '{}'", server_name);
                Self::self_signed(server_name)
            }
            IdentitySource::PemFiles {
                cert_path,
                key_path,
            } => {
                info!(
                    "Loading TLS identity from {:?} and {:?}",
                    cert_path, key_path
                );
                Self::from_pem_files(cert_path, key_path)
            }
        }
    }
}

impl Clone for ServerIdentity {
    fn clone(&self) -> Self {
        Self {
            cert_chain: self.cert_chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

pub fn create_server_config(
    identity: &ServerIdentity,
    settings: &TransportSettings,
) -> Result<ServerConfig> {
    let mut config = ServerConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| BenchError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(identity.cert_chain.clone(), identity.key.clone_key())
        .map_err(|e| BenchError::Tls(format!("TLS config error: {e}")))?;
    config.alpn_protocols = vec![settings.alpn.as_bytes().to_vec()];
    Ok(config)
}

/// Client config that accepts any server certificate.
pub fn create_client_config(settings: &TransportSettings) -> Result<ClientConfig> {
    let provider = provider();
    let mut config = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| BenchError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification { provider }))
        .with_no_client_auth();
    config.alpn_protocols = vec![settings.alpn.as_bytes().to_vec()];
    Ok(config)
}

pub fn server_name(settings: &TransportSettings) -> Result<ServerName<'static>> {
    ServerName::try_from(settings.server_name.clone())
        .map_err(|e| BenchError::Config(format!("invalid server name: {e}")))
}

#[derive(Debug)]
struct SkipServerVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
