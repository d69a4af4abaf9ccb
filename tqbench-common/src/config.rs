//! Configuration types for tqbench
//!
//! Every structure here is built once at startup and handed to the harness by
//! value or reference; nothing in the process mutates configuration afterwards.

use crate::constants::{
    ALPN_PROTOCOL, DEFAULT_IDLE_TIMEOUT, DEFAULT_INTER_TRIAL_DELAY, DEFAULT_MEASUREMENT_TRIALS,
    DEFAULT_PAYLOAD_SIZE, DEFAULT_SEGMENT_SIZE, DEFAULT_SERVER_NAME, DEFAULT_WARMUP_TRIALS,
    MIN_QUIC_SEGMENT_SIZE,
};
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Transport under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TLS 1.3 over a single TCP connection
    Tcp,
    /// QUIC with one server-initiated unidirectional stream
    Quic,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Quic => "quic",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "quic" => Ok(Self::Quic),
            other => Err(BenchError::Config(format!(
                "unknown protocol '{other}', expected 'tcp' or 'quic'"
            ))),
        }
    }
}

/// Knobs shared by both transport bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Effective per-frame payload: TCP_MAXSEG for TCP, initial MTU for QUIC
    pub segment_size: u16,
    /// Upper bound on any single blocking dial, accept or read
    pub idle_timeout: Duration,
    /// ALPN identifier offered by the client and required by the server
    pub alpn: String,
    /// SNI sent by the client
    pub server_name: String,
}

impl TransportSettings {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.segment_size < MIN_QUIC_SEGMENT_SIZE {
            return Err(BenchError::Config(format!(
                "segment_size must be at least {MIN_QUIC_SEGMENT_SIZE} (got {})",
                self.segment_size
            )));
        }
        if self.idle_timeout.is_zero() {
            return Err(BenchError::Config("idle_timeout must be non-zero".into()));
        }
        if self.alpn.is_empty() {
            return Err(BenchError::Config("alpn is required".into()));
        }
        if self.server_name.is_empty() {
            return Err(BenchError::Config("server_name is required".into()));
        }
        Ok(())
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            alpn: ALPN_PROTOCOL.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

/// Client-side measurement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Bytes every trial must receive
    pub payload_size: usize,
    /// Trials executed first and discarded
    pub warmup_trials: usize,
    /// Trials retained for statistics
    pub measurement_trials: usize,
    /// Pause between consecutive trials, excluded from every measurement
    pub inter_trial_delay: Duration,
}

impl MeasurementConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.payload_size == 0 {
            return Err(BenchError::Config("payload_size must be non-zero".into()));
        }
        if self.measurement_trials == 0 {
            return Err(BenchError::Config(
                "at least one measurement trial is required".into(),
            ));
        }
        Ok(())
    }

    pub fn total_trials(&self) -> usize {
        self.warmup_trials + self.measurement_trials
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            payload_size: DEFAULT_PAYLOAD_SIZE,
            warmup_trials: DEFAULT_WARMUP_TRIALS,
            measurement_trials: DEFAULT_MEASUREMENT_TRIALS,
            inter_trial_delay: DEFAULT_INTER_TRIAL_DELAY,
        }
    }
}

/// Where the server's TLS identity comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum IdentitySource {
    /// Generate a fresh self-signed certificate at startup
    #[default]
    SelfSigned,
    /// Load a PEM certificate chain and private key from disk
    PemFiles { cert_path: PathBuf, key_path: PathBuf },
}

/// Server-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Size of the payload written to every connection
    pub payload_size: usize,
    /// TLS identity
    pub identity: IdentitySource,
}

impl ServerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.payload_size == 0 {
            return Err(BenchError::Config("payload_size must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], crate::constants::DEFAULT_PORT).into(),
            payload_size: DEFAULT_PAYLOAD_SIZE,
            identity: IdentitySource::default(),
        }
    }
}
