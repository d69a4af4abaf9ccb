//! Error types for tqbench

use thiserror::Error;

/// Main error type for tqbench operations
#[derive(Error, Debug)]
pub enum BenchError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dial or handshake failure
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Segment size alignment could not be applied to a socket
    #[error("Segment size configuration failed: {0}")]
    SegmentConfig(String),

    /// Read, write or stream error in the middle of the payload
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Stream ended before the whole payload arrived
    #[error("Short transfer: received {received} of {expected} bytes")]
    ShortTransfer { expected: u64, received: u64 },

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(String),
}

impl BenchError {
    /// Whether the error belongs to the transfer class (mid-payload failure or short read).
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer(_) | Self::ShortTransfer { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BenchError>;
