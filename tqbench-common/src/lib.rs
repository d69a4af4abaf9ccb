//! Common configuration, constants and error types for tqbench

pub mod config;
pub mod constants;
pub mod error;

pub use config::{IdentitySource, MeasurementConfig, Protocol, ServerConfig, TransportSettings};
pub use constants::{
    ALPN_PROTOCOL, DEFAULT_CLIENT_TARGET, DEFAULT_DIAGNOSTICS_BIND, DEFAULT_PAYLOAD_SIZE,
    DEFAULT_PORT, DEFAULT_SEGMENT_SIZE, DEFAULT_SERVER_BIND,
};
pub use error::{BenchError, Result};
