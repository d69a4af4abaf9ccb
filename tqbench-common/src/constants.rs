//! Default addresses, sizes and identifiers for tqbench.
//!
//! Use these constants instead of magic numbers so defaults stay consistent
//! across the library, the CLI and the integration tests.

use std::time::Duration;

/// Default benchmark port, shared by both protocols.
pub const DEFAULT_PORT: u16 = 4242;

/// Default server bind address (`0.0.0.0:4242`).
pub const DEFAULT_SERVER_BIND: &str = "0.0.0.0:4242";

/// Default client target address (`127.0.0.1:4242`).
pub const DEFAULT_CLIENT_TARGET: &str = "127.0.0.1:4242";

/// Default bind address for the diagnostics endpoint. Loopback only.
pub const DEFAULT_DIAGNOSTICS_BIND: &str = "127.0.0.1:6060";

/// ALPN identifier negotiated by both transports.
pub const ALPN_PROTOCOL: &str = "tcp-quic-bench";

/// Server name presented in the TLS ClientHello and baked into the self-signed cert.
pub const DEFAULT_SERVER_NAME: &str = "localhost";

/// Payload size served per connection: 1 GiB.
pub const DEFAULT_PAYLOAD_SIZE: usize = 1 << 30;

/// Per-frame application payload target used for both TCP MSS and QUIC initial MTU.
pub const DEFAULT_SEGMENT_SIZE: u16 = 1240;

/// QUIC forbids datagrams smaller than this on the initial path.
pub const MIN_QUIC_SEGMENT_SIZE: u16 = 1200;

/// Idle timeout enforced on dials, stream accepts and reads.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between trials so transient connection state settles.
pub const DEFAULT_INTER_TRIAL_DELAY: Duration = Duration::from_millis(100);

pub const DEFAULT_WARMUP_TRIALS: usize = 2;

pub const DEFAULT_MEASUREMENT_TRIALS: usize = 10;
