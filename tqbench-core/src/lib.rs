//! Benchmark harness for comparing TLS/TCP and QUIC bulk transfers.

pub mod driver;
pub mod payload;
pub mod report;
pub mod server;
pub mod stats;
pub mod transport;

pub use driver::{BenchmarkRun, MeasurementDriver, TrialPhase, TrialSeries};
pub use payload::Payload;
pub use report::{Report, ReportFormat};
pub use server::PayloadServer;
pub use stats::{PhaseStats, StatsWarning, Summary, TrialResult};
pub use transport::{
    read_all, Dialer, InboundConnection, Listener, QuicDialer, QuicListener, ServerIdentity,
    TlsTcpDialer, TlsTcpListener,
};
