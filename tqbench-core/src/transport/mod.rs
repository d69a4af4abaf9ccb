//! Transport bindings for the benchmark harness
//!
//! Both protocols expose the same capability set:
//!
//! - client side, [`Dialer`]: `dial` completes the handshake, `open_inbound_stream`
//!   yields the byte stream carrying the payload, [`read_all`] drains it.
//! - server side, [`Listener`]: `accept` yields one [`InboundConnection`] per
//!   client, which finishes its own handshake and writes the payload.
//!
//! The protocol is chosen once at startup; everything downstream is generic
//! over these traits.

use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tqbench_common::{BenchError, Result};

pub mod quic;
pub mod socket_tuning;
pub mod tcp;
pub mod tls;

pub use quic::{QuicDialer, QuicListener};
pub use tcp::{TlsTcpDialer, TlsTcpListener};
pub use tls::ServerIdentity;

/// Read buffer used while draining a stream.
const DRAIN_BUFFER_SIZE: usize = 256 * 1024;

/// Largest slice handed to a single bounded write.
const WRITE_CHUNK_SIZE: usize = 256 * 1024;

/// Client half of a transport binding.
pub trait Dialer: Send + Sync {
    /// Established connection, handshake complete.
    type Session: Send;
    /// Byte stream the server writes the payload into.
    type Stream: AsyncRead + Send + Unpin;

    /// Connect and run the full handshake. Failures are [`BenchError::Connect`].
    fn dial(&self, addr: SocketAddr) -> impl Future<Output = Result<Self::Session>> + Send;

    /// Turn a session into the stream carrying the payload. TLS/TCP hands the
    /// connection itself back; QUIC waits for the server's first stream.
    fn open_inbound_stream(
        &self,
        session: Self::Session,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Release the stream after a complete read. Dropping a stream also releases
    /// it, so error paths need no explicit call.
    fn close(&self, stream: Self::Stream) -> impl Future<Output = ()> + Send;

    /// Bound applied to each blocking read while draining.
    fn idle_timeout(&self) -> Duration;

    /// Release resources shared across trials once the run is over.
    fn shutdown(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Server half of a transport binding.
pub trait Listener: Send + 'static {
    type Connection: InboundConnection;

    fn local_addr(&self) -> Result<SocketAddr>;

    /// Wait for the next client. `None` means the listener is closed and no
    /// further connections will arrive; `Some(Err(_))` is a per-connection
    /// failure the caller logs and skips.
    fn accept(&mut self) -> impl Future<Output = Option<Result<Self::Connection>>> + Send;
}

/// One accepted client, owned by exactly one handler task.
pub trait InboundConnection: Send + 'static {
    fn peer_addr(&self) -> SocketAddr;

    /// Finish the handshake, write the whole payload, then close. Returns the
    /// number of payload bytes written.
    fn serve(self, payload: Bytes) -> impl Future<Output = Result<u64>> + Send;
}

/// Drain `stream` to end-of-stream, discarding the bytes.
///
/// Every individual read is bounded by `idle_timeout`; a stalled peer becomes a
/// [`BenchError::Timeout`] instead of a hang. Read errors become
/// [`BenchError::Transfer`].
pub async fn read_all<S>(stream: &mut S, idle_timeout: Duration) -> Result<u64>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; DRAIN_BUFFER_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = tokio::time::timeout(idle_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| {
                BenchError::Timeout(format!(
                    "no data for {idle_timeout:?} after {total} bytes"
                ))
            })?
            .map_err(|e| BenchError::Transfer(format!("read failed after {total} bytes: {e}")))?;
        if n == 0 {
            return Ok(total);
        }
        total += n as u64;
    }
}

/// Write all of `data` then shut the stream down.
///
/// Each chunk write and the final shutdown are bounded by `idle_timeout`, so a
/// peer that stops reading becomes a [`BenchError::Timeout`].
pub async fn write_all_bounded<S>(
    stream: &mut S,
    data: &[u8],
    idle_timeout: Duration,
) -> Result<u64>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let mut written: u64 = 0;
    for chunk in data.chunks(WRITE_CHUNK_SIZE) {
        tokio::time::timeout(idle_timeout, stream.write_all(chunk))
            .await
            .map_err(|_| {
                BenchError::Timeout(format!(
                    "peer stopped reading for {idle_timeout:?} after {written} bytes"
                ))
            })?
            .map_err(|e| BenchError::Transfer(format!("write failed after {written} bytes: {e}")))?;
        written += chunk.len() as u64;
    }
    tokio::time::timeout(idle_timeout, stream.shutdown())
        .await
        .map_err(|_| BenchError::Timeout(format!("shutdown stalled for {idle_timeout:?}")))?
        .map_err(|e| BenchError::Transfer(format!("shutdown failed: {e}")))?;
    Ok(written)
}

/// Run a handshake step under the idle timeout, mapping expiry to a connect error.
pub(crate) async fn with_connect_timeout<T, F>(
    idle_timeout: Duration,
    what: &str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(idle_timeout, fut)
        .await
        .map_err(|_| BenchError::Connect(format!("{what} timed out after {idle_timeout:?}")))?
}
