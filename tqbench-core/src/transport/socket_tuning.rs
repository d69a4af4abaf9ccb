//! Socket tuning for the TCP binding
//!
//! - `TCP_MAXSEG`: pin the segment size so TCP frames carry the same payload as
//!   QUIC datagrams
//! - `TCP_NODELAY`: TLS records are flushed as soon as they are sealed
//! - TCP keepalive: a silent peer is detected instead of hanging a writer forever

use socket2::SockRef;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tqbench_common::{BenchError, Result};
use tracing::{debug, warn};

const KEEPALIVE_TIME: Duration = Duration::from_secs(30);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Set `TCP_MAXSEG` on a socket. On a listener this is inherited by accepted
/// connections; on an unconnected socket it bounds the MSS advertised in the SYN.
#[cfg(unix)]
pub fn set_segment_size(socket: SockRef<'_>, segment_size: u16) -> Result<()> {
    socket
        .set_tcp_mss(u32::from(segment_size))
        .map_err(|e| BenchError::SegmentConfig(format!("TCP_MAXSEG={segment_size}: {e}")))?;
    if let Ok(effective) = socket.tcp_mss() {
        debug!("TCP_MAXSEG requested {} effective {}", segment_size, effective);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn set_segment_size(_socket: SockRef<'_>, segment_size: u16) -> Result<()> {
    Err(BenchError::SegmentConfig(format!(
        "TCP_MAXSEG={segment_size}: not supported on this platform"
    )))
}

/// Apply segment alignment, downgrading failure to a warning. The connection
/// proceeds unaligned and the log line is the operator's cue that the
/// comparison is not like-for-like.
pub fn align_segment_size(socket: SockRef<'_>, segment_size: u16) -> bool {
    match set_segment_size(socket, segment_size) {
        Ok(()) => true,
        Err(e) => {
            warn!("{}; continuing with the kernel default segment size", e);
            false
        }
    }
}

pub fn configure_socket(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;

    let socket = SockRef::from(stream);
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(KEEPALIVE_TIME)
        .with_interval(KEEPALIVE_INTERVAL);
    socket.set_tcp_keepalive(&keepalive)?;

    Ok(())
}

pub fn configure_socket_silent(stream: &TcpStream) {
    if let Err(e) = configure_socket(stream) {
        debug!("Socket tuning failed: {}", e);
    }
}
