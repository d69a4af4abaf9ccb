//! QUIC binding
//!
//! The server opens one unidirectional stream per connection, writes the
//! payload and finishes it. Path-MTU discovery is disabled and the initial
//! packet size pinned to the configured segment size so datagrams match the
//! TCP binding's segments.

use super::tls::{create_client_config, create_server_config, ServerIdentity};
use super::{with_connect_timeout, Dialer, InboundConnection, Listener};
use bytes::Bytes;
use quinn::crypto::rustls::{QuicClientConfig, QuicServerConfig};
use quinn::{
    ClientConfig, Connection, ConnectionError, Endpoint, IdleTimeout, Incoming, RecvStream,
    ServerConfig, TransportConfig, VarInt,
};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tqbench_common::{BenchError, Result, TransportSettings};
use tracing::debug;

/// Application close code sent by the client once the payload is drained.
const CLOSE_DONE: u32 = 0;

pub fn transport_config(settings: &TransportSettings) -> Result<TransportConfig> {
    let idle_timeout = IdleTimeout::try_from(settings.idle_timeout).map_err(|e| {
        BenchError::Config(format!(
            "invalid idle timeout {:?}: {e}",
            settings.idle_timeout
        ))
    })?;

    let mut transport = TransportConfig::default();
    transport.initial_mtu(settings.segment_size);
    transport.mtu_discovery_config(None);
    transport.max_idle_timeout(Some(idle_timeout));
    Ok(transport)
}

/// Client side: a single UDP endpoint reused by every trial.
pub struct QuicDialer {
    endpoint: Endpoint,
    client_config: ClientConfig,
    server_name: String,
    idle_timeout: Duration,
}

impl QuicDialer {
    /// Bind an ephemeral client endpoint in the same address family as `target`.
    /// Must be called from within a Tokio runtime.
    pub fn new(settings: &TransportSettings, target: SocketAddr) -> Result<Self> {
        let crypto = QuicClientConfig::try_from(create_client_config(settings)?)
            .map_err(|e| BenchError::Tls(format!("QUIC client crypto: {e}")))?;
        let mut client_config = ClientConfig::new(Arc::new(crypto));
        client_config.transport_config(Arc::new(transport_config(settings)?));

        let bind: SocketAddr = if target.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let endpoint = Endpoint::client(bind)?;

        Ok(Self {
            endpoint,
            client_config,
            server_name: settings.server_name.clone(),
            idle_timeout: settings.idle_timeout,
        })
    }

    async fn connect(&self, addr: SocketAddr) -> Result<Connection> {
        let connecting = self
            .endpoint
            .connect_with(self.client_config.clone(), addr, &self.server_name)
            .map_err(|e| BenchError::Connect(format!("{addr}: {e}")))?;
        connecting
            .await
            .map_err(|e| BenchError::Connect(format!("QUIC handshake with {addr}: {e}")))
    }
}

impl Dialer for QuicDialer {
    type Session = Connection;
    type Stream = QuicStream;

    async fn dial(&self, addr: SocketAddr) -> Result<Self::Session> {
        with_connect_timeout(self.idle_timeout, "QUIC handshake", self.connect(addr)).await
    }

    async fn open_inbound_stream(&self, session: Self::Session) -> Result<Self::Stream> {
        let recv = with_connect_timeout(self.idle_timeout, "QUIC stream accept", async {
            session.accept_uni().await.map_err(|e| {
                BenchError::Connect(format!(
                    "no stream from {}: {e}",
                    session.remote_address()
                ))
            })
        })
        .await?;
        Ok(QuicStream {
            connection: session,
            recv,
        })
    }

    async fn close(&self, stream: Self::Stream) {
        stream
            .connection
            .close(VarInt::from_u32(CLOSE_DONE), b"done");
    }

    fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    async fn shutdown(&self) {
        // Flush outstanding CONNECTION_CLOSE frames before the endpoint is dropped.
        self.endpoint.wait_idle().await;
    }
}

/// Inbound payload stream. Holds the connection so it outlives the read.
pub struct QuicStream {
    connection: Connection,
    recv: RecvStream,
}

impl AsyncRead for QuicStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        AsyncRead::poll_read(Pin::new(&mut self.recv), cx, buf)
    }
}

/// Server side endpoint.
pub struct QuicListener {
    endpoint: Endpoint,
    idle_timeout: Duration,
}

impl QuicListener {
    /// Must be called from within a Tokio runtime.
    pub fn bind(
        addr: SocketAddr,
        identity: &ServerIdentity,
        settings: &TransportSettings,
    ) -> Result<Self> {
        let crypto = QuicServerConfig::try_from(create_server_config(identity, settings)?)
            .map_err(|e| BenchError::Tls(format!("QUIC server crypto: {e}")))?;
        let mut server_config = ServerConfig::with_crypto(Arc::new(crypto));
        server_config.transport_config(Arc::new(transport_config(settings)?));

        let endpoint = Endpoint::server(server_config, addr)?;
        Ok(Self {
            endpoint,
            idle_timeout: settings.idle_timeout,
        })
    }

    /// Stop accepting; pending [`Listener::accept`] calls return `None`.
    pub fn close(&self) {
        self.endpoint.close(VarInt::from_u32(0), b"shutdown");
    }
}

impl Listener for QuicListener {
    type Connection = QuicInbound;

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    async fn accept(&mut self) -> Option<Result<Self::Connection>> {
        let incoming = self.endpoint.accept().await?;
        Some(Ok(QuicInbound {
            peer: incoming.remote_address(),
            incoming,
            idle_timeout: self.idle_timeout,
        }))
    }
}

pub struct QuicInbound {
    incoming: Incoming,
    peer: SocketAddr,
    idle_timeout: Duration,
}

impl InboundConnection for QuicInbound {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn serve(self, payload: Bytes) -> Result<u64> {
        let Self {
            incoming,
            peer,
            idle_timeout,
        } = self;

        let connection = with_connect_timeout(idle_timeout, "QUIC accept", async {
            incoming
                .await
                .map_err(|e| BenchError::Connect(format!("QUIC handshake with {peer}: {e}")))
        })
        .await?;

        let len = payload.len() as u64;
        let mut send = connection
            .open_uni()
            .await
            .map_err(|e| BenchError::Transfer(format!("open stream to {peer}: {e}")))?;
        send.write_chunk(payload)
            .await
            .map_err(|e| BenchError::Transfer(format!("write to {peer} failed: {e}")))?;
        send.finish()
            .map_err(|e| BenchError::Transfer(format!("finish stream to {peer}: {e}")))?;

        // Dropping the connection now would discard unacknowledged stream data;
        // the client closes once it has read to the end.
        match connection.closed().await {
            ConnectionError::ApplicationClosed(close)
                if close.error_code == VarInt::from_u32(CLOSE_DONE) =>
            {
                Ok(len)
            }
            ConnectionError::LocallyClosed => Ok(len),
            other => {
                debug!("Connection with {} ended: {}", peer, other);
                Err(BenchError::Transfer(format!(
                    "connection with {peer} ended before the client confirmed receipt: {other}"
                )))
            }
        }
    }
}
