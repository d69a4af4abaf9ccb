//! TLS 1.3 over TCP binding

use super::socket_tuning::{align_segment_size, configure_socket_silent};
use super::tls::{create_client_config, create_server_config, server_name, ServerIdentity};
use super::{with_connect_timeout, write_all_bounded, Dialer, InboundConnection, Listener};
use bytes::Bytes;
use rustls_pki_types::ServerName;
use socket2::SockRef;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_rustls::{client, TlsAcceptor, TlsConnector};
use tqbench_common::{BenchError, Result, TransportSettings};
use tracing::debug;

const LISTEN_BACKLOG: u32 = 1024;

fn new_socket(addr: SocketAddr) -> std::io::Result<TcpSocket> {
    if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
}

/// Client side: one TCP connection plus a TLS session per trial.
pub struct TlsTcpDialer {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    segment_size: u16,
    idle_timeout: Duration,
}

impl TlsTcpDialer {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let client_config = create_client_config(settings)?;
        Ok(Self {
            connector: TlsConnector::from(Arc::new(client_config)),
            server_name: server_name(settings)?,
            segment_size: settings.segment_size,
            idle_timeout: settings.idle_timeout,
        })
    }

    async fn connect(&self, addr: SocketAddr) -> Result<client::TlsStream<TcpStream>> {
        let socket = new_socket(addr)
            .map_err(|e| BenchError::Connect(format!("socket for {addr}: {e}")))?;
        // Must precede connect(): the MSS is advertised in the SYN.
        align_segment_size(SockRef::from(&socket), self.segment_size);

        let stream = socket
            .connect(addr)
            .await
            .map_err(|e| BenchError::Connect(format!("{addr}: {e}")))?;
        configure_socket_silent(&stream);

        self.connector
            .connect(self.server_name.clone(), stream)
            .await
            .map_err(|e| BenchError::Connect(format!("TLS handshake with {addr}: {e}")))
    }
}

impl Dialer for TlsTcpDialer {
    type Session = client::TlsStream<TcpStream>;
    type Stream = client::TlsStream<TcpStream>;

    async fn dial(&self, addr: SocketAddr) -> Result<Self::Session> {
        with_connect_timeout(self.idle_timeout, "TLS/TCP handshake", self.connect(addr)).await
    }

    async fn open_inbound_stream(&self, session: Self::Session) -> Result<Self::Stream> {
        Ok(session)
    }

    async fn close(&self, mut stream: Self::Stream) {
        // The server has already sent close_notify; ours may race its FIN.
        if let Err(e) = stream.shutdown().await {
            debug!("TLS shutdown after transfer: {}", e);
        }
    }

    fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

/// Server side: accepts TCP connections and defers the TLS handshake to the
/// per-connection task.
pub struct TlsTcpListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    segment_size: u16,
    idle_timeout: Duration,
}

impl TlsTcpListener {
    pub fn bind(
        addr: SocketAddr,
        identity: &ServerIdentity,
        settings: &TransportSettings,
    ) -> Result<Self> {
        let server_config = create_server_config(identity, settings)?;

        let socket = new_socket(addr)?;
        socket.set_reuseaddr(true)?;
        // Inherited by every accepted socket, including the MSS in the SYN-ACK.
        align_segment_size(SockRef::from(&socket), settings.segment_size);
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(Arc::new(server_config)),
            segment_size: settings.segment_size,
            idle_timeout: settings.idle_timeout,
        })
    }
}

impl Listener for TlsTcpListener {
    type Connection = TlsTcpInbound;

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    async fn accept(&mut self) -> Option<Result<Self::Connection>> {
        let accepted = match self.listener.accept().await {
            Ok((stream, peer)) => {
                configure_socket_silent(&stream);
                align_segment_size(SockRef::from(&stream), self.segment_size);
                Ok(TlsTcpInbound {
                    stream,
                    peer,
                    acceptor: self.acceptor.clone(),
                    idle_timeout: self.idle_timeout,
                })
            }
            Err(e) => Err(BenchError::Connect(format!("accept failed: {e}"))),
        };
        Some(accepted)
    }
}

pub struct TlsTcpInbound {
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    idle_timeout: Duration,
}

impl InboundConnection for TlsTcpInbound {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn serve(self, payload: Bytes) -> Result<u64> {
        let Self {
            stream,
            peer,
            acceptor,
            idle_timeout,
        } = self;

        let mut tls = with_connect_timeout(idle_timeout, "TLS accept", async {
            acceptor
                .accept(stream)
                .await
                .map_err(|e| BenchError::Connect(format!("TLS handshake with {peer}: {e}")))
        })
        .await?;

        // Shutdown sends close_notify then FIN: EOF is the client's only
        // completion signal.
        write_all_bounded(&mut tls, &payload, idle_timeout)
            .await
            .map_err(|e| match e {
                BenchError::Timeout(msg) => BenchError::Timeout(format!("{peer}: {msg}")),
                BenchError::Transfer(msg) => BenchError::Transfer(format!("{peer}: {msg}")),
                other => other,
            })
    }
}
