//! TCP transport implementation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_parts(stream, addr);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A single TCP connection.
///
/// The stream is split into halves, each behind its own lock, so a reader
/// task and a writer never wait on each other.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Opens a client connection to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::AcceptFailed)?;
        Ok(Self::from_parts(stream, peer))
    }

    fn from_parts(stream: TcpStream, peer: SocketAddr) -> Self {
        // Moves are tiny and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            peer,
            reader: Mutex::new(read_half),
            writer: Mutex::new(write_half),
        }
    }

    async fn read_exact_into(&self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut reader = self.reader.lock().await;
        let mut filled = 0;
        while filled < buf.len() {
            let n = reader
                .read(&mut buf[filled..])
                .await
                .map_err(TransportError::from_recv)?;
            if n == 0 {
                return Err(TransportError::PeerClosed);
            }
            filled += n;
        }
        Ok(())
    }
}

impl Connection for TcpConnection {
    async fn send_all(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::from_send)?;
        writer.flush().await.map_err(TransportError::from_send)
    }

    async fn receive_exact(
        &self,
        len: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        match deadline {
            Some(at) => tokio::time::timeout_at(at, self.read_exact_into(&mut buf))
                .await
                .map_err(|_| TransportError::TimedOut)??,
            None => self.read_exact_into(&mut buf).await?,
        }
        Ok(buf)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::from_send)
    }

    async fn is_peer_closed(&self) -> bool {
        // A reader already holds the lock, so the connection is in use.
        let Ok(mut reader) = self.reader.try_lock() else {
            return false;
        };
        let mut byte = [0u8; 1];
        matches!(
            tokio::time::timeout(Duration::ZERO, reader.peek(&mut byte)).await,
            Ok(Ok(0) | Err(_))
        )
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}
