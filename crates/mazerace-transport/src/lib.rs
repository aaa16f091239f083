//! Transport abstraction layer for Maze Race.
//!
//! Provides the [`Transport`] and [`Connection`] traits over a reliable,
//! ordered byte stream, plus the TCP implementation the server runs on.
//!
//! The protocol above this layer frames its own messages, so a
//! [`Connection`] only offers the two primitives framing needs:
//! "send all of these bytes" and "receive exactly N bytes, optionally
//! before a deadline".

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};
pub use tokio::time::Instant;

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), TransportError>;
}

/// A single bidirectional connection.
///
/// Methods take `&self`: reading and writing are independent, so one task
/// can block in [`receive_exact`](Self::receive_exact) while another
/// writes. The futures are `Send` so generic callers can spawn them.
pub trait Connection: Send + Sync + 'static {
    /// Writes every byte of `data`, retrying partial writes.
    fn send_all(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reads exactly `len` bytes, retrying partial reads.
    ///
    /// With a `deadline`, the whole read must finish before it or the call
    /// fails with [`TransportError::TimedOut`]. A zero-byte read from the
    /// peer yields [`TransportError::PeerClosed`].
    fn receive_exact(
        &self,
        len: usize,
        deadline: Option<Instant>,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Half-closes the connection (no more writes from our side).
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reports whether the peer has already hung up, without waiting for
    /// data. Bytes waiting to be read are left in place.
    ///
    /// Transports that cannot tell report `false`.
    fn is_peer_closed(&self) -> impl Future<Output = bool> + Send {
        async { false }
    }

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The remote address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
