//! Per-connection handling from accept to the matchmaking queue.

use std::net::SocketAddr;
use std::sync::Arc;

use mazerace_lobby::run_handshake;
use mazerace_transport::{Connection, ConnectionId, Instant, TcpConnection, TransportError};

use crate::MazeRaceError;
use crate::server::ServerState;
use crate::stats::ActiveGuard;

/// A TCP connection that counts as active until it is dropped.
///
/// The connection passes from the handshake task to the queue and then to
/// a race, and whichever owner drops it last releases the count.
pub(crate) struct TrackedConnection {
    inner: TcpConnection,
    _guard: ActiveGuard,
}

impl TrackedConnection {
    pub(crate) fn new(inner: TcpConnection, guard: ActiveGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl Connection for TrackedConnection {
    async fn send_all(&self, data: &[u8]) -> Result<(), TransportError> {
        self.inner.send_all(data).await
    }

    async fn receive_exact(
        &self,
        len: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, TransportError> {
        self.inner.receive_exact(len, deadline).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }

    async fn is_peer_closed(&self) -> bool {
        self.inner.is_peer_closed().await
    }

    fn id(&self) -> ConnectionId {
        self.inner.id()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr()
    }
}

/// Runs the handshake for one accepted connection.
///
/// On success the connection now sits in the queue and this task is done
/// with it; the pairing task picks it up from there.
pub(crate) async fn handle_connection(
    conn: TrackedConnection,
    state: Arc<ServerState>,
) -> Result<(), MazeRaceError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    run_handshake(conn, &state.codec, &state.queue, &state.config.handshake).await?;
    Ok(())
}
