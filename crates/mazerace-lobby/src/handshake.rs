//! The per-connection handshake: `hello`, `hello-ack`, `join`, queued.
//!
//! Every accepted connection runs through this state machine before it can
//! be matched with an opponent:
//!
//! ```text
//!   AwaitingHello ──(hello, right version)──→ AwaitingJoin ──(join)──→ Queued
//!         │                                        │
//!         └──────────────(anything else)───────────┴──────────→ Rejected
//! ```
//!
//! A rejected client gets one packet explaining why (an `error` with a
//! reason code, or `timeout`) unless it already went away, and is then
//! disconnected.

use std::fmt;
use std::time::Duration;

use mazerace_protocol::{Codec, Message, PROTOCOL_VERSION, receive_message, send_message};
use mazerace_transport::{Connection, ConnectionId, Instant};
use serde::{Deserialize, Serialize};

use crate::{HandshakeError, HandshakeFailure, MatchQueue, PushError};

// ---------------------------------------------------------------------------
// HandshakeConfig
// ---------------------------------------------------------------------------

/// Handshake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// How long the client has for each of `hello` and `join`. Also bounds
    /// each packet the server writes during the handshake.
    pub timeout: Duration,

    /// The only protocol version the server accepts.
    pub protocol_version: u8,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

// ---------------------------------------------------------------------------
// HandshakeState
// ---------------------------------------------------------------------------

/// Where a connection is in the handshake.
///
/// The happy path is strictly ordered; [`Rejected`](Self::Rejected) can be
/// entered from either waiting state and ends the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    AwaitingHello,
    AwaitingJoin,
    Queued,
    Rejected,
}

impl HandshakeState {
    /// The next state on the happy path, or `None` from a final state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::AwaitingHello => Some(Self::AwaitingJoin),
            Self::AwaitingJoin => Some(Self::Queued),
            Self::Queued | Self::Rejected => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        match target {
            Self::Rejected => !self.is_final(),
            _ => self.next() == Some(target),
        }
    }

    /// `true` once the handshake is over, successfully or not.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Queued | Self::Rejected)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingHello => write!(f, "awaiting hello"),
            Self::AwaitingJoin => write!(f, "awaiting join"),
            Self::Queued => write!(f, "queued"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake runner
// ---------------------------------------------------------------------------

/// Drives one connection through the handshake and, on success, moves it
/// into `queue`.
///
/// The connection is consumed either way: it ends up in the queue, or it
/// is sent its rejection packet (if one is owed), half-closed and dropped.
///
/// # Errors
/// A [`HandshakeError`] naming the state the handshake failed in.
pub async fn run_handshake<C, K>(
    conn: C,
    codec: &K,
    queue: &MatchQueue<C>,
    config: &HandshakeConfig,
) -> Result<(), HandshakeError>
where
    C: Connection,
    K: Codec,
{
    let conn_id = conn.id();
    let mut state = HandshakeState::AwaitingHello;

    let greeted = advance(&conn, codec, queue, config, &mut state).await;
    if let Err(cause) = greeted {
        return Err(reject(&conn, codec, config, &mut state, cause).await);
    }

    // Only `join` is left; the queue takes ownership of the connection or
    // hands it back.
    match queue.push(conn) {
        Ok(()) => {
            transition(conn_id, &mut state, HandshakeState::Queued);
            tracing::info!(%conn_id, queued = queue.len(), "client queued for a match");
            Ok(())
        }
        Err(rejected) => {
            let cause = match &rejected {
                PushError::Full(_) => HandshakeFailure::QueueFull,
                PushError::Closed(_) => HandshakeFailure::QueueClosed,
            };
            let conn = rejected.into_inner();
            Err(reject(&conn, codec, config, &mut state, cause).await)
        }
    }
}

/// Runs the two receive steps. On success the client has been greeted and
/// has asked to join; `state` is left at `AwaitingJoin` for the push.
async fn advance<C, K>(
    conn: &C,
    codec: &K,
    queue: &MatchQueue<C>,
    config: &HandshakeConfig,
    state: &mut HandshakeState,
) -> Result<(), HandshakeFailure>
where
    C: Connection,
    K: Codec,
{
    let conn_id = conn.id();

    match receive_message(conn, codec, Some(Instant::now() + config.timeout)).await? {
        Message::Hello { version } if version == config.protocol_version => {
            let deadline = Instant::now() + config.timeout;
            send_message(conn, codec, &Message::HelloAck, Some(deadline)).await?;
            tracing::debug!(%conn_id, version, "hello acknowledged");
        }
        Message::Hello { version } => {
            return Err(HandshakeFailure::VersionMismatch {
                expected: config.protocol_version,
                got: version,
            });
        }
        other => return Err(HandshakeFailure::UnexpectedMessage(other.opcode())),
    }
    transition(conn_id, state, HandshakeState::AwaitingJoin);

    match receive_message(conn, codec, Some(Instant::now() + config.timeout)).await? {
        Message::Join if queue.is_closed() => Err(HandshakeFailure::QueueClosed),
        Message::Join => Ok(()),
        Message::Leave => Err(HandshakeFailure::Left),
        other => Err(HandshakeFailure::UnexpectedMessage(other.opcode())),
    }
}

fn transition(conn_id: ConnectionId, state: &mut HandshakeState, target: HandshakeState) {
    debug_assert!(
        state.can_transition_to(target),
        "illegal handshake transition {state} -> {target}"
    );
    tracing::debug!(%conn_id, from = %state, to = %target, "handshake state");
    *state = target;
}

/// Sends the rejection packet (if any), logs, and closes the connection.
///
/// Leaves `state` at `Rejected`; the returned error names the state the
/// handshake failed in.
async fn reject<C, K>(
    conn: &C,
    codec: &K,
    config: &HandshakeConfig,
    state: &mut HandshakeState,
    cause: HandshakeFailure,
) -> HandshakeError
where
    C: Connection,
    K: Codec,
{
    let conn_id = conn.id();
    let failed_in = *state;

    if cause.is_clean_close() {
        tracing::info!(%conn_id, state = %failed_in, "client left during handshake");
    } else if cause.is_abrupt_close() {
        tracing::warn!(%conn_id, state = %failed_in, error = %cause, "client dropped during handshake");
    } else {
        tracing::info!(%conn_id, state = %failed_in, error = %cause, "handshake rejected");
    }

    if let Some(reply) = cause.reply() {
        // The client may already be gone, or may not be reading.
        let deadline = Instant::now() + config.timeout;
        if let Err(e) = send_message(conn, codec, &reply, Some(deadline)).await {
            tracing::debug!(%conn_id, error = %e, "could not deliver rejection");
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }

    transition(conn_id, state, HandshakeState::Rejected);
    HandshakeError {
        state: failed_in,
        cause,
    }
}
