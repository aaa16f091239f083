//! Error types for the lobby layer.

use mazerace_protocol::{ErrorCode, Message, Opcode, ProtocolError};
use mazerace_transport::TransportError;

use crate::HandshakeState;

/// A failed handshake: the state it failed in and why.
#[derive(Debug, thiserror::Error)]
#[error("handshake failed while {state}: {cause}")]
pub struct HandshakeError {
    pub state: HandshakeState,
    #[source]
    pub cause: HandshakeFailure,
}

/// What went wrong during a handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeFailure {
    #[error("client speaks protocol version {got}, server speaks {expected}")]
    VersionMismatch { expected: u8, got: u8 },

    /// A well-formed message that is not allowed at this point.
    #[error("unexpected {0} message")]
    UnexpectedMessage(Opcode),

    /// Bytes that did not decode to a message at all.
    #[error("malformed message: {0}")]
    Malformed(ProtocolError),

    /// The client sent `leave` instead of `join`.
    #[error("client left before joining")]
    Left,

    #[error("matchmaking queue is full")]
    QueueFull,

    #[error("matchmaking queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Transport(TransportError),
}

impl HandshakeFailure {
    /// The packet owed to the client before its connection is closed, if
    /// any. Clients that left or vanished are not answered.
    pub fn reply(&self) -> Option<Message> {
        match self {
            Self::VersionMismatch { .. } => Some(Message::Error(ErrorCode::VersionMismatch)),
            Self::UnexpectedMessage(_) => Some(Message::Error(ErrorCode::IllegalOpcode)),
            Self::Malformed(e) => Some(Message::Error(e.error_code())),
            Self::QueueFull => Some(Message::Error(ErrorCode::FullQueue)),
            Self::Transport(e) if e.is_timeout() => Some(Message::Timeout),
            Self::Left | Self::QueueClosed | Self::Transport(_) => None,
        }
    }

    /// `true` when the client closed its connection in an orderly way.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::Left)
            || matches!(self, Self::Transport(e) if e.is_clean_close())
    }

    /// `true` when the client vanished without an orderly close.
    pub fn is_abrupt_close(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_abrupt_close())
    }
}

impl From<ProtocolError> for HandshakeFailure {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Transport(e) => Self::Transport(e),
            other => Self::Malformed(other),
        }
    }
}
