//! Unified error type for the Maze Race server.

use std::path::PathBuf;

use mazerace_lobby::{HandshakeError, HandshakeFailure, HandshakeState};
use mazerace_maze::MazeError;
use mazerace_protocol::ProtocolError;
use mazerace_race::RaceError;
use mazerace_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Every sub-crate variant is transparent and has a `From` impl, so `?`
/// converts sub-crate errors on the way up.
#[derive(Debug, thiserror::Error)]
pub enum MazeRaceError {
    /// A transport-level error (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A framing or decoding error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The maze could not be built.
    #[error(transparent)]
    Maze(#[from] MazeError),

    /// A client failed the handshake.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// A race was cut short by an I/O failure.
    #[error(transparent)]
    Race(#[from] RaceError),

    /// The server configuration could not be loaded or is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from loading or validating a [`ServerConfig`](crate::ServerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: MazeRaceError = TransportError::PeerClosed.into();
        assert!(matches!(err, MazeRaceError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: MazeRaceError = ProtocolError::UnknownOpcode(99).into();
        assert!(matches!(err, MazeRaceError::Protocol(_)));
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_from_maze_error() {
        let err: MazeRaceError = MazeError::EmptyDimensions { rows: 0, columns: 3 }.into();
        assert!(matches!(err, MazeRaceError::Maze(_)));
    }

    #[test]
    fn test_from_handshake_error() {
        let err: MazeRaceError = HandshakeError {
            state: HandshakeState::AwaitingJoin,
            cause: HandshakeFailure::QueueFull,
        }
        .into();
        assert!(matches!(err, MazeRaceError::Handshake(_)));
        assert!(err.to_string().contains("awaiting join"));
    }

    #[test]
    fn test_from_race_error() {
        let err: MazeRaceError = RaceError::InputClosed.into();
        assert!(matches!(err, MazeRaceError::Race(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: MazeRaceError = ConfigError::Invalid("rows must be non-zero".into()).into();
        assert!(matches!(err, MazeRaceError::Config(_)));
        assert!(err.to_string().contains("rows"));
    }
}
