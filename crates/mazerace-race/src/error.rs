//! Error types for the race layer.

use mazerace_protocol::ProtocolError;

use crate::Seat;

/// Errors that cut a race short without either player being at fault for
/// the game itself.
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    /// A packet could not be delivered to a player.
    #[error("could not reach {seat}: {source}")]
    Unreachable {
        seat: Seat,
        #[source]
        source: ProtocolError,
    },

    /// Both connection readers stopped without reporting why.
    #[error("race input channel closed")]
    InputClosed,
}

impl RaceError {
    /// The player the error is about, when there is one.
    pub fn seat(&self) -> Option<Seat> {
        match self {
            Self::Unreachable { seat, .. } => Some(*seat),
            Self::InputClosed => None,
        }
    }
}
