//! Error types for the protocol layer.
//!
//! A `ProtocolError` means the bytes on the wire could not be turned into a
//! [`Message`](crate::Message), or the connection underneath failed while
//! reading or writing them. Each decode failure has its own variant so the
//! caller can pick the right error code to report back to the peer.

use mazerace_transport::TransportError;

use crate::{ErrorCode, Opcode};

/// Errors that can occur while encoding, decoding or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The header named an opcode outside the protocol table.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// An `error` packet carried a code outside the error-code table.
    #[error("unknown error code {0}")]
    UnknownErrorCode(u8),

    /// The payload length does not fit the opcode.
    #[error("{opcode} payload must be {expected} bytes, got {actual}")]
    PayloadLength {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    /// The header announced more payload than any message can carry.
    #[error("payload length {0} exceeds the protocol maximum")]
    PayloadTooLarge(u32),

    /// A buffer handed to `decode_frame` does not hold exactly one frame.
    #[error("frame holds {actual} bytes, header announces {declared}")]
    FrameLength { declared: usize, actual: usize },

    /// The payload has the right shape but a meaningless value, such as a
    /// winner flag other than 0 or 1, or a maze with a zero dimension.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Reading or writing the underlying connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProtocolError {
    /// The error code a server reports back when it receives this error.
    ///
    /// Opcodes that do not exist are "illegal"; anything else that fails to
    /// decode is reported as unknown.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownOpcode(_) => ErrorCode::IllegalOpcode,
            _ => ErrorCode::Unknown,
        }
    }

    /// The transport failure behind this error, if that is what it is.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// `true` when the deadline passed before a full message arrived.
    pub fn is_timeout(&self) -> bool {
        self.as_transport().is_some_and(TransportError::is_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_unknown_opcode_is_illegal() {
        assert_eq!(
            ProtocolError::UnknownOpcode(99).error_code(),
            ErrorCode::IllegalOpcode
        );
    }

    #[test]
    fn test_error_code_bad_payload_is_unknown() {
        let err = ProtocolError::PayloadLength {
            opcode: Opcode::Move,
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.error_code(), ErrorCode::Unknown);
        assert_eq!(err.to_string(), "move payload must be 2 bytes, got 1");
    }

    #[test]
    fn test_transport_errors_convert_and_classify() {
        let err: ProtocolError = TransportError::TimedOut.into();
        assert!(err.is_timeout());
        assert!(err.as_transport().is_some());

        let err: ProtocolError = TransportError::PeerClosed.into();
        assert!(!err.is_timeout());
        assert!(err.as_transport().is_some_and(TransportError::is_clean_close));
    }
}
