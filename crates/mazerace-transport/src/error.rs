use std::io;

/// Errors that can occur in the transport layer.
///
/// The receive path distinguishes *how* a peer went away, because the
/// layers above react differently: a clean close is a normal leave, an
/// abrupt one is only logged, and a timeout is reported to the peer with a
/// timeout packet.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed its side in an orderly way (a zero-byte read).
    #[error("peer closed the connection")]
    PeerClosed,

    /// The connection was reset or aborted by the peer.
    #[error("peer reset the connection: {0}")]
    PeerReset(#[source] io::Error),

    /// No data arrived before the deadline.
    #[error("timed out waiting for data")]
    TimedOut,

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// Binding, connecting or accepting failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// `true` for an orderly close by the peer.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::PeerClosed)
    }

    /// `true` when the peer vanished without an orderly close.
    pub fn is_abrupt_close(&self) -> bool {
        matches!(self, Self::PeerReset(_))
    }

    /// `true` when a deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Classifies an I/O error from the read side.
    pub(crate) fn from_recv(err: io::Error) -> Self {
        if is_reset(&err) {
            Self::PeerReset(err)
        } else {
            Self::ReceiveFailed(err)
        }
    }

    /// Classifies an I/O error from the write side.
    pub(crate) fn from_send(err: io::Error) -> Self {
        if is_reset(&err) {
            Self::PeerReset(err)
        } else {
            Self::SendFailed(err)
        }
    }
}

fn is_reset(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_recv_reset_kinds_are_abrupt() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
        ] {
            let err = TransportError::from_recv(io::Error::from(kind));
            assert!(err.is_abrupt_close(), "{kind:?} should be abrupt");
        }
    }

    #[test]
    fn test_from_recv_other_kinds_are_plain_failures() {
        let err = TransportError::from_recv(io::Error::other("boom"));
        assert!(matches!(err, TransportError::ReceiveFailed(_)));
        assert!(!err.is_abrupt_close());
        assert!(!err.is_clean_close());
    }

    #[test]
    fn test_from_send_broken_pipe_is_abrupt() {
        let err = TransportError::from_send(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.is_abrupt_close());
        let err = TransportError::from_send(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TransportError::SendFailed(_)));
    }

    #[test]
    fn test_classification_helpers() {
        assert!(TransportError::PeerClosed.is_clean_close());
        assert!(TransportError::TimedOut.is_timeout());
        assert!(!TransportError::Shutdown.is_timeout());
    }
}
