//! Message types for the Maze Race Messaging Protocol (MRMP).
//!
//! Every packet is a 5-byte header followed by a payload:
//!
//! ```text
//! +--------+---------------------------+-----------------------+
//! | opcode | payload length (u32, BE)  | payload (length bytes)|
//! +--------+---------------------------+-----------------------+
//!   1 byte          4 bytes
//! ```
//!
//! The length always equals the number of payload bytes that follow, so a
//! receiver can read a header and then exactly that many bytes.

use std::fmt;

use mazerace_maze::{Maze, Position};

/// Current protocol version, sent in `hello`.
pub const PROTOCOL_VERSION: u8 = 0;

/// The TCP port servers listen on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9898;

/// Size of the fixed frame header: opcode byte plus 4-byte length.
pub const HEADER_LEN: usize = 5;

/// The largest payload any message can carry: a 255×255 join-response.
pub const MAX_PAYLOAD_LEN: usize = 2 + 255 * 255;

// ---------------------------------------------------------------------------
// Opcode
// ---------------------------------------------------------------------------

/// The first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Error = 0,
    Ping = 1,
    Hello = 2,
    Join = 3,
    Leave = 4,
    Move = 5,
    BadMove = 6,
    Result = 7,
    JoinResponse = 8,
    Start = 9,
    Ready = 10,
    Pong = 11,
    Timeout = 12,
    OpponentMove = 13,
    HelloAck = 14,
}

impl Opcode {
    /// Looks up an opcode byte, returning `None` for bytes outside the table.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let opcode = match byte {
            0 => Self::Error,
            1 => Self::Ping,
            2 => Self::Hello,
            3 => Self::Join,
            4 => Self::Leave,
            5 => Self::Move,
            6 => Self::BadMove,
            7 => Self::Result,
            8 => Self::JoinResponse,
            9 => Self::Start,
            10 => Self::Ready,
            11 => Self::Pong,
            12 => Self::Timeout,
            13 => Self::OpponentMove,
            14 => Self::HelloAck,
            _ => return None,
        };
        Some(opcode)
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The protocol name of the opcode, as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Ping => "ping",
            Self::Hello => "hello",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Move => "move",
            Self::BadMove => "bad-move",
            Self::Result => "result",
            Self::JoinResponse => "join-response",
            Self::Start => "start",
            Self::Ready => "ready",
            Self::Pong => "pong",
            Self::Timeout => "timeout",
            Self::OpponentMove => "opponent-move",
            Self::HelloAck => "hello-ack",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// The reason carried by an `error` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Catch-all, also sent to a player whose opponent went away.
    Unknown = 0,
    /// The peer sent an opcode that is not allowed (or not known) here.
    IllegalOpcode = 1,
    /// The `hello` carried a protocol version the server does not speak.
    VersionMismatch = 2,
    /// The matchmaking queue is at capacity.
    FullQueue = 3,
}

impl ErrorCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Unknown),
            1 => Some(Self::IllegalOpcode),
            2 => Some(Self::VersionMismatch),
            3 => Some(Self::FullQueue),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::IllegalOpcode => "illegal-opcode",
            Self::VersionMismatch => "version-mismatch",
            Self::FullQueue => "full-queue",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One decoded protocol message.
///
/// Direction matters for meaning but not for encoding: the same codec
/// handles client-to-server (`hello`, `join`, `ready`, `move`, `leave`,
/// `ping`) and server-to-client (`hello-ack`, `join-response`, `start`,
/// `bad-move`, `opponent-move`, `result`, `timeout`, `error`, `pong`)
/// messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Error(ErrorCode),
    Ping,
    Hello { version: u8 },
    Join,
    Leave,
    /// A player's requested new position.
    Move(Position),
    /// Rejection of a move, carrying the mover's last confirmed position.
    BadMove(Position),
    /// `won` is from the recipient's point of view.
    Result { won: bool },
    /// The maze both players race through.
    JoinResponse(Maze),
    Start,
    Ready,
    Pong,
    Timeout,
    /// The opponent's newly confirmed position.
    OpponentMove(Position),
    HelloAck,
}

impl Message {
    /// The opcode this message is framed with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Error(_) => Opcode::Error,
            Self::Ping => Opcode::Ping,
            Self::Hello { .. } => Opcode::Hello,
            Self::Join => Opcode::Join,
            Self::Leave => Opcode::Leave,
            Self::Move(_) => Opcode::Move,
            Self::BadMove(_) => Opcode::BadMove,
            Self::Result { .. } => Opcode::Result,
            Self::JoinResponse(_) => Opcode::JoinResponse,
            Self::Start => Opcode::Start,
            Self::Ready => Opcode::Ready,
            Self::Pong => Opcode::Pong,
            Self::Timeout => Opcode::Timeout,
            Self::OpponentMove(_) => Opcode::OpponentMove,
            Self::HelloAck => Opcode::HelloAck,
        }
    }

    /// A `hello` for the version this crate speaks.
    pub fn hello() -> Self {
        Self::Hello {
            version: PROTOCOL_VERSION,
        }
    }
}

/// The decoded 5-byte header of a frame.
///
/// The opcode is kept as the raw byte: an unknown opcode is reported only
/// after its payload has been consumed, so the stream stays in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub opcode: u8,
    pub len: u32,
}

impl FrameHeader {
    /// The payload length as a buffer size.
    pub fn payload_len(&self) -> usize {
        self.len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_byte_covers_the_table() {
        for byte in 0..=14u8 {
            let opcode = Opcode::from_byte(byte).expect("defined opcode");
            assert_eq!(opcode.as_byte(), byte);
        }
        assert_eq!(Opcode::from_byte(15), None);
        assert_eq!(Opcode::from_byte(255), None);
    }

    #[test]
    fn test_opcode_numbering_matches_wire_table() {
        assert_eq!(Opcode::Error.as_byte(), 0);
        assert_eq!(Opcode::Hello.as_byte(), 2);
        assert_eq!(Opcode::JoinResponse.as_byte(), 8);
        assert_eq!(Opcode::HelloAck.as_byte(), 14);
    }

    #[test]
    fn test_opcode_display_uses_protocol_names() {
        assert_eq!(Opcode::BadMove.to_string(), "bad-move");
        assert_eq!(Opcode::OpponentMove.to_string(), "opponent-move");
        assert_eq!(Opcode::HelloAck.to_string(), "hello-ack");
    }

    #[test]
    fn test_error_code_from_byte() {
        assert_eq!(ErrorCode::from_byte(0), Some(ErrorCode::Unknown));
        assert_eq!(ErrorCode::from_byte(3), Some(ErrorCode::FullQueue));
        assert_eq!(ErrorCode::from_byte(4), None);
        assert_eq!(ErrorCode::VersionMismatch.to_string(), "version-mismatch");
    }

    #[test]
    fn test_message_opcode_matches_variant() {
        assert_eq!(Message::hello().opcode(), Opcode::Hello);
        assert_eq!(Message::Result { won: true }.opcode(), Opcode::Result);
        assert_eq!(
            Message::OpponentMove(Position::new(1, 1)).opcode(),
            Opcode::OpponentMove
        );
    }

    #[test]
    fn test_max_payload_fits_largest_maze() {
        assert_eq!(MAX_PAYLOAD_LEN, 65_027);
    }
}
