//! Codec trait and the binary MRMP implementation.
//!
//! The codec is a strategy: the rest of the server only needs *something*
//! that turns a [`Message`] into a frame and back. [`MrmpCodec`] is the
//! binary format every Maze Race client speaks.

use mazerace_maze::{Maze, Position};

use crate::{
    ErrorCode, FrameHeader, HEADER_LEN, MAX_PAYLOAD_LEN, Message, Opcode, ProtocolError,
};

/// Converts messages to frames and frames back to messages.
///
/// Decoding is split into header and payload steps because a stream
/// reader learns the payload length from the header before it can read
/// the payload.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a message as a complete frame (header and payload).
    fn encode(&self, message: &Message) -> Vec<u8>;

    /// Parses a frame header.
    ///
    /// # Errors
    /// [`ProtocolError::PayloadTooLarge`] when the announced length exceeds
    /// [`MAX_PAYLOAD_LEN`]. The opcode is not checked here.
    fn decode_header(&self, header: &[u8; HEADER_LEN]) -> Result<FrameHeader, ProtocolError>;

    /// Decodes the payload that followed `header`.
    fn decode(&self, header: FrameHeader, payload: &[u8]) -> Result<Message, ProtocolError>;

    /// Decodes a buffer holding exactly one complete frame.
    fn decode_frame(&self, frame: &[u8]) -> Result<Message, ProtocolError> {
        let Some((head, payload)) = frame.split_first_chunk::<HEADER_LEN>() else {
            return Err(ProtocolError::FrameLength {
                declared: HEADER_LEN,
                actual: frame.len(),
            });
        };
        let header = self.decode_header(head)?;
        if payload.len() != header.payload_len() {
            return Err(ProtocolError::FrameLength {
                declared: HEADER_LEN + header.payload_len(),
                actual: frame.len(),
            });
        }
        self.decode(header, payload)
    }
}

// ---------------------------------------------------------------------------
// MrmpCodec
// ---------------------------------------------------------------------------

/// The Maze Race Messaging Protocol binary codec.
///
/// ```rust
/// use mazerace_maze::Position;
/// use mazerace_protocol::{Codec, Message, MrmpCodec};
///
/// let codec = MrmpCodec;
/// let frame = codec.encode(&Message::Move(Position::new(0, 1)));
/// assert_eq!(frame, [5, 0, 0, 0, 2, 0, 1]);
/// assert_eq!(
///     codec.decode_frame(&frame).unwrap(),
///     Message::Move(Position::new(0, 1))
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MrmpCodec;

impl Codec for MrmpCodec {
    fn encode(&self, message: &Message) -> Vec<u8> {
        let mut payload = Vec::new();
        match message {
            Message::Error(code) => payload.push(code.as_byte()),
            Message::Hello { version } => payload.push(*version),
            Message::Move(pos) | Message::BadMove(pos) | Message::OpponentMove(pos) => {
                payload.extend_from_slice(&[pos.row, pos.column]);
            }
            Message::Result { won } => payload.push(u8::from(*won)),
            Message::JoinResponse(maze) => {
                payload.reserve(2 + maze.cells().len());
                payload.extend_from_slice(&[maze.rows(), maze.columns()]);
                payload.extend(maze.cells().iter().map(|cell| cell.bits()));
            }
            Message::Ping
            | Message::Join
            | Message::Leave
            | Message::Start
            | Message::Ready
            | Message::Pong
            | Message::Timeout
            | Message::HelloAck => {}
        }

        // Payloads are bounded by MAX_PAYLOAD_LEN, well inside u32.
        let len = payload.len() as u32;
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.push(message.opcode().as_byte());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    fn decode_header(&self, header: &[u8; HEADER_LEN]) -> Result<FrameHeader, ProtocolError> {
        let [opcode, a, b, c, d] = *header;
        let len = u32::from_be_bytes([a, b, c, d]);
        if len as usize > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(len));
        }
        Ok(FrameHeader { opcode, len })
    }

    fn decode(&self, header: FrameHeader, payload: &[u8]) -> Result<Message, ProtocolError> {
        let opcode =
            Opcode::from_byte(header.opcode).ok_or(ProtocolError::UnknownOpcode(header.opcode))?;
        if payload.len() != header.payload_len() {
            return Err(ProtocolError::PayloadLength {
                opcode,
                expected: header.payload_len(),
                actual: payload.len(),
            });
        }

        let message = match opcode {
            Opcode::Error => {
                let [code] = fixed::<1>(opcode, payload)?;
                Message::Error(ErrorCode::from_byte(code).ok_or(ProtocolError::UnknownErrorCode(code))?)
            }
            Opcode::Hello => {
                let [version] = fixed::<1>(opcode, payload)?;
                Message::Hello { version }
            }
            Opcode::Move => Message::Move(position(opcode, payload)?),
            Opcode::BadMove => Message::BadMove(position(opcode, payload)?),
            Opcode::OpponentMove => Message::OpponentMove(position(opcode, payload)?),
            Opcode::Result => match fixed::<1>(opcode, payload)? {
                [0] => Message::Result { won: false },
                [1] => Message::Result { won: true },
                [flag] => {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "winner flag must be 0 or 1, got {flag}"
                    )));
                }
            },
            Opcode::JoinResponse => Message::JoinResponse(maze(payload)?),
            Opcode::Ping => empty(opcode, payload, Message::Ping)?,
            Opcode::Join => empty(opcode, payload, Message::Join)?,
            Opcode::Leave => empty(opcode, payload, Message::Leave)?,
            Opcode::Start => empty(opcode, payload, Message::Start)?,
            Opcode::Ready => empty(opcode, payload, Message::Ready)?,
            Opcode::Pong => empty(opcode, payload, Message::Pong)?,
            Opcode::Timeout => empty(opcode, payload, Message::Timeout)?,
            Opcode::HelloAck => empty(opcode, payload, Message::HelloAck)?,
        };
        Ok(message)
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

fn fixed<const N: usize>(opcode: Opcode, payload: &[u8]) -> Result<[u8; N], ProtocolError> {
    payload
        .try_into()
        .map_err(|_| ProtocolError::PayloadLength {
            opcode,
            expected: N,
            actual: payload.len(),
        })
}

fn empty(opcode: Opcode, payload: &[u8], message: Message) -> Result<Message, ProtocolError> {
    fixed::<0>(opcode, payload).map(|[]| message)
}

fn position(opcode: Opcode, payload: &[u8]) -> Result<Position, ProtocolError> {
    let [row, column] = fixed::<2>(opcode, payload)?;
    Ok(Position::new(row, column))
}

/// Reshapes `rows, columns, cells...` into a maze.
fn maze(payload: &[u8]) -> Result<Maze, ProtocolError> {
    let Some((&[rows, columns], cells)) = payload.split_first_chunk::<2>() else {
        return Err(ProtocolError::PayloadLength {
            opcode: Opcode::JoinResponse,
            expected: 2,
            actual: payload.len(),
        });
    };
    let expected = 2 + usize::from(rows) * usize::from(columns);
    if payload.len() != expected {
        return Err(ProtocolError::PayloadLength {
            opcode: Opcode::JoinResponse,
            expected,
            actual: payload.len(),
        });
    }
    Maze::from_cells(rows, columns, cells).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![opcode];
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    // =======================================================================
    // encode
    // =======================================================================

    #[test]
    fn test_encode_empty_payload_messages_have_zero_length() {
        assert_eq!(MrmpCodec.encode(&Message::Ready), [10, 0, 0, 0, 0]);
        assert_eq!(MrmpCodec.encode(&Message::HelloAck), [14, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_error_carries_code_byte() {
        assert_eq!(
            MrmpCodec.encode(&Message::Error(ErrorCode::FullQueue)),
            [0, 0, 0, 0, 1, 3]
        );
    }

    #[test]
    fn test_encode_result_flag() {
        assert_eq!(MrmpCodec.encode(&Message::Result { won: true }), [7, 0, 0, 0, 1, 1]);
        assert_eq!(MrmpCodec.encode(&Message::Result { won: false }), [7, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_encode_join_response_is_rows_columns_cells() {
        let maze = Maze::from_cells(1, 2, &[0x04, 0x08]).unwrap();
        assert_eq!(
            MrmpCodec.encode(&Message::JoinResponse(maze)),
            [8, 0, 0, 0, 4, 1, 2, 0x04, 0x08]
        );
    }

    // =======================================================================
    // decode_header
    // =======================================================================

    #[test]
    fn test_decode_header_reads_big_endian_length() {
        let header = MrmpCodec.decode_header(&[8, 0, 0, 0x01, 0x02]).unwrap();
        assert_eq!(header, FrameHeader { opcode: 8, len: 258 });
    }

    #[test]
    fn test_decode_header_oversized_length_rejected() {
        let too_big = (MAX_PAYLOAD_LEN as u32 + 1).to_be_bytes();
        let header = [8, too_big[0], too_big[1], too_big[2], too_big[3]];
        let err = MrmpCodec.decode_header(&header).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge(n) if n == MAX_PAYLOAD_LEN as u32 + 1));
    }

    #[test]
    fn test_decode_header_keeps_unknown_opcode_byte() {
        let header = MrmpCodec.decode_header(&[200, 0, 0, 0, 0]).unwrap();
        assert_eq!(header.opcode, 200);
    }

    // =======================================================================
    // decode
    // =======================================================================

    #[test]
    fn test_decode_unknown_opcode_rejected() {
        let err = MrmpCodec.decode_frame(&frame(42, &[])).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOpcode(42)));
        assert_eq!(err.error_code(), ErrorCode::IllegalOpcode);
    }

    #[test]
    fn test_decode_unknown_error_code_rejected() {
        let err = MrmpCodec.decode_frame(&frame(0, &[9])).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownErrorCode(9)));
    }

    #[test]
    fn test_decode_move_with_short_payload_rejected() {
        let err = MrmpCodec.decode_frame(&frame(5, &[1])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadLength {
                opcode: Opcode::Move,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_decode_empty_message_with_payload_rejected() {
        let err = MrmpCodec.decode_frame(&frame(1, &[0])).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadLength { opcode: Opcode::Ping, .. }));
    }

    #[test]
    fn test_decode_result_bad_flag_rejected() {
        let err = MrmpCodec.decode_frame(&frame(7, &[2])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_decode_join_response_zero_rows_rejected() {
        let err = MrmpCodec.decode_frame(&frame(8, &[0, 5])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_decode_join_response_wrong_cell_count_rejected() {
        let err = MrmpCodec.decode_frame(&frame(8, &[2, 2, 0, 0, 0])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadLength {
                opcode: Opcode::JoinResponse,
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_decode_mismatched_header_and_payload_rejected() {
        let header = FrameHeader { opcode: 5, len: 2 };
        let err = MrmpCodec.decode(header, &[1]).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadLength { .. }));
    }

    // =======================================================================
    // decode_frame
    // =======================================================================

    #[test]
    fn test_decode_frame_truncated_header_rejected() {
        let err = MrmpCodec.decode_frame(&[5, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameLength { declared: 5, actual: 3 }));
    }

    #[test]
    fn test_decode_frame_truncated_payload_rejected() {
        let err = MrmpCodec.decode_frame(&[5, 0, 0, 0, 2, 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameLength { declared: 7, actual: 6 }));
    }

    #[test]
    fn test_decode_frame_trailing_bytes_rejected() {
        let err = MrmpCodec.decode_frame(&[9, 0, 0, 0, 0, 0xff]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameLength { declared: 5, actual: 6 }));
    }
}
