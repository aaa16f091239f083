//! Reading and writing whole messages over a [`Connection`].

use mazerace_transport::{Connection, Instant, TransportError};

use crate::{Codec, HEADER_LEN, Message, ProtocolError};

/// Encodes `message` and writes the whole frame.
///
/// With a `deadline`, the write must finish before it or the call fails
/// with [`TransportError::TimedOut`]. A peer that stops reading fills its
/// socket buffer, and without a deadline the write then waits forever.
/// A frame cut short by the deadline leaves the stream unusable; the
/// caller is expected to drop the connection.
pub async fn send_message<C, K>(
    conn: &C,
    codec: &K,
    message: &Message,
    deadline: Option<Instant>,
) -> Result<(), ProtocolError>
where
    C: Connection,
    K: Codec,
{
    let frame = codec.encode(message);
    tracing::debug!(conn_id = %conn.id(), opcode = %message.opcode(), len = frame.len(), "send");
    match deadline {
        Some(at) => tokio::time::timeout_at(at, conn.send_all(&frame))
            .await
            .map_err(|_| TransportError::TimedOut)??,
        None => conn.send_all(&frame).await?,
    }
    Ok(())
}

/// Reads one complete frame and decodes it.
///
/// The header and the payload are read under the same `deadline`, so a
/// peer cannot stall the reader by trickling a payload after a prompt
/// header. An unknown opcode is reported only after its payload has been
/// read, which leaves the stream positioned at the next frame.
pub async fn receive_message<C, K>(
    conn: &C,
    codec: &K,
    deadline: Option<Instant>,
) -> Result<Message, ProtocolError>
where
    C: Connection,
    K: Codec,
{
    let raw = conn.receive_exact(HEADER_LEN, deadline).await?;
    let head: [u8; HEADER_LEN] =
        raw.as_slice()
            .try_into()
            .map_err(|_| ProtocolError::FrameLength {
                declared: HEADER_LEN,
                actual: raw.len(),
            })?;
    let header = codec.decode_header(&head)?;
    let payload = conn.receive_exact(header.payload_len(), deadline).await?;

    let message = codec.decode(header, &payload)?;
    tracing::debug!(conn_id = %conn.id(), opcode = %message.opcode(), "receive");
    Ok(message)
}
