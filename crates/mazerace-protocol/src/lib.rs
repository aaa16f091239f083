//! Wire protocol for Maze Race.
//!
//! This crate defines the language clients and the server speak, the Maze
//! Race Messaging Protocol (MRMP):
//!
//! - **Types** ([`Message`], [`Opcode`], [`ErrorCode`]): the messages that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`MrmpCodec`]): how those messages become
//!   length-prefixed binary frames and back.
//! - **I/O** ([`send_message`], [`receive_message`]): whole-message reads
//!   and writes over any [`Connection`](mazerace_transport::Connection).
//!
//! # Architecture
//!
//! ```text
//! Transport (exact bytes) → Protocol (Message) → Lobby / Race (game rules)
//! ```
//!
//! The protocol knows nothing about matchmaking or races. It only checks
//! that a frame is well formed; whether a message is *allowed* at a given
//! moment is decided by the layers above.

mod codec;
mod error;
mod io;
mod types;

pub use codec::{Codec, MrmpCodec};
pub use error::ProtocolError;
pub use io::{receive_message, send_message};
pub use types::{
    DEFAULT_PORT, ErrorCode, FrameHeader, HEADER_LEN, MAX_PAYLOAD_LEN, Message, Opcode,
    PROTOCOL_VERSION,
};
