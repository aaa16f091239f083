//! Admission into Maze Race matches.
//!
//! Before a client can race it has to prove it speaks the protocol and ask
//! to play. This crate handles that part of a connection's life:
//!
//! 1. **Handshake** ([`run_handshake`]): `hello` / `hello-ack` / `join`,
//!    with a per-step timeout and a reason code for every rejection.
//! 2. **Matchmaking** ([`MatchQueue`]): a bounded FIFO of clients that
//!    joined, taken out two at a time by the server's pairing task.
//!
//! # How it fits in the stack
//!
//! ```text
//! Race Layer (above)      ← receives pairs of connections to race
//!     ↕
//! Lobby Layer (this crate) ← greets clients and queues them
//!     ↕
//! Protocol Layer (below)  ← Message, Codec, send/receive
//! ```

mod error;
mod handshake;
mod queue;

pub use error::{HandshakeError, HandshakeFailure};
pub use handshake::{HandshakeConfig, HandshakeState, run_handshake};
pub use queue::{MatchQueue, PushError};
