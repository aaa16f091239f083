//! Race sessions for Maze Race.
//!
//! A race is one match between two players who were paired by the lobby.
//! It runs in its own Tokio task and owns both connections until it ends:
//!
//! ```text
//! Pairing → AwaitingReady → Racing → Finished
//!   maze      ready × 2     moves      result / timeout / error
//! ```
//!
//! - [`RaceBoard`] holds the rules: positions, move validation, the win.
//! - [`Race`] is the session loop around it: packet exchange, deadlines,
//!   and the best-effort notifications owed when a race ends early.

mod board;
mod config;
mod error;
mod race;

pub use board::{MoveOutcome, RaceBoard, Recipient, Seat};
pub use config::{RaceConfig, RaceState};
pub use error::RaceError;
pub use race::{AbandonReason, Race, RaceId, RaceOutcome};
