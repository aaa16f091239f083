//! # Maze Race
//!
//! A real-time two-player maze race server speaking MRMP, a small binary
//! protocol over TCP.
//!
//! Clients connect, greet the server with `hello`, and ask to `join`. The
//! server pairs queued clients first-come first-served, sends both the same
//! freshly generated maze, and arbitrates the race: every move is checked
//! against the walls, the opponent sees each accepted move, and the first
//! player to reach the bottom-right cell wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mazerace::prelude::*;
//!
//! # async fn start() -> Result<(), MazeRaceError> {
//! let server = MazeRaceServer::builder()
//!     .config(ServerConfig::from_json_str(r#"{ "max_sessions": 4 }"#)?)
//!     .bind("0.0.0.0:9898")
//!     .build()
//!     .await?;
//! let handle = server.handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.shutdown();
//! });
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod matchmaker;
mod server;
mod stats;

pub use config::ServerConfig;
pub use error::{ConfigError, MazeRaceError};
pub use server::{MazeRaceServer, MazeRaceServerBuilder, ServerHandle};
pub use stats::StatsSnapshot;

pub use mazerace_lobby::HandshakeConfig;
pub use mazerace_race::RaceConfig;

/// Convenient imports for embedding the server.
pub mod prelude {
    pub use crate::{
        ConfigError, HandshakeConfig, MazeRaceError, MazeRaceServer, MazeRaceServerBuilder,
        RaceConfig, ServerConfig, ServerHandle, StatsSnapshot,
    };
}
