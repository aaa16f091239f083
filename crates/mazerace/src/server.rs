//! `MazeRaceServer` builder, accept loop and shutdown.
//!
//! This is the entry point for running a Maze Race server. It ties the
//! layers together: transport → handshake → queue → race.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use mazerace_lobby::MatchQueue;
use mazerace_protocol::MrmpCodec;
use mazerace_transport::{Connection, TcpTransport, Transport};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use crate::handler::{TrackedConnection, handle_connection};
use crate::stats::ServerStats;
use crate::{MazeRaceError, ServerConfig, StatsSnapshot, matchmaker};

type VerbosityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Shared server state passed to every task.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) codec: MrmpCodec,
    pub(crate) queue: MatchQueue<TrackedConnection>,
    pub(crate) sessions: Arc<Semaphore>,
    pub(crate) stats: Arc<ServerStats>,
    shutdown: watch::Sender<bool>,
    on_verbosity_change: Option<VerbosityCallback>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Maze Race server.
///
/// # Example
///
/// ```rust,no_run
/// use mazerace::prelude::*;
///
/// # async fn start() -> Result<(), MazeRaceError> {
/// let server = MazeRaceServer::builder()
///     .bind("0.0.0.0:9898")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MazeRaceServerBuilder {
    config: ServerConfig,
    bind_addr: Option<String>,
    on_verbosity_change: Option<VerbosityCallback>,
}

impl MazeRaceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bind_addr: None,
            on_verbosity_change: None,
        }
    }

    /// Sets the address to bind the server to. Takes precedence over the
    /// address in [`config`](Self::config).
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Replaces the whole server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback run whenever verbosity is switched through
    /// [`ServerHandle::set_verbose`].
    pub fn on_verbosity_change(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_verbosity_change = Some(Arc::new(callback));
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<MazeRaceServer, MazeRaceError> {
        let mut config = self.config;
        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr;
        }
        config.validate()?;

        let transport = TcpTransport::bind(&config.bind_addr).await?;
        let (shutdown, _) = watch::channel(false);

        let state = Arc::new(ServerState {
            queue: MatchQueue::new(config.max_queued),
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
            stats: Arc::new(ServerStats::new(config.verbose)),
            codec: MrmpCodec,
            shutdown,
            on_verbosity_change: self.on_verbosity_change,
            config,
        });

        Ok(MazeRaceServer { transport, state })
    }
}

impl Default for MazeRaceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Maze Race server.
///
/// Call [`run()`](Self::run) to start accepting connections. Take a
/// [`handle()`](Self::handle) first to read stats or stop it later.
pub struct MazeRaceServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl MazeRaceServer {
    /// Creates a new builder.
    pub fn builder() -> MazeRaceServerBuilder {
        MazeRaceServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, MazeRaceError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Returns a handle for stats, verbosity and shutdown.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs the accept loop until [`ServerHandle::shutdown`] is called.
    ///
    /// Every accepted connection gets its own handshake task, and a single
    /// pairing task starts races from the queue. On shutdown the accept
    /// loop stops, handshakes in progress are aborted, queued clients are
    /// disconnected and running races get the configured grace period.
    /// Returns once every task has finished.
    pub async fn run(self) -> Result<(), MazeRaceError> {
        let Self {
            mut transport,
            state,
        } = self;
        let mut shutdown = state.shutdown.subscribe();

        tracing::info!(
            addr = %transport.local_addr()?,
            max_sessions = state.config.max_sessions,
            max_queued = state.config.max_queued,
            "Maze Race server running"
        );

        let matchmaker = tokio::spawn(matchmaker::run(
            Arc::clone(&state),
            state.shutdown.subscribe(),
        ));
        let mut handshakes = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|&stop| stop) => break,
                Some(joined) = handshakes.join_next(), if !handshakes.is_empty() => {
                    match joined {
                        Err(e) if e.is_panic() => {
                            tracing::error!(error = %e, "handshake task panicked");
                        }
                        _ => {}
                    }
                }
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let conn = TrackedConnection::new(conn, state.stats.connection_opened());
                        let state = Arc::clone(&state);
                        handshakes.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        transport.shutdown().await?;
        drop(transport);

        // Closing first means a handshake that slips past the abort below
        // is refused instead of queued.
        state.queue.close();
        handshakes.shutdown().await;
        for conn in state.queue.drain() {
            if let Err(e) = conn.close().await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "queued client close failed");
            }
        }

        if let Err(e) = matchmaker.await {
            tracing::error!(error = %e, "pairing task failed");
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A cloneable handle to a server, usable while it runs.
#[derive(Clone)]
pub struct ServerHandle {
    state: Arc<ServerState>,
}

impl ServerHandle {
    /// Current counters, including the queue depth.
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot(self.state.queue.len())
    }

    pub fn is_verbose(&self) -> bool {
        self.state.stats.is_verbose()
    }

    /// Switches verbosity. The builder's callback runs only when the flag
    /// actually changes.
    pub fn set_verbose(&self, verbose: bool) {
        if self.state.stats.set_verbose(verbose) == verbose {
            return;
        }
        tracing::info!(verbose, "verbosity changed");
        if let Some(callback) = &self.state.on_verbosity_change {
            callback(verbose);
        }
    }

    /// Asks the server to stop. Returns immediately; `run()` returns once
    /// shutdown has completed.
    pub fn shutdown(&self) {
        self.state.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.state.shutdown.borrow()
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("stats", &self.stats())
            .field("verbose", &self.is_verbose())
            .finish()
    }
}
