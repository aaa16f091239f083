//! Read-only server counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Live counters shared by every task of one server.
#[derive(Debug, Default)]
pub(crate) struct ServerStats {
    total_connections: AtomicU64,
    active_connections: AtomicUsize,
    total_sessions: AtomicU64,
    active_sessions: AtomicUsize,
    verbose: AtomicBool,
}

impl ServerStats {
    pub(crate) fn new(verbose: bool) -> Self {
        Self {
            verbose: AtomicBool::new(verbose),
            ..Self::default()
        }
    }

    /// Counts a newly accepted connection until the guard is dropped.
    pub(crate) fn connection_opened(self: &Arc<Self>) -> ActiveGuard {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ActiveGuard {
            stats: Arc::clone(self),
            counter: Counter::Connections,
        }
    }

    /// Counts a newly started race until the guard is dropped.
    pub(crate) fn session_started(self: &Arc<Self>) -> ActiveGuard {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        ActiveGuard {
            stats: Arc::clone(self),
            counter: Counter::Sessions,
        }
    }

    pub(crate) fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Stores the flag and returns the previous value.
    pub(crate) fn set_verbose(&self, verbose: bool) -> bool {
        self.verbose.swap(verbose, Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self, queued: usize) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            queued,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Connections,
    Sessions,
}

/// Decrements an "active" counter when dropped, however the owning task
/// ends (including being aborted).
#[derive(Debug)]
pub(crate) struct ActiveGuard {
    stats: Arc<ServerStats>,
    counter: Counter,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let active = match self.counter {
            Counter::Connections => &self.stats.active_connections,
            Counter::Sessions => &self.stats.active_sessions,
        };
        active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A point-in-time copy of the server counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Connections accepted since start.
    pub total_connections: u64,
    /// Connections currently open, in any phase.
    pub active_connections: usize,
    /// Races started since start.
    pub total_sessions: u64,
    /// Races currently running.
    pub active_sessions: usize,
    /// Connections waiting in the matchmaking queue.
    pub queued: usize,
}
