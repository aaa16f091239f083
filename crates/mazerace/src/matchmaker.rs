//! The pairing task: turns queued pairs into running races.

use std::sync::Arc;
use std::time::Duration;

use mazerace_maze::Maze;
use mazerace_race::{Race, RaceOutcome};
use mazerace_transport::Connection;
use tokio::sync::{OwnedSemaphorePermit, watch};
use tokio::task::{JoinError, JoinSet};

use crate::handler::TrackedConnection;
use crate::server::ServerState;

/// Pairs queued clients until shutdown, then winds down the running races.
///
/// Each race holds a session permit for its whole life, so at most
/// `max_sessions` run at once; later pairs stay in the queue meanwhile.
pub(crate) async fn run(state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    let mut races = JoinSet::new();

    loop {
        tokio::select! {
            _ = async { let _ = shutdown.wait_for(|&stop| stop).await; } => break,
            Some(joined) = races.join_next(), if !races.is_empty() => log_finished(joined),
            pair = next_pair(&state) => match pair {
                Some((permit, first, second)) => {
                    if let Some((first, second)) = live_pair(&state, first, second).await {
                        start_race(&state, &mut races, permit, first, second);
                    }
                }
                None => break,
            },
        }
    }

    finish_races(races, state.config.shutdown_grace).await;
}

/// Waits for a free session slot, then for two queued clients.
///
/// Nothing is taken from the queue until a slot is held, and the pair is
/// removed in the same poll that completes this future.
async fn next_pair(
    state: &ServerState,
) -> Option<(OwnedSemaphorePermit, TrackedConnection, TrackedConnection)> {
    let permit = Arc::clone(&state.sessions).acquire_owned().await.ok()?;
    let (first, second) = state.queue.wait_for_pair().await?;
    Some((permit, first, second))
}

/// Drops clients that hung up while they sat in the queue.
///
/// A survivor whose partner is gone goes back to the head of the queue
/// and waits for the next client instead of racing an empty seat.
async fn live_pair(
    state: &ServerState,
    first: TrackedConnection,
    second: TrackedConnection,
) -> Option<(TrackedConnection, TrackedConnection)> {
    let mut survivors = Vec::with_capacity(2);
    for conn in [first, second] {
        if conn.is_peer_closed().await {
            tracing::info!(conn_id = %conn.id(), "queued client hung up before pairing");
        } else {
            survivors.push(conn);
        }
    }

    let mut survivors = survivors.into_iter();
    match (survivors.next(), survivors.next()) {
        (Some(first), Some(second)) => Some((first, second)),
        (Some(conn), None) => {
            let conn_id = conn.id();
            match state.queue.push_front(conn) {
                Ok(()) => tracing::debug!(%conn_id, "partner gone, requeued"),
                Err(e) => tracing::debug!(%conn_id, error = %e, "partner gone, queue closed"),
            }
            None
        }
        _ => None,
    }
}

fn start_race(
    state: &ServerState,
    races: &mut JoinSet<RaceOutcome>,
    permit: OwnedSemaphorePermit,
    first: TrackedConnection,
    second: TrackedConnection,
) {
    let race_config = state.config.race.clone();
    let maze = match Maze::generate(race_config.rows, race_config.columns) {
        Ok(maze) => maze,
        Err(e) => {
            // Both clients are dropped, which closes their sockets.
            tracing::error!(error = %e, "maze generation failed");
            return;
        }
    };

    let session = state.stats.session_started();
    let race = Race::new(first, second, maze, state.codec, race_config);
    tracing::debug!(race_id = %race.id(), queued = state.queue.len(), "pair dequeued");

    races.spawn(async move {
        let _permit = permit;
        let _session = session;
        race.run().await
    });
}

fn log_finished(joined: Result<RaceOutcome, JoinError>) {
    match joined {
        Ok(outcome) => tracing::debug!(%outcome, "race task joined"),
        Err(e) if e.is_panic() => tracing::error!(error = %e, "race task panicked"),
        Err(e) => tracing::debug!(error = %e, "race task cancelled"),
    }
}

/// Gives running races `grace` to end on their own, then aborts the rest.
async fn finish_races(mut races: JoinSet<RaceOutcome>, grace: Duration) {
    if races.is_empty() {
        return;
    }
    tracing::info!(running = races.len(), ?grace, "waiting for running races");

    let drained = tokio::time::timeout(grace, async {
        while let Some(joined) = races.join_next().await {
            log_finished(joined);
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(running = races.len(), "shutdown grace elapsed, aborting races");
        races.shutdown().await;
    }
}
