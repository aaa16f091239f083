//! The session loop: one task per race.
//!
//! A [`Race`] owns both players' connections for the whole session. It
//! delivers the maze, waits for both players to be ready, starts the race
//! and then arbitrates moves until someone wins or the race is cut short.
//!
//! Each connection gets a small reader task that forwards every decoded
//! message into one channel. The loop waits on that channel alone, so the
//! inactivity deadline covers both players at once and messages are
//! handled one at a time, in arrival order.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mazerace_maze::Maze;
use mazerace_protocol::{Codec, ErrorCode, Message, ProtocolError, receive_message, send_message};
use mazerace_transport::{Connection, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::{MoveOutcome, RaceBoard, RaceConfig, RaceError, RaceState, Recipient, Seat};

/// Buffered messages per race before readers wait for the loop.
const INBOUND_CAPACITY: usize = 16;

static NEXT_RACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a race, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RaceId(u64);

impl RaceId {
    /// Allocates the next identifier.
    pub fn next() -> Self {
        Self(NEXT_RACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "race-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a player ended the race early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// Sent `leave`.
    Left,
    /// The connection closed or broke.
    Disconnected,
    /// Sent something not allowed at that point, or something undecodable.
    IllegalMessage,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::IllegalMessage => write!(f, "sent an illegal message"),
        }
    }
}

/// How a race ended.
#[derive(Debug)]
pub enum RaceOutcome {
    /// A player reached the goal.
    Won { winner: Seat },
    /// Nobody spoke before a deadline. Both players were sent `timeout`.
    TimedOut { during: RaceState },
    /// One player left, vanished or broke the protocol. The other was sent
    /// an `error`.
    Abandoned { by: Seat, reason: AbandonReason },
    /// The server could not keep the race going.
    Aborted { reason: RaceError },
}

impl RaceOutcome {
    pub fn winner(&self) -> Option<Seat> {
        match self {
            Self::Won { winner } => Some(*winner),
            _ => None,
        }
    }
}

impl fmt::Display for RaceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won { winner } => write!(f, "{winner} won"),
            Self::TimedOut { during } => write!(f, "timed out in {during}"),
            Self::Abandoned { by, reason } => write!(f, "{by} {reason}"),
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Race
// ---------------------------------------------------------------------------

/// One message (or read failure) from one player.
struct Inbound {
    seat: Seat,
    event: Result<Message, ProtocolError>,
}

/// A two-player race session.
pub struct Race<C, K> {
    id: RaceId,
    state: RaceState,
    players: [Arc<C>; 2],
    board: RaceBoard,
    codec: K,
    config: RaceConfig,
}

impl<C, K> Race<C, K>
where
    C: Connection,
    K: Codec + Clone,
{
    /// Seats `first` as player one and `second` as player two on `maze`.
    pub fn new(first: C, second: C, maze: Maze, codec: K, config: RaceConfig) -> Self {
        Self {
            id: RaceId::next(),
            state: RaceState::Pairing,
            players: [Arc::new(first), Arc::new(second)],
            board: RaceBoard::new(maze),
            codec,
            config,
        }
    }

    pub fn id(&self) -> RaceId {
        self.id
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn board(&self) -> &RaceBoard {
        &self.board
    }

    /// Runs the race to completion and closes both connections.
    pub async fn run(mut self) -> RaceOutcome {
        tracing::info!(
            race_id = %self.id,
            player_one = %self.players[0].id(),
            player_two = %self.players[1].id(),
            rows = self.board.maze().rows(),
            columns = self.board.maze().columns(),
            "race created"
        );

        let outcome = self.play().await;
        self.transition(RaceState::Finished);

        match &outcome {
            RaceOutcome::Won { .. } => tracing::info!(race_id = %self.id, %outcome, "race finished"),
            _ => tracing::warn!(race_id = %self.id, %outcome, "race ended early"),
        }

        for (seat, player) in Seat::BOTH.into_iter().zip(&self.players) {
            if let Err(e) = player.close().await {
                tracing::debug!(race_id = %self.id, %seat, error = %e, "close failed");
            }
        }
        outcome
    }

    async fn play(&mut self) -> RaceOutcome {
        let join_response = Message::JoinResponse(self.board.maze().clone());
        if let Err(outcome) = self.deliver(Recipient::Both, &join_response).await {
            return outcome;
        }

        let (tx, mut rx) = mpsc::channel(INBOUND_CAPACITY);
        let mut readers = JoinSet::new();
        for seat in Seat::BOTH {
            readers.spawn(read_loop(
                seat,
                Arc::clone(&self.players[seat.index()]),
                self.codec.clone(),
                tx.clone(),
            ));
        }
        drop(tx);

        let outcome = match self.prepare(&mut rx).await {
            Ok(()) => self.race(&mut rx).await,
            Err(outcome) => outcome,
        };

        readers.shutdown().await;
        outcome
    }

    /// `AwaitingReady`: both players must send `ready` before one shared
    /// deadline. Then `start` goes out to both.
    async fn prepare(&mut self, rx: &mut mpsc::Receiver<Inbound>) -> Result<(), RaceOutcome> {
        self.transition(RaceState::AwaitingReady);
        let deadline = Instant::now() + self.config.ready_timeout;
        let mut ready = [false; 2];

        while !ready.iter().all(|r| *r) {
            let Inbound { seat, event } = self.next_inbound(rx, deadline).await?;
            match event {
                Ok(Message::Ready) => {
                    ready[seat.index()] = true;
                    tracing::debug!(race_id = %self.id, %seat, "player ready");
                }
                Ok(Message::Ping) => self.deliver(Recipient::Player(seat), &Message::Pong).await?,
                event => return Err(self.end_by(seat, event).await),
            }
        }

        self.deliver(Recipient::Both, &Message::Start).await?;
        self.transition(RaceState::Racing);
        tracing::info!(race_id = %self.id, "race started");
        Ok(())
    }

    /// `Racing`: arbitrate moves until a win, a timeout or an abandonment.
    async fn race(&mut self, rx: &mut mpsc::Receiver<Inbound>) -> RaceOutcome {
        loop {
            let deadline = Instant::now() + self.config.inactivity_timeout;
            let inbound = match self.next_inbound(rx, deadline).await {
                Ok(inbound) => inbound,
                Err(outcome) => return outcome,
            };
            match self.on_racing_message(inbound).await {
                Ok(Some(winner)) => return RaceOutcome::Won { winner },
                Ok(None) => {}
                Err(outcome) => return outcome,
            }
        }
    }

    /// Handles one message during the race; returns the winner, if any.
    async fn on_racing_message(&mut self, inbound: Inbound) -> Result<Option<Seat>, RaceOutcome> {
        let Inbound { seat, event } = inbound;
        match event {
            Ok(Message::Move(to)) => {
                let outcome = self.board.apply_move(seat, to);
                match &outcome {
                    MoveOutcome::Rejected { position, reason } => tracing::debug!(
                        race_id = %self.id, %seat, %to, at = %position, %reason, "bad move"
                    ),
                    _ => tracing::debug!(race_id = %self.id, %seat, %to, "move"),
                }
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!(race_id = %self.id, "board\n{}", self.board.render());
                }

                for (recipient, message) in outcome.replies(seat) {
                    self.deliver(recipient, &message).await?;
                }
                Ok(self.board.winner())
            }
            Ok(Message::Ping) => {
                self.deliver(Recipient::Player(seat), &Message::Pong).await?;
                Ok(None)
            }
            event => Err(self.end_by(seat, event).await),
        }
    }

    /// Waits for the next message from either player until `deadline`.
    async fn next_inbound(
        &self,
        rx: &mut mpsc::Receiver<Inbound>,
        deadline: Instant,
    ) -> Result<Inbound, RaceOutcome> {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(inbound)) => Ok(inbound),
            Ok(None) => Err(RaceOutcome::Aborted {
                reason: RaceError::InputClosed,
            }),
            Err(_) => {
                tracing::info!(race_id = %self.id, state = %self.state, "race timed out");
                for seat in Seat::BOTH {
                    self.notify(seat, Message::Timeout).await;
                }
                Err(RaceOutcome::TimedOut { during: self.state })
            }
        }
    }

    /// Ends the race because of something `seat` sent (or failed to).
    async fn end_by(&self, seat: Seat, event: Result<Message, ProtocolError>) -> RaceOutcome {
        let reason = match event {
            Ok(Message::Leave) => {
                tracing::info!(race_id = %self.id, %seat, "player left");
                AbandonReason::Left
            }
            Err(ProtocolError::Transport(e)) => {
                if e.is_clean_close() {
                    tracing::info!(race_id = %self.id, %seat, "player disconnected");
                } else {
                    tracing::warn!(race_id = %self.id, %seat, error = %e, "player connection failed");
                }
                AbandonReason::Disconnected
            }
            Ok(message) => {
                tracing::warn!(
                    race_id = %self.id, %seat, opcode = %message.opcode(), state = %self.state,
                    "illegal message"
                );
                self.notify(seat, Message::Error(ErrorCode::IllegalOpcode)).await;
                AbandonReason::IllegalMessage
            }
            Err(e) => {
                tracing::warn!(race_id = %self.id, %seat, error = %e, "undecodable message");
                self.notify(seat, Message::Error(ErrorCode::IllegalOpcode)).await;
                AbandonReason::IllegalMessage
            }
        };

        self.notify(seat.other(), Message::Error(ErrorCode::Unknown)).await;
        RaceOutcome::Abandoned { by: seat, reason }
    }

    /// Sends `message` to the recipients. A failed or timed-out send ends
    /// the race: the other player is told, and the race is aborted.
    async fn deliver(&self, recipient: Recipient, message: &Message) -> Result<(), RaceOutcome> {
        let seats: &[Seat] = match recipient {
            Recipient::Both => &Seat::BOTH,
            Recipient::Player(Seat::One) => &[Seat::One],
            Recipient::Player(Seat::Two) => &[Seat::Two],
        };

        for &seat in seats {
            if let Err(source) = self.send(seat, message).await {
                tracing::warn!(race_id = %self.id, %seat, error = %source, "send failed");
                self.notify(seat.other(), Message::Error(ErrorCode::Unknown)).await;
                return Err(RaceOutcome::Aborted {
                    reason: RaceError::Unreachable { seat, source },
                });
            }
        }
        Ok(())
    }

    /// Best-effort send: failures are logged and otherwise ignored.
    async fn notify(&self, seat: Seat, message: Message) {
        if let Err(e) = self.send(seat, &message).await {
            tracing::debug!(race_id = %self.id, %seat, error = %e, "notification not delivered");
        }
    }

    /// Writes one packet, giving up after `send_timeout`.
    async fn send(&self, seat: Seat, message: &Message) -> Result<(), ProtocolError> {
        let deadline = Instant::now() + self.config.send_timeout;
        send_message(self.player(seat), &self.codec, message, Some(deadline)).await
    }

    fn player(&self, seat: Seat) -> &C {
        &self.players[seat.index()]
    }

    fn transition(&mut self, target: RaceState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "illegal race transition {} -> {target}",
            self.state
        );
        tracing::debug!(race_id = %self.id, from = %self.state, to = %target, "race state");
        self.state = target;
    }
}

/// Forwards every message from one connection into the race channel.
/// Stops after the first failure, or once the race stops listening.
async fn read_loop<C, K>(seat: Seat, conn: Arc<C>, codec: K, tx: mpsc::Sender<Inbound>)
where
    C: Connection,
    K: Codec,
{
    loop {
        let event = receive_message(&*conn, &codec, None).await;
        let failed = event.is_err();
        if tx.send(Inbound { seat, event }).await.is_err() || failed {
            break;
        }
    }
}
