//! The race rules, free of any I/O.
//!
//! [`RaceBoard`] holds the maze and both players' confirmed positions and
//! decides what a move does. The session loop feeds it moves and delivers
//! the replies it returns; tests can drive it directly.

use std::fmt;

use mazerace_maze::{Maze, MoveError, Position};
use mazerace_protocol::Message;

/// Which of the two players: the first or second one taken from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::One, Seat::Two];

    /// The opponent's seat.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "player one"),
            Self::Two => write!(f, "player two"),
        }
    }
}

/// Who should receive a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Both,
    Player(Seat),
}

/// What a move did to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was illegal; the mover stays at `position`.
    Rejected { position: Position, reason: MoveError },
    /// The mover is now at `position`.
    Moved { position: Position },
    /// The mover reached the goal at `position` and won.
    Won { position: Position },
}

impl MoveOutcome {
    /// The packets this outcome produces, given who moved.
    ///
    /// A rejected move is only reported to the mover. The opponent hears
    /// about every accepted move, and both learn the result of a win.
    pub fn replies(&self, mover: Seat) -> Vec<(Recipient, Message)> {
        match *self {
            Self::Rejected { position, .. } => {
                vec![(Recipient::Player(mover), Message::BadMove(position))]
            }
            Self::Moved { position } => vec![(
                Recipient::Player(mover.other()),
                Message::OpponentMove(position),
            )],
            Self::Won { position } => vec![
                (
                    Recipient::Player(mover.other()),
                    Message::OpponentMove(position),
                ),
                (Recipient::Player(mover), Message::Result { won: true }),
                (Recipient::Player(mover.other()), Message::Result { won: false }),
            ],
        }
    }
}

/// The shared maze and both players' confirmed positions.
#[derive(Debug, Clone)]
pub struct RaceBoard {
    maze: Maze,
    positions: [Position; 2],
    winner: Option<Seat>,
}

impl RaceBoard {
    /// Places both players on the maze's start cell.
    pub fn new(maze: Maze) -> Self {
        let start = maze.start();
        Self {
            maze,
            positions: [start, start],
            winner: None,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// The last confirmed position of `seat`.
    pub fn position(&self, seat: Seat) -> Position {
        self.positions[seat.index()]
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Validates and applies one move by `seat` to `to`.
    ///
    /// The move is checked against the mover's last confirmed position. An
    /// illegal move changes nothing. Reaching the goal sets the winner; the
    /// board accepts no further moves after that.
    pub fn apply_move(&mut self, seat: Seat, to: Position) -> MoveOutcome {
        let from = self.position(seat);
        if self.is_finished() {
            return MoveOutcome::Rejected {
                position: from,
                reason: MoveError::NoMovement,
            };
        }
        if let Err(reason) = self.maze.check_move(from, to) {
            return MoveOutcome::Rejected {
                position: from,
                reason,
            };
        }

        self.positions[seat.index()] = to;
        if to == self.maze.goal() {
            self.winner = Some(seat);
            MoveOutcome::Won { position: to }
        } else {
            MoveOutcome::Moved { position: to }
        }
    }

    /// ASCII picture of the maze with `1` and `2` marking the players.
    pub fn render(&self) -> String {
        self.maze.render_with(&[
            (self.position(Seat::One), '1'),
            (self.position(Seat::Two), '2'),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2x2 maze shaped like a "U": down the left, across the bottom, up
    /// the right. From the start, the goal (1, 1) is reached via (1, 0).
    ///
    /// ```text
    /// (0,0)  (0,1)
    ///   |      |
    /// (1,0)--(1,1)
    /// ```
    fn u_maze() -> Maze {
        const N: u8 = 0x01;
        const S: u8 = 0x02;
        const E: u8 = 0x04;
        const W: u8 = 0x08;
        Maze::from_cells(2, 2, &[S, S, N | E, N | W]).unwrap()
    }

    #[test]
    fn test_new_board_starts_both_players_at_origin() {
        let board = RaceBoard::new(u_maze());
        assert_eq!(board.position(Seat::One), Position::new(0, 0));
        assert_eq!(board.position(Seat::Two), Position::new(0, 0));
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_apply_move_through_wall_is_rejected() {
        let mut board = RaceBoard::new(u_maze());
        let outcome = board.apply_move(Seat::One, Position::new(0, 1));
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected {
                position,
                reason: MoveError::Wall { .. }
            } if position == Position::new(0, 0)
        ));
        assert_eq!(board.position(Seat::One), Position::new(0, 0));
    }

    #[test]
    fn test_apply_move_non_move_is_rejected() {
        let mut board = RaceBoard::new(u_maze());
        let outcome = board.apply_move(Seat::Two, Position::new(0, 0));
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected {
                reason: MoveError::NoMovement,
                ..
            }
        ));
    }

    #[test]
    fn test_apply_move_is_checked_against_movers_own_position() {
        let mut board = RaceBoard::new(u_maze());
        assert_eq!(
            board.apply_move(Seat::One, Position::new(1, 0)),
            MoveOutcome::Moved {
                position: Position::new(1, 0)
            }
        );
        // Player two is still at the start, so (1, 1) is two cells away.
        assert!(matches!(
            board.apply_move(Seat::Two, Position::new(1, 1)),
            MoveOutcome::Rejected { .. }
        ));
        assert_eq!(board.position(Seat::Two), Position::new(0, 0));
    }

    #[test]
    fn test_apply_move_into_goal_wins() {
        let mut board = RaceBoard::new(u_maze());
        board.apply_move(Seat::Two, Position::new(1, 0));
        let outcome = board.apply_move(Seat::Two, Position::new(1, 1));

        assert_eq!(
            outcome,
            MoveOutcome::Won {
                position: Position::new(1, 1)
            }
        );
        assert_eq!(board.winner(), Some(Seat::Two));
        assert!(board.is_finished());
    }

    #[test]
    fn test_apply_move_after_win_is_rejected() {
        let mut board = RaceBoard::new(u_maze());
        board.apply_move(Seat::One, Position::new(1, 0));
        board.apply_move(Seat::One, Position::new(1, 1));

        let outcome = board.apply_move(Seat::Two, Position::new(1, 0));
        assert!(matches!(outcome, MoveOutcome::Rejected { .. }));
        assert_eq!(board.winner(), Some(Seat::One));
    }

    #[test]
    fn test_replies_for_rejected_move_go_only_to_mover() {
        let outcome = MoveOutcome::Rejected {
            position: Position::new(0, 0),
            reason: MoveError::NoMovement,
        };
        assert_eq!(
            outcome.replies(Seat::One),
            vec![(
                Recipient::Player(Seat::One),
                Message::BadMove(Position::new(0, 0))
            )]
        );
    }

    #[test]
    fn test_replies_for_win_tell_both_players() {
        let outcome = MoveOutcome::Won {
            position: Position::new(1, 1),
        };
        let replies = outcome.replies(Seat::Two);
        assert!(replies.contains(&(Recipient::Player(Seat::Two), Message::Result { won: true })));
        assert!(replies.contains(&(Recipient::Player(Seat::One), Message::Result { won: false })));
        assert!(replies.contains(&(
            Recipient::Player(Seat::One),
            Message::OpponentMove(Position::new(1, 1))
        )));
    }

    #[test]
    fn test_seat_other_and_display() {
        assert_eq!(Seat::One.other(), Seat::Two);
        assert_eq!(Seat::Two.other(), Seat::One);
        assert_eq!(Seat::Two.to_string(), "player two");
    }
}
