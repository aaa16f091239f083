//! Error types for maze construction and move validation.

use crate::{Direction, Position};

/// Errors raised while building a [`Maze`](crate::Maze).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    /// A maze needs at least one row and one column.
    #[error("maze dimensions must be non-zero, got {rows}x{columns}")]
    EmptyDimensions { rows: u8, columns: u8 },

    /// The flat cell sequence does not fill the grid exactly.
    #[error("expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },
}

/// Why a move was rejected. Returned by
/// [`Maze::check_move`](crate::Maze::check_move).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// One of the endpoints lies outside the grid.
    #[error("position {0} is outside the maze")]
    OutOfBounds(Position),

    /// The destination equals the origin.
    #[error("move does not change position")]
    NoMovement,

    /// More than one cell away on some axis.
    #[error("{from} -> {to} is more than one cell away")]
    TooFar { from: Position, to: Position },

    /// Both row and column change.
    #[error("{from} -> {to} is diagonal")]
    Diagonal { from: Position, to: Position },

    /// A wall blocks the way.
    #[error("wall to the {direction} of {from}")]
    Wall { from: Position, direction: Direction },
}
