//! Maze engine for Maze Race.
//!
//! Generates *perfect* mazes (every cell reachable, no loops) with
//! randomized depth-first backtracking and validates player moves against
//! the walls. The maze is the authoritative game state of a race: the
//! server generates one per session, ships it to both players inside the
//! join-response packet and checks every move against it.
//!
//! ```rust
//! use mazerace_maze::{Maze, Position};
//!
//! let maze = Maze::generate(10, 20).unwrap();
//! assert_eq!(maze.open_passages(), 10 * 20 - 1);
//!
//! // Moving two cells at once is never legal.
//! assert!(!maze.is_valid_move(Position::new(0, 0), Position::new(2, 0)));
//! ```

mod cell;
mod error;
mod maze;

pub use cell::{Cell, Direction, Position};
pub use error::{MazeError, MoveError};
pub use maze::Maze;
