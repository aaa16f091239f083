//! The [`Maze`] grid: generation, move validation and read-only access.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Cell, Direction, MazeError, MoveError, Position};

/// A rectangular maze of wall-bitmask cells, stored row-major.
///
/// Mazes produced by [`Maze::generate`] are *perfect*: the open passages
/// form a spanning tree over the grid, so there is exactly one simple path
/// between any two cells. A maze never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    rows: u8,
    columns: u8,
    cells: Vec<Cell>,
}

/// One level of the depth-first walk: the cell being visited, its
/// shuffled candidate directions and how many of them were tried.
struct Frame {
    position: Position,
    directions: [Direction; 4],
    next: usize,
}

impl Frame {
    fn new<R: Rng + ?Sized>(position: Position, rng: &mut R) -> Self {
        let mut directions = Direction::ALL;
        directions.shuffle(rng);
        Self {
            position,
            directions,
            next: 0,
        }
    }

    fn next_direction(&mut self) -> Option<Direction> {
        let dir = self.directions.get(self.next).copied();
        self.next += 1;
        dir
    }
}

impl Maze {
    /// Generates a random perfect maze using the thread-local RNG.
    ///
    /// # Errors
    /// [`MazeError::EmptyDimensions`] if `rows` or `columns` is zero.
    pub fn generate(rows: u8, columns: u8) -> Result<Self, MazeError> {
        Self::generate_with_rng(rows, columns, &mut rand::rng())
    }

    /// Generates a perfect maze with randomized depth-first backtracking.
    ///
    /// The walk starts at `(0, 0)`. Every visited cell shuffles the four
    /// directions; each in-bounds, unvisited neighbour gets its shared wall
    /// removed on both sides and is explored before the remaining directions
    /// are tried. The walk keeps its own stack instead of recursing, so the
    /// largest grid (255×255) is safe on any thread, and the visiting order
    /// matches the recursive algorithm for the same sequence of shuffles.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        rows: u8,
        columns: u8,
        rng: &mut R,
    ) -> Result<Self, MazeError> {
        if rows == 0 || columns == 0 {
            return Err(MazeError::EmptyDimensions { rows, columns });
        }

        let len = usize::from(rows) * usize::from(columns);
        let mut cells = vec![Cell::CLOSED; len];
        let mut visited = vec![false; len];

        let start = Position::new(0, 0);
        visited[index(columns, start)] = true;
        let mut stack = vec![Frame::new(start, rng)];

        while let Some(frame) = stack.last_mut() {
            let here = frame.position;
            let Some(dir) = frame.next_direction() else {
                stack.pop();
                continue;
            };
            let Some(next) = here.step(dir, rows, columns) else {
                continue;
            };
            let next_idx = index(columns, next);
            if visited[next_idx] {
                continue;
            }

            cells[index(columns, here)].open(dir);
            cells[next_idx].open(dir.opposite());
            visited[next_idx] = true;
            stack.push(Frame::new(next, rng));
        }

        tracing::debug!(rows, columns, "maze generated");
        Ok(Self {
            rows,
            columns,
            cells,
        })
    }

    /// Rebuilds a maze from a flat, row-major sequence of cell bytes.
    ///
    /// This is the receiving side of the join-response payload. The walls
    /// are taken as given; no perfectness check is made.
    ///
    /// # Errors
    /// - [`MazeError::EmptyDimensions`] if either dimension is zero
    /// - [`MazeError::CellCount`] if `cells.len() != rows * columns`
    pub fn from_cells(rows: u8, columns: u8, cells: &[u8]) -> Result<Self, MazeError> {
        if rows == 0 || columns == 0 {
            return Err(MazeError::EmptyDimensions { rows, columns });
        }
        let expected = usize::from(rows) * usize::from(columns);
        if cells.len() != expected {
            return Err(MazeError::CellCount {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            cells: cells.iter().copied().map(Cell::from_bits).collect(),
        })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// Where both players begin: the top-left cell.
    pub fn start(&self) -> Position {
        Position::new(0, 0)
    }

    /// The cell a player must reach to win: the bottom-right cell.
    pub fn goal(&self) -> Position {
        Position::new(self.rows - 1, self.columns - 1)
    }

    /// Returns `true` if `pos` lies inside the grid.
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.column < self.columns
    }

    /// Returns the cell at `pos`, or `None` outside the grid.
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        self.contains(pos)
            .then(|| self.cells[index(self.columns, pos)])
    }

    /// Returns one row of cells.
    pub fn row(&self, row: u8) -> Option<&[Cell]> {
        if row >= self.rows {
            return None;
        }
        let width = usize::from(self.columns);
        let start = usize::from(row) * width;
        Some(&self.cells[start..start + width])
    }

    /// Iterates over the rows, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(usize::from(self.columns))
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Counts open adjacencies between in-bounds neighbours, each one
    /// once. A perfect maze has exactly `rows * columns - 1`.
    pub fn open_passages(&self) -> usize {
        let mut count = 0;
        for row in 0..self.rows {
            for column in 0..self.columns {
                let pos = Position::new(row, column);
                let cell = self.cells[index(self.columns, pos)];
                for dir in [Direction::South, Direction::East] {
                    if cell.is_open(dir) && pos.step(dir, self.rows, self.columns).is_some() {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Validates a single step from `from` to `to`.
    ///
    /// A legal move goes exactly one cell north, south, east or west
    /// through an open side of the origin cell. Staying in place is not a
    /// move and is rejected.
    pub fn check_move(&self, from: Position, to: Position) -> Result<Direction, MoveError> {
        if !self.contains(from) {
            return Err(MoveError::OutOfBounds(from));
        }
        if !self.contains(to) {
            return Err(MoveError::OutOfBounds(to));
        }

        let d_row = i16::from(to.row) - i16::from(from.row);
        let d_column = i16::from(to.column) - i16::from(from.column);
        if d_row == 0 && d_column == 0 {
            return Err(MoveError::NoMovement);
        }
        if d_row.abs() > 1 || d_column.abs() > 1 {
            return Err(MoveError::TooFar { from, to });
        }
        let Some(direction) = Direction::from_delta(d_row, d_column) else {
            return Err(MoveError::Diagonal { from, to });
        };

        if !self.cells[index(self.columns, from)].is_open(direction) {
            return Err(MoveError::Wall { from, direction });
        }
        Ok(direction)
    }

    /// Boolean shorthand for [`check_move`](Self::check_move).
    pub fn is_valid_move(&self, from: Position, to: Position) -> bool {
        self.check_move(from, to).is_ok()
    }

    /// Draws the maze as ASCII art with optional single-character markers
    /// (e.g. player positions) placed inside cells.
    ///
    /// ```text
    /// +---+---+
    /// | A     |
    /// +---+   +
    /// |     B |
    /// +---+---+
    /// ```
    pub fn render_with(&self, markers: &[(Position, char)]) -> String {
        let width = usize::from(self.columns);
        let mut out = String::with_capacity((width * 4 + 2) * (usize::from(self.rows) * 2 + 1));

        for (r, row) in self.iter_rows().enumerate() {
            for cell in row {
                out.push('+');
                out.push_str(if cell.is_open(Direction::North) { "   " } else { "---" });
            }
            out.push_str("+\n");

            for (c, cell) in row.iter().enumerate() {
                out.push(if cell.is_open(Direction::West) { ' ' } else { '|' });
                let here = Position::new(r as u8, c as u8);
                let mark = markers
                    .iter()
                    .rev()
                    .find(|(pos, _)| *pos == here)
                    .map_or(' ', |(_, m)| *m);
                out.push(' ');
                out.push(mark);
                out.push(' ');
            }
            let east_open = row.last().is_some_and(|c| c.is_open(Direction::East));
            out.push(if east_open { ' ' } else { '|' });
            out.push('\n');
        }

        if let Some(last) = self.iter_rows().last() {
            for cell in last {
                out.push('+');
                out.push_str(if cell.is_open(Direction::South) { "   " } else { "---" });
            }
            out.push_str("+\n");
        }
        out
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(&[]))
    }
}

fn index(columns: u8, pos: Position) -> usize {
    usize::from(pos.row) * usize::from(columns) + usize::from(pos.column)
}
