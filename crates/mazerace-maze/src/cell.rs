//! Grid primitives: directions, wall bitmask cells and positions.
//!
//! A cell is a single byte. Each of the four low bits says whether the
//! cell is *open* toward a neighbour:
//!
//! ```text
//! bit 0 (0x01) North    bit 2 (0x04) East
//! bit 1 (0x02) South    bit 3 (0x08) West
//! ```
//!
//! A set bit means "no wall". A freshly allocated grid is all zeroes,
//! i.e. every cell is boxed in.

use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four cardinal directions a player can move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All directions, in bit order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The bit this direction occupies in a [`Cell`].
    pub const fn bit(self) -> u8 {
        match self {
            Self::North => 0x01,
            Self::South => 0x02,
            Self::East => 0x04,
            Self::West => 0x08,
        }
    }

    /// The direction pointing back the way we came.
    ///
    /// Removing a wall is always done in pairs: `dir` on one side,
    /// `dir.opposite()` on the neighbour.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    /// Row/column offset of one step in this direction.
    ///
    /// North is "up", i.e. toward row 0.
    pub const fn delta(self) -> (i16, i16) {
        match self {
            Self::North => (-1, 0),
            Self::South => (1, 0),
            Self::East => (0, 1),
            Self::West => (0, -1),
        }
    }

    /// Maps a unit offset back to a direction. Anything that is not exactly
    /// one orthogonal step yields `None`.
    pub const fn from_delta(d_row: i16, d_column: i16) -> Option<Self> {
        match (d_row, d_column) {
            (-1, 0) => Some(Self::North),
            (1, 0) => Some(Self::South),
            (0, 1) => Some(Self::East),
            (0, -1) => Some(Self::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single maze cell: a wall bitmask.
///
/// The raw byte is kept as-is (including any bits above the low nibble) so
/// a maze received from the wire re-encodes to exactly the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Cell(u8);

impl Cell {
    /// A cell with all four walls standing.
    pub const CLOSED: Cell = Cell(0);

    /// Wraps a raw wire byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if there is no wall in `direction`.
    pub const fn is_open(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Knocks down the wall in `direction`.
    pub(crate) fn open(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    /// Iterates over the directions this cell is open toward.
    pub fn open_directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.is_open(*d))
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A `(row, column)` coordinate. Both are single bytes, matching the
/// protocol's maze size type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub row: u8,
    pub column: u8,
}

impl Position {
    pub const fn new(row: u8, column: u8) -> Self {
        Self { row, column }
    }

    /// Steps one cell in `direction`, returning `None` if that leaves a
    /// `rows × columns` grid.
    pub fn step(self, direction: Direction, rows: u8, columns: u8) -> Option<Self> {
        let (d_row, d_column) = direction.delta();
        let row = i16::from(self.row) + d_row;
        let column = i16::from(self.column) + d_column;
        if row < 0 || column < 0 || row >= i16::from(rows) || column >= i16::from(columns) {
            return None;
        }
        // Both values are within 0..=254 here.
        Some(Self::new(row as u8, column as u8))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}
