//! Spatial identity of a storage node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable integer coordinate identifying one storage node.
///
/// Ordering is lexicographic on `(x, y, z)`. Components are iterated in this
/// order and the smallest position of a component is its leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

const PACKED_X_BITS: u32 = 26;
const PACKED_Z_BITS: u32 = 26;
const PACKED_Y_BITS: u32 = 64 - PACKED_X_BITS - PACKED_Z_BITS;

impl NodePos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the neighbouring position one step towards `direction`.
    pub fn relative(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            z: self.z.wrapping_add(dz),
        }
    }

    /// Returns all six face-adjacent positions in [`Direction::ALL`] order.
    pub fn neighbours(self) -> [NodePos; 6] {
        Direction::ALL.map(|d| self.relative(d))
    }

    /// Packs the coordinate into 64 bits (26 bits x, 12 bits y, 26 bits z).
    ///
    /// Coordinates outside the packed range wrap, so distinct far-apart
    /// positions may share a packed value.
    pub fn as_long(self) -> u64 {
        let x_mask = (1u64 << PACKED_X_BITS) - 1;
        let y_mask = (1u64 << PACKED_Y_BITS) - 1;
        let z_mask = (1u64 << PACKED_Z_BITS) - 1;
        ((self.x as i64 as u64 & x_mask) << (PACKED_Y_BITS + PACKED_Z_BITS))
            | ((self.z as i64 as u64 & z_mask) << PACKED_Y_BITS)
            | (self.y as i64 as u64 & y_mask)
    }
}

impl fmt::Display for NodePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six faces of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Unit offset `(dx, dy, dz)` for this face.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}
