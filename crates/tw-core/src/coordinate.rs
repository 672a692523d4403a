use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete cell position. Immutable; all operations return new values.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coordinate {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Layer.
    pub z: i32,
}

impl Coordinate {
    /// Create a coordinate from all three axes.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Create a coordinate on layer zero.
    pub const fn planar(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    /// Floor a fractional position component-wise.
    pub fn from_floored(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
            z: z.floor() as i32,
        }
    }

    /// Shift by the given deltas.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// The adjacent cell in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy, 0)
    }

    /// The four planar neighbours in N, E, S, W order.
    pub const fn neighbors(self) -> [Coordinate; 4] {
        [
            self.step(Direction::North),
            self.step(Direction::East),
            self.step(Direction::South),
            self.step(Direction::West),
        ]
    }

    /// Straight-line distance.
    pub fn euclidean_distance(self, other: Coordinate) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Grid distance along the axes.
    pub const fn manhattan_distance(self, other: Coordinate) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
            .saturating_add(self.z.abs_diff(other.z))
    }

    /// Whether `other` is one planar step away on the same layer.
    pub const fn is_adjacent(self, other: Coordinate) -> bool {
        self.z == other.z && self.manhattan_distance(other) == 1
    }

    /// The dominant planar direction toward `other`, or `None` for the same column/row.
    ///
    /// Horizontal wins ties so the result is stable for diagonal targets.
    pub fn direction_to(self, other: Coordinate) -> Option<Direction> {
        let dx = other.x.saturating_sub(self.x);
        let dy = other.y.saturating_sub(self.y);
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.unsigned_abs() >= dy.unsigned_abs() {
            Some(if dx > 0 {
                Direction::East
            } else {
                Direction::West
            })
        } else {
            Some(if dy > 0 {
                Direction::South
            } else {
                Direction::North
            })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Planar facing direction. North is toward decreasing `y`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward decreasing `y`.
    North,
    /// Toward increasing `x`.
    East,
    /// Toward increasing `y`.
    #[default]
    South,
    /// Toward decreasing `x`.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Planar `(dx, dy)` step for this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// The direction facing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "north"),
            Self::East => write!(f, "east"),
            Self::South => write!(f, "south"),
            Self::West => write!(f, "west"),
        }
    }
}
