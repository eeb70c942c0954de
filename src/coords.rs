use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// The six edge directions of a flat-top hex tile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeDirection {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

/// Axial coordinates on the hex grid. Tiles, cities and edge endpoints are
/// all addressed by value through this type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TilePosition {
    pub q: i32,
    pub r: i32,
}

impl TilePosition {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn add(self, other: TilePosition) -> Self {
        TilePosition::new(self.q + other.q, self.r + other.r)
    }

    /// The adjacent position in the given direction.
    pub fn neighbour(self, direction: EdgeDirection) -> TilePosition {
        self.add(UNIT_VECTORS[&direction])
    }

    pub fn neighbours(self) -> impl Iterator<Item = TilePosition> {
        EdgeDirection::iter().map(move |direction| self.neighbour(direction))
    }

    pub fn is_adjacent(self, other: TilePosition) -> bool {
        self.neighbours().any(|n| n == other)
    }

    /// Hex distance in tile steps.
    pub fn distance(self, other: TilePosition) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        (dq.abs() + dr.abs() + (dq + dr).abs()) / 2
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

pub static UNIT_VECTORS: Lazy<HashMap<EdgeDirection, TilePosition>> = Lazy::new(|| {
    use EdgeDirection::*;
    HashMap::from([
        (East, TilePosition::new(1, 0)),
        (NorthEast, TilePosition::new(1, -1)),
        (NorthWest, TilePosition::new(0, -1)),
        (West, TilePosition::new(-1, 0)),
        (SouthWest, TilePosition::new(-1, 1)),
        (SouthEast, TilePosition::new(0, 1)),
    ])
});

fn num_tiles_for(radius: i32) -> i32 {
    if radius == 0 {
        return 1;
    }
    6 * radius + num_tiles_for(radius - 1)
}

/// Generates all positions of a hexagon-shaped grid with the given radius
/// around the origin.
pub fn generate_hexagon(radius: u32) -> HashSet<TilePosition> {
    let target = num_tiles_for(radius as i32);
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([TilePosition::default()]);

    while (visited.len() as i32) < target {
        let Some(node) = queue.pop_front() else {
            break;
        };
        if !visited.insert(node) {
            continue;
        }
        for neighbour in node.neighbours() {
            if !visited.contains(&neighbour) && !queue.contains(&neighbour) {
                queue.push_back(neighbour);
            }
        }
    }
    visited
}
