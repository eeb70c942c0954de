//! Game constants and the terrain-pair cost tables.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::board::{Terrain, TerrainPair};

pub const DICE_SIDES: u8 = 6;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

/// Credits every player starts the game with.
pub const STARTING_CREDITS: i64 = 20;

/// The building phase keeps running while at least this many cities are
/// still unconnected.
pub const UNCONNECTED_CITIES_THRESHOLD: usize = 2;

/// Fixed budget for the building sub-round that interleaves the driving
/// phase every [`BUILDING_SUBROUND_INTERVAL`]th round.
pub const MAX_BUILDING_BUDGET_DRIVING_PHASE: u32 = 5;
pub const BUILDING_SUBROUND_INTERVAL: u32 = 3;

/// Point surplus every driver starts a driving round with. Once somebody
/// has reached the target, everyone still en route loses [`DICE_SIDES`]
/// of it per round.
pub const ROUND_POINT_SURPLUS: i64 = 3 * DICE_SIDES as i64;

/// Credits awarded to the round winners, by rank.
pub const WINNING_CREDITS: [i64; 3] = [20, 10, 5];

/// Chance that a building-phase dice roll triggers a windfall or penalty
/// for the roller, and the amount involved.
pub const DICE_EVENT_PROBABILITY: f64 = 0.1;
pub const DICE_EVENT_CREDITS: i64 = 5;

/// Artificial think-time of automated players.
pub const AI_THINK_DELAY: Duration = Duration::from_millis(100);

pub const TOWN_NAMES: &[&str] = &[
    "Aachen",
    "Bruges",
    "Cologne",
    "Dijon",
    "Esbjerg",
    "Fulda",
    "Geneva",
    "Hamburg",
    "Innsbruck",
    "Krakow",
    "Lyon",
    "Munich",
];

/// Base cost of building a rail between two tiles, keyed by the unordered
/// pair of their terrains.
pub static BUILDING_COST: Lazy<HashMap<TerrainPair, u32>> = Lazy::new(|| {
    use Terrain::*;
    HashMap::from([
        (TerrainPair::new(Plain, Plain), 1),
        (TerrainPair::new(Plain, Mountain), 3),
        (TerrainPair::new(Mountain, Mountain), 5),
    ])
});

/// Cost of driving across a rail, keyed the same way.
pub static DRIVING_COST: Lazy<HashMap<TerrainPair, u32>> = Lazy::new(|| {
    use Terrain::*;
    HashMap::from([
        (TerrainPair::new(Plain, Plain), 1),
        (TerrainPair::new(Plain, Mountain), 2),
        (TerrainPair::new(Mountain, Mountain), 3),
    ])
});

/// The tables above are total over `Terrain`; the fallback is never hit.
pub fn building_cost(pair: TerrainPair) -> u32 {
    BUILDING_COST.get(&pair).copied().unwrap_or(0)
}

pub fn driving_cost(pair: TerrainPair) -> u32 {
    DRIVING_COST.get(&pair).copied().unwrap_or(0)
}
