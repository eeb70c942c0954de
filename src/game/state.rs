use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::board::{
    EdgeKey, GridError, GridTemplate, HexGrid, PlayerId, drivable_tiles, path_cost,
};
use crate::config;
use crate::coords::TilePosition;

use super::action::{ActionKind, PlayerObjective};
use super::players::PlayerState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub name: String,
    pub is_ai: bool,
}

impl PlayerSpec {
    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: true,
        }
    }

    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub seed: u64,
    pub template: GridTemplate,
    /// The building phase keeps running while at least this many cities are
    /// unconnected.
    pub unconnected_city_threshold: usize,
    pub players: Vec<PlayerSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            template: GridTemplate::standard().clone(),
            unconnected_city_threshold: config::UNCONNECTED_CITIES_THRESHOLD,
            players: vec![PlayerSpec::ai("Bot 1"), PlayerSpec::ai("Bot 2")],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Building,
    Driving,
    Completed,
}

/// The (start, target) cities of the active driving round. Replaced
/// wholesale at round start and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityPair {
    pub start: TilePosition,
    pub target: TilePosition,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("not enough players: got {0}")]
    NotEnoughPlayers(usize),
    #[error("invalid player index {0}")]
    InvalidPlayer(PlayerId),
    #[error("action {action} is not allowed while the objective is {objective}")]
    NotAllowed {
        objective: PlayerObjective,
        action: ActionKind,
    },
    #[error("building the rail costs {needed} but only {available} budget remains")]
    InsufficientBudget { needed: u32, available: u32 },
    #[error("rail {0} would not connect to the player's network")]
    DisconnectedRail(EdgeKey),
    #[error("destination {0} is out of driving range")]
    OutOfRange(TilePosition),
    #[error("fewer than two cities are left to choose")]
    NoCitiesLeft,
    #[error("chosen rails do not form a drivable path to the target")]
    InvalidPath,
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("game was stopped")]
    Stopped,
    #[error("actor for player {0} disconnected")]
    ActorDisconnected(PlayerId),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl GameError {
    /// Fatal errors terminate the game loop; everything else is surfaced to
    /// the submitting actor, which must resubmit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GameError::Stopped
                | GameError::ActorDisconnected(_)
                | GameError::InvariantViolation(_)
        )
    }
}

/// All mutable game state. Mutated only by the orchestrator and by the
/// validated actions players submit; every mutation either fully applies or
/// leaves the state untouched.
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    pub grid: HexGrid,
    pub players: Vec<PlayerState>,
    pub phase: GamePhase,
    /// Remaining building budget per player for the current round.
    pub building_budgets: Vec<u32>,
    /// Driving-phase position per player.
    pub positions: HashMap<PlayerId, TilePosition>,
    /// Point surplus per player for the current driving round.
    pub point_surplus: HashMap<PlayerId, i64>,
    pub chosen_pair: Option<CityPair>,
    /// Cities already used as start or target in earlier rounds.
    pub chosen_cities: HashSet<TilePosition>,
    /// Players that confirmed a path this round, in confirmation order.
    pub driving_players: Vec<PlayerId>,
    pub confirmed_paths: HashMap<PlayerId, Vec<TilePosition>>,
    pub winner: Option<PlayerId>,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let grid = HexGrid::from_template_with_rng(&config.template, &mut rng);
        Self::with_grid(config, grid)
    }

    /// Builds a state over an explicit grid; used for crafted boards.
    pub fn with_grid(config: GameConfig, grid: HexGrid) -> Self {
        let players: Vec<PlayerState> = config
            .players
            .iter()
            .map(|spec| PlayerState::new(spec.name.clone(), spec.is_ai))
            .collect();
        let building_budgets = vec![0; players.len()];
        Self {
            config,
            grid,
            players,
            phase: GamePhase::Building,
            building_budgets,
            positions: HashMap::new(),
            point_surplus: HashMap::new(),
            chosen_pair: None,
            chosen_cities: HashSet::new(),
            driving_players: Vec::new(),
            confirmed_paths: HashMap::new(),
            winner: None,
        }
    }

    fn ensure_player(&self, player: PlayerId) -> Result<(), GameError> {
        if player < self.players.len() {
            Ok(())
        } else {
            Err(GameError::InvalidPlayer(player))
        }
    }

    /// Builds a rail for the player, paying the base cost from the round's
    /// building budget and crediting competitors their parallel tolls.
    pub fn build_rail(&mut self, player: PlayerId, edge: EdgeKey) -> Result<(), GameError> {
        self.ensure_player(player)?;
        if !self.grid.can_add_rail(&edge, player) {
            return Err(GameError::DisconnectedRail(edge));
        }
        let needed = self.grid.total_building_cost(&edge, player)?;
        let available = self.building_budgets[player];
        if needed > available {
            return Err(GameError::InsufficientBudget { needed, available });
        }

        let parallel = self.grid.parallel_cost_per_player(&edge, player);
        if !self.grid.add_rail(&edge, player) {
            return Err(GameError::DisconnectedRail(edge));
        }
        self.players[player].rails.insert(edge);
        self.building_budgets[player] = available - needed;
        for (owner, amount) in parallel {
            if let Some(other) = self.players.get_mut(owner) {
                other.add_credits(i64::from(amount));
            }
        }
        Ok(())
    }

    /// Candidate rails the player could legally build with the remaining
    /// budget, in stable order. Offered to actors as the legal action set.
    pub fn buildable_rail_edges(&self, player: PlayerId) -> Vec<EdgeKey> {
        let Some(budget) = self.building_budgets.get(player).copied() else {
            return Vec::new();
        };
        let mut edges: Vec<EdgeKey> = self
            .grid
            .edges()
            .map(|edge| edge.key)
            .filter(|key| self.grid.can_add_rail(key, player))
            .filter(|key| {
                self.grid
                    .total_building_cost(key, player)
                    .is_ok_and(|cost| cost <= budget)
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn unchosen_city_count(&self) -> usize {
        self.grid
            .cities()
            .keys()
            .filter(|position| !self.chosen_cities.contains(position))
            .count()
    }

    /// Draws two distinct cities from the not-yet-chosen set and records
    /// them as this round's pair.
    pub fn choose_cities(&mut self, rng: &mut impl Rng) -> Result<CityPair, GameError> {
        let mut unchosen: Vec<TilePosition> = self
            .grid
            .cities()
            .keys()
            .filter(|position| !self.chosen_cities.contains(position))
            .copied()
            .collect();
        unchosen.sort();
        if unchosen.len() < 2 {
            return Err(GameError::NoCitiesLeft);
        }

        let start = unchosen[rng.gen_range(0..unchosen.len())];
        let mut target = start;
        while target == start {
            target = unchosen[rng.gen_range(0..unchosen.len())];
        }

        self.chosen_cities.insert(start);
        self.chosen_cities.insert(target);
        let pair = CityPair { start, target };
        self.chosen_pair = Some(pair);
        Ok(pair)
    }

    /// Resets every player's driving state to the round's start city.
    pub fn reset_driving_round(&mut self, pair: CityPair) {
        self.positions.clear();
        self.point_surplus.clear();
        self.driving_players.clear();
        self.confirmed_paths.clear();
        for player in 0..self.players.len() {
            self.positions.insert(player, pair.start);
            self.point_surplus.insert(player, config::ROUND_POINT_SURPLUS);
        }
    }

    /// Registers the player as driving this round with the given path.
    pub fn confirm_path(
        &mut self,
        player: PlayerId,
        path: Vec<TilePosition>,
    ) -> Result<(), GameError> {
        self.ensure_player(player)?;
        if !self.driving_players.contains(&player) {
            self.driving_players.push(player);
        }
        self.confirmed_paths.insert(player, path);
        Ok(())
    }

    /// Moves the player to `destination` if it is reachable within the dice
    /// budget, paying rent to every foreign rail owner along the way.
    pub fn drive_to(
        &mut self,
        player: PlayerId,
        destination: TilePosition,
        budget: u32,
    ) -> Result<(), GameError> {
        self.ensure_player(player)?;
        let from = *self
            .positions
            .get(&player)
            .ok_or(GameError::InvalidPlayer(player))?;
        let drivable = drivable_tiles(&self.grid, player, from);
        let Some(path) = drivable.get(&destination) else {
            return Err(GameError::OutOfRange(destination));
        };
        let cost = path_cost(&self.grid, player, path)?;
        if cost > u64::from(budget) {
            return Err(GameError::OutOfRange(destination));
        }

        let mut owed: HashMap<PlayerId, i64> = HashMap::new();
        for segment in path.windows(2) {
            let key = EdgeKey::new(segment[0], segment[1])?;
            for (owner, amount) in self.grid.renting_cost(&key, player) {
                *owed.entry(owner).or_insert(0) += i64::from(amount);
            }
        }
        let total_rent: i64 = owed.values().sum();
        self.players[player].remove_credits(total_rent);
        for (owner, amount) in owed {
            if let Some(other) = self.players.get_mut(owner) {
                other.add_credits(amount);
            }
        }
        self.positions.insert(player, destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{City, Terrain, Tile};

    fn pos(q: i32) -> TilePosition {
        TilePosition::new(q, 0)
    }

    fn edge(q1: i32, q2: i32) -> EdgeKey {
        EdgeKey::new(pos(q1), pos(q2)).unwrap()
    }

    fn line_state(length: i32, players: usize) -> GameState {
        let tiles = (0..length).map(|q| Tile {
            position: pos(q),
            terrain: Terrain::Plain,
        });
        let cities = vec![
            City {
                position: pos(0),
                name: "Aachen".to_string(),
                is_starting_city: true,
            },
            City {
                position: pos(length - 1),
                name: "Bruges".to_string(),
                is_starting_city: false,
            },
        ];
        let grid = HexGrid::from_parts(tiles, cities).unwrap();
        let config = GameConfig {
            players: (0..players)
                .map(|idx| PlayerSpec::ai(format!("Bot {idx}")))
                .collect(),
            ..GameConfig::default()
        };
        GameState::with_grid(config, grid)
    }

    /// Line state plus one extra tile south-east of the starting city.
    fn forked_state(length: i32, players: usize) -> GameState {
        let tiles = (0..length)
            .map(|q| Tile {
                position: pos(q),
                terrain: Terrain::Plain,
            })
            .chain([Tile {
                position: TilePosition::new(0, 1),
                terrain: Terrain::Plain,
            }]);
        let cities = vec![
            City {
                position: pos(0),
                name: "Aachen".to_string(),
                is_starting_city: true,
            },
            City {
                position: pos(length - 1),
                name: "Bruges".to_string(),
                is_starting_city: false,
            },
        ];
        let grid = HexGrid::from_parts(tiles, cities).unwrap();
        let config = GameConfig {
            players: (0..players)
                .map(|idx| PlayerSpec::ai(format!("Bot {idx}")))
                .collect(),
            ..GameConfig::default()
        };
        GameState::with_grid(config, grid)
    }

    #[test]
    fn build_rail_spends_budget_and_pays_tolls() {
        let mut state = forked_state(4, 2);
        let fork = EdgeKey::new(pos(0), TilePosition::new(0, 1)).unwrap();
        state.building_budgets = vec![6, 6];

        state.build_rail(0, edge(0, 1)).unwrap();
        assert_eq!(state.building_budgets[0], 5);
        assert!(state.players[0].owns_rail(&edge(0, 1)));

        // A network-less player may not join the built city edge.
        assert!(matches!(
            state.build_rail(1, edge(0, 1)),
            Err(GameError::DisconnectedRail(_))
        ));

        // After starting their own network, joining works and pays player 0
        // the 3-credit city-edge sharing toll out of the budget.
        state.build_rail(1, fork).unwrap();
        let before = state.players[0].credits;
        state.build_rail(1, edge(0, 1)).unwrap();
        assert_eq!(state.players[0].credits, before + 3);
        // Base cost 1 plus 3 toll plus the fork's cost of 1.
        assert_eq!(state.building_budgets[1], 1);
    }

    #[test]
    fn build_rail_rejects_overdraft_without_side_effects() {
        let mut state = line_state(4, 1);
        state.building_budgets = vec![0];
        let err = state.build_rail(0, edge(0, 1)).unwrap_err();
        assert!(matches!(err, GameError::InsufficientBudget { .. }));
        assert!(!state.players[0].owns_rail(&edge(0, 1)));
        assert!(!state.grid.edge_by_key(&edge(0, 1)).unwrap().has_rail());
    }

    #[test]
    fn buildable_edges_respect_budget_and_connectivity() {
        let mut state = line_state(4, 1);
        state.building_budgets = vec![1];
        // Only the city edge is reachable for a fresh network.
        assert_eq!(state.buildable_rail_edges(0), vec![edge(0, 1)]);

        state.build_rail(0, edge(0, 1)).unwrap();
        assert_eq!(state.building_budgets[0], 0);
        assert!(state.buildable_rail_edges(0).is_empty());

        state.building_budgets[0] = 6;
        assert_eq!(state.buildable_rail_edges(0), vec![edge(1, 2)]);
    }

    #[test]
    fn choose_cities_picks_two_distinct_unchosen() {
        let mut state = line_state(4, 2);
        let mut rng = StdRng::seed_from_u64(3);
        let pair = state.choose_cities(&mut rng).unwrap();
        assert_ne!(pair.start, pair.target);
        assert_eq!(state.chosen_pair, Some(pair));
        assert_eq!(state.unchosen_city_count(), 0);
        assert!(matches!(
            state.choose_cities(&mut rng),
            Err(GameError::NoCitiesLeft)
        ));
    }

    #[test]
    fn reset_driving_round_places_everyone_at_start() {
        let mut state = line_state(4, 3);
        let pair = CityPair {
            start: pos(0),
            target: pos(3),
        };
        state.reset_driving_round(pair);
        for player in 0..3 {
            assert_eq!(state.positions[&player], pos(0));
            assert_eq!(state.point_surplus[&player], config::ROUND_POINT_SURPLUS);
        }
        assert!(state.driving_players.is_empty());
    }

    #[test]
    fn drive_to_moves_and_pays_rent() {
        let mut state = line_state(4, 2);
        state.building_budgets = vec![6, 0];
        state.build_rail(0, edge(0, 1)).unwrap();
        state.build_rail(0, edge(1, 2)).unwrap();

        let pair = CityPair {
            start: pos(0),
            target: pos(3),
        };
        state.reset_driving_round(pair);

        // The owner drives free of rent.
        state.drive_to(0, pos(2), 6).unwrap();
        assert_eq!(state.positions[&0], pos(2));
        assert_eq!(state.players[0].credits, config::STARTING_CREDITS);

        // The renter pays 1 credit per foreign rail crossed.
        state.drive_to(1, pos(2), 6).unwrap();
        assert_eq!(state.players[1].credits, config::STARTING_CREDITS - 2);
        assert_eq!(state.players[0].credits, config::STARTING_CREDITS + 2);
    }

    #[test]
    fn drive_to_rejects_unreachable_or_too_expensive() {
        let mut state = line_state(4, 1);
        state.building_budgets = vec![6];
        state.build_rail(0, edge(0, 1)).unwrap();
        state.reset_driving_round(CityPair {
            start: pos(0),
            target: pos(3),
        });

        assert!(matches!(
            state.drive_to(0, pos(3), 6),
            Err(GameError::OutOfRange(_))
        ));
        // Reachable but beyond the dice budget of zero.
        assert!(matches!(
            state.drive_to(0, pos(1), 0),
            Err(GameError::OutOfRange(_))
        ));
        assert_eq!(state.positions[&0], pos(0));
    }
}
