use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config;
use crate::coords::{EdgeDirection, TilePosition};

mod pathfind;

pub use pathfind::{drivable_tiles, path_cost};

pub type PlayerId = usize;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    Plain,
    Mountain,
}

/// Unordered pair of terrains, canonicalized on construction so that cost
/// table lookups cannot miss on operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainPair(Terrain, Terrain);

impl TerrainPair {
    pub fn new(a: Terrain, b: Terrain) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub position: TilePosition,
    pub terrain: Terrain,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    pub position: TilePosition,
    pub name: String,
    pub is_starting_city: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("positions {0} and {1} are not adjacent")]
    NotAdjacent(TilePosition, TilePosition),
    #[error("no tile at {0}")]
    UnknownTile(TilePosition),
    #[error("no edge between {0} and {1}")]
    UnknownEdge(TilePosition, TilePosition),
    #[error("{0} is not an endpoint of edge {1}")]
    NotAnEndpoint(TilePosition, EdgeKey),
    #[error("no rail built between {0} and {1}")]
    NoRail(TilePosition, TilePosition),
    #[error("city at {0} is not on the grid")]
    CityOffGrid(TilePosition),
}

/// Normalized unordered pair of adjacent tile positions. The two positions
/// are always distinct and grid-adjacent; the smaller one sorts first so the
/// same physical edge always hashes identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    a: TilePosition,
    b: TilePosition,
}

impl EdgeKey {
    pub fn new(p1: TilePosition, p2: TilePosition) -> Result<Self, GridError> {
        if !p1.is_adjacent(p2) {
            return Err(GridError::NotAdjacent(p1, p2));
        }
        Ok(Self::between(p1, p2))
    }

    /// Callers guarantee adjacency (derived from direction arithmetic).
    pub(crate) fn between(p1: TilePosition, p2: TilePosition) -> Self {
        debug_assert!(p1.is_adjacent(p2));
        if p1 <= p2 {
            Self { a: p1, b: p2 }
        } else {
            Self { a: p2, b: p1 }
        }
    }

    pub fn positions(&self) -> (TilePosition, TilePosition) {
        (self.a, self.b)
    }

    pub fn contains(&self, position: TilePosition) -> bool {
        self.a == position || self.b == position
    }

    pub fn other_endpoint(&self, from: TilePosition) -> Option<TilePosition> {
        if from == self.a {
            Some(self.b)
        } else if from == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// True iff the two edges share at least one endpoint.
    pub fn connects_to(&self, other: &EdgeKey) -> bool {
        self.contains(other.a) || self.contains(other.b)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// A potential rail between two adjacent tiles. `rail_owners` is empty while
/// unbuilt; built rails stay shared and further players may join them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub key: EdgeKey,
    rail_owners: Vec<PlayerId>,
}

impl Edge {
    fn new(key: EdgeKey) -> Self {
        Self {
            key,
            rail_owners: Vec::new(),
        }
    }

    pub fn rail_owners(&self) -> &[PlayerId] {
        &self.rail_owners
    }

    pub fn has_rail(&self) -> bool {
        !self.rail_owners.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridTemplate {
    pub radius: u32,
    pub mountain_probability: f64,
    pub city_count: usize,
    pub starting_city_count: usize,
}

impl GridTemplate {
    pub fn standard() -> &'static GridTemplate {
        &STANDARD_TEMPLATE
    }
}

static STANDARD_TEMPLATE: Lazy<GridTemplate> = Lazy::new(|| GridTemplate {
    radius: 3,
    mountain_probability: 0.25,
    city_count: 8,
    starting_city_count: 3,
});

/// Owns every tile, edge and city of the game board. Edges and neighbours
/// are derived from position arithmetic; the only mutable state is rail
/// ownership.
#[derive(Debug, Clone)]
pub struct HexGrid {
    tiles: HashMap<TilePosition, Tile>,
    edges: HashMap<EdgeKey, Edge>,
    cities: HashMap<TilePosition, City>,
}

impl HexGrid {
    pub fn from_template(template: &GridTemplate) -> Self {
        let mut rng = thread_rng();
        Self::from_template_with_rng(template, &mut rng)
    }

    pub fn from_template_with_rng(template: &GridTemplate, rng: &mut impl rand::Rng) -> Self {
        let mut positions: Vec<TilePosition> =
            crate::coords::generate_hexagon(template.radius).into_iter().collect();
        positions.sort();

        let tiles: Vec<Tile> = positions
            .iter()
            .map(|position| Tile {
                position: *position,
                terrain: if rng.gen_bool(template.mountain_probability) {
                    Terrain::Mountain
                } else {
                    Terrain::Plain
                },
            })
            .collect();

        let city_count = template.city_count.min(positions.len());
        let cities: Vec<City> = positions
            .choose_multiple(rng, city_count)
            .enumerate()
            .map(|(index, position)| City {
                position: *position,
                name: config::TOWN_NAMES[index % config::TOWN_NAMES.len()].to_string(),
                is_starting_city: index < template.starting_city_count,
            })
            .collect();

        Self::from_parts(tiles, cities).expect("template cities are placed on grid tiles")
    }

    /// Builds a grid from explicit tiles and cities; every pair of adjacent
    /// tiles gets an (unbuilt) edge.
    pub fn from_parts(
        tiles: impl IntoIterator<Item = Tile>,
        cities: impl IntoIterator<Item = City>,
    ) -> Result<Self, GridError> {
        let tiles: HashMap<TilePosition, Tile> =
            tiles.into_iter().map(|tile| (tile.position, tile)).collect();

        let mut edges = HashMap::new();
        for position in tiles.keys() {
            for neighbour in position.neighbours() {
                if tiles.contains_key(&neighbour) {
                    let key = EdgeKey::between(*position, neighbour);
                    edges.entry(key).or_insert_with(|| Edge::new(key));
                }
            }
        }

        let mut city_map = HashMap::new();
        for city in cities {
            if !tiles.contains_key(&city.position) {
                return Err(GridError::CityOffGrid(city.position));
            }
            city_map.insert(city.position, city);
        }

        Ok(Self {
            tiles,
            edges,
            cities: city_map,
        })
    }

    pub fn tile_at(&self, position: TilePosition) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn tile_at_coords(&self, q: i32, r: i32) -> Option<&Tile> {
        self.tile_at(TilePosition::new(q, r))
    }

    /// The edge between two positions, or `None` when they are not adjacent
    /// or off the grid.
    pub fn edge_at(&self, p1: TilePosition, p2: TilePosition) -> Option<&Edge> {
        let key = EdgeKey::new(p1, p2).ok()?;
        self.edges.get(&key)
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn city_at(&self, position: TilePosition) -> Option<&City> {
        self.cities.get(&position)
    }

    pub fn cities(&self) -> &HashMap<TilePosition, City> {
        &self.cities
    }

    pub fn neighbour(&self, tile: &Tile, direction: EdgeDirection) -> Option<&Tile> {
        self.tile_at(tile.position.neighbour(direction))
    }

    /// The edge leaving `tile` in `direction`, or `None` at the boundary.
    pub fn edge(&self, tile: &Tile, direction: EdgeDirection) -> Option<&Edge> {
        let neighbour = self.neighbour(tile, direction)?;
        self.edge_at(tile.position, neighbour.position)
    }

    /// Keys of all grid edges incident to `position`.
    pub fn edges_at(&self, position: TilePosition) -> SmallVec<[EdgeKey; 6]> {
        EdgeDirection::iter()
            .filter_map(|direction| {
                let neighbour = position.neighbour(direction);
                let key = EdgeKey::between(position, neighbour);
                self.edges.contains_key(&key).then_some(key)
            })
            .collect()
    }

    /// For a set of edges touching `tile`, the tiles at the far endpoints.
    /// `tile` itself is never included.
    pub fn connected_neighbours(
        &self,
        tile: &Tile,
        edges: &HashSet<EdgeKey>,
    ) -> HashSet<&Tile> {
        let mut neighbours = HashSet::new();
        for key in edges {
            if !key.contains(tile.position) {
                continue;
            }
            if let Some(other) = key.other_endpoint(tile.position) {
                if let Some(neighbour) = self.tile_at(other) {
                    if neighbour != tile {
                        neighbours.insert(neighbour);
                    }
                }
            }
        }
        neighbours
    }

    /// Cities that no built rail network reaches from a starting city.
    pub fn unconnected_cities(&self) -> HashSet<&City> {
        let mut reached: HashSet<TilePosition> = HashSet::new();
        let mut queue: VecDeque<TilePosition> = self
            .cities
            .values()
            .filter(|city| {
                city.is_starting_city
                    && self
                        .edges_at(city.position)
                        .iter()
                        .any(|key| self.edges[key].has_rail())
            })
            .map(|city| city.position)
            .collect();

        while let Some(position) = queue.pop_front() {
            if !reached.insert(position) {
                continue;
            }
            for key in self.edges_at(position) {
                if !self.edges[&key].has_rail() {
                    continue;
                }
                if let Some(other) = key.other_endpoint(position) {
                    if !reached.contains(&other) {
                        queue.push_back(other);
                    }
                }
            }
        }

        self.cities
            .values()
            .filter(|city| !reached.contains(&city.position))
            .collect()
    }

    pub fn base_building_cost(&self, key: &EdgeKey) -> Result<u32, GridError> {
        let (a, b) = key.positions();
        if !self.edges.contains_key(key) {
            return Err(GridError::UnknownEdge(a, b));
        }
        Ok(config::building_cost(self.terrain_pair(key)?))
    }

    /// Cost of driving across the edge starting at `from`; `from` must be
    /// one of the edge's endpoints.
    pub fn driving_cost(&self, key: &EdgeKey, from: TilePosition) -> Result<u32, GridError> {
        if !key.contains(from) {
            return Err(GridError::NotAnEndpoint(from, *key));
        }
        let (a, b) = key.positions();
        if !self.edges.contains_key(key) {
            return Err(GridError::UnknownEdge(a, b));
        }
        Ok(config::driving_cost(self.terrain_pair(key)?))
    }

    fn terrain_pair(&self, key: &EdgeKey) -> Result<TerrainPair, GridError> {
        let (a, b) = key.positions();
        let terrain_a = self.tile_at(a).ok_or(GridError::UnknownTile(a))?.terrain;
        let terrain_b = self.tile_at(b).ok_or(GridError::UnknownTile(b))?.terrain;
        Ok(TerrainPair::new(terrain_a, terrain_b))
    }

    /// The toll a builder owes competitors for a contested or crowded edge:
    /// sharing an already-built edge costs every other owner 5 credits (3
    /// when an endpoint is a city), and each non-city endpoint tile adds a
    /// 1-credit crowding charge per foreign owner with rails there, capped
    /// per owner at the larger charge rather than summed. Tiles where the
    /// builder already owns a rail charge nothing.
    pub fn parallel_cost_per_player(
        &self,
        key: &EdgeKey,
        builder: PlayerId,
    ) -> HashMap<PlayerId, u32> {
        let mut result = HashMap::new();
        let Some(edge) = self.edges.get(key) else {
            return result;
        };

        let foreign_owners: Vec<PlayerId> = edge
            .rail_owners()
            .iter()
            .copied()
            .filter(|owner| *owner != builder)
            .collect();
        if !foreign_owners.is_empty() {
            let (a, b) = key.positions();
            let touches_city = self.city_at(a).is_some() || self.city_at(b).is_some();
            let toll = if touches_city { 3 } else { 5 };
            for owner in foreign_owners {
                result.insert(owner, toll);
            }
        }

        let (a, b) = key.positions();
        for position in [a, b] {
            if self.city_at(position).is_some() {
                continue;
            }
            let mut tile_owners: HashSet<PlayerId> = HashSet::new();
            for other in self.edges_at(position) {
                if other == *key {
                    continue;
                }
                tile_owners.extend(self.edges[&other].rail_owners().iter().copied());
            }
            if tile_owners.contains(&builder) {
                continue;
            }
            for owner in tile_owners {
                if owner == builder {
                    continue;
                }
                let charge = result.entry(owner).or_insert(0);
                *charge = (*charge).max(1);
            }
        }
        result
    }

    pub fn total_parallel_cost(&self, key: &EdgeKey, builder: PlayerId) -> u32 {
        self.parallel_cost_per_player(key, builder).values().sum()
    }

    pub fn total_building_cost(&self, key: &EdgeKey, builder: PlayerId) -> Result<u32, GridError> {
        Ok(self.base_building_cost(key)? + self.total_parallel_cost(key, builder))
    }

    /// Rent owed for driving across the edge: 1 credit per current owner,
    /// nothing when the player owns the edge themselves.
    pub fn renting_cost(&self, key: &EdgeKey, player: PlayerId) -> HashMap<PlayerId, u32> {
        let Some(edge) = self.edges.get(key) else {
            return HashMap::new();
        };
        if edge.rail_owners().contains(&player) {
            return HashMap::new();
        }
        edge.rail_owners().iter().map(|owner| (*owner, 1)).collect()
    }

    /// The player's owned edges adjacent to `key` (sharing an endpoint).
    pub fn connected_rails(&self, key: &EdgeKey, player: PlayerId) -> HashSet<EdgeKey> {
        let (a, b) = key.positions();
        let mut connected = HashSet::new();
        for position in [a, b] {
            for other in self.edges_at(position) {
                if other == *key {
                    continue;
                }
                if self.edges[&other].rail_owners().contains(&player) {
                    connected.insert(other);
                }
            }
        }
        connected
    }

    fn touches_starting_city(&self, key: &EdgeKey) -> bool {
        let (a, b) = key.positions();
        [a, b]
            .into_iter()
            .any(|p| self.city_at(p).is_some_and(|city| city.is_starting_city))
    }

    pub fn can_add_rail(&self, key: &EdgeKey, player: PlayerId) -> bool {
        let Some(edge) = self.edges.get(key) else {
            return false;
        };
        if edge.rail_owners().contains(&player) {
            return false;
        }
        let connects = !self.connected_rails(key, player).is_empty();
        if edge.has_rail() {
            // Joining somebody else's rail requires an own adjacent rail.
            connects
        } else {
            connects || self.touches_starting_city(key)
        }
    }

    /// Registers `player` as an owner of the edge. Networks must grow
    /// contiguously from a starting city; disconnected attempts return
    /// `false` without touching any state.
    pub fn add_rail(&mut self, key: &EdgeKey, player: PlayerId) -> bool {
        if !self.can_add_rail(key, player) {
            return false;
        }
        match self.edges.get_mut(key) {
            Some(edge) => {
                edge.rail_owners.push(player);
                true
            }
            None => false,
        }
    }

    pub fn remove_rail(&mut self, key: &EdgeKey, player: PlayerId) -> bool {
        match self.edges.get_mut(key) {
            Some(edge) => {
                let before = edge.rail_owners.len();
                edge.rail_owners.retain(|owner| *owner != player);
                edge.rail_owners.len() != before
            }
            None => false,
        }
    }

    /// All edge keys currently owned by the player.
    pub fn rails_of(&self, player: PlayerId) -> HashSet<EdgeKey> {
        self.edges
            .values()
            .filter(|edge| edge.rail_owners().contains(&player))
            .map(|edge| edge.key)
            .collect()
    }

    pub fn network_touches_starting_city(&self, player: PlayerId) -> bool {
        self.rails_of(player)
            .iter()
            .any(|key| self.touches_starting_city(key))
    }

    /// Whether the player's owned edges form a single connected component.
    pub fn network_is_connected(&self, player: PlayerId) -> bool {
        let rails = self.rails_of(player);
        let Some(start) = rails.iter().min().map(|key| key.positions().0) else {
            return true;
        };

        let mut reached: HashSet<TilePosition> = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(position) = queue.pop_front() {
            if !reached.insert(position) {
                continue;
            }
            let Some(tile) = self.tile_at(position) else {
                continue;
            };
            let incident: HashSet<EdgeKey> = rails
                .iter()
                .copied()
                .filter(|key| key.contains(position))
                .collect();
            for neighbour in self.connected_neighbours(tile, &incident) {
                if !reached.contains(&neighbour.position) {
                    queue.push_back(neighbour.position);
                }
            }
        }

        rails
            .iter()
            .all(|key| reached.contains(&key.positions().0) && reached.contains(&key.positions().1))
    }
}
