#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod actors;
pub mod agents;
pub mod board;
pub mod config;
pub mod coords;
pub mod game;
pub mod leaderboard;

pub use board::{City, Edge, EdgeKey, GridError, GridTemplate, HexGrid, PlayerId, Terrain, Tile};
pub use coords::{EdgeDirection, TilePosition};
pub use game::{GameConfig, GameController, GameError, GamePhase, GameState};
