pub mod action;
pub mod controller;
pub mod players;
pub mod state;

pub use action::{ActionKind, PlayerAction, PlayerObjective};
pub use controller::{DiceSupplier, GameController, GameEvent};
pub use players::PlayerState;
pub use state::{CityPair, GameConfig, GameError, GamePhase, GameState, PlayerSpec};
