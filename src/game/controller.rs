use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actors::{ActorHandle, Agent, TurnContext, spawn_actor};
use crate::board::{EdgeKey, PlayerId, drivable_tiles, path_cost};
use crate::config;
use crate::coords::TilePosition;

use super::action::{PlayerAction, PlayerObjective};
use super::state::{CityPair, GameError, GamePhase, GameState};

pub type DiceSupplier = Box<dyn FnMut() -> u8 + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    PhaseChanged { phase: GamePhase },
    DiceRolled { player: PlayerId, roll: u8 },
    Windfall { player: PlayerId, delta: i64 },
    RailBuilt { player: PlayerId, edge: EdgeKey },
    CitiesChosen { pair: CityPair },
    PathConfirmed { player: PlayerId, accepted: bool },
    Drove { player: PlayerId, to: TilePosition },
    RoundWinners { winners: Vec<PlayerId> },
    GameWon { winner: PlayerId },
}

/// The coordinating game loop. Owns all mutable state; hands control to one
/// player actor at a time and blocks until that actor deposits a valid
/// action. Illegal actions are bounced back to the actor with the rejection
/// reason and never advance the state machine.
pub struct GameController {
    pub id: Uuid,
    state: GameState,
    actors: Vec<ActorHandle>,
    dice: DiceSupplier,
    rng: StdRng,
    current_dice_roll: u8,
    round_counter: u32,
    stop: Arc<AtomicBool>,
    events: Vec<GameEvent>,
}

impl GameController {
    /// Backstop against a game that cannot make progress any more.
    const ROUNDS_LIMIT: u32 = 10_000;

    pub fn new(state: GameState, agents: Vec<Box<dyn Agent>>) -> Self {
        let mut dice_rng = StdRng::seed_from_u64(state.config.seed.wrapping_add(1));
        let dice: DiceSupplier = Box::new(move || dice_rng.gen_range(1..=config::DICE_SIDES));
        Self::with_dice(state, agents, dice)
    }

    /// Same as [`GameController::new`] but with an injected dice supplier.
    pub fn with_dice(state: GameState, agents: Vec<Box<dyn Agent>>, dice: DiceSupplier) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let actors: Vec<ActorHandle> = agents
            .into_iter()
            .enumerate()
            .map(|(index, agent)| {
                let think_delay = state
                    .players
                    .get(index)
                    .is_some_and(|player| player.is_ai)
                    .then_some(config::AI_THINK_DELAY);
                spawn_actor(agent, Arc::clone(&stop), think_delay)
            })
            .collect();
        let rng = StdRng::seed_from_u64(state.config.seed.wrapping_add(2));
        Self {
            id: Uuid::new_v4(),
            state,
            actors,
            dice,
            rng,
            current_dice_roll: 0,
            round_counter: 0,
            stop,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn round(&self) -> u32 {
        self.round_counter
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Flags the game as stopped; every later hand-off fails fatally.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Runs the whole game: building phase, driving phase, winner
    /// resolution. Returns the index of the overall winner.
    pub fn run(&mut self) -> Result<PlayerId, GameError> {
        let player_count = self.state.players.len();
        if player_count < config::MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers(player_count));
        }
        if self.actors.len() != player_count {
            return Err(GameError::InvariantViolation(format!(
                "{} actors for {player_count} players",
                self.actors.len()
            )));
        }

        self.state.phase = GamePhase::Building;
        self.push_event(GameEvent::PhaseChanged {
            phase: GamePhase::Building,
        });
        info!(game = %self.id, "building phase started");
        self.execute_building_phase()?;

        self.state.phase = GamePhase::Driving;
        self.round_counter = 0;
        self.push_event(GameEvent::PhaseChanged {
            phase: GamePhase::Driving,
        });
        info!(game = %self.id, "driving phase started");
        self.execute_driving_phase()?;

        let winner = self.overall_winner();
        self.state.winner = Some(winner);
        self.state.phase = GamePhase::Completed;
        self.push_event(GameEvent::GameWon { winner });
        info!(game = %self.id, winner = %self.state.players[winner].name, "game over");
        Ok(winner)
    }

    /// Highest credit total wins; ties go to the earliest player in turn
    /// order.
    fn overall_winner(&self) -> PlayerId {
        (0..self.state.players.len())
            .max_by_key(|&index| (self.state.players[index].credits, Reverse(index)))
            .unwrap_or(0)
    }

    /// Building rounds keep going while too many cities are unconnected.
    /// Each round the next player in turn order rolls, then everyone
    /// (starting with the roller) builds on a budget equal to the roll.
    fn execute_building_phase(&mut self) -> Result<(), GameError> {
        let player_count = self.state.players.len();
        while self.state.grid.unconnected_cities().len() >= self.state.config.unconnected_city_threshold
        {
            self.round_counter += 1;
            if self.round_counter > Self::ROUNDS_LIMIT {
                return Err(GameError::InvariantViolation(
                    "building phase exceeded the round limit".into(),
                ));
            }
            let roller = (self.round_counter as usize - 1) % player_count;
            let _ = self.request_action(roller, PlayerObjective::RollDice, None)?;
            let roll = self.cast_dice();
            self.push_event(GameEvent::DiceRolled {
                player: roller,
                roll,
            });
            self.maybe_dice_event(roller);

            for offset in 0..player_count {
                let player = (roller + offset) % player_count;
                self.state.building_budgets[player] = u32::from(roll);
                self.wait_for_build(player)?;
            }
            debug!(
                round = self.round_counter,
                unconnected = self.state.grid.unconnected_cities().len(),
                "building round finished"
            );
        }
        info!(rounds = self.round_counter, "building phase finished");
        Ok(())
    }

    /// With small probability a roll triggers a windfall or penalty for the
    /// roller.
    fn maybe_dice_event(&mut self, player: PlayerId) {
        if !self.rng.gen_bool(config::DICE_EVENT_PROBABILITY) {
            return;
        }
        let delta = if self.rng.gen_bool(0.5) {
            config::DICE_EVENT_CREDITS
        } else {
            -config::DICE_EVENT_CREDITS
        };
        self.state.players[player].add_credits(delta);
        self.push_event(GameEvent::Windfall { player, delta });
        info!(player, delta, "dice event");
    }

    /// Lets the player place rails until they confirm. With no affordable
    /// edge left only confirmation is offered.
    fn wait_for_build(&mut self, player: PlayerId) -> Result<(), GameError> {
        let mut rejection: Option<String> = None;
        loop {
            let buildable = self.state.buildable_rail_edges(player);
            let objective = if buildable.is_empty() {
                PlayerObjective::ConfirmBuild
            } else {
                PlayerObjective::PlaceRail
            };
            let action = self.request_action(player, objective, rejection.take())?;
            match action {
                PlayerAction::ConfirmBuild => break,
                PlayerAction::BuildRail(edges) => {
                    for edge in edges {
                        match self.state.build_rail(player, edge) {
                            Ok(()) => {
                                self.push_event(GameEvent::RailBuilt { player, edge });
                                debug!(player, %edge, "rail built");
                            }
                            Err(error) if error.is_fatal() => return Err(error),
                            Err(error) => {
                                rejection = Some(error.to_string());
                                break;
                            }
                        }
                    }
                }
                other => {
                    rejection = Some(
                        GameError::NotAllowed {
                            objective,
                            action: other.kind(),
                        }
                        .to_string(),
                    );
                }
            }
        }
        self.state.building_budgets[player] = 0;
        Ok(())
    }

    /// Driving rounds keep going while at least two cities have not been a
    /// start or target yet.
    fn execute_driving_phase(&mut self) -> Result<(), GameError> {
        let player_count = self.state.players.len();
        while self.state.unchosen_city_count() >= 2 {
            self.round_counter += 1;
            if self.round_counter > Self::ROUNDS_LIMIT {
                return Err(GameError::InvariantViolation(
                    "driving phase exceeded the round limit".into(),
                ));
            }
            if self.round_counter % config::BUILDING_SUBROUND_INTERVAL == 0 {
                self.building_subround()?;
            }

            let chooser = (self.round_counter as usize - 1) % player_count;
            let _ = self.request_action(chooser, PlayerObjective::ChooseCities, None)?;
            let pair = self.state.choose_cities(&mut self.rng)?;
            self.push_event(GameEvent::CitiesChosen { pair });
            info!(round = self.round_counter, start = %pair.start, target = %pair.target, "cities chosen");

            self.state.reset_driving_round(pair);
            self.let_players_choose_paths(pair)?;

            let mut finished: Vec<PlayerId> = Vec::new();
            self.handle_driving(pair, &mut finished)?;

            let winners = self.round_winners(&finished);
            for (rank, player) in winners.iter().enumerate() {
                self.state.players[*player].add_credits(config::WINNING_CREDITS[rank]);
            }
            self.push_event(GameEvent::RoundWinners { winners });
        }
        info!(rounds = self.round_counter, "driving phase finished");
        Ok(())
    }

    /// Bounded building sub-round: fixed budget, poorest player first.
    fn building_subround(&mut self) -> Result<(), GameError> {
        let order: Vec<PlayerId> = (0..self.state.players.len())
            .sorted_by_key(|&index| (self.state.players[index].credits, index))
            .collect();
        for player in order {
            self.state.building_budgets[player] = config::MAX_BUILDING_BUDGET_DRIVING_PHASE;
            self.wait_for_build(player)?;
        }
        Ok(())
    }

    /// Every player either confirms a path from the start city towards the
    /// target or sits the round out. An unreachable target is not an error;
    /// the player is routed to the confirm objective with nothing to accept.
    fn let_players_choose_paths(&mut self, pair: CityPair) -> Result<(), GameError> {
        for player in 0..self.state.players.len() {
            let drivable = drivable_tiles(&self.state.grid, player, pair.start);
            let Some(engine_path) = drivable.get(&pair.target).cloned() else {
                let _ = self.request_action(player, PlayerObjective::ConfirmPath, None)?;
                debug!(player, "target unreachable, sitting this round out");
                self.push_event(GameEvent::PathConfirmed {
                    player,
                    accepted: false,
                });
                continue;
            };

            let mut rejection: Option<String> = None;
            let path = loop {
                let action =
                    self.request_action(player, PlayerObjective::ChoosePath, rejection.take())?;
                let PlayerAction::ChooseRails(edges) = action else {
                    continue;
                };
                match self.resolve_chosen_path(player, pair, &edges, &engine_path) {
                    Ok(path) => break path,
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => rejection = Some(error.to_string()),
                }
            };

            let action = self.request_action(player, PlayerObjective::ConfirmPath, None)?;
            let accepted = matches!(action, PlayerAction::ConfirmDrive(true));
            if accepted {
                self.state.confirm_path(player, path)?;
            }
            self.push_event(GameEvent::PathConfirmed { player, accepted });
        }
        Ok(())
    }

    /// Turns a `ChooseRails` submission into a tile path. An empty choice
    /// delegates to the engine-computed cheapest route.
    fn resolve_chosen_path(
        &self,
        player: PlayerId,
        pair: CityPair,
        edges: &[EdgeKey],
        engine_path: &[TilePosition],
    ) -> Result<Vec<TilePosition>, GameError> {
        if edges.is_empty() {
            return Ok(engine_path.to_vec());
        }
        let mut cursor = pair.start;
        let mut tiles = vec![cursor];
        for key in edges {
            let edge = self
                .state
                .grid
                .edge_by_key(key)
                .ok_or(GameError::InvalidPath)?;
            if !edge.has_rail() {
                return Err(GameError::InvalidPath);
            }
            let Some(next) = key.other_endpoint(cursor) else {
                return Err(GameError::InvalidPath);
            };
            cursor = next;
            tiles.push(next);
        }
        if cursor != pair.target {
            return Err(GameError::InvalidPath);
        }
        path_cost(&self.state.grid, player, &tiles)?;
        Ok(tiles)
    }

    /// Applies the driving rounds. A lone driver reaches the target
    /// immediately without consuming any dice. Otherwise players roll and
    /// drive in credits-descending order until everyone has finished, the
    /// reward tiers are exhausted, or the stragglers' surplus runs dry.
    fn handle_driving(
        &mut self,
        pair: CityPair,
        finished: &mut Vec<PlayerId>,
    ) -> Result<(), GameError> {
        let mut driving: Vec<PlayerId> = self.state.driving_players.clone();
        if driving.is_empty() {
            return Ok(());
        }
        if driving.len() == 1 {
            let player = driving[0];
            self.state.positions.insert(player, pair.target);
            finished.push(player);
            self.push_event(GameEvent::Drove {
                player,
                to: pair.target,
            });
            info!(player, "lone driver reaches the target unopposed");
            return Ok(());
        }

        let mut safety = 0;
        loop {
            safety += 1;
            if safety > Self::ROUNDS_LIMIT {
                warn!("driving rounds exceeded the limit, abandoning the round");
                break;
            }

            let arrived: Vec<PlayerId> = driving
                .iter()
                .copied()
                .filter(|player| self.state.positions.get(player) == Some(&pair.target))
                .collect();
            for player in &arrived {
                if !finished.contains(player) {
                    finished.push(*player);
                }
            }
            driving.retain(|player| !arrived.contains(player));

            if driving.is_empty() {
                break;
            }
            if finished.len() >= config::WINNING_CREDITS.len() {
                break;
            }
            if !finished.is_empty() {
                for player in &driving {
                    if let Some(surplus) = self.state.point_surplus.get_mut(player) {
                        *surplus -= i64::from(config::DICE_SIDES);
                    }
                }
                if driving
                    .iter()
                    .all(|player| self.state.point_surplus.get(player).copied().unwrap_or(0) <= 0)
                {
                    debug!("all remaining drivers exhausted their surplus");
                    break;
                }
            }

            let order: Vec<PlayerId> = driving
                .iter()
                .copied()
                .sorted_by_key(|&player| (Reverse(self.state.players[player].credits), player))
                .collect();
            for player in order {
                let _ = self.request_action(player, PlayerObjective::RollDice, None)?;
                let roll = self.cast_dice();
                self.push_event(GameEvent::DiceRolled { player, roll });

                if self.drivable_within_roll(player).is_empty() {
                    debug!(player, roll, "no reachable tile within the roll");
                    continue;
                }
                let mut rejection: Option<String> = None;
                loop {
                    let action =
                        self.request_action(player, PlayerObjective::Drive, rejection.take())?;
                    let PlayerAction::Drive(destination) = action else {
                        continue;
                    };
                    match self.state.drive_to(player, destination, u32::from(roll)) {
                        Ok(()) => {
                            self.push_event(GameEvent::Drove {
                                player,
                                to: destination,
                            });
                            break;
                        }
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(error) => rejection = Some(error.to_string()),
                    }
                }
            }
        }
        Ok(())
    }

    /// Winners of a driving round: the finishers ranked by remaining point
    /// surplus, capped to the reward tiers. Equal surplus keeps finish
    /// order.
    fn round_winners(&self, finished: &[PlayerId]) -> Vec<PlayerId> {
        let mut winners: Vec<PlayerId> = finished
            .iter()
            .copied()
            .sorted_by_key(|player| {
                Reverse(self.state.point_surplus.get(player).copied().unwrap_or(0))
            })
            .collect();
        winners.truncate(config::WINNING_CREDITS.len());
        winners
    }

    fn cast_dice(&mut self) -> u8 {
        let roll = (self.dice)();
        self.current_dice_roll = roll;
        roll
    }

    /// Destinations reachable with the current roll, presented as the legal
    /// `Drive` targets.
    fn drivable_within_roll(
        &self,
        player: PlayerId,
    ) -> HashMap<TilePosition, Vec<TilePosition>> {
        let Some(from) = self.state.positions.get(&player).copied() else {
            return HashMap::new();
        };
        let budget = u64::from(self.current_dice_roll);
        drivable_tiles(&self.state.grid, player, from)
            .into_iter()
            .filter(|(_, path)| {
                path_cost(&self.state.grid, player, path).is_ok_and(|cost| cost <= budget)
            })
            .collect()
    }

    /// The rendezvous with a player actor: set the objective, block until an
    /// action of a permitted kind arrives. Disallowed kinds are bounced back
    /// with the reason; a stopped game or a dead actor is fatal.
    fn request_action(
        &self,
        player: PlayerId,
        objective: PlayerObjective,
        rejection: Option<String>,
    ) -> Result<PlayerAction, GameError> {
        let mut rejection = rejection;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Err(GameError::Stopped);
            }
            let context = self.make_context(player, objective, rejection.take());
            let handle = self
                .actors
                .get(player)
                .ok_or(GameError::InvalidPlayer(player))?;
            let action = handle
                .request(context)
                .map_err(|_| GameError::ActorDisconnected(player))?;
            if objective.allows(action.kind()) {
                return Ok(action);
            }
            debug!(player, %objective, kind = %action.kind(), "action kind not allowed");
            rejection = Some(
                GameError::NotAllowed {
                    objective,
                    action: action.kind(),
                }
                .to_string(),
            );
        }
    }

    fn make_context(
        &self,
        player: PlayerId,
        objective: PlayerObjective,
        rejection: Option<String>,
    ) -> TurnContext {
        let mut context = TurnContext {
            objective,
            player_index: player,
            state: self.state.clone(),
            dice_roll: self.current_dice_roll,
            round: self.round_counter,
            building_budget: self.state.building_budgets.get(player).copied().unwrap_or(0),
            buildable_edges: Vec::new(),
            drivable: HashMap::new(),
            rejection,
        };
        match objective {
            PlayerObjective::PlaceRail | PlayerObjective::ConfirmBuild => {
                context.buildable_edges = self.state.buildable_rail_edges(player);
            }
            PlayerObjective::Drive => {
                context.drivable = self.drivable_within_roll(player);
            }
            PlayerObjective::ChoosePath => {
                if let Some(position) = self.state.positions.get(&player) {
                    context.drivable = drivable_tiles(&self.state.grid, player, *position);
                }
            }
            _ => {}
        }
        context
    }

    fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
