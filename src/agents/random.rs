use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};

use crate::actors::{Agent, TurnContext};
use crate::game::{ActionKind, PlayerAction};

/// Baseline agent: picks uniformly among the legal moves it is offered.
/// Seeded, so a given seed always replays the same game.
#[derive(Clone)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, context: &TurnContext) -> PlayerAction {
        let allowed = context.objective.allowed_actions();

        if allowed.contains(&ActionKind::RollDice) {
            return PlayerAction::RollDice;
        }
        if allowed.contains(&ActionKind::BuildRail) {
            if let Some(edge) = context.buildable_edges.choose(&mut self.rng) {
                return PlayerAction::BuildRail(vec![*edge]);
            }
        }
        if allowed.contains(&ActionKind::ConfirmBuild) {
            return PlayerAction::ConfirmBuild;
        }
        if allowed.contains(&ActionKind::ChooseCities) {
            return PlayerAction::ChooseCities;
        }
        if allowed.contains(&ActionKind::ChooseRails) {
            return PlayerAction::ChooseRails(Vec::new());
        }
        if allowed.contains(&ActionKind::Drive) {
            let mut destinations: Vec<_> = context.drivable.keys().copied().collect();
            destinations.sort();
            if let Some(destination) = destinations.choose(&mut self.rng) {
                return PlayerAction::Drive(*destination);
            }
        }
        PlayerAction::ConfirmDrive(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::actors::TurnContext;
    use crate::game::{GameConfig, GameState, PlayerObjective};

    fn context(objective: PlayerObjective) -> TurnContext {
        TurnContext {
            objective,
            player_index: 0,
            state: GameState::new(GameConfig::default()),
            dice_roll: 0,
            round: 0,
            building_budget: 0,
            buildable_edges: Vec::new(),
            drivable: HashMap::new(),
            rejection: None,
        }
    }

    #[test]
    fn same_seed_replays_the_same_choices() {
        let mut first = RandomAgent::new(9);
        let mut second = RandomAgent::new(9);
        for objective in [
            PlayerObjective::RollDice,
            PlayerObjective::ConfirmPath,
            PlayerObjective::ChoosePath,
        ] {
            assert_eq!(first.act(&context(objective)), second.act(&context(objective)));
        }
    }

    #[test]
    fn confirms_build_with_nothing_to_build() {
        let mut agent = RandomAgent::new(1);
        assert_eq!(
            agent.act(&context(PlayerObjective::PlaceRail)),
            PlayerAction::ConfirmBuild
        );
    }
}
