use crate::actors::{Agent, TurnContext};
use crate::game::{ActionKind, PlayerAction};

/// Strategic reference agent: rolls when asked, builds the cheapest
/// affordable rail, confirms once nothing affordable remains, accepts every
/// proposed path and always drives as close to the target as it can get.
#[derive(Clone)]
pub struct GreedyAgent;

impl Agent for GreedyAgent {
    fn act(&mut self, context: &TurnContext) -> PlayerAction {
        let allowed = context.objective.allowed_actions();

        if allowed.contains(&ActionKind::RollDice) {
            return PlayerAction::RollDice;
        }
        if allowed.contains(&ActionKind::BuildRail) {
            if let Some(action) = self.build_cheapest(context) {
                return action;
            }
        }
        if allowed.contains(&ActionKind::ConfirmBuild) {
            return PlayerAction::ConfirmBuild;
        }
        if allowed.contains(&ActionKind::ChooseCities) {
            return PlayerAction::ChooseCities;
        }
        if allowed.contains(&ActionKind::ChooseRails) {
            // Let the engine compute the cheapest route.
            return PlayerAction::ChooseRails(Vec::new());
        }
        if allowed.contains(&ActionKind::Drive) {
            if let Some(action) = self.drive_toward_target(context) {
                return action;
            }
        }
        PlayerAction::ConfirmDrive(true)
    }
}

impl GreedyAgent {
    fn build_cheapest(&self, context: &TurnContext) -> Option<PlayerAction> {
        let player = context.player_index;
        let grid = &context.state.grid;
        let cheapest = context
            .buildable_edges
            .iter()
            .copied()
            .min_by_key(|key| {
                (
                    grid.total_building_cost(key, player).unwrap_or(u32::MAX),
                    *key,
                )
            })?;
        Some(PlayerAction::BuildRail(vec![cheapest]))
    }

    fn drive_toward_target(&self, context: &TurnContext) -> Option<PlayerAction> {
        let target = context.state.chosen_pair.map(|pair| pair.target);
        if let Some(target) = target {
            if context.drivable.contains_key(&target) {
                return Some(PlayerAction::Drive(target));
            }
        }
        let best = context
            .drivable
            .keys()
            .min_by_key(|position| (target.map_or(0, |t| position.distance(t)), **position))
            .copied()?;
        Some(PlayerAction::Drive(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::actors::TurnContext;
    use crate::board::{City, EdgeKey, HexGrid, Terrain, Tile};
    use crate::coords::TilePosition;
    use crate::game::{CityPair, GameConfig, GameState, PlayerObjective, PlayerSpec};

    fn pos(q: i32) -> TilePosition {
        TilePosition::new(q, 0)
    }

    fn line_context(objective: PlayerObjective) -> TurnContext {
        let tiles = (0..4).map(|q| Tile {
            position: pos(q),
            terrain: if q == 2 {
                Terrain::Mountain
            } else {
                Terrain::Plain
            },
        });
        let cities = vec![City {
            position: pos(0),
            name: "Aachen".to_string(),
            is_starting_city: true,
        }];
        let grid = HexGrid::from_parts(tiles, cities).unwrap();
        let config = GameConfig {
            players: vec![PlayerSpec::ai("Bot 0")],
            ..GameConfig::default()
        };
        let mut state = GameState::with_grid(config, grid);
        state.chosen_pair = Some(CityPair {
            start: pos(0),
            target: pos(3),
        });
        TurnContext {
            objective,
            player_index: 0,
            state,
            dice_roll: 0,
            round: 0,
            building_budget: 6,
            buildable_edges: Vec::new(),
            drivable: HashMap::new(),
            rejection: None,
        }
    }

    #[test]
    fn builds_the_cheapest_offered_edge() {
        let mut context = line_context(PlayerObjective::PlaceRail);
        let cheap = EdgeKey::new(pos(0), pos(1)).unwrap();
        let pricey = EdgeKey::new(pos(1), pos(2)).unwrap();
        context.buildable_edges = vec![pricey, cheap];
        let action = GreedyAgent.act(&context);
        assert_eq!(action, PlayerAction::BuildRail(vec![cheap]));
    }

    #[test]
    fn confirms_when_nothing_is_buildable() {
        let context = line_context(PlayerObjective::PlaceRail);
        assert_eq!(GreedyAgent.act(&context), PlayerAction::ConfirmBuild);
    }

    #[test]
    fn drives_to_the_target_when_reachable() {
        let mut context = line_context(PlayerObjective::Drive);
        context.drivable = HashMap::from([
            (pos(1), vec![pos(0), pos(1)]),
            (pos(3), vec![pos(0), pos(1), pos(2), pos(3)]),
        ]);
        assert_eq!(GreedyAgent.act(&context), PlayerAction::Drive(pos(3)));
    }

    #[test]
    fn otherwise_drives_as_close_as_possible() {
        let mut context = line_context(PlayerObjective::Drive);
        context.drivable = HashMap::from([
            (pos(1), vec![pos(0), pos(1)]),
            (pos(2), vec![pos(0), pos(1), pos(2)]),
        ]);
        assert_eq!(GreedyAgent.act(&context), PlayerAction::Drive(pos(2)));
    }
}
