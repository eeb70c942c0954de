use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::board::EdgeKey;
use crate::coords::TilePosition;

/// One action submitted by a player actor. Actions either mutate game state
/// through the orchestrator or are rejected with a typed failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    RollDice,
    /// Build the given rails, in order.
    BuildRail(Vec<EdgeKey>),
    ConfirmBuild,
    /// Ask the orchestrator to draw this round's city pair.
    ChooseCities,
    /// Propose the rails to drive along this round; empty means "let the
    /// engine pick a cheapest path".
    ChooseRails(Vec<EdgeKey>),
    /// Accept or reject the proposed path.
    ConfirmDrive(bool),
    /// Drive to a reachable destination tile.
    Drive(TilePosition),
}

impl PlayerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::RollDice => ActionKind::RollDice,
            PlayerAction::BuildRail(_) => ActionKind::BuildRail,
            PlayerAction::ConfirmBuild => ActionKind::ConfirmBuild,
            PlayerAction::ChooseCities => ActionKind::ChooseCities,
            PlayerAction::ChooseRails(_) => ActionKind::ChooseRails,
            PlayerAction::ConfirmDrive(_) => ActionKind::ConfirmDrive,
            PlayerAction::Drive(_) => ActionKind::Drive,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    RollDice,
    BuildRail,
    ConfirmBuild,
    ChooseCities,
    ChooseRails,
    ConfirmDrive,
    Drive,
}

/// What the active player is currently asked to do. Restricts which action
/// kinds the player may submit next.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerObjective {
    Idle,
    RollDice,
    PlaceRail,
    ConfirmBuild,
    ChooseCities,
    ChoosePath,
    ConfirmPath,
    Drive,
}

impl PlayerObjective {
    pub fn allowed_actions(self) -> &'static [ActionKind] {
        match self {
            PlayerObjective::Idle => &[],
            PlayerObjective::RollDice => &[ActionKind::RollDice],
            PlayerObjective::PlaceRail => &[ActionKind::BuildRail, ActionKind::ConfirmBuild],
            PlayerObjective::ConfirmBuild => &[ActionKind::ConfirmBuild],
            PlayerObjective::ChooseCities => &[ActionKind::ChooseCities],
            PlayerObjective::ChoosePath => &[ActionKind::ChooseRails],
            PlayerObjective::ConfirmPath => &[ActionKind::ConfirmDrive],
            PlayerObjective::Drive => &[ActionKind::Drive],
        }
    }

    pub fn allows(self, kind: ActionKind) -> bool {
        self.allowed_actions().contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_action_kind_is_permitted_somewhere() {
        for kind in ActionKind::iter() {
            assert!(
                PlayerObjective::iter().any(|objective| objective.allows(kind)),
                "{kind} is never allowed"
            );
        }
    }

    #[test]
    fn idle_permits_nothing() {
        assert!(PlayerObjective::Idle.allowed_actions().is_empty());
    }

    #[test]
    fn place_rail_allows_building_and_confirming() {
        assert!(PlayerObjective::PlaceRail.allows(ActionKind::BuildRail));
        assert!(PlayerObjective::PlaceRail.allows(ActionKind::ConfirmBuild));
        assert!(!PlayerObjective::PlaceRail.allows(ActionKind::Drive));
    }
}
