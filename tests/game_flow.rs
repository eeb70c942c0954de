//! End-to-end runs of the full game loop with automated players.

use std::collections::VecDeque;

use steamrails::actors::Agent;
use steamrails::agents::{GreedyAgent, RandomAgent};
use steamrails::board::{City, GridTemplate, HexGrid, Terrain, Tile};
use steamrails::coords::{TilePosition, generate_hexagon};
use steamrails::game::{
    DiceSupplier, GameConfig, GameController, GameEvent, GamePhase, GameState, PlayerSpec,
};
use steamrails::leaderboard;

fn corner_city_grid() -> HexGrid {
    let tiles = generate_hexagon(1).into_iter().map(|position| Tile {
        position,
        terrain: Terrain::Plain,
    });
    let cities = vec![
        City {
            position: TilePosition::new(-1, 0),
            name: "Aachen".to_string(),
            is_starting_city: true,
        },
        City {
            position: TilePosition::new(1, 0),
            name: "Bruges".to_string(),
            is_starting_city: false,
        },
    ];
    HexGrid::from_parts(tiles, cities).unwrap()
}

fn scripted_dice(rolls: &[u8]) -> DiceSupplier {
    let mut queue: VecDeque<u8> = rolls.iter().copied().collect();
    Box::new(move || queue.pop_front().unwrap_or(1))
}

fn players(count: usize) -> Vec<PlayerSpec> {
    (0..count)
        .map(|index| PlayerSpec::human(format!("Player {index}")))
        .collect()
}

#[test]
fn greedy_builders_connect_the_corner_cities() {
    let grid = corner_city_grid();
    let unconnected_before = grid.unconnected_cities().len();
    assert_eq!(unconnected_before, 2);

    let config = GameConfig {
        players: players(2),
        unconnected_city_threshold: 2,
        ..GameConfig::default()
    };
    let state = GameState::with_grid(config, grid);
    let agents: Vec<Box<dyn Agent>> = vec![Box::new(GreedyAgent), Box::new(GreedyAgent)];
    let mut controller = GameController::with_dice(state, agents, scripted_dice(&[4, 3]));

    let winner = controller.run().unwrap();
    let state = controller.state();

    assert_eq!(state.phase, GamePhase::Completed);
    assert_eq!(state.winner, Some(winner));
    // The building phase never leaves more cities unconnected than it found.
    assert!(state.grid.unconnected_cities().len() <= unconnected_before);
    assert!(state.grid.unconnected_cities().len() < 2);
    assert!(
        controller
            .events()
            .iter()
            .any(|event| matches!(event, GameEvent::RailBuilt { .. }))
    );

    // Whatever was built forms valid networks anchored at a starting city.
    for player in 0..2 {
        if !state.players[player].rails.is_empty() {
            assert!(state.grid.network_is_connected(player));
            assert!(state.grid.network_touches_starting_city(player));
        }
    }
}

#[test]
fn seeded_standard_game_runs_to_completion() {
    let template = GridTemplate::standard().clone();
    let city_count = template.city_count;
    let config = GameConfig {
        seed: 42,
        template,
        // Stop building as soon as any city gets connected, to keep the
        // phase short on the big board.
        unconnected_city_threshold: city_count,
        players: players(3),
    };
    let state = GameState::new(config);
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(GreedyAgent),
        Box::new(GreedyAgent),
        Box::new(RandomAgent::new(7)),
    ];
    let mut controller = GameController::new(state, agents);

    let winner = controller.run().unwrap();
    let state = controller.state();

    assert_eq!(state.phase, GamePhase::Completed);
    assert_eq!(state.winner, Some(winner));
    assert!(winner < 3);
    // The driving phase consumed the available city pairs.
    assert!(state.unchosen_city_count() < 2);
    assert!(
        controller
            .events()
            .iter()
            .any(|event| matches!(event, GameEvent::GameWon { .. }))
    );

    // Final scores land on the leaderboard.
    let mut path = std::env::temp_dir();
    path.push(format!("steamrails-flow-{}.csv", uuid::Uuid::new_v4()));
    for player in &state.players {
        leaderboard::save_player_data(&path, &player.name, player.credits, player.is_ai).unwrap();
    }
    let entries = leaderboard::load_leaderboard_data(&path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].player_name, state.players[0].name);
    let _ = std::fs::remove_file(path);
}

#[test]
fn stopping_the_controller_aborts_the_run() {
    let grid = corner_city_grid();
    let config = GameConfig {
        players: players(2),
        ..GameConfig::default()
    };
    let state = GameState::with_grid(config, grid);
    let agents: Vec<Box<dyn Agent>> = vec![Box::new(GreedyAgent), Box::new(GreedyAgent)];
    let mut controller = GameController::with_dice(state, agents, scripted_dice(&[]));

    controller.stop();
    let error = controller.run().unwrap_err();
    assert!(error.is_fatal());
    assert_ne!(controller.state().phase, GamePhase::Completed);
}
