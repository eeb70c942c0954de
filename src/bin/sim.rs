use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use steamrails::actors::Agent;
use steamrails::agents::{create_agent, print_agent_help};
use steamrails::board::GridTemplate;
use steamrails::game::{GameConfig, GameController, GameEvent, GameState, PlayerSpec};
use steamrails::leaderboard;

#[derive(Debug, Parser, Clone)]
#[command(name = "steamrails-sim")]
#[command(about = "Rail game simulator - runs automated players against each other")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 1)]
    num: u32,

    /// Comma-separated agent codes (e.g. G,G or G,R,R)
    #[arg(long, default_value = "G,R")]
    agents: String,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Grid radius
    #[arg(long, default_value_t = 3)]
    radius: u32,

    /// Number of cities placed on the grid
    #[arg(long, default_value_t = 8)]
    cities: usize,

    /// Append final scores to this leaderboard CSV
    #[arg(long)]
    leaderboard: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Show agent codes and exit
    #[arg(long)]
    help_agents: bool,

    /// Silence console output
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct GameResult {
    seed: u64,
    winner: String,
    credits: Vec<i64>,
    events: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.help_agents {
        print_agent_help();
        return;
    }

    let codes: Vec<&str> = args.agents.split(',').collect();
    if codes.len() < 2 || codes.len() > 6 {
        eprintln!("Error: Must specify 2-6 agents");
        std::process::exit(1);
    }

    let mut results = Vec::new();
    for game_index in 0..args.num {
        let seed = args.seed + u64::from(game_index);
        let mut agents: Vec<Box<dyn Agent>> = Vec::new();
        let mut specs = Vec::new();
        for (index, code) in codes.iter().enumerate() {
            match create_agent(code, seed + index as u64) {
                Some(agent) => {
                    agents.push(Box::new(agent));
                    specs.push(PlayerSpec::ai(format!("{code} {}", index + 1)));
                }
                None => {
                    eprintln!("Error: Unknown agent code '{code}'");
                    eprintln!("Use --help-agents to see available codes");
                    std::process::exit(1);
                }
            }
        }

        let config = GameConfig {
            seed,
            template: GridTemplate {
                radius: args.radius,
                city_count: args.cities,
                ..GridTemplate::standard().clone()
            },
            players: specs,
            ..GameConfig::default()
        };
        let state = GameState::new(config);
        let mut controller = GameController::new(state, agents);

        match controller.run() {
            Ok(winner) => {
                let state = controller.state();
                let result = GameResult {
                    seed,
                    winner: state.players[winner].name.clone(),
                    credits: state.players.iter().map(|player| player.credits).collect(),
                    events: controller.events().len(),
                };
                if let Some(path) = &args.leaderboard {
                    for player in &state.players {
                        if let Err(error) = leaderboard::save_player_data(
                            path,
                            &player.name,
                            player.credits,
                            player.is_ai,
                        ) {
                            eprintln!("Could not write the leaderboard: {error}");
                        }
                    }
                }
                if !args.quiet && !args.json {
                    print_result(&result, controller.events());
                }
                results.push(result);
            }
            Err(error) => {
                eprintln!("Game {game_index} failed: {error}");
                std::process::exit(1);
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(error) => eprintln!("Could not serialize results: {error}"),
        }
    }
}

fn print_result(result: &GameResult, events: &[GameEvent]) {
    let rails = events
        .iter()
        .filter(|event| matches!(event, GameEvent::RailBuilt { .. }))
        .count();
    let rounds_won = events
        .iter()
        .filter(|event| matches!(event, GameEvent::RoundWinners { .. }))
        .count();
    println!(
        "seed {:>6}  winner {:<12} rails {:>3}  driving rounds {:>2}  credits {:?}",
        result.seed, result.winner, rails, rounds_won, result.credits
    );
}
