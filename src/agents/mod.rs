//! Reference player agents and the factory the simulation binary uses to
//! construct them from short codes.

mod greedy;
mod random;

pub use greedy::GreedyAgent;
pub use random::RandomAgent;

use crate::actors::{Agent, TurnContext};
use crate::game::PlayerAction;

pub struct CliAgent {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const CLI_AGENTS: &[CliAgent] = &[
    CliAgent {
        code: "G",
        name: "GreedyAgent",
        description: "Builds the cheapest affordable rail and drives straight for the target.",
    },
    CliAgent {
        code: "R",
        name: "RandomAgent",
        description: "Picks uniformly among its legal moves.",
    },
];

#[derive(Clone)]
pub enum AgentInstance {
    Greedy(GreedyAgent),
    Random(RandomAgent),
}

impl Agent for AgentInstance {
    fn act(&mut self, context: &TurnContext) -> PlayerAction {
        match self {
            AgentInstance::Greedy(agent) => agent.act(context),
            AgentInstance::Random(agent) => agent.act(context),
        }
    }
}

/// Compile-time registered factory keyed by the agent code.
pub fn create_agent(code: &str, seed: u64) -> Option<AgentInstance> {
    match code {
        "G" => Some(AgentInstance::Greedy(GreedyAgent)),
        "R" => Some(AgentInstance::Random(RandomAgent::new(seed))),
        _ => None,
    }
}

pub fn print_agent_help() {
    println!("Agent Legend:");
    println!("{:<5} {:<15} {}", "CODE", "AGENT", "DESCRIPTION");
    println!("{}", "-".repeat(72));
    for agent in CLI_AGENTS {
        println!("{:<5} {:<15} {}", agent.code, agent.name, agent.description);
    }
}
