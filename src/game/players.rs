use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::board::EdgeKey;
use crate::config;

/// A participant for the whole game: identity, credit balance and the rail
/// network, keyed by normalized position pairs. Credits may go negative
/// through driving-phase penalties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub credits: i64,
    pub rails: HashSet<EdgeKey>,
    pub is_ai: bool,
}

impl PlayerState {
    pub fn new(name: impl Into<String>, is_ai: bool) -> Self {
        Self {
            name: name.into(),
            credits: config::STARTING_CREDITS,
            rails: HashSet::new(),
            is_ai,
        }
    }

    pub fn add_credits(&mut self, amount: i64) {
        self.credits += amount;
    }

    pub fn remove_credits(&mut self, amount: i64) {
        self.credits -= amount;
    }

    pub fn owns_rail(&self, key: &EdgeKey) -> bool {
        self.rails.contains(key)
    }
}
