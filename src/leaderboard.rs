//! Append-only leaderboard records: one CSV row per finished player with
//! name, human/AI flag, timestamp and final score.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;

const CSV_HEADER: &str = "PlayerName,AI,Timestamp,Score";

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed leaderboard entry on line {0}")]
    Malformed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub ai: bool,
    pub timestamp: String,
    pub score: i64,
}

/// Makes sure the CSV file exists with its header row, creating parent
/// directories as needed.
pub fn initialize_csv(path: &Path) -> Result<(), LeaderboardError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{CSV_HEADER}\n"))?;
    Ok(())
}

/// Appends one player's record. Commas in names are replaced to keep the
/// format line-parseable.
pub fn save_player_data(
    path: &Path,
    player_name: &str,
    score: i64,
    ai: bool,
) -> Result<(), LeaderboardError> {
    initialize_csv(path)?;
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let name = player_name.replace(',', ";");
    let mut file = OpenOptions::new().append(true).open(path)?;
    writeln!(file, "{name},{ai},{timestamp},{score}")?;
    Ok(())
}

pub fn load_leaderboard_data(path: &Path) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate().skip(1) {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(LeaderboardError::Malformed(index + 1));
        }
        let ai = fields[1]
            .parse::<bool>()
            .map_err(|_| LeaderboardError::Malformed(index + 1))?;
        let score = fields[3]
            .parse::<i64>()
            .map_err(|_| LeaderboardError::Malformed(index + 1))?;
        entries.push(LeaderboardEntry {
            player_name: fields[0].to_string(),
            ai,
            timestamp: fields[2].to_string(),
            score,
        });
    }
    Ok(entries)
}
