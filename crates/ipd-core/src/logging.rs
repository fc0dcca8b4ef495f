//! Structured records for the logging collaborator.
//!
//! The core hands a record to the sink after every completed match and after
//! every tournament; how the sink stores them (spreadsheet, file, nothing) is
//! its own business. Sink failures are reported back as errors so the caller
//! can warn instead of silently dropping them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::MatchState;
use crate::strategy::Strategy;
use crate::tournament::StandingEntry;

/// Why a log sink rejected a record.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log sink unavailable: {0}")]
    Sink(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One completed match, in the shape the spreadsheet log expects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchLogRecord {
    pub timestamp: DateTime<Utc>,
    /// Context label, e.g. "Single Game" or "Tournament Round Robin".
    pub context: String,
    pub tournament_id: Option<String>,
    pub tournament_type: Option<String>,
    pub p1_id: String,
    pub p1_name: String,
    pub p2_id: String,
    pub p2_name: String,
    pub rounds: usize,
    pub noise_percent: f64,
    pub forgiveness_percent: f64,
    pub p1_score: u32,
    pub p2_score: u32,
    /// None on a draw.
    pub winner_id: Option<String>,
    pub p1_history: String,
    pub p2_history: String,
}

impl MatchLogRecord {
    /// Build a record from a finished match.
    pub fn from_match(
        context: &str,
        tournament: Option<(&str, &str)>,
        p1: &Strategy,
        p2: &Strategy,
        state: &MatchState,
    ) -> Self {
        let (p1_history, p2_history) = state.history_strings();
        let winner_id = match state.score_a().cmp(&state.score_b()) {
            std::cmp::Ordering::Greater => Some(p1.id.clone()),
            std::cmp::Ordering::Less => Some(p2.id.clone()),
            std::cmp::Ordering::Equal => None,
        };
        MatchLogRecord {
            timestamp: Utc::now(),
            context: context.to_string(),
            tournament_id: tournament.map(|(id, _)| id.to_string()),
            tournament_type: tournament.map(|(_, kind)| kind.to_string()),
            p1_id: p1.id.clone(),
            p1_name: p1.name.clone(),
            p2_id: p2.id.clone(),
            p2_name: p2.name.clone(),
            rounds: state.config().rounds,
            noise_percent: state.config().noise * 100.0,
            forgiveness_percent: state.config().forgiveness * 100.0,
            p1_score: state.score_a(),
            p2_score: state.score_b(),
            winner_id,
            p1_history,
            p2_history,
        }
    }
}

/// Summary of one finished tournament.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TournamentLogRecord {
    pub tournament_id: String,
    pub tournament_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub participants: Vec<String>,
    pub rounds_per_game: usize,
    pub noise_percent: f64,
    pub forgiveness_percent: f64,
    pub winner_id: String,
    pub standings: Vec<StandingEntry>,
}

/// The logging collaborator contract.
pub trait SimulationLog {
    fn match_completed(&mut self, record: &MatchLogRecord) -> Result<(), LogError>;
    fn tournament_completed(&mut self, record: &TournamentLogRecord) -> Result<(), LogError>;
}
