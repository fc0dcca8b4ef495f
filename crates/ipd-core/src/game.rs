//! Match execution engine.
//!
//! A match is a finite, non-restartable sequence of rounds between two
//! players. The engine owns all mutation of [`MatchState`]: per round it
//! collects both decisions, applies noise independently to each, looks up the
//! payoffs for the actual moves and appends histories and scores atomically.
//! `step` exists so a presentation layer can interleave rounds with its own
//! rendering loop; `run_match` drives a match to completion in one call.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::payoff;
use crate::random::SimRng;
use crate::strategy::{history_string, Move, Strategy};
use crate::{DEFAULT_ROUNDS, MAX_ROUNDS};

/// Per-match parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Number of rounds to play.
    pub rounds: usize,
    /// Chance that an intended move is inverted, per player per round.
    pub noise: f64,
    /// Chance that a punitive Defect decision is overridden to Cooperate.
    pub forgiveness: f64,
}

impl MatchConfig {
    pub fn new(rounds: usize) -> Self {
        MatchConfig {
            rounds,
            noise: 0.0,
            forgiveness: 0.0,
        }
    }

    /// Reject out-of-range parameters before any simulation work happens.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.rounds == 0 {
            return Err(SimError::NoRounds);
        }
        if self.rounds > MAX_ROUNDS {
            return Err(SimError::TooManyRounds(self.rounds));
        }
        check_probability("noise", self.noise)?;
        check_probability("forgiveness", self.forgiveness)?;
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig::new(DEFAULT_ROUNDS)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), SimError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::ProbabilityOutOfRange { name, value });
    }
    Ok(())
}

/// Moves and payoffs recorded for one completed round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    pub move_a: Move,
    pub move_b: Move,
    pub payoff_a: u32,
    pub payoff_b: u32,
}

/// One side of a match.
///
/// Automated players consult a strategy; manual players replay a move
/// supplied from outside (the sandbox UI). The engine drives both through
/// the same decision contract and never branches on which is which beyond
/// this enum.
#[derive(Clone, Debug)]
pub enum Player<'a> {
    Automated(&'a Strategy),
    Manual { pending: Option<Move> },
}

impl<'a> Player<'a> {
    pub fn manual() -> Player<'static> {
        Player::Manual { pending: None }
    }

    /// Queue the next move for a manual player. No-op for automated ones.
    pub fn supply_move(&mut self, m: Move) {
        if let Player::Manual { pending } = self {
            *pending = Some(m);
        }
    }

    fn ensure_ready(&self, round: usize) -> Result<(), SimError> {
        match self {
            Player::Automated(_) => Ok(()),
            Player::Manual { pending: Some(_) } => Ok(()),
            Player::Manual { pending: None } => Err(SimError::MissingManualMove(round)),
        }
    }

    fn next_move(
        &mut self,
        own: &[Move],
        opponent: &[Move],
        round: usize,
        forgiveness: f64,
        rng: &mut SimRng,
    ) -> Result<Move, SimError> {
        match self {
            Player::Automated(strategy) => {
                Ok(strategy.decide(own, opponent, round, forgiveness, rng))
            }
            Player::Manual { pending } => pending.take().ok_or(SimError::MissingManualMove(round)),
        }
    }
}

/// The full state of one match.
///
/// Mutable only through [`MatchState::step`]; once the configured round count
/// is reached the state is frozen and further steps fail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    id_a: String,
    id_b: String,
    config: MatchConfig,
    history_a: Vec<Move>,
    history_b: Vec<Move>,
    score_a: u32,
    score_b: u32,
}

impl MatchState {
    pub fn new(
        id_a: impl Into<String>,
        id_b: impl Into<String>,
        config: MatchConfig,
    ) -> Result<Self, SimError> {
        config.validate()?;
        Ok(MatchState {
            id_a: id_a.into(),
            id_b: id_b.into(),
            config,
            history_a: Vec::with_capacity(config.rounds),
            history_b: Vec::with_capacity(config.rounds),
            score_a: 0,
            score_b: 0,
        })
    }

    pub fn id_a(&self) -> &str {
        &self.id_a
    }

    pub fn id_b(&self) -> &str {
        &self.id_b
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn score_a(&self) -> u32 {
        self.score_a
    }

    pub fn score_b(&self) -> u32 {
        self.score_b
    }

    pub fn history_a(&self) -> &[Move] {
        &self.history_a
    }

    pub fn history_b(&self) -> &[Move] {
        &self.history_b
    }

    pub fn rounds_played(&self) -> usize {
        self.history_a.len()
    }

    pub fn is_complete(&self) -> bool {
        self.history_a.len() >= self.config.rounds
    }

    /// The histories as "CCD..." strings, for the log records.
    pub fn history_strings(&self) -> (String, String) {
        (history_string(&self.history_a), history_string(&self.history_b))
    }

    /// Moves and payoffs of a completed round, or None when out of range.
    pub fn round_data(&self, round: usize) -> Option<RoundData> {
        let move_a = *self.history_a.get(round)?;
        let move_b = *self.history_b.get(round)?;
        let (payoff_a, payoff_b) = payoff(move_a, move_b);
        Some(RoundData {
            move_a,
            move_b,
            payoff_a,
            payoff_b,
        })
    }

    /// Advance the match by exactly one round.
    ///
    /// Both players must be ready before any randomness is drawn, so a
    /// missing manual move can be supplied and the step retried without
    /// perturbing the sequence.
    pub fn step(
        &mut self,
        player_a: &mut Player<'_>,
        player_b: &mut Player<'_>,
        rng: &mut SimRng,
    ) -> Result<RoundData, SimError> {
        if self.is_complete() {
            return Err(SimError::MatchComplete(self.config.rounds));
        }
        let round = self.history_a.len();
        player_a.ensure_ready(round)?;
        player_b.ensure_ready(round)?;

        let intended_a = player_a.next_move(
            &self.history_a,
            &self.history_b,
            round,
            self.config.forgiveness,
            rng,
        )?;
        let intended_b = player_b.next_move(
            &self.history_b,
            &self.history_a,
            round,
            self.config.forgiveness,
            rng,
        )?;

        let actual_a = apply_noise(intended_a, self.config.noise, rng);
        let actual_b = apply_noise(intended_b, self.config.noise, rng);

        let (payoff_a, payoff_b) = payoff(actual_a, actual_b);
        self.history_a.push(actual_a);
        self.history_b.push(actual_b);
        self.score_a += payoff_a;
        self.score_b += payoff_b;

        Ok(RoundData {
            move_a: actual_a,
            move_b: actual_b,
            payoff_a,
            payoff_b,
        })
    }
}

fn apply_noise(intended: Move, noise: f64, rng: &mut SimRng) -> Move {
    // One draw per player per round, even at zero noise, so the random
    // sequence does not depend on the noise setting.
    if rng.gen::<f64>() < noise {
        intended.flip()
    } else {
        intended
    }
}

/// Run a complete match between two strategies.
pub fn run_match(
    strategy_a: &Strategy,
    strategy_b: &Strategy,
    config: MatchConfig,
    rng: &mut SimRng,
) -> Result<MatchState, SimError> {
    let mut state = MatchState::new(strategy_a.id.clone(), strategy_b.id.clone(), config)?;
    let mut player_a = Player::Automated(strategy_a);
    let mut player_b = Player::Automated(strategy_b);
    while !state.is_complete() {
        state.step(&mut player_a, &mut player_b, rng)?;
    }
    Ok(state)
}
