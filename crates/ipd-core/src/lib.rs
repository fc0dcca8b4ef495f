//! Core simulation engine for the Iterated Prisoner's Dilemma simulator.
//!
//! The crate covers the strategy decision model (built-in strategies plus a
//! rule interpreter for user-defined ones), the single-match engine with
//! noise and forgiveness, the tournament orchestrator (Round Robin, Single
//! Elimination, Group Stage + Knockout) and the per-strategy statistics
//! aggregator. Presentation, file persistence and log sinks live behind the
//! collaborator traits in [`persist`] and [`logging`]; the core never touches
//! the filesystem or a UI.

mod error;
mod game;
mod logging;
mod persist;
mod random;
mod registry;
mod rules;
mod stats;
mod strategy;
mod tournament;

pub use error::SimError;
pub use game::{run_match, MatchConfig, MatchState, Player, RoundData};
pub use logging::{LogError, MatchLogRecord, SimulationLog, TournamentLogRecord};
pub use persist::{CustomStrategyDef, StatsStore, StoreError, StrategyStore};
pub use random::{rng_from_entropy, rng_from_seed, SimRng};
pub use registry::{custom_id_for, StrategyRegistry};
pub use rules::{CompiledRules, CoopRateRule, LastMoveRule, RoundRule, RuleError, RuleSet};
pub use stats::{StatRecord, StatsAggregator};
pub use strategy::{history_string, BuiltIn, Move, Strategy, StrategyKind};
pub use tournament::{
    StandingEntry, TournamentConfig, TournamentFormat, TournamentReport, TournamentRunner,
};

/// Payoff for mutual cooperation (R).
pub const REWARD: u32 = 3;
/// Payoff for cooperating against a defector (S).
pub const SUCKER: u32 = 0;
/// Payoff for defecting against a cooperator (T).
pub const TEMPTATION: u32 = 5;
/// Payoff for mutual defection (P).
pub const PUNISHMENT: u32 = 1;

/// Default rounds per match.
pub const DEFAULT_ROUNDS: usize = 100;
/// Upper bound on rounds per match.
pub const MAX_ROUNDS: usize = 1000;
/// Upper bound of the noise/forgiveness input range, in percent.
pub const MAX_NOISE_FORGIVENESS_PERCENT: u8 = 20;

/// Payoff matrix for the Prisoner's Dilemma.
/// Returns (score_a, score_b).
pub fn payoff(a: Move, b: Move) -> (u32, u32) {
    match (a, b) {
        (Move::Cooperate, Move::Cooperate) => (REWARD, REWARD),
        (Move::Cooperate, Move::Defect) => (SUCKER, TEMPTATION),
        (Move::Defect, Move::Cooperate) => (TEMPTATION, SUCKER),
        (Move::Defect, Move::Defect) => (PUNISHMENT, PUNISHMENT),
    }
}

/// Convert a UI percentage (0..=20) into a probability.
///
/// Values outside the input range are rejected rather than clamped.
pub fn percent_to_probability(percent: f64) -> Result<f64, SimError> {
    if !(0.0..=MAX_NOISE_FORGIVENESS_PERCENT as f64).contains(&percent) {
        return Err(SimError::PercentOutOfRange(percent));
    }
    Ok(percent / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1, 1));
    }

    #[test]
    fn test_payoff_ordering() {
        // T > R > P > S
        assert!(TEMPTATION > REWARD);
        assert!(REWARD > PUNISHMENT);
        assert!(PUNISHMENT > SUCKER);
        // 2R > T + S, so mutual cooperation beats alternating exploitation
        assert!(2 * REWARD > TEMPTATION + SUCKER);
    }

    #[test]
    fn test_percent_conversion() {
        assert_eq!(percent_to_probability(0.0).unwrap(), 0.0);
        assert_eq!(percent_to_probability(20.0).unwrap(), 0.2);
        assert_eq!(percent_to_probability(5.0).unwrap(), 0.05);
        assert!(percent_to_probability(-1.0).is_err());
        assert!(percent_to_probability(20.5).is_err());
    }
}
