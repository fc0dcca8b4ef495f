//! Error taxonomy for the simulation core.
//!
//! Validation and lookup failures live in [`SimError`]; rule-set compilation
//! has its own [`RuleError`] (raised before a custom strategy is usable) and
//! converts into `SimError` at the registry boundary.

use thiserror::Error;

pub use crate::rules::RuleError;

/// Errors surfaced by the match engine, the registry and the tournament
/// orchestrator. None of these are swallowed internally; callers decide how
/// to report them.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("at least 2 participants are required, got {0}")]
    TooFewParticipants(usize),

    #[error("{name} probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("percentage {0} is outside the 0-20% input range")]
    PercentOutOfRange(f64),

    #[error("a match needs at least one round")]
    NoRounds,

    #[error("rounds {0} exceeds the 1000-round cap")]
    TooManyRounds(usize),

    #[error("group count must be at least 1")]
    NoGroups,

    #[error("{participants} participants cannot fill {groups} groups of at least 2")]
    TooFewForGroups { participants: usize, groups: usize },

    #[error("{qualifiers} qualifier(s) per group across {groups} group(s) leaves fewer than 2 knockout entrants")]
    TooFewQualifiers { qualifiers: usize, groups: usize },

    #[error("unknown strategy id `{0}`")]
    UnknownStrategy(String),

    #[error("strategy name `{0}` has no usable characters")]
    InvalidStrategyName(String),

    #[error("match already ran its {0} rounds")]
    MatchComplete(usize),

    #[error("manual player has no move queued for round {0}")]
    MissingManualMove(usize),

    #[error("tournament cancelled after {completed} completed match(es)")]
    Cancelled { completed: usize },

    #[error(transparent)]
    Rule(#[from] RuleError),
}
