//! Declarative rule sets for user-defined strategies.
//!
//! A rule set is data, not code: it is interpreted at decision time, which
//! keeps custom strategies serializable and inspectable. Rules are evaluated
//! in a fixed priority order and the first applicable rule wins. Compilation
//! validates the structure up front so a broken definition fails before the
//! strategy is ever used in a match.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::random::SimRng;
use crate::strategy::Move;

/// Responses to the opponent's last move. Either branch may be left unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMoveRule {
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub on_cooperate: Option<Move>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub on_defect: Option<Move>,
}

/// Fires when the opponent's cooperation rate over its full history so far is
/// strictly below `percent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoopRateRule {
    #[serde(rename = "value")]
    pub percent: u8,
    #[serde(rename = "move")]
    pub response: Move,
}

/// Fires when the 0-based round index is strictly greater than `round`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRule {
    #[serde(rename = "value")]
    pub round: usize,
    #[serde(rename = "move")]
    pub response: Move,
}

/// An ordered rule set: up to three conditional rules plus a default move.
///
/// The serialized form matches the persisted custom-strategy schema, with
/// the rule keys `opp_last_move`, `opp_coop_lt` and `round_gt`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(rename = "opp_last_move", default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<LastMoveRule>,
    #[serde(rename = "opp_coop_lt", default, skip_serializing_if = "Option::is_none")]
    pub coop_rate_below: Option<CoopRateRule>,
    #[serde(rename = "round_gt", default, skip_serializing_if = "Option::is_none")]
    pub round_greater_than: Option<RoundRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Move>,
}

/// Structural problems caught when compiling a rule set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule set has no default move")]
    MissingDefault,
    #[error("cooperation-rate threshold {0}% exceeds 100%")]
    ThresholdOutOfRange(u8),
}

impl RuleSet {
    /// Validate the rule set into an executable form.
    pub fn compile(self) -> Result<CompiledRules, RuleError> {
        let default = self.default.ok_or(RuleError::MissingDefault)?;
        if let Some(rule) = &self.coop_rate_below {
            if rule.percent > 100 {
                return Err(RuleError::ThresholdOutOfRange(rule.percent));
            }
        }
        Ok(CompiledRules { rules: self, default })
    }
}

/// A validated rule set ready for decision-time interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledRules {
    rules: RuleSet,
    default: Move,
}

impl CompiledRules {
    /// The source rule set, for display and persistence.
    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    pub fn default_move(&self) -> Move {
        self.default
    }

    /// Evaluate the rules for one round.
    ///
    /// Priority is strict: once opponent history exists, a present last-move
    /// rule consumes its slot even when the matching branch is unset, and
    /// lower rules are not consulted. Forgiveness can override a Defect
    /// selected by a conditional rule; a Defect reached through the default
    /// fallback is never forgiven.
    pub fn decide(
        &self,
        _own: &[Move],
        opponent: &[Move],
        round: usize,
        forgiveness: f64,
        rng: &mut SimRng,
    ) -> Move {
        let mut chosen = self.default;
        let mut rule_defected = false;

        let has_history = !opponent.is_empty();
        if let Some(rule) = self.rules.last_move.as_ref().filter(|_| has_history) {
            let target = match opponent[opponent.len() - 1] {
                Move::Cooperate => rule.on_cooperate,
                Move::Defect => rule.on_defect,
            };
            if let Some(m) = target {
                chosen = m;
                rule_defected = m == Move::Defect;
            }
        } else if let Some(rule) = self.rules.coop_rate_below.as_ref().filter(|_| has_history) {
            let coop = opponent.iter().filter(|m| **m == Move::Cooperate).count();
            let rate = coop as f64 / opponent.len() as f64 * 100.0;
            if rate < rule.percent as f64 {
                chosen = rule.response;
                rule_defected = rule.response == Move::Defect;
            }
        } else if let Some(rule) = &self.rules.round_greater_than {
            if round > rule.round {
                chosen = rule.response;
                rule_defected = rule.response == Move::Defect;
            }
        }

        if chosen == Move::Defect && rule_defected && rng.gen::<f64>() < forgiveness {
            return Move::Cooperate;
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::rng_from_seed;

    const C: Move = Move::Cooperate;
    const D: Move = Move::Defect;

    fn mirror_rules() -> CompiledRules {
        RuleSet {
            last_move: Some(LastMoveRule {
                on_cooperate: Some(C),
                on_defect: Some(D),
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap()
    }

    #[test]
    fn test_missing_default_rejected() {
        let err = RuleSet {
            last_move: Some(LastMoveRule {
                on_cooperate: Some(C),
                on_defect: None,
            }),
            ..Default::default()
        }
        .compile()
        .unwrap_err();
        assert_eq!(err, RuleError::MissingDefault);
    }

    #[test]
    fn test_threshold_over_100_rejected() {
        let err = RuleSet {
            coop_rate_below: Some(CoopRateRule {
                percent: 101,
                response: D,
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap_err();
        assert_eq!(err, RuleError::ThresholdOutOfRange(101));
    }

    #[test]
    fn test_default_only_rule_set_is_valid() {
        let rules = RuleSet {
            default: Some(D),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[], &[], 0, 0.0, &mut rng), D);
    }

    #[test]
    fn test_last_move_rule_mirrors() {
        let rules = mirror_rules();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[], &[], 0, 0.0, &mut rng), C); // no history, default
        assert_eq!(rules.decide(&[C], &[C], 1, 0.0, &mut rng), C);
        assert_eq!(rules.decide(&[C], &[D], 1, 0.0, &mut rng), D);
    }

    #[test]
    fn test_priority_last_move_beats_coop_rate() {
        // Both rules would match; the last-move rule must win.
        let rules = RuleSet {
            last_move: Some(LastMoveRule {
                on_cooperate: None,
                on_defect: Some(C),
            }),
            coop_rate_below: Some(CoopRateRule {
                percent: 100,
                response: D,
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[C], &[D], 1, 0.0, &mut rng), C);
    }

    #[test]
    fn test_last_move_rule_shadows_even_when_branch_unset() {
        // The last-move rule has no C branch; with history present the
        // lower-priority rules still never run.
        let rules = RuleSet {
            last_move: Some(LastMoveRule {
                on_cooperate: None,
                on_defect: Some(D),
            }),
            coop_rate_below: Some(CoopRateRule {
                percent: 100,
                response: D,
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[C], &[C], 1, 0.0, &mut rng), C);
    }

    #[test]
    fn test_coop_rate_rule() {
        let rules = RuleSet {
            coop_rate_below: Some(CoopRateRule {
                percent: 50,
                response: D,
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        // 1/3 cooperation is below 50%
        assert_eq!(rules.decide(&[C; 3], &[C, D, D], 3, 0.0, &mut rng), D);
        // exactly 50% is not strictly below
        assert_eq!(rules.decide(&[C; 2], &[C, D], 2, 0.0, &mut rng), C);
    }

    #[test]
    fn test_round_rule() {
        let rules = RuleSet {
            round_greater_than: Some(RoundRule {
                round: 5,
                response: D,
            }),
            default: Some(C),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[], &[], 5, 0.0, &mut rng), C);
        assert_eq!(rules.decide(&[], &[], 6, 0.0, &mut rng), D);
    }

    #[test]
    fn test_rule_defect_is_forgivable() {
        let rules = mirror_rules();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[C], &[D], 1, 1.0, &mut rng), C);
    }

    #[test]
    fn test_default_defect_never_forgiven() {
        let rules = RuleSet {
            default: Some(D),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        for round in 0..20 {
            assert_eq!(rules.decide(&[], &[], round, 1.0, &mut rng), D);
        }
    }

    #[test]
    fn test_unmatched_rule_defect_default_not_forgiven() {
        // A defecting default behind a non-matching rule is still a default.
        let rules = RuleSet {
            round_greater_than: Some(RoundRule {
                round: 100,
                response: C,
            }),
            default: Some(D),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut rng = rng_from_seed(1);
        assert_eq!(rules.decide(&[C], &[D], 1, 1.0, &mut rng), D);
    }

    #[test]
    fn test_serde_round_trip_matches_schema() {
        let rules = RuleSet {
            last_move: Some(LastMoveRule {
                on_cooperate: Some(C),
                on_defect: Some(D),
            }),
            coop_rate_below: Some(CoopRateRule {
                percent: 40,
                response: D,
            }),
            round_greater_than: None,
            default: Some(C),
        };
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["opp_last_move"]["C"], "C");
        assert_eq!(json["opp_coop_lt"]["value"], 40);
        assert_eq!(json["opp_coop_lt"]["move"], "D");
        assert_eq!(json["default"], "C");
        let back: RuleSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, rules);
    }
}
