//! Strategy definitions and decision logic.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::random::SimRng;
use crate::rules::CompiledRules;
use crate::{payoff, PUNISHMENT, REWARD};

/// A move in the Prisoner's Dilemma.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    #[serde(rename = "C")]
    Cooperate,
    #[serde(rename = "D")]
    Defect,
}

impl Move {
    /// The opposite move, used when noise inverts a decision.
    pub fn flip(self) -> Move {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Move::Cooperate => 'C',
            Move::Defect => 'D',
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Render a history as the "CCDDC" string form used by the log records.
pub fn history_string(moves: &[Move]) -> String {
    moves.iter().map(|m| m.as_char()).collect()
}

/// The built-in strategy behaviors, fixed at process start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltIn {
    AlwaysCooperate,
    AlwaysDefect,
    TitForTat,
    Grudger,
    Random,
    TitForTwoTats,
    SuspiciousTitForTat,
    GenerousTitForTat,
    Pavlov,
    Prober,
    Majority,
}

impl BuiltIn {
    /// Every built-in, in registry display order.
    pub const ALL: [BuiltIn; 11] = [
        BuiltIn::AlwaysCooperate,
        BuiltIn::AlwaysDefect,
        BuiltIn::TitForTat,
        BuiltIn::Grudger,
        BuiltIn::Random,
        BuiltIn::TitForTwoTats,
        BuiltIn::SuspiciousTitForTat,
        BuiltIn::GenerousTitForTat,
        BuiltIn::Pavlov,
        BuiltIn::Prober,
        BuiltIn::Majority,
    ];

    /// Stable identifier used by the registry, statistics and persistence.
    pub fn id(self) -> &'static str {
        match self {
            BuiltIn::AlwaysCooperate => "cooperate",
            BuiltIn::AlwaysDefect => "defect",
            BuiltIn::TitForTat => "tit_for_tat",
            BuiltIn::Grudger => "grudger",
            BuiltIn::Random => "random",
            BuiltIn::TitForTwoTats => "tit_for_two_tats",
            BuiltIn::SuspiciousTitForTat => "suspicious_tft",
            BuiltIn::GenerousTitForTat => "generous_tft_10",
            BuiltIn::Pavlov => "pavlov",
            BuiltIn::Prober => "prober",
            BuiltIn::Majority => "majority",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BuiltIn::AlwaysCooperate => "Always Cooperate",
            BuiltIn::AlwaysDefect => "Always Defect",
            BuiltIn::TitForTat => "Tit for Tat (TFT)",
            BuiltIn::Grudger => "Grudger",
            BuiltIn::Random => "Random",
            BuiltIn::TitForTwoTats => "Tit for Two Tats",
            BuiltIn::SuspiciousTitForTat => "Suspicious TFT",
            BuiltIn::GenerousTitForTat => "Generous TFT (10%)",
            BuiltIn::Pavlov => "Pavlov (Win-Stay, Lose-Shift)",
            BuiltIn::Prober => "Prober",
            BuiltIn::Majority => "Majority",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BuiltIn::AlwaysCooperate => "Always chooses to cooperate.",
            BuiltIn::AlwaysDefect => "Always chooses to defect.",
            BuiltIn::TitForTat => "Starts C, mirrors opponent's last move.",
            BuiltIn::Grudger => "Starts C, defects forever after first D.",
            BuiltIn::Random => "Chooses C/D randomly (50/50).",
            BuiltIn::TitForTwoTats => "Starts C, defects only after two consecutive Ds.",
            BuiltIn::SuspiciousTitForTat => "Starts D, then mirrors opponent's last move.",
            BuiltIn::GenerousTitForTat => "Like TFT, but 10% chance to C when it should D.",
            BuiltIn::Pavlov => "Repeats last move if payoff was good (R/P), else switches.",
            BuiltIn::Prober => {
                "Starts D, C, C. If opponent cooperated during the probe, plays TFT. Else, always defects."
            }
            BuiltIn::Majority => "Plays opponent's most frequent past move (C on tie).",
        }
    }

    pub fn pros_cons(self) -> &'static str {
        match self {
            BuiltIn::AlwaysCooperate => "Pros: Simple, good with cooperators.\nCons: Exploitable.",
            BuiltIn::AlwaysDefect => "Pros: Exploits cooperators.\nCons: Poor mutual defection.",
            BuiltIn::TitForTat => "Pros: Robust, retaliates, forgives.\nCons: Noise sensitivity.",
            BuiltIn::Grudger => "Pros: Strong deterrent.\nCons: Unforgiving.",
            BuiltIn::Random => "Pros: Unpredictable.\nCons: Inconsistent.",
            BuiltIn::TitForTwoTats => "Pros: More forgiving than TFT.\nCons: Slower to punish.",
            BuiltIn::SuspiciousTitForTat => {
                "Pros: Avoids first-move sucker.\nCons: Can initiate conflict."
            }
            BuiltIn::GenerousTitForTat => {
                "Pros: Breaks mutual defection.\nCons: Slightly exploitable."
            }
            BuiltIn::Pavlov => "Pros: Corrects mistakes, exploits AllC.\nCons: Complex cycles possible.",
            BuiltIn::Prober => "Pros: Tests opponent.\nCons: Initial D can be bad.",
            BuiltIn::Majority => "Pros: Adapts to overall behavior.\nCons: Slow reaction, exploitable.",
        }
    }

    pub fn analogue(self) -> &'static str {
        match self {
            BuiltIn::AlwaysCooperate => "Altruism.",
            BuiltIn::AlwaysDefect => "Aggression.",
            BuiltIn::TitForTat => "Reciprocity.",
            BuiltIn::Grudger => "Zero tolerance.",
            BuiltIn::Random => "Capriciousness.",
            BuiltIn::TitForTwoTats => "Second chances.",
            BuiltIn::SuspiciousTitForTat => "Initial distrust.",
            BuiltIn::GenerousTitForTat => "Occasional forgiveness.",
            BuiltIn::Pavlov => "Reinforcement learning.",
            BuiltIn::Prober => "Testing the waters.",
            BuiltIn::Majority => "Judging by reputation.",
        }
    }

    /// Choose a move given the histories so far.
    ///
    /// `own` and `opponent` hold the actual (post-noise) moves of completed
    /// rounds; `round` is the 0-based index of the round being decided.
    pub fn decide(
        self,
        own: &[Move],
        opponent: &[Move],
        round: usize,
        forgiveness: f64,
        rng: &mut SimRng,
    ) -> Move {
        match self {
            BuiltIn::AlwaysCooperate => Move::Cooperate,
            BuiltIn::AlwaysDefect => Move::Defect,
            BuiltIn::TitForTat => tit_for_tat(opponent, forgiveness, rng),
            BuiltIn::Grudger => grudger(opponent, forgiveness, rng),
            BuiltIn::Random => {
                if rng.gen::<bool>() {
                    Move::Cooperate
                } else {
                    Move::Defect
                }
            }
            BuiltIn::TitForTwoTats => tit_for_two_tats(opponent, forgiveness, rng),
            BuiltIn::SuspiciousTitForTat => match opponent.last() {
                None => Move::Defect,
                Some(_) => tit_for_tat(opponent, forgiveness, rng),
            },
            BuiltIn::GenerousTitForTat => generous_tit_for_tat(opponent, forgiveness, rng),
            BuiltIn::Pavlov => pavlov(own, opponent, round, forgiveness, rng),
            BuiltIn::Prober => prober(opponent, round, forgiveness, rng),
            BuiltIn::Majority => majority(opponent, forgiveness, rng),
        }
    }
}

/// Tit for Tat: mirror the opponent's last move, cooperate first. A mirrored
/// Defect can be overridden to Cooperate with probability `forgiveness`.
fn tit_for_tat(opponent: &[Move], forgiveness: f64, rng: &mut SimRng) -> Move {
    match opponent.last() {
        None => Move::Cooperate,
        Some(Move::Defect) if rng.gen::<f64>() < forgiveness => Move::Cooperate,
        Some(last) => *last,
    }
}

/// Grudger: cooperate until the opponent has ever defected, then defect
/// forever. The forgiveness draw only happens while the opponent's last move
/// is still a Defect.
fn grudger(opponent: &[Move], forgiveness: f64, rng: &mut SimRng) -> Move {
    if opponent.contains(&Move::Defect) {
        if opponent.last() == Some(&Move::Defect) && rng.gen::<f64>() < forgiveness {
            return Move::Cooperate;
        }
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Tit for Two Tats: defect only after two consecutive opponent defections.
fn tit_for_two_tats(opponent: &[Move], forgiveness: f64, rng: &mut SimRng) -> Move {
    if opponent.len() < 2 {
        return Move::Cooperate;
    }
    let last_two = &opponent[opponent.len() - 2..];
    if last_two == [Move::Defect, Move::Defect] {
        if rng.gen::<f64>() < forgiveness {
            return Move::Cooperate;
        }
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Generous TFT: the fixed 10% generosity draw happens first, then the
/// configured forgiveness draw, as two independent chances.
fn generous_tit_for_tat(opponent: &[Move], forgiveness: f64, rng: &mut SimRng) -> Move {
    match opponent.last() {
        None => Move::Cooperate,
        Some(Move::Cooperate) => Move::Cooperate,
        Some(Move::Defect) => {
            if rng.gen::<f64>() < 0.10 {
                return Move::Cooperate;
            }
            if rng.gen::<f64>() < forgiveness {
                return Move::Cooperate;
            }
            Move::Defect
        }
    }
}

/// Pavlov: repeat the last move after Reward or Punishment, flip it after
/// Sucker or Temptation. Forgiveness applies only to the Punishment-repeat
/// case (which would otherwise repeat a Defect).
fn pavlov(
    own: &[Move],
    opponent: &[Move],
    round: usize,
    forgiveness: f64,
    rng: &mut SimRng,
) -> Move {
    if round == 0 {
        return Move::Cooperate;
    }
    let my_last = own[own.len() - 1];
    let opp_last = opponent[opponent.len() - 1];
    let (last_payoff, _) = payoff(my_last, opp_last);
    if last_payoff == REWARD || last_payoff == PUNISHMENT {
        if last_payoff == PUNISHMENT && rng.gen::<f64>() < forgiveness {
            return Move::Cooperate;
        }
        my_last
    } else {
        my_last.flip()
    }
}

/// Prober: D, C, C on rounds 0-2, then TFT if the opponent cooperated on both
/// probe rounds (indices 1 and 2), otherwise defect unconditionally.
fn prober(opponent: &[Move], round: usize, forgiveness: f64, rng: &mut SimRng) -> Move {
    match round {
        0 => Move::Defect,
        1 | 2 => Move::Cooperate,
        _ => {
            if opponent.len() >= 3 {
                if opponent[1] == Move::Cooperate && opponent[2] == Move::Cooperate {
                    tit_for_tat(opponent, forgiveness, rng)
                } else {
                    Move::Defect
                }
            } else {
                Move::Defect
            }
        }
    }
}

/// Majority: play the opponent's most frequent past move, cooperating on an
/// exact tie or with no history.
fn majority(opponent: &[Move], forgiveness: f64, rng: &mut SimRng) -> Move {
    if opponent.is_empty() {
        return Move::Cooperate;
    }
    let coop = opponent.iter().filter(|m| **m == Move::Cooperate).count();
    let defect = opponent.len() - coop;
    if coop > defect {
        Move::Cooperate
    } else if defect > coop {
        if rng.gen::<f64>() < forgiveness {
            return Move::Cooperate;
        }
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// How a strategy makes its decisions.
#[derive(Clone, Debug)]
pub enum StrategyKind {
    BuiltIn(BuiltIn),
    Custom(CompiledRules),
}

/// A strategy with its identity and display metadata.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pros_cons: String,
    pub analogue: String,
    pub kind: StrategyKind,
}

impl Strategy {
    pub fn built_in(behavior: BuiltIn) -> Strategy {
        Strategy {
            id: behavior.id().to_string(),
            name: behavior.display_name().to_string(),
            description: behavior.description().to_string(),
            pros_cons: behavior.pros_cons().to_string(),
            analogue: behavior.analogue().to_string(),
            kind: StrategyKind::BuiltIn(behavior),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, StrategyKind::Custom(_))
    }

    /// The rule set behind a custom strategy, if any.
    pub fn rules(&self) -> Option<&CompiledRules> {
        match &self.kind {
            StrategyKind::Custom(rules) => Some(rules),
            StrategyKind::BuiltIn(_) => None,
        }
    }

    /// Decide a move for the given round.
    pub fn decide(
        &self,
        own: &[Move],
        opponent: &[Move],
        round: usize,
        forgiveness: f64,
        rng: &mut SimRng,
    ) -> Move {
        match &self.kind {
            StrategyKind::BuiltIn(behavior) => behavior.decide(own, opponent, round, forgiveness, rng),
            StrategyKind::Custom(rules) => rules.decide(own, opponent, round, forgiveness, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::rng_from_seed;

    const C: Move = Move::Cooperate;
    const D: Move = Move::Defect;

    fn decide(b: BuiltIn, own: &[Move], opp: &[Move], round: usize) -> Move {
        let mut rng = rng_from_seed(42);
        b.decide(own, opp, round, 0.0, &mut rng)
    }

    fn decide_forgiving(b: BuiltIn, own: &[Move], opp: &[Move], round: usize) -> Move {
        // forgiveness 1.0 makes every forgiveness draw succeed
        let mut rng = rng_from_seed(42);
        b.decide(own, opp, round, 1.0, &mut rng)
    }

    #[test]
    fn test_opening_moves() {
        // Round 0 with empty histories, per the strategy table
        assert_eq!(decide(BuiltIn::AlwaysCooperate, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::AlwaysDefect, &[], &[], 0), D);
        assert_eq!(decide(BuiltIn::TitForTat, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::Grudger, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::TitForTwoTats, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::SuspiciousTitForTat, &[], &[], 0), D);
        assert_eq!(decide(BuiltIn::GenerousTitForTat, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::Pavlov, &[], &[], 0), C);
        assert_eq!(decide(BuiltIn::Prober, &[], &[], 0), D);
        assert_eq!(decide(BuiltIn::Majority, &[], &[], 0), C);
    }

    #[test]
    fn test_tit_for_tat_mirrors() {
        assert_eq!(decide(BuiltIn::TitForTat, &[C], &[C], 1), C);
        assert_eq!(decide(BuiltIn::TitForTat, &[C], &[D], 1), D);
    }

    #[test]
    fn test_tit_for_tat_forgives() {
        assert_eq!(decide_forgiving(BuiltIn::TitForTat, &[C], &[D], 1), C);
        // forgiveness never upgrades a mirrored Cooperate
        assert_eq!(decide_forgiving(BuiltIn::TitForTat, &[C], &[C], 1), C);
    }

    #[test]
    fn test_grudger_holds_grudge() {
        assert_eq!(decide(BuiltIn::Grudger, &[C, C], &[C, C], 2), C);
        assert_eq!(decide(BuiltIn::Grudger, &[C, C], &[D, C], 2), D);
        assert_eq!(decide(BuiltIn::Grudger, &[C, C], &[C, D], 2), D);
    }

    #[test]
    fn test_grudger_forgives_only_on_trailing_defect() {
        assert_eq!(decide_forgiving(BuiltIn::Grudger, &[C, C], &[C, D], 2), C);
        // the grudge itself is not forgiven once the opponent is back to C
        assert_eq!(decide_forgiving(BuiltIn::Grudger, &[C, C], &[D, C], 2), D);
    }

    #[test]
    fn test_tit_for_two_tats() {
        assert_eq!(decide(BuiltIn::TitForTwoTats, &[C], &[D], 1), C);
        assert_eq!(decide(BuiltIn::TitForTwoTats, &[C, C], &[C, D], 2), C);
        assert_eq!(decide(BuiltIn::TitForTwoTats, &[C, C], &[D, D], 2), D);
        assert_eq!(decide_forgiving(BuiltIn::TitForTwoTats, &[C, C], &[D, D], 2), C);
    }

    #[test]
    fn test_suspicious_tft_mirrors_after_opening() {
        assert_eq!(decide(BuiltIn::SuspiciousTitForTat, &[D], &[C], 1), C);
        assert_eq!(decide(BuiltIn::SuspiciousTitForTat, &[D], &[D], 1), D);
    }

    #[test]
    fn test_generous_tft_statistical() {
        // With no forgiveness the 10% generosity should fire sometimes but
        // not often over many draws.
        let mut rng = rng_from_seed(7);
        let mut coops = 0;
        for _ in 0..1000 {
            if BuiltIn::GenerousTitForTat.decide(&[C], &[D], 1, 0.0, &mut rng) == C {
                coops += 1;
            }
        }
        assert!(coops > 50, "generosity never fired ({coops})");
        assert!(coops < 200, "generosity fired too often ({coops})");
    }

    #[test]
    fn test_pavlov_win_stay() {
        // Reward: repeat Cooperate
        assert_eq!(decide(BuiltIn::Pavlov, &[C], &[C], 1), C);
        // Temptation: flip own Defect back to Cooperate
        assert_eq!(decide(BuiltIn::Pavlov, &[D], &[C], 1), C);
    }

    #[test]
    fn test_pavlov_lose_shift() {
        // Sucker: flip own Cooperate to Defect
        assert_eq!(decide(BuiltIn::Pavlov, &[C], &[D], 1), D);
        // Punishment: repeat Defect...
        assert_eq!(decide(BuiltIn::Pavlov, &[D], &[D], 1), D);
        // ...unless forgiveness breaks the deadlock
        assert_eq!(decide_forgiving(BuiltIn::Pavlov, &[D], &[D], 1), C);
    }

    #[test]
    fn test_prober_probe_sequence() {
        assert_eq!(decide(BuiltIn::Prober, &[], &[], 0), D);
        assert_eq!(decide(BuiltIn::Prober, &[D], &[C], 1), C);
        assert_eq!(decide(BuiltIn::Prober, &[D, C], &[C, C], 2), C);
    }

    #[test]
    fn test_prober_exploits_probe_cooperators() {
        // Opponent cooperated on rounds 1 and 2: play TFT
        assert_eq!(decide(BuiltIn::Prober, &[D, C, C], &[C, C, C], 3), C);
        assert_eq!(decide(BuiltIn::Prober, &[D, C, C], &[C, C, D], 3), D);
        // A defection during the probe means defect forever
        assert_eq!(decide(BuiltIn::Prober, &[D, C, C], &[C, D, C], 3), D);
        assert_eq!(decide_forgiving(BuiltIn::Prober, &[D, C, C], &[C, D, C], 3), D);
    }

    #[test]
    fn test_majority_counts() {
        assert_eq!(decide(BuiltIn::Majority, &[C, C, C], &[C, C, D], 3), C);
        assert_eq!(decide(BuiltIn::Majority, &[C, C, C], &[D, C, D], 3), D);
        // exact tie cooperates
        assert_eq!(decide(BuiltIn::Majority, &[C, C], &[C, D], 2), C);
        assert_eq!(decide_forgiving(BuiltIn::Majority, &[C, C, C], &[D, C, D], 3), C);
    }

    #[test]
    fn test_random_is_roughly_uniform() {
        let mut rng = rng_from_seed(9);
        let mut coops = 0;
        for _ in 0..1000 {
            if BuiltIn::Random.decide(&[], &[], 0, 0.0, &mut rng) == C {
                coops += 1;
            }
        }
        assert!((400..600).contains(&coops), "biased random: {coops}");
    }

    #[test]
    fn test_metadata_ids_unique() {
        let mut ids: Vec<&str> = BuiltIn::ALL.iter().map(|b| b.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), BuiltIn::ALL.len());
    }

    #[test]
    fn test_history_string() {
        assert_eq!(history_string(&[C, C, D, C]), "CCDC");
        assert_eq!(history_string(&[]), "");
    }

    #[test]
    fn test_move_serde_uses_letters() {
        assert_eq!(serde_json::to_string(&C).unwrap(), "\"C\"");
        assert_eq!(serde_json::from_str::<Move>("\"D\"").unwrap(), D);
    }
}
