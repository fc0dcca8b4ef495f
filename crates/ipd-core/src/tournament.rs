//! Tournament orchestration: Round Robin, Single Elimination and Group
//! Stage + Knockout, with their ranking and tie-break rules.
//!
//! The orchestrator validates its inputs before any match runs, resolves
//! strategy ids at match time (so a missing id aborts the run but keeps the
//! statistics of matches already played), and offers a per-match observer
//! hook as the cancellation boundary: a match always runs to completion, a
//! tournament can stop between matches.

use std::cmp::Reverse;

use chrono::Utc;
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::game::{run_match, MatchConfig, MatchState};
use crate::logging::{MatchLogRecord, SimulationLog, TournamentLogRecord};
use crate::random::SimRng;
use crate::registry::StrategyRegistry;
use crate::stats::StatsAggregator;

/// The supported tournament formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentFormat {
    RoundRobin,
    SingleElimination,
    GroupKnockout {
        groups: usize,
        qualifiers_per_group: usize,
    },
}

impl TournamentFormat {
    pub fn label(&self) -> &'static str {
        match self {
            TournamentFormat::RoundRobin => "Round Robin",
            TournamentFormat::SingleElimination => "Elimination",
            TournamentFormat::GroupKnockout { .. } => "Group Stage + Knockout",
        }
    }
}

/// Tournament-wide parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TournamentConfig {
    pub format: TournamentFormat,
    /// Parameters applied to every match in the tournament.
    pub game: MatchConfig,
    /// Sort bracket entrants by display name before pairing. Applies to the
    /// elimination bracket and the knockout stage only.
    pub seeded: bool,
}

/// One row of the final ranked standings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    /// 1-based rank.
    pub rank: usize,
    pub id: String,
    pub name: String,
    /// Cumulative score within the ranking scope (tournament or group stage).
    pub score: u32,
    pub games: u32,
    pub avg_score: f64,
}

/// Outcome of a completed tournament.
#[derive(Clone, Debug)]
pub struct TournamentReport {
    pub id: String,
    pub format: TournamentFormat,
    pub winner_id: String,
    pub standings: Vec<StandingEntry>,
    pub matches_played: usize,
}

/// Runs tournaments against a registry of strategies.
pub struct TournamentRunner<'a> {
    registry: &'a StrategyRegistry,
    config: TournamentConfig,
}

/// Mutable per-run context threaded through the format drivers.
struct Session<'r, 's> {
    registry: &'r StrategyRegistry,
    game: MatchConfig,
    tournament_id: String,
    format_label: &'static str,
    rng: &'s mut SimRng,
    stats: &'s mut StatsAggregator,
    logger: Option<&'s mut dyn SimulationLog>,
    observer: &'s mut dyn FnMut(&MatchState) -> bool,
    matches_played: usize,
}

impl Session<'_, '_> {
    /// Play one match and fan out stats, logging and the observer hook.
    fn play(
        &mut self,
        context: &'static str,
        id_a: &str,
        id_b: &str,
    ) -> Result<MatchState, SimError> {
        let registry = self.registry;
        let a = registry.get(id_a)?;
        let b = registry.get(id_b)?;
        let state = run_match(a, b, self.game, self.rng)?;
        self.matches_played += 1;
        self.stats
            .record_match(registry, id_a, id_b, state.score_a(), state.score_b());
        if let Some(logger) = self.logger.as_deref_mut() {
            let record = MatchLogRecord::from_match(
                context,
                Some((&self.tournament_id, self.format_label)),
                a,
                b,
                &state,
            );
            if let Err(e) = logger.match_completed(&record) {
                warn!("match log rejected by sink: {e}");
            }
        }
        if !(self.observer)(&state) {
            return Err(SimError::Cancelled {
                completed: self.matches_played,
            });
        }
        Ok(state)
    }
}

/// Per-participant totals accumulated over a set of matches.
struct Totals {
    id: String,
    score: u32,
    games: u32,
}

/// Per-participant bracket bookkeeping.
struct BracketEntry {
    id: String,
    score: u32,
    games: u32,
    /// Round at which this participant was knocked out; the champion gets
    /// one more than the last contested round.
    elim_round: u32,
}

struct BracketOutcome {
    winner_id: String,
    entries: Vec<BracketEntry>,
}

impl<'a> TournamentRunner<'a> {
    pub fn new(registry: &'a StrategyRegistry, config: TournamentConfig) -> Self {
        TournamentRunner { registry, config }
    }

    /// Run the tournament to completion with no logging or observer.
    pub fn run(
        &self,
        participants: &[String],
        rng: &mut SimRng,
        stats: &mut StatsAggregator,
    ) -> Result<TournamentReport, SimError> {
        self.run_with(participants, rng, stats, None, &mut |_| true)
    }

    /// Run the tournament, reporting each completed match to `observer` (and
    /// `logger`, when present). The observer returning `false` cancels the
    /// run at the between-matches boundary; statistics recorded so far are
    /// kept.
    pub fn run_with<'s>(
        &self,
        participants: &[String],
        rng: &'s mut SimRng,
        stats: &'s mut StatsAggregator,
        logger: Option<&'s mut (dyn SimulationLog + 's)>,
        observer: &'s mut (dyn FnMut(&MatchState) -> bool + 's),
    ) -> Result<TournamentReport, SimError> {
        self.config.game.validate()?;
        if participants.len() < 2 {
            return Err(SimError::TooFewParticipants(participants.len()));
        }
        if let TournamentFormat::GroupKnockout {
            groups,
            qualifiers_per_group,
        } = self.config.format
        {
            if groups == 0 {
                return Err(SimError::NoGroups);
            }
            if participants.len() < groups * 2 {
                return Err(SimError::TooFewForGroups {
                    participants: participants.len(),
                    groups,
                });
            }
            if qualifiers_per_group * groups < 2 {
                return Err(SimError::TooFewQualifiers {
                    qualifiers: qualifiers_per_group,
                    groups,
                });
            }
        }

        let started_at = Utc::now();
        let tournament_id = format!(
            "T-{}-{:04x}",
            started_at.format("%y%m%d%H%M"),
            rng.gen::<u16>()
        );
        let format_label = self.config.format.label();
        let mut session = Session {
            registry: self.registry,
            game: self.config.game,
            tournament_id: tournament_id.clone(),
            format_label,
            rng,
            stats,
            logger,
            observer,
            matches_played: 0,
        };

        let (winner_id, standings) = match self.config.format {
            TournamentFormat::RoundRobin => self.drive_round_robin(&mut session, participants)?,
            TournamentFormat::SingleElimination => {
                self.drive_elimination(&mut session, participants)?
            }
            TournamentFormat::GroupKnockout {
                groups,
                qualifiers_per_group,
            } => self.drive_group_knockout(
                &mut session,
                participants,
                groups,
                qualifiers_per_group,
            )?,
        };

        let matches_played = session.matches_played;
        if let Some(logger) = session.logger.as_deref_mut() {
            let record = TournamentLogRecord {
                tournament_id: tournament_id.clone(),
                tournament_type: format_label.to_string(),
                started_at,
                finished_at: Utc::now(),
                participants: participants.to_vec(),
                rounds_per_game: self.config.game.rounds,
                noise_percent: self.config.game.noise * 100.0,
                forgiveness_percent: self.config.game.forgiveness * 100.0,
                winner_id: winner_id.clone(),
                standings: standings.clone(),
            };
            if let Err(e) = logger.tournament_completed(&record) {
                warn!("tournament log rejected by sink: {e}");
            }
        }

        Ok(TournamentReport {
            id: tournament_id,
            format: self.config.format,
            winner_id,
            standings,
            matches_played,
        })
    }

    /// Round Robin: every unordered pair plays once; ranking is by score,
    /// with ties keeping the pair-enumeration order.
    fn drive_round_robin(
        &self,
        session: &mut Session<'_, '_>,
        participants: &[String],
    ) -> Result<(String, Vec<StandingEntry>), SimError> {
        let totals = all_pairs_round_robin(session, participants, "Tournament Round Robin")?;
        let standings = rank_by_score(self.registry, totals);
        Ok((standings[0].id.clone(), standings))
    }

    /// Single Elimination: bracket with leading byes; ranking by elimination
    /// round, then cumulative score.
    fn drive_elimination(
        &self,
        session: &mut Session<'_, '_>,
        participants: &[String],
    ) -> Result<(String, Vec<StandingEntry>), SimError> {
        let mut entrants = participants.to_vec();
        if self.config.seeded {
            let registry = self.registry;
            entrants.sort_by_key(|id| registry.display_name(id));
        }
        let outcome = run_bracket(session, &entrants, "Tournament Elimination")?;
        let mut entries = outcome.entries;
        entries.sort_by_key(|e| (Reverse(e.elim_round), Reverse(e.score)));
        let standings = entries
            .into_iter()
            .enumerate()
            .map(|(i, e)| standing(self.registry, i + 1, e.id, e.score, e.games))
            .collect();
        Ok((outcome.winner_id, standings))
    }

    /// Group Stage + Knockout. The knockout decides the winner; the
    /// published standings rank everyone by group-stage score alone, an
    /// intentional asymmetry inherited from the observed contract.
    fn drive_group_knockout(
        &self,
        session: &mut Session<'_, '_>,
        participants: &[String],
        groups: usize,
        qualifiers_per_group: usize,
    ) -> Result<(String, Vec<StandingEntry>), SimError> {
        let mut shuffled = participants.to_vec();
        shuffled.shuffle(session.rng);
        let mut group_lists: Vec<Vec<String>> = vec![Vec::new(); groups];
        for (i, id) in shuffled.into_iter().enumerate() {
            group_lists[i % groups].push(id);
        }

        let registry = self.registry;
        let mut group_totals: Vec<Totals> = Vec::with_capacity(participants.len());
        let mut qualifiers: Vec<String> = Vec::with_capacity(groups * qualifiers_per_group);
        for group in &group_lists {
            let totals = all_pairs_round_robin(session, group, "Tournament Group Stage")?;
            // Group ranking: score descending, display name ascending on ties.
            let mut ranked: Vec<&Totals> = totals.iter().collect();
            ranked.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then_with(|| registry.display_name(&a.id).cmp(&registry.display_name(&b.id)))
            });
            qualifiers.extend(
                ranked
                    .iter()
                    .take(qualifiers_per_group)
                    .map(|t| t.id.clone()),
            );
            group_totals.extend(totals);
        }

        if self.config.seeded {
            qualifiers.sort_by_key(|id| registry.display_name(id));
        }
        let outcome = run_bracket(session, &qualifiers, "Tournament Knockout")?;

        let standings = rank_by_score(self.registry, group_totals);
        Ok((outcome.winner_id, standings))
    }
}

/// Play every unordered pair of `participants` once, returning per-id totals
/// in the participants' order.
fn all_pairs_round_robin(
    session: &mut Session<'_, '_>,
    participants: &[String],
    context: &'static str,
) -> Result<Vec<Totals>, SimError> {
    let mut totals: Vec<Totals> = participants
        .iter()
        .map(|id| Totals {
            id: id.clone(),
            score: 0,
            games: 0,
        })
        .collect();
    for i in 0..participants.len() {
        for j in (i + 1)..participants.len() {
            let state = session.play(context, &participants[i], &participants[j])?;
            totals[i].score += state.score_a();
            totals[i].games += 1;
            totals[j].score += state.score_b();
            totals[j].games += 1;
        }
    }
    Ok(totals)
}

/// Run a knockout bracket over `entrants` in their given order.
///
/// With an odd field the first participant in the current ordering gets a
/// bye and advances without playing. Pairs are formed consecutively and an
/// exact score tie goes to player one of the match.
fn run_bracket(
    session: &mut Session<'_, '_>,
    entrants: &[String],
    context: &'static str,
) -> Result<BracketOutcome, SimError> {
    let mut entries: Vec<BracketEntry> = entrants
        .iter()
        .map(|id| BracketEntry {
            id: id.clone(),
            score: 0,
            games: 0,
            elim_round: 0,
        })
        .collect();

    let mut remaining: Vec<usize> = (0..entries.len()).collect();
    let mut round = 1u32;
    while remaining.len() > 1 {
        let mut queue = std::mem::take(&mut remaining);
        let mut next = Vec::with_capacity(queue.len() / 2 + 1);
        if queue.len() % 2 == 1 {
            next.push(queue.remove(0)); // bye advances without playing
        }
        for pair in queue.chunks_exact(2) {
            let (ia, ib) = (pair[0], pair[1]);
            let state = session.play(context, &entries[ia].id, &entries[ib].id)?;
            entries[ia].score += state.score_a();
            entries[ia].games += 1;
            entries[ib].score += state.score_b();
            entries[ib].games += 1;
            let (winner, loser) = if state.score_a() >= state.score_b() {
                (ia, ib)
            } else {
                (ib, ia)
            };
            entries[loser].elim_round = round;
            next.push(winner);
        }
        remaining = next;
        round += 1;
    }

    let champion = remaining[0];
    entries[champion].elim_round = round;
    Ok(BracketOutcome {
        winner_id: entries[champion].id.clone(),
        entries,
    })
}

/// Rank totals by score descending; the sort is stable, so ties keep the
/// order the totals were accumulated in.
fn rank_by_score(registry: &StrategyRegistry, mut totals: Vec<Totals>) -> Vec<StandingEntry> {
    totals.sort_by_key(|t| Reverse(t.score));
    totals
        .into_iter()
        .enumerate()
        .map(|(i, t)| standing(registry, i + 1, t.id, t.score, t.games))
        .collect()
}

fn standing(
    registry: &StrategyRegistry,
    rank: usize,
    id: String,
    score: u32,
    games: u32,
) -> StandingEntry {
    let avg_score = if games > 0 {
        score as f64 / games as f64
    } else {
        0.0
    };
    StandingEntry {
        rank,
        name: registry.display_name(&id),
        id,
        score,
        games,
        avg_score,
    }
}
