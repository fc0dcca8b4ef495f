//! Running per-strategy statistics across all matches ever played.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::registry::StrategyRegistry;

/// Lifetime counters for one strategy id. Field names match the persisted
/// statistics schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub total_score: u64,
    #[serde(default)]
    pub games_played: u32,
}

/// Accumulates match outcomes per strategy id.
///
/// Records are created lazily on the first match a strategy plays and live
/// for the process lifetime; saving and loading them is the persistence
/// collaborator's job. Single-writer access is assumed.
#[derive(Clone, Debug, Default)]
pub struct StatsAggregator {
    records: BTreeMap<String, StatRecord>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        StatsAggregator::default()
    }

    /// Rebuild the aggregator from persisted records.
    pub fn from_records(records: BTreeMap<String, StatRecord>) -> Self {
        StatsAggregator { records }
    }

    /// Record one finished match for both participants.
    ///
    /// Ids absent from the registry (ephemeral manual/sandbox players, or
    /// strategies removed since) are skipped rather than erroring.
    pub fn record_match(
        &mut self,
        registry: &StrategyRegistry,
        id_a: &str,
        id_b: &str,
        score_a: u32,
        score_b: u32,
    ) {
        for (id, own, theirs) in [(id_a, score_a, score_b), (id_b, score_b, score_a)] {
            if !registry.contains(id) {
                debug!("not recording stats for unregistered id `{id}`");
                continue;
            }
            let record = self.records.entry(id.to_string()).or_default();
            record.games_played += 1;
            record.total_score += own as u64;
            match own.cmp(&theirs) {
                std::cmp::Ordering::Greater => record.wins += 1,
                std::cmp::Ordering::Less => record.losses += 1,
                std::cmp::Ordering::Equal => record.draws += 1,
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&StatRecord> {
        self.records.get(id)
    }

    /// All records, for persistence and display.
    pub fn records(&self) -> &BTreeMap<String, StatRecord> {
        &self.records
    }
}
