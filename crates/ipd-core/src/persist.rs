//! Contracts for the persistence collaborator.
//!
//! The core never reads or writes files itself; it exposes the serde shapes
//! and the store traits, and tolerates missing or corrupt data at startup
//! (see `StrategyRegistry::install_custom_defs` and
//! `StatsAggregator::from_records`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::RuleSet;
use crate::stats::StatRecord;

/// A custom strategy as persisted, keyed externally by its registry id.
/// Field names match the stored JSON schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStrategyDef {
    pub name: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(default)]
    pub pros_cons: String,
    #[serde(default)]
    pub analogue: String,
    pub rules: RuleSet,
}

/// Why a store failed to load or save.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed store data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Loads and saves the per-strategy statistics map.
pub trait StatsStore {
    fn load(&mut self) -> Result<BTreeMap<String, StatRecord>, StoreError>;
    fn save(&mut self, records: &BTreeMap<String, StatRecord>) -> Result<(), StoreError>;
}

/// Loads and saves custom strategy definitions keyed by strategy id.
pub trait StrategyStore {
    fn load(&mut self) -> Result<BTreeMap<String, CustomStrategyDef>, StoreError>;
    fn save(&mut self, defs: &BTreeMap<String, CustomStrategyDef>) -> Result<(), StoreError>;
}
