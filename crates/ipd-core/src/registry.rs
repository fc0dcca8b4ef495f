//! The strategy registry: all built-in and custom strategies known to the
//! process, keyed by stable id.

use std::collections::BTreeMap;

use log::warn;

use crate::error::SimError;
use crate::persist::CustomStrategyDef;
use crate::strategy::{BuiltIn, Strategy, StrategyKind};

/// Derive the registry id for a custom strategy name.
///
/// Keeps alphanumerics, `_` and `-`, lowercased, behind a `custom_` prefix so
/// custom ids can never collide with built-in ones.
pub fn custom_id_for(name: &str) -> Result<String, SimError> {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_lowercase();
    if sanitized.is_empty() {
        return Err(SimError::InvalidStrategyName(name.to_string()));
    }
    Ok(format!("custom_{sanitized}"))
}

/// Holds every strategy available for matches and tournaments.
///
/// Built-ins are installed at construction and cannot be removed; custom
/// strategies come and go at runtime. Single-writer access is assumed.
#[derive(Clone, Debug)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Strategy>,
}

impl StrategyRegistry {
    /// A registry populated with the eleven built-in strategies.
    pub fn with_built_ins() -> Self {
        let mut strategies = BTreeMap::new();
        for behavior in BuiltIn::ALL {
            let s = Strategy::built_in(behavior);
            strategies.insert(s.id.clone(), s);
        }
        StrategyRegistry { strategies }
    }

    /// Insert a strategy, replacing any existing entry with the same id.
    pub fn register(&mut self, strategy: Strategy) {
        self.strategies.insert(strategy.id.clone(), strategy);
    }

    /// Compile and register a custom strategy definition, returning its id.
    pub fn register_custom(&mut self, def: &CustomStrategyDef) -> Result<String, SimError> {
        let id = custom_id_for(&def.name)?;
        let compiled = def.rules.clone().compile()?;
        self.register(Strategy {
            id: id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            pros_cons: def.pros_cons.clone(),
            analogue: def.analogue.clone(),
            kind: StrategyKind::Custom(compiled),
        });
        Ok(id)
    }

    /// Install persisted custom definitions, keeping their stored ids.
    ///
    /// Invalid entries are skipped with a warning rather than failing the
    /// load: corrupt persisted data must never prevent startup.
    pub fn install_custom_defs(
        &mut self,
        defs: impl IntoIterator<Item = (String, CustomStrategyDef)>,
    ) -> usize {
        let mut installed = 0;
        for (id, def) in defs {
            match def.rules.clone().compile() {
                Ok(compiled) => {
                    self.register(Strategy {
                        id,
                        name: def.name,
                        description: def.description,
                        pros_cons: def.pros_cons,
                        analogue: def.analogue,
                        kind: StrategyKind::Custom(compiled),
                    });
                    installed += 1;
                }
                Err(e) => {
                    warn!("skipping custom strategy `{id}`: {e}");
                }
            }
        }
        installed
    }

    /// Look up a strategy, failing with the lookup error used at match time.
    pub fn get(&self, id: &str) -> Result<&Strategy, SimError> {
        self.strategies
            .get(id)
            .ok_or_else(|| SimError::UnknownStrategy(id.to_string()))
    }

    pub fn lookup(&self, id: &str) -> Option<&Strategy> {
        self.strategies.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    /// Display name for an id, falling back to the id itself.
    pub fn display_name(&self, id: &str) -> String {
        self.lookup(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Remove a custom strategy. Built-ins are fixed for the process
    /// lifetime and stay put.
    pub fn remove(&mut self, id: &str) -> Option<Strategy> {
        if self.strategies.get(id)?.is_custom() {
            self.strategies.remove(id)
        } else {
            None
        }
    }

    /// All strategies in id order.
    pub fn all(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Snapshot of the custom strategies in their persistable form.
    pub fn custom_defs(&self) -> BTreeMap<String, CustomStrategyDef> {
        self.strategies
            .values()
            .filter_map(|s| {
                let rules = s.rules()?;
                Some((
                    s.id.clone(),
                    CustomStrategyDef {
                        name: s.name.clone(),
                        description: s.description.clone(),
                        pros_cons: s.pros_cons.clone(),
                        analogue: s.analogue.clone(),
                        rules: rules.rule_set().clone(),
                    },
                ))
            })
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_built_ins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use crate::strategy::Move;

    fn sample_def(name: &str) -> CustomStrategyDef {
        CustomStrategyDef {
            name: name.to_string(),
            description: "test".to_string(),
            pros_cons: String::new(),
            analogue: String::new(),
            rules: RuleSet {
                default: Some(Move::Defect),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_built_ins_present() {
        let reg = StrategyRegistry::with_built_ins();
        assert_eq!(reg.len(), 11);
        assert!(reg.contains("tit_for_tat"));
        assert!(reg.contains("defect"));
        assert!(!reg.get("tit_for_tat").unwrap().is_custom());
    }

    #[test]
    fn test_unknown_id_errors() {
        let reg = StrategyRegistry::with_built_ins();
        assert_eq!(
            reg.get("nope").unwrap_err(),
            SimError::UnknownStrategy("nope".to_string())
        );
    }

    #[test]
    fn test_custom_id_sanitization() {
        assert_eq!(custom_id_for("Cautious Prober").unwrap(), "custom_cautiousprober");
        assert_eq!(custom_id_for("A_b-3").unwrap(), "custom_a_b-3");
        assert!(matches!(
            custom_id_for("!!!"),
            Err(SimError::InvalidStrategyName(_))
        ));
    }

    #[test]
    fn test_register_and_remove_custom() {
        let mut reg = StrategyRegistry::with_built_ins();
        let id = reg.register_custom(&sample_def("Hawk")).unwrap();
        assert_eq!(id, "custom_hawk");
        assert!(reg.get(&id).unwrap().is_custom());

        assert!(reg.remove(&id).is_some());
        assert!(!reg.contains(&id));
    }

    #[test]
    fn test_built_ins_cannot_be_removed() {
        let mut reg = StrategyRegistry::with_built_ins();
        assert!(reg.remove("tit_for_tat").is_none());
        assert!(reg.contains("tit_for_tat"));
    }

    #[test]
    fn test_register_custom_rejects_missing_default() {
        let mut reg = StrategyRegistry::with_built_ins();
        let mut def = sample_def("Broken");
        def.rules.default = None;
        assert!(matches!(
            reg.register_custom(&def),
            Err(SimError::Rule(crate::rules::RuleError::MissingDefault))
        ));
    }

    #[test]
    fn test_install_skips_invalid_defs() {
        let mut reg = StrategyRegistry::with_built_ins();
        let mut broken = sample_def("Broken");
        broken.rules.default = None;
        let defs = vec![
            ("custom_ok".to_string(), sample_def("Ok")),
            ("custom_broken".to_string(), broken),
        ];
        assert_eq!(reg.install_custom_defs(defs), 1);
        assert!(reg.contains("custom_ok"));
        assert!(!reg.contains("custom_broken"));
    }

    #[test]
    fn test_custom_defs_round_trip() {
        let mut reg = StrategyRegistry::with_built_ins();
        let def = sample_def("Hawk");
        let id = reg.register_custom(&def).unwrap();

        let defs = reg.custom_defs();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[&id].name, "Hawk");
        assert_eq!(defs[&id].rules, def.rules);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let reg = StrategyRegistry::with_built_ins();
        assert_eq!(reg.display_name("tit_for_tat"), "Tit for Tat (TFT)");
        assert_eq!(reg.display_name("manual_p1"), "manual_p1");
    }
}
