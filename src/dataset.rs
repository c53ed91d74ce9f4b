// 📊 Dataset - the canonical output of a run
//
// Invariant: one value per (scope, key). Once set, a slot is never overwritten;
// `insert_if_absent` is the only write path.

use crate::config::SourceConfig;
use crate::registry::{Scope, StateRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field of a serialized state record that holds the display name
pub const RESERVED_INDICATOR_KEY: &str = "name";

/// Provenance for one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source: String,
    pub year: serde_json::Value,
    pub desc: String,
}

impl SourceMetadata {
    pub fn from_config(config: &SourceConfig) -> Self {
        SourceMetadata {
            source: config
                .source
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            year: if config.year.is_null() {
                serde_json::json!("Unknown")
            } else {
                config.year.clone()
            },
            desc: config.description.clone().unwrap_or_default(),
        }
    }
}

/// Serialized flat: `{ "name": ..., <key>: <value>, ... }`, so `name` cannot be an
/// indicator key (see `RESERVED_INDICATOR_KEY`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub name: String,

    /// indicator key → dollars per month
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl StateRecord {
    pub fn new(name: impl Into<String>) -> Self {
        StateRecord {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub metadata: BTreeMap<String, SourceMetadata>,

    #[serde(default)]
    pub national: BTreeMap<String, f64>,

    /// state code → record; every registry state is present, filled or not
    #[serde(default)]
    pub states: BTreeMap<String, StateRecord>,
}

impl Dataset {
    /// Empty national record plus one empty record per registry state
    pub fn new(registry: &StateRegistry) -> Self {
        Dataset {
            metadata: BTreeMap::new(),
            national: BTreeMap::new(),
            states: registry
                .iter()
                .map(|(code, name)| (code.to_string(), StateRecord::new(name)))
                .collect(),
        }
    }

    pub fn get(&self, scope: &Scope, key: &str) -> Option<f64> {
        match scope {
            Scope::National => self.national.get(key).copied(),
            Scope::State(code) => self
                .states
                .get(code)
                .and_then(|record| record.values.get(key).copied()),
        }
    }

    pub fn contains(&self, scope: &Scope, key: &str) -> bool {
        self.get(scope, key).is_some()
    }

    /// Store `value` only if the slot is empty. Returns true when stored.
    ///
    /// States outside the dataset are ignored.
    pub fn insert_if_absent(&mut self, scope: &Scope, key: &str, value: f64) -> bool {
        let slot = match scope {
            Scope::National => &mut self.national,
            Scope::State(code) => match self.states.get_mut(code) {
                Some(record) => &mut record.values,
                None => return false,
            },
        };

        if slot.contains_key(key) {
            return false;
        }
        slot.insert(key.to_string(), value);
        true
    }

    /// Metadata is recorded once per key; first source wins like values do
    pub fn record_metadata(&mut self, key: &str, metadata: SourceMetadata) {
        self.metadata.entry(key.to_string()).or_insert(metadata);
    }

    /// Every scope in resolution order: national first, then states by code
    pub fn scopes(&self) -> Vec<Scope> {
        std::iter::once(Scope::National)
            .chain(self.states.keys().map(|code| Scope::State(code.clone())))
            .collect()
    }

    /// (scope, key) pairs with no value for any of `keys`
    pub fn gaps<'k>(&self, keys: impl Iterator<Item = &'k str> + Clone) -> Vec<(Scope, String)> {
        let mut gaps = Vec::new();
        for scope in self.scopes() {
            for key in keys.clone() {
                if !self.contains(&scope, key) {
                    gaps.push((scope.clone(), key.to_string()));
                }
            }
        }
        gaps
    }

    /// Number of stored values across all scopes
    pub fn filled_count(&self) -> usize {
        self.national.len() + self.states.values().map(|r| r.values.len()).sum::<usize>()
    }
}

// ============================================================================
// TESTS
// ============================================================================
