// 🗺️ State Registry - canonical scopes for the run
//
// "California", "california", "CA" → all the same scope.
// Loaded once from the states file, immutable afterwards, passed by reference.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Scope string written to the audit ledger for national entries
pub const NATIONAL_LEDGER_SCOPE: &str = "National";

// ============================================================================
// SCOPE
// ============================================================================

/// The unit of data resolution: the whole country or one state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    National,
    /// Canonical 2-letter code, always present in the registry that produced it
    State(String),
}

impl Scope {
    pub fn is_national(&self) -> bool {
        matches!(self, Scope::National)
    }

    /// Scope as stored in the audit ledger
    pub fn ledger_code(&self) -> &str {
        match self {
            Scope::National => NATIONAL_LEDGER_SCOPE,
            Scope::State(code) => code,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::National => write!(f, "United States"),
            Scope::State(code) => write!(f, "{}", code),
        }
    }
}

// ============================================================================
// STATE REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    /// code → display name, sorted by code
    states: BTreeMap<String, String>,

    /// UPPERCASED display name → code
    name_to_code: HashMap<String, String>,
}

impl StateRegistry {
    pub fn new(states: BTreeMap<String, String>) -> Self {
        let states: BTreeMap<String, String> = states
            .into_iter()
            .map(|(code, name)| (code.trim().to_uppercase(), name))
            .collect();

        let name_to_code = states
            .iter()
            .map(|(code, name)| (name.trim().to_uppercase(), code.clone()))
            .collect();

        StateRegistry {
            states,
            name_to_code,
        }
    }

    /// Load the code → name mapping.
    ///
    /// A missing file is not fatal: the registry is empty and no state is processed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "States config missing at {}, continuing with an empty registry",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read states file: {}", path.display()))?;
        let states: BTreeMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse states file: {}", path.display()))?;

        Ok(Self::new(states))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Canonical code lookup (input must already be uppercased)
    pub fn contains_code(&self, code: &str) -> bool {
        self.states.contains_key(code)
    }

    /// Code for a full state name, case-insensitive
    pub fn code_for_name(&self, name: &str) -> Option<&str> {
        self.name_to_code
            .get(&name.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.states.get(code).map(String::as_str)
    }

    /// (code, name) pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.states.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    /// Resolve a ledger scope string ("National" or a known code)
    pub fn scope_from_ledger(&self, raw: &str) -> Option<Scope> {
        if raw == NATIONAL_LEDGER_SCOPE {
            return Some(Scope::National);
        }
        if self.states.contains_key(raw) {
            return Some(Scope::State(raw.to_string()));
        }
        None
    }
}

impl From<BTreeMap<String, String>> for StateRegistry {
    fn from(states: BTreeMap<String, String>) -> Self {
        StateRegistry::new(states)
    }
}

// ============================================================================
// TESTS
// ============================================================================
