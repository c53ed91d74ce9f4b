// 🧮 Value Normalizer - pure functions, no I/O
//
// scope text      → Scope (national aliases, codes, full state names)
// raw value + tag → canonical dollars per month

use crate::error::NormalizeError;
use crate::registry::{Scope, StateRegistry};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Cleaned inputs that mean "the whole country"
pub const NATIONAL_ALIASES: [&str; 7] = [
    "UNITED STATES",
    "USA",
    "US",
    "NATIONAL",
    "U.S.",
    "TOTAL US",
    "AMERICA",
];

// ============================================================================
// FREQUENCY
// ============================================================================

/// Reporting period of a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    Annual,
    #[default]
    Monthly,
    Weekly,
}

impl Frequency {
    /// Case-insensitive, single letter or full word. Anything else is monthly.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "a" | "annual" => Frequency::Annual,
            "w" | "weekly" => Frequency::Weekly,
            _ => Frequency::Monthly,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Monthly => "monthly",
            Frequency::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag: Option<String> = Option::deserialize(deserializer)?;
        Ok(tag.as_deref().map(Frequency::from_tag).unwrap_or_default())
    }
}

// ============================================================================
// SCOPE NORMALIZATION
// ============================================================================

/// Map free-form scope text onto a canonical scope.
///
/// Order: national alias, canonical code, full state name.
pub fn normalize_scope(input: &str, registry: &StateRegistry) -> Result<Scope, NormalizeError> {
    let clean = input.trim().to_uppercase();
    if clean.is_empty() {
        return Err(NormalizeError::Missing);
    }

    if NATIONAL_ALIASES.contains(&clean.as_str()) {
        return Ok(Scope::National);
    }

    if registry.contains_code(&clean) {
        return Ok(Scope::State(clean));
    }

    match registry.code_for_name(&clean) {
        Some(code) => Ok(Scope::State(code.to_string())),
        None => Err(NormalizeError::Unresolved(input.to_string())),
    }
}

// ============================================================================
// VALUE NORMALIZATION
// ============================================================================

/// Parse "$1,200" style text into a finite number.
pub fn parse_amount(raw: &str) -> Result<f64, NormalizeError> {
    let clean: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if clean.is_empty() {
        return Err(NormalizeError::Missing);
    }

    match clean.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(NormalizeError::Unparsable(raw.to_string())),
    }
}

/// Convert an amount reported at `frequency` into dollars per month. No rounding.
pub fn to_monthly(value: f64, frequency: Frequency) -> f64 {
    match frequency {
        Frequency::Annual => value / 12.0,
        Frequency::Weekly => (value * 52.0) / 12.0,
        Frequency::Monthly => value,
    }
}

pub fn normalize_monthly_value(raw: &str, frequency: Frequency) -> Result<f64, NormalizeError> {
    parse_amount(raw).map(|value| to_monthly(value, frequency))
}

// ============================================================================
// TESTS
// ============================================================================
