// 📝 Audit Ledger - append-only record of manual values
//
// Prior entries are read once and written back exactly as read, unknown fields and
// number spelling included. New entries collect in a separate batch and are appended
// after the prior ones when the run ends.
// Values are kept RAW so a changed source frequency re-interprets history correctly.

use crate::error::NormalizeError;
use crate::normalize::{normalize_monthly_value, to_monthly, Frequency};
use crate::registry::Scope;
use anyhow::{Context, Result};
use chrono::Local;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Citation recorded when the operator gives none
pub const NO_CITATION: &str = "Manual Entry (No citation)";

// ============================================================================
// RAW VALUE
// ============================================================================

/// Value exactly as supplied: a number from the prompt, or hand-edited text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Re-normalize with the frequency currently declared for the entry's key
    pub fn to_monthly(&self, frequency: Frequency) -> Result<f64, NormalizeError> {
        match self {
            RawValue::Number(n) if n.is_finite() => Ok(to_monthly(*n, frequency)),
            RawValue::Number(n) => Err(NormalizeError::Unparsable(n.to_string())),
            RawValue::Text(s) => normalize_monthly_value(s, frequency),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// AUDIT ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default)]
    pub timestamp: String,

    /// "National" or a state code
    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub value: Option<RawValue>,

    #[serde(default)]
    pub citation: String,
}

impl AuditEntry {
    /// Entry stamped with the current local time
    pub fn now(scope: &Scope, key: &str, value: RawValue, citation: impl Into<String>) -> Self {
        AuditEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            scope: scope.ledger_code().to_string(),
            key: key.to_string(),
            value: Some(value),
            citation: citation.into(),
        }
    }
}

// ============================================================================
// AUDIT LEDGER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLedger {
    /// Entries persisted before this run, in file order, exactly as read
    prior: Vec<serde_json::Value>,

    /// Entries produced by this run
    pending: Vec<AuditEntry>,
}

impl AuditLedger {
    pub fn new(prior: Vec<serde_json::Value>) -> Self {
        AuditLedger {
            prior,
            pending: Vec::new(),
        }
    }

    /// Read the persisted ledger. A missing file is an empty history.
    ///
    /// The file must be a JSON array; a malformed file is an error, since rewriting it
    /// later would drop history. Individual entries are not validated here.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read audit log: {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let prior: Vec<serde_json::Value> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse audit log: {}", path.display()))?;

        Ok(Self::new(prior))
    }

    /// History as it was when the run started, untouched
    pub fn history(&self) -> &[serde_json::Value] {
        &self.prior
    }

    /// Typed view of the history. Entries that do not fit `AuditEntry` are skipped.
    pub fn entries(&self) -> impl Iterator<Item = AuditEntry> + '_ {
        self.prior.iter().enumerate().filter_map(|(index, raw)| {
            match AuditEntry::deserialize(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Audit log entry {} ignored: {}", index, e);
                    None
                }
            }
        })
    }

    pub fn pending(&self) -> &[AuditEntry] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Append a new entry to this run's batch
    pub fn record(&mut self, entry: AuditEntry) {
        self.pending.push(entry);
    }
}

/// Serializes as one array: prior entries verbatim, then this run's entries
impl Serialize for AuditLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.prior.len() + self.pending.len()))?;
        for raw in &self.prior {
            seq.serialize_element(raw)?;
        }
        for entry in &self.pending {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_entries_written_back_verbatim() {
        let text = r#"[
            {"timestamp": "2024-06-01 09:00:00", "scope": "CA", "key": "rent", "value": 24000, "citation": "HUD", "operator": "alice"},
            {"scope": "ZZ", "key": "rent", "value": 5, "citation": "x"}
        ]"#;
        let prior: Vec<serde_json::Value> = serde_json::from_str(text).unwrap();
        let mut ledger = AuditLedger::new(prior.clone());
        ledger.record(AuditEntry::now(
            &Scope::State("TX".to_string()),
            "internet",
            RawValue::Number(65.0),
            "BroadbandNow",
        ));

        let saved: Vec<serde_json::Value> =
            serde_json::from_str(&serde_json::to_string(&ledger).unwrap()).unwrap();

        assert_eq!(saved.len(), 3);
        assert_eq!(&saved[..2], prior.as_slice());
        assert_eq!(saved[0]["value"].to_string(), "24000");
        assert_eq!(saved[0]["operator"], "alice");
        assert!(saved[1].get("timestamp").is_none());
        assert_eq!(saved[2]["scope"], "TX");
        assert_eq!(ledger.history(), prior.as_slice());

        println!("✅ Ledger grew by {} entries", ledger.pending().len());
    }

    #[test]
    fn test_entries_skip_malformed_history() {
        let text = r#"[
            {"timestamp": "t", "scope": null, "key": "rent", "value": 1, "citation": ""},
            {"timestamp": "t", "scope": "CA", "key": "rent", "value": {"amount": 3}, "citation": ""},
            "not an entry",
            {"scope": "NY", "key": "rent", "value": "$2,100"}
        ]"#;
        let ledger = AuditLedger::new(serde_json::from_str(text).unwrap());

        let entries: Vec<AuditEntry> = ledger.entries().collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scope, "NY");
        assert_eq!(entries[0].value, Some(RawValue::Text("$2,100".to_string())));
        assert_eq!(ledger.history().len(), 4);
    }

    #[test]
    fn test_national_entries_use_ledger_scope() {
        let entry = AuditEntry::now(&Scope::National, "rent", RawValue::Number(1.0), "x");

        assert_eq!(entry.scope, "National");
        assert_eq!(entry.timestamp.len(), "2025-01-05 10:30:00.000000".len());
    }

    #[test]
    fn test_parse_mixed_value_forms() {
        let text = r#"[
            {"timestamp": "2024-06-01 09:00:00", "scope": "CA", "key": "rent", "value": 24000, "citation": "HUD"},
            {"timestamp": "2024-06-01 09:01:00", "scope": "NY", "key": "rent", "value": "$2,100", "citation": "Zillow"},
            {"timestamp": "2024-06-01 09:02:00", "scope": "TX", "key": "rent", "value": null, "citation": ""}
        ]"#;

        let entries: Vec<AuditEntry> = serde_json::from_str(text).unwrap();

        assert_eq!(entries[0].value, Some(RawValue::Number(24000.0)));
        assert_eq!(entries[1].value, Some(RawValue::Text("$2,100".to_string())));
        assert_eq!(entries[2].value, None);
        assert_eq!(entries[1].value.as_ref().unwrap().to_string(), "$2,100");
        assert_eq!(entries[0].value.as_ref().unwrap().to_string(), "24000");
    }

    #[test]
    fn test_raw_value_renormalizes() {
        assert_eq!(RawValue::Number(30000.0).to_monthly(Frequency::Annual), Ok(2500.0));
        assert_eq!(RawValue::Text("$1,200".to_string()).to_monthly(Frequency::Annual), Ok(100.0));
        assert!(RawValue::Text("unknown".to_string()).to_monthly(Frequency::Monthly).is_err());
    }

    #[test]
    fn test_load_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual_audit_log.json");

        assert!(AuditLedger::load(&path).unwrap().history().is_empty());

        fs::write(&path, "").unwrap();
        assert!(AuditLedger::load(&path).unwrap().history().is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual_audit_log.json");
        fs::write(&path, "{ broken").unwrap();

        assert!(AuditLedger::load(&path).is_err());
    }
}
