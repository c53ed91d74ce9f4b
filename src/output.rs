// 💾 Output Writer
// Only runs after all three passes; an interrupted run writes nothing.

use crate::audit::AuditLedger;
use crate::dataset::Dataset;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct OutputWriter {
    output: PathBuf,
    audit_log: PathBuf,
}

impl OutputWriter {
    pub fn new(output: impl Into<PathBuf>, audit_log: impl Into<PathBuf>) -> Self {
        OutputWriter {
            output: output.into(),
            audit_log: audit_log.into(),
        }
    }

    pub fn write_dataset(&self, dataset: &Dataset) -> Result<()> {
        write_json(&self.output, dataset)
    }

    /// Persist prior entries (as read) + new entries. Returns false (file untouched)
    /// when nothing is new.
    pub fn write_ledger(&self, ledger: &AuditLedger) -> Result<bool> {
        if !ledger.has_pending() {
            return Ok(false);
        }
        write_json(&self.audit_log, ledger)?;
        Ok(true)
    }
}

/// Pretty JSON (2-space indent), parent directories created as needed
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let text = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================
