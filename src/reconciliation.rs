// ⚖️ Reconciliation Engine - three passes, strict precedence
//
//   1. source data      (first configured source to fill a slot wins)
//   2. historical log   (fills only what sources left empty)
//   3. manual entry     (fills only what history left empty, and is logged)
//
// Each pass takes the Dataset by value and hands it back, so a pass can only
// see the result of the passes before it. Writes go through
// `Dataset::insert_if_absent`, which never overwrites.

use crate::audit::{AuditEntry, AuditLedger, RawValue};
use crate::config::SourceMap;
use crate::dataset::{Dataset, SourceMetadata};
use crate::error::SourceError;
use crate::loader::{SourceLoad, SourceLoader};
use crate::normalize::to_monthly;
use crate::registry::StateRegistry;
use crate::resolver::{Gap, GapResolver};
use crate::table::TableReader;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// SOURCE OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceStatus {
    Loaded {
        /// State-scope records the source emitted
        state_records: usize,
        /// Emitted records that landed in an empty slot
        stored: usize,
    },
    Skipped {
        reason: String,
    },
}

/// What one configured source contributed to pass 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub key: String,
    pub status: SourceStatus,
}

impl SourceOutcome {
    fn skipped(key: &str, err: SourceError) -> Self {
        SourceOutcome {
            key: key.to_string(),
            status: SourceStatus::Skipped {
                reason: err.to_string(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.status, SourceStatus::Loaded { .. })
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler<'a> {
    sources: &'a SourceMap,
    registry: &'a StateRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(sources: &'a SourceMap, registry: &'a StateRegistry) -> Self {
        Reconciler { sources, registry }
    }

    /// Empty dataset shaped by the registry
    pub fn empty_dataset(&self) -> Dataset {
        Dataset::new(self.registry)
    }

    // ------------------------------------------------------------------------
    // Pass 1: sources
    // ------------------------------------------------------------------------

    /// Read and apply every configured source, in configuration order.
    ///
    /// A source that cannot be read contributes nothing; the others still run.
    pub fn apply_sources(
        &self,
        mut dataset: Dataset,
        reader: &dyn TableReader,
        raw_dir: &Path,
    ) -> (Dataset, Vec<SourceOutcome>) {
        let loader = SourceLoader::new(self.registry);
        let mut outcomes = Vec::with_capacity(self.sources.len());

        for config in self.sources.iter() {
            let path = raw_dir.join(&config.file);
            info!("Processing '{}' from {}", config.key, config.file);

            let table = match reader.read(&path, config.file_type) {
                Ok(table) => table,
                Err(err) => {
                    warn!("'{}': {}", config.key, err);
                    outcomes.push(SourceOutcome::skipped(&config.key, err));
                    continue;
                }
            };

            // The table was readable: provenance is kept even if columns turn out missing
            dataset.record_metadata(&config.key, SourceMetadata::from_config(config));

            match loader.load(config, &table) {
                Ok(load) => {
                    let (next, stored) = self.apply(dataset, &load);
                    dataset = next;
                    info!("'{}': loaded {} records", config.key, load.state_records);
                    outcomes.push(SourceOutcome {
                        key: config.key.clone(),
                        status: SourceStatus::Loaded {
                            state_records: load.state_records,
                            stored,
                        },
                    });
                }
                Err(err) => {
                    warn!("'{}': {}", config.key, err);
                    outcomes.push(SourceOutcome::skipped(&config.key, err));
                }
            }
        }

        (dataset, outcomes)
    }

    /// Apply one source's records. Returns how many filled an empty slot.
    pub fn apply(&self, mut dataset: Dataset, load: &SourceLoad) -> (Dataset, usize) {
        let mut stored = 0;
        for record in &load.records {
            if dataset.insert_if_absent(&record.scope, &record.key, record.value) {
                stored += 1;
            } else {
                debug!(
                    "'{}': {} already populated, keeping earlier value",
                    record.key, record.scope
                );
            }
        }
        (dataset, stored)
    }

    // ------------------------------------------------------------------------
    // Pass 2: history
    // ------------------------------------------------------------------------

    /// Fill remaining gaps from the ledger, re-normalizing each raw value with the
    /// frequency currently configured for its key (monthly if unconfigured).
    pub fn rehydrate(&self, mut dataset: Dataset, ledger: &AuditLedger) -> (Dataset, usize) {
        if ledger.history().is_empty() {
            info!("No historical manual entries found");
            return (dataset, 0);
        }

        let mut restored = 0;
        for entry in ledger.entries() {
            let Some(scope) = self.registry.scope_from_ledger(&entry.scope) else {
                continue;
            };
            let Some(raw) = &entry.value else {
                continue;
            };

            let frequency = self.sources.frequency_for(&entry.key);
            match raw.to_monthly(frequency) {
                Ok(value) => {
                    if dataset.insert_if_absent(&scope, &entry.key, value) {
                        restored += 1;
                    }
                }
                Err(reason) => debug!("Ledger entry {} '{}' ignored: {}", scope, entry.key, reason),
            }
        }

        info!("Restored {} manual entries from history", restored);
        (dataset, restored)
    }

    // ------------------------------------------------------------------------
    // Pass 3: manual entry
    // ------------------------------------------------------------------------

    /// Ask `resolver` for every configured key still missing, national first,
    /// then states by code. Each accepted value is stored normalized and logged raw.
    pub fn resolve_gaps(
        &self,
        mut dataset: Dataset,
        resolver: &mut dyn GapResolver,
        ledger: &mut AuditLedger,
    ) -> Result<(Dataset, usize)> {
        let gaps = dataset.gaps(self.sources.keys());
        info!("{} gaps remain after sources and history", gaps.len());

        let mut resolved = 0;
        for (scope, key) in &gaps {
            let config = self.sources.get(key);
            let gap = Gap {
                scope,
                key,
                description: config
                    .and_then(|c| c.description.as_deref())
                    .unwrap_or(""),
            };

            let Some(entry) = resolver.resolve(&gap)? else {
                continue;
            };

            let frequency = self.sources.frequency_for(key);
            if dataset.insert_if_absent(scope, key, to_monthly(entry.value, frequency)) {
                ledger.record(AuditEntry::now(
                    scope,
                    key,
                    RawValue::Number(entry.value),
                    entry.citation,
                ));
                resolved += 1;
            }
        }

        Ok((dataset, resolved))
    }
}

// ============================================================================
// TESTS
// ============================================================================
