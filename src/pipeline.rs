// 🔁 Pipeline - one full run, start to finish
//
// load config → pass 1 (sources) → pass 2 (history) → pass 3 (gaps) → write
//
// Nothing is written until pass 3 completes.

use crate::audit::AuditLedger;
use crate::config::{IngestPaths, SourceMap};
use crate::output::OutputWriter;
use crate::reconciliation::{Reconciler, SourceOutcome, SourceStatus};
use crate::registry::StateRegistry;
use crate::resolver::GapResolver;
use crate::table::TableReader;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceOutcome>,
    pub state_records_loaded: usize,
    pub restored_from_history: usize,
    pub resolved_manually: usize,
    pub new_audit_entries: usize,
    /// (scope, key) pairs still empty after all passes
    pub remaining_gaps: usize,
    pub ledger_written: bool,
}

impl RunReport {
    pub fn summary(&self) -> String {
        let loaded = self.sources.iter().filter(|s| s.is_loaded()).count();
        format!(
            "{} of {} sources loaded ({} state records), {} restored from history, {} entered manually, {} gaps remain",
            loaded,
            self.sources.len(),
            self.state_records_loaded,
            self.restored_from_history,
            self.resolved_manually,
            self.remaining_gaps
        )
    }
}

/// Run the whole reconciliation once.
///
/// Fatal: missing source map (before anything is read), malformed registry or ledger,
/// resolver I/O failure, any write failure.
pub fn run_pipeline(
    paths: &IngestPaths,
    reader: &dyn TableReader,
    resolver: &mut dyn GapResolver,
) -> Result<RunReport> {
    let sources = SourceMap::load(&paths.source_map)?;
    let registry = StateRegistry::load(&paths.states)?;
    let mut ledger = AuditLedger::load(&paths.audit_log)?;
    info!(
        "Loaded {} sources, {} states, {} historical entries",
        sources.len(),
        registry.len(),
        ledger.history().len()
    );

    let reconciler = Reconciler::new(&sources, &registry);

    let (dataset, outcomes) =
        reconciler.apply_sources(reconciler.empty_dataset(), reader, &paths.raw_dir);
    let (dataset, restored) = reconciler.rehydrate(dataset, &ledger);
    let (dataset, resolved) = reconciler.resolve_gaps(dataset, resolver, &mut ledger)?;

    let writer = OutputWriter::new(&paths.output, &paths.audit_log);
    writer.write_dataset(&dataset)?;
    info!("Data compiled to {}", paths.output.display());

    let ledger_written = writer.write_ledger(&ledger)?;
    if ledger_written {
        info!("Audit log updated with {} new entries", ledger.pending().len());
    } else {
        info!("No new manual entries to log");
    }

    let state_records_loaded = outcomes
        .iter()
        .map(|o| match o.status {
            SourceStatus::Loaded { state_records, .. } => state_records,
            SourceStatus::Skipped { .. } => 0,
        })
        .sum();

    Ok(RunReport {
        sources: outcomes,
        state_records_loaded,
        restored_from_history: restored,
        resolved_manually: resolved,
        new_audit_entries: ledger.pending().len(),
        remaining_gaps: dataset.gaps(sources.keys()).len(),
        ledger_written,
    })
}

// ============================================================================
// TESTS
// ============================================================================
