// Cost of Living Dataset - Core Library
// Reconciles per-state and national monthly cost indicators from raw sources,
// the manual audit history, and operator entries.

pub mod error;
pub mod registry;       // Canonical scopes (state codes + national)
pub mod normalize;      // Scope + monthly value normalization
pub mod config;         // Source configuration + run paths
pub mod table;          // Tabular readers (CSV, workbook)
pub mod loader;         // One source → normalized triples
pub mod dataset;        // Output dataset, first-writer-wins slots
pub mod audit;          // Append-only manual entry ledger
pub mod resolver;       // Gap resolvers (console, scripted)
pub mod reconciliation; // Three-pass reconciliation
pub mod output;         // Persistence of dataset + ledger
pub mod pipeline;       // One full run

// Re-export commonly used types
pub use error::{IngestError, NormalizeError, SourceError};
pub use registry::{Scope, StateRegistry, NATIONAL_LEDGER_SCOPE};
pub use normalize::{
    normalize_monthly_value, normalize_scope, parse_amount, to_monthly,
    Frequency, NATIONAL_ALIASES,
};
pub use config::{FileKind, IngestPaths, RowFilter, SourceConfig, SourceMap};
pub use table::{FileTableReader, Table, TableReader};
pub use loader::{SourceLoad, SourceLoader, SourceRecord};
pub use dataset::{Dataset, SourceMetadata, StateRecord, RESERVED_INDICATOR_KEY};
pub use audit::{AuditEntry, AuditLedger, RawValue, NO_CITATION};
pub use resolver::{
    parse_manual_input, ConsoleResolver, Gap, GapResolver, ManualEntry, ScriptedResolver,
};
pub use reconciliation::{Reconciler, SourceOutcome, SourceStatus};
pub use output::OutputWriter;
pub use pipeline::{run_pipeline, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
