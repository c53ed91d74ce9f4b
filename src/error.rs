// 🚦 Error Taxonomy
// Fatal run errors, source-level recoverable errors, record-level drops.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single cell could not become a scope or a monthly value.
///
/// Record-level: the caller drops the candidate and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// Scope text matched no alias, code, or state name
    #[error("unresolved scope: {0:?}")]
    Unresolved(String),

    /// Value text is not a finite number once cleaned
    #[error("unparsable value: {0:?}")]
    Unparsable(String),

    /// Cell was empty
    #[error("missing value")]
    Missing,
}

/// A configured source contributed nothing; the run continues.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("columns missing, needed: {state_col}, {value_col}")]
    MissingColumns { state_col: String, value_col: String },
}

/// Aborts the run before any processing.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("source map not found at {}; register sources first", .0.display())]
    MissingSourceMap(PathBuf),

    /// Indicator keys share a state record with its display name
    #[error("indicator key '{0}' is reserved")]
    ReservedKey(String),
}
