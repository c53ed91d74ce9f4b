// 📄 Tabular Reader
// Every source, CSV or workbook, becomes the same thing: trimmed headers + string cells.

use crate::config::FileKind;
use crate::error::SourceError;
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::path::Path;

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Headers are trimmed; short rows read as empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    /// Convenience for literal tables in tests and scripts
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, "" when the row is short
    pub fn cell(row: &[String], index: usize) -> &str {
        row.get(index).map(String::as_str).unwrap_or("")
    }
}

// ============================================================================
// READER TRAIT
// ============================================================================

/// TableReader - the only thing the pipeline needs from file formats
///
/// A missing file is `SourceError::FileNotFound`; anything else that stops the
/// table from being read is `SourceError::Read`.
pub trait TableReader {
    fn read(&self, path: &Path, kind: FileKind) -> Result<Table, SourceError>;
}

/// Reads tables from disk: `csv` for delimited files, `calamine` for workbooks
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTableReader;

impl FileTableReader {
    pub fn new() -> Self {
        FileTableReader
    }

    fn read_delimited(&self, path: &Path) -> Result<Table> {
        use csv::ReaderBuilder;

        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header in {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, path.display())
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Table::new(headers, rows))
    }

    fn read_spreadsheet(&self, path: &Path) -> Result<Table> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| anyhow!("Failed to open workbook {}: {}", path.display(), e))?;

        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook contains no sheets: {}", path.display()))?;

        let range = workbook
            .worksheet_range(&first_sheet)
            .map_err(|e| anyhow!("Failed to read sheet '{}': {}", first_sheet, e))?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => header_row.iter().map(cell_text).collect(),
            None => Vec::new(),
        };
        let rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();

        Ok(Table::new(headers, rows))
    }
}

impl TableReader for FileTableReader {
    fn read(&self, path: &Path, kind: FileKind) -> Result<Table, SourceError> {
        if !path.exists() {
            return Err(SourceError::FileNotFound(path.to_path_buf()));
        }

        let table = match kind {
            FileKind::Delimited => self.read_delimited(path),
            FileKind::Spreadsheet => self.read_spreadsheet(path),
        };
        table.map_err(|e| SourceError::Read {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })
    }
}

/// String form of a workbook cell. Whole floats drop the fraction (2024.0 → "2024").
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
