// ⚙️ Source Configuration + Paths
//
// One SourceConfig per indicator key. The map keeps the order it was written in,
// and that order decides which source wins a collision in the first pass.

use crate::dataset::RESERVED_INDICATOR_KEY;
use crate::error::IngestError;
use crate::normalize::Frequency;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// FILE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    /// Comma-delimited text with a header row
    #[default]
    Delimited,
    /// xlsx / xls / ods workbook, first sheet
    Spreadsheet,
}

impl FileKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "excel" | "xlsx" | "xls" | "spreadsheet" => FileKind::Spreadsheet,
            _ => FileKind::Delimited,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            FileKind::Delimited => "csv",
            FileKind::Spreadsheet => "excel",
        }
    }
}

impl Serialize for FileKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for FileKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag: Option<String> = Option::deserialize(deserializer)?;
        Ok(tag.as_deref().map(FileKind::from_tag).unwrap_or_default())
    }
}

// ============================================================================
// ROW FILTER
// ============================================================================

/// Keep a row only when the string form of `col` equals the string form of `val`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub col: String,
    pub val: serde_json::Value,
}

impl RowFilter {
    pub fn new(col: impl Into<String>, val: impl Into<serde_json::Value>) -> Self {
        RowFilter {
            col: col.into(),
            val: val.into(),
        }
    }

    /// Expected cell text. Numbers keep their JSON spelling: 2024 → "2024", 2024.0 → "2024.0".
    pub fn expected(&self) -> String {
        match &self.val {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(true) => "True".to_string(),
            serde_json::Value::Bool(false) => "False".to_string(),
            serde_json::Value::Null => "None".to_string(),
            other => other.to_string(),
        }
    }

    /// Exact string equality, never numeric
    pub fn matches(&self, cell: &str) -> bool {
        cell == self.expected()
    }
}

// ============================================================================
// SOURCE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Indicator key; carried by the enclosing map, not the record body
    #[serde(skip)]
    pub key: String,

    /// File name, relative to the raw data directory
    pub file: String,

    #[serde(default)]
    pub file_type: FileKind,

    pub state_col: String,
    pub value_col: String,

    #[serde(default)]
    pub filter: Option<RowFilter>,

    #[serde(default)]
    pub frequency: Frequency,

    /// Number or free text ("2023", 2023)
    #[serde(default)]
    pub year: serde_json::Value,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl SourceConfig {
    /// Minimal monthly CSV source; mostly for tests and scripted setups
    pub fn new(
        key: impl Into<String>,
        file: impl Into<String>,
        state_col: impl Into<String>,
        value_col: impl Into<String>,
    ) -> Self {
        SourceConfig {
            key: key.into(),
            file: file.into(),
            file_type: FileKind::Delimited,
            state_col: state_col.into(),
            value_col: value_col.into(),
            filter: None,
            frequency: Frequency::Monthly,
            year: serde_json::Value::Null,
            source: None,
            description: None,
        }
    }

    /// Builder: reporting frequency
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Builder: row filter
    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder: file kind
    pub fn with_file_type(mut self, file_type: FileKind) -> Self {
        self.file_type = file_type;
        self
    }

    /// Builder: provenance
    pub fn with_provenance(
        mut self,
        source: impl Into<String>,
        year: impl Into<serde_json::Value>,
        description: impl Into<String>,
    ) -> Self {
        self.source = Some(source.into());
        self.year = year.into();
        self.description = Some(description.into());
        self
    }
}

// ============================================================================
// SOURCE MAP
// ============================================================================

/// Ordered indicator key → SourceConfig mapping. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    entries: Vec<SourceConfig>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the config for `config.key`, keeping first-seen position
    pub fn insert(&mut self, config: SourceConfig) {
        match self.entries.iter_mut().find(|c| c.key == config.key) {
            Some(existing) => *existing = config,
            None => self.entries.push(config),
        }
    }

    /// Load the persisted map. Absence is fatal for the run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IngestError::MissingSourceMap(path.to_path_buf()).into());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source map: {}", path.display()))?;

        Self::from_json_str(&text)
            .with_context(|| format!("Invalid source map: {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        // preserve_order: the Map iterates in file order
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).context("Source map must be a JSON object")?;

        let mut map = SourceMap::new();
        for (key, body) in raw {
            if key == RESERVED_INDICATOR_KEY {
                return Err(IngestError::ReservedKey(key).into());
            }
            let mut config: SourceConfig = serde_json::from_value(body)
                .with_context(|| format!("Invalid config for indicator '{}'", key))?;
            config.key = key;
            map.insert(config);
        }

        Ok(map)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceConfig> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + Clone {
        self.entries.iter().map(|c| c.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&SourceConfig> {
        self.entries.iter().find(|c| c.key == key)
    }

    /// Declared frequency for a key; keys no longer configured are monthly
    pub fn frequency_for(&self, key: &str) -> Frequency {
        self.get(key).map(|c| c.frequency).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SourceConfig> for SourceMap {
    fn from_iter<I: IntoIterator<Item = SourceConfig>>(iter: I) -> Self {
        let mut map = SourceMap::new();
        for config in iter {
            map.insert(config);
        }
        map
    }
}

// ============================================================================
// PATHS
// ============================================================================

/// Where every input and output of a run lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestPaths {
    pub source_map: PathBuf,
    pub states: PathBuf,
    pub output: PathBuf,
    pub audit_log: PathBuf,
    pub raw_dir: PathBuf,
}

impl IngestPaths {
    /// Standard project layout under `root`
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        IngestPaths {
            source_map: root.join("config").join("sources_map.json"),
            states: root.join("config").join("states.json"),
            output: root.join("data").join("geo_stats.json"),
            audit_log: root.join("data").join("manual_audit_log.json"),
            raw_dir: root.join("raw_data"),
        }
    }

    /// Path of a source's raw file
    pub fn raw_file(&self, config: &SourceConfig) -> PathBuf {
        self.raw_dir.join(&config.file)
    }
}

impl Default for IngestPaths {
    fn default() -> Self {
        Self::from_root(".")
    }
}

// ============================================================================
// TESTS
// ============================================================================
