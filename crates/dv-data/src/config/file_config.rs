//! CSV ingestion configuration

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::null_handling::NullConfig;

/// How a CSV column is loaded, overriding type inference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKindOverride {
    Numeric,
    /// Instants parsed with a chrono format string, `"rfc3339"`, or a
    /// format detected from the data when `None`
    Temporal { format: Option<String> },
    Categorical,
    /// Column is skipped
    Ignored,
}

/// Configuration for loading one CSV file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Path to the file
    pub path: PathBuf,

    /// Line (0-indexed) holding the column names; earlier lines are skipped
    pub header_line: usize,

    pub delimiter: u8,

    /// Per-column overrides keyed by header name
    pub column_kinds: HashMap<String, ColumnKindOverride>,

    /// Missing value handling
    pub null_config: NullConfig,

    /// Rows sampled for type inference
    pub sample_size: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            header_line: 0,
            delimiter: b',',
            column_kinds: HashMap::new(),
            null_config: NullConfig::default(),
            sample_size: 1000,
        }
    }
}

impl CsvConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header_line(mut self, line: usize) -> Self {
        self.header_line = line;
        self
    }

    pub fn with_column_kind(mut self, column: impl Into<String>, kind: ColumnKindOverride) -> Self {
        self.column_kinds.insert(column.into(), kind);
        self
    }

    pub fn with_null_config(mut self, null_config: NullConfig) -> Self {
        self.null_config = null_config;
        self
    }

    /// Get the file name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn kind_override(&self, column: &str) -> Option<&ColumnKindOverride> {
        self.column_kinds.get(column)
    }

    pub fn is_ignored(&self, column: &str) -> bool {
        matches!(self.kind_override(column), Some(ColumnKindOverride::Ignored))
    }

    /// Overrides naming a column that is not in `headers`
    pub fn unknown_columns<'a>(&'a self, headers: &[String]) -> Vec<&'a str> {
        let known: HashSet<&str> = headers.iter().map(String::as_str).collect();
        let mut unknown: Vec<&str> = self
            .column_kinds
            .keys()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();
        unknown.sort_unstable();
        unknown
    }
}
