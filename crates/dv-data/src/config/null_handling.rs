//! Missing-value handling for CSV ingestion

use serde::{Deserialize, Serialize};

/// Cell contents that count as a missing value.
///
/// Missing numeric cells load as NaN and missing categorical cells as the
/// empty category. A missing temporal cell fails the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Patterns to treat as missing
    pub patterns: Vec<String>,

    /// Whether to trim whitespace before checking
    pub trim_whitespace: bool,

    /// Case sensitive matching
    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                String::new(),
                "NA".to_string(),
                "N/A".to_string(),
                "NaN".to_string(),
                "null".to_string(),
                "None".to_string(),
            ],
            trim_whitespace: true,
            case_sensitive: false,
        }
    }
}

impl NullConfig {
    /// Only the empty cell counts as missing
    pub fn empty_only() -> Self {
        Self {
            patterns: vec![String::new()],
            ..Self::default()
        }
    }

    /// Check if a cell should be treated as missing
    pub fn is_null(&self, value: &str) -> bool {
        let value = if self.trim_whitespace { value.trim() } else { value };

        self.patterns.iter().any(|pattern| {
            if self.case_sensitive {
                value == pattern
            } else {
                value.eq_ignore_ascii_case(pattern)
            }
        })
    }

    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }
}
