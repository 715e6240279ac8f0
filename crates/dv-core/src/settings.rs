//! Engine settings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Largest bin count used when the count is derived from the data size
pub const DEFAULT_MAX_HISTOGRAM_BINS: usize = 100;

/// Settings that control how a data table derives its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Fixed histogram bin count. `None` derives it per column as
    /// `floor(sqrt(n))`, capped at `max_histogram_bins`.
    pub num_histogram_bins: Option<usize>,

    /// Upper bound for derived bin counts
    pub max_histogram_bins: usize,

    /// Whether statistics for the queried subset are maintained
    pub calculate_query_statistics: bool,

    /// Whether statistics for the non-queried subset are maintained
    pub calculate_nonquery_statistics: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            num_histogram_bins: None,
            max_histogram_bins: DEFAULT_MAX_HISTOGRAM_BINS,
            calculate_query_statistics: true,
            calculate_nonquery_statistics: false,
        }
    }
}

impl TableSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_histogram_bins == 0 {
            return Err(CoreError::Settings(
                "max_histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.num_histogram_bins == Some(0) {
            return Err(CoreError::Settings(
                "num_histogram_bins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Bin count for a value set of `n` entries
    pub fn bins_for(&self, n: usize) -> usize {
        match self.num_histogram_bins {
            Some(bins) => bins,
            None => ((n as f64).sqrt().floor() as usize).clamp(1, self.max_histogram_bins),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = TableSettings::default();
        assert_eq!(settings.num_histogram_bins, None);
        assert!(settings.calculate_query_statistics);
        assert!(!settings.calculate_nonquery_statistics);
    }

    #[test]
    fn test_derived_bin_count() {
        let settings = TableSettings::default();
        assert_eq!(settings.bins_for(0), 1);
        assert_eq!(settings.bins_for(10), 3);
        assert_eq!(settings.bins_for(100), 10);
        assert_eq!(settings.bins_for(1_000_000), DEFAULT_MAX_HISTOGRAM_BINS);

        let fixed = TableSettings {
            num_histogram_bins: Some(7),
            ..TableSettings::default()
        };
        assert_eq!(fixed.bins_for(1_000_000), 7);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            TableSettings::from_json_str(r#"{ "calculate_nonquery_statistics": true }"#).unwrap();
        assert!(settings.calculate_nonquery_statistics);
        assert_eq!(settings.max_histogram_bins, DEFAULT_MAX_HISTOGRAM_BINS);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = TableSettings::from_json_str(r#"{ "num_histogram_bins": 0 }"#);
        assert!(matches!(result, Err(CoreError::Settings(_))));

        let result = TableSettings::from_json_str("not json");
        assert!(matches!(result, Err(CoreError::Settings(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "num_histogram_bins": 12 }}"#).unwrap();
        file.flush().unwrap();

        let settings = TableSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.num_histogram_bins, Some(12));
    }
}
