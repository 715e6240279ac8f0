//! Column kind inference for CSV ingestion

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::config::{ColumnKindOverride, NullConfig};

/// Format name for RFC 3339 instants with an offset
pub const RFC3339: &str = "rfc3339";

/// Formats tried, in order, when detecting temporal columns
const TEMPORAL_FORMATS: &[&str] = &[
    RFC3339,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
];

/// Parse an instant with a chrono format string (date-only formats give
/// midnight UTC) or [`RFC3339`]
pub fn parse_instant(value: &str, format: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if format == RFC3339 {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Schema detector for deciding how each column is loaded
#[derive(Debug, Clone)]
pub struct SchemaDetector {
    sample_size: usize,
    null_config: NullConfig,
}

impl SchemaDetector {
    pub fn new() -> Self {
        Self {
            sample_size: 1000,
            null_config: NullConfig::default(),
        }
    }

    /// Set the sample size for detection
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.max(1);
        self
    }

    pub fn with_null_config(mut self, null_config: NullConfig) -> Self {
        self.null_config = null_config;
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Resolve a loading plan for every column. The result never holds
    /// `Temporal { format: None }`; `Ignored` only comes from `overrides`.
    pub fn detect_from_samples(
        &self,
        headers: &[String],
        samples: &[Vec<String>],
        overrides: impl Fn(&str) -> Option<ColumnKindOverride>,
    ) -> Vec<ColumnKindOverride> {
        headers
            .iter()
            .enumerate()
            .map(|(idx, header)| match overrides(header.as_str()) {
                Some(ColumnKindOverride::Temporal { format: None }) => ColumnKindOverride::Temporal {
                    format: Some(
                        self.detect_temporal_format(samples, idx)
                            .unwrap_or(RFC3339)
                            .to_string(),
                    ),
                },
                Some(kind) => kind,
                None => self.analyze_column(samples, idx),
            })
            .collect()
    }

    /// Infer the kind of one column: numeric when every present value parses
    /// as a number, temporal when no sampled value is missing and every one
    /// parses with one known format, otherwise categorical. A column with no
    /// present values is numeric.
    pub fn analyze_column(&self, samples: &[Vec<String>], col_idx: usize) -> ColumnKindOverride {
        let present: Vec<&str> = self.present_values(samples, col_idx).collect();

        if present.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
            return ColumnKindOverride::Numeric;
        }
        let sampled = samples
            .iter()
            .take(self.sample_size)
            .filter(|row| row.get(col_idx).is_some())
            .count();
        if present.len() < sampled {
            return ColumnKindOverride::Categorical;
        }
        if let Some(format) = self.detect_temporal_format(samples, col_idx) {
            return ColumnKindOverride::Temporal {
                format: Some(format.to_string()),
            };
        }
        ColumnKindOverride::Categorical
    }

    fn detect_temporal_format(&self, samples: &[Vec<String>], col_idx: usize) -> Option<&'static str> {
        let present: Vec<&str> = self.present_values(samples, col_idx).collect();
        if present.is_empty() {
            return None;
        }
        TEMPORAL_FORMATS
            .iter()
            .copied()
            .find(|format| present.iter().all(|v| parse_instant(v, format).is_some()))
    }

    fn present_values<'a>(&'a self, samples: &'a [Vec<String>], col_idx: usize) -> impl Iterator<Item = &'a str> + 'a {
        samples
            .iter()
            .take(self.sample_size)
            .filter_map(move |row| row.get(col_idx))
            .map(String::as_str)
            .filter(move |v| !self.null_config.is_null(v))
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_detect_kinds() {
        let headers = vec!["mpg".to_string(), "when".to_string(), "origin".to_string()];
        let samples = rows(&[
            &["18.0", "2024-01-01", "USA"],
            &["", "2024-01-02", "Japan"],
            &["25.5", "2024-01-03", "Europe"],
        ]);

        let kinds = SchemaDetector::new().detect_from_samples(&headers, &samples, |_| None);

        assert_eq!(kinds[0], ColumnKindOverride::Numeric);
        assert_eq!(
            kinds[1],
            ColumnKindOverride::Temporal {
                format: Some("%Y-%m-%d".to_string())
            }
        );
        assert_eq!(kinds[2], ColumnKindOverride::Categorical);
    }

    #[test]
    fn test_dates_with_missing_cells_are_categorical() {
        let samples = rows(&[&["2024-01-01"], &[""], &["2024-01-03"]]);

        assert_eq!(
            SchemaDetector::new().analyze_column(&samples, 0),
            ColumnKindOverride::Categorical
        );
    }

    #[test]
    fn test_overrides_win() {
        let headers = vec!["cylinders".to_string(), "stamp".to_string()];
        let samples = rows(&[&["4", "2024-01-01T10:00:00Z"], &["8", "2024-01-01T11:30:00+01:00"]]);

        let kinds = SchemaDetector::new().detect_from_samples(&headers, &samples, |name| match name {
            "cylinders" => Some(ColumnKindOverride::Categorical),
            _ => Some(ColumnKindOverride::Temporal { format: None }),
        });

        assert_eq!(kinds[0], ColumnKindOverride::Categorical);
        assert_eq!(
            kinds[1],
            ColumnKindOverride::Temporal {
                format: Some(RFC3339.to_string())
            }
        );
    }

    #[test]
    fn test_parse_instant_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
        assert_eq!(parse_instant("2024-03-05 12:30:00", "%Y-%m-%d %H:%M:%S%.f"), Some(expected));
        assert_eq!(parse_instant("2024-03-05T13:30:00+01:00", RFC3339), Some(expected));
        assert_eq!(
            parse_instant("03/05/2024", "%m/%d/%Y"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("yesterday", "%Y-%m-%d"), None);
    }

    #[test]
    fn test_sample_size_limits_inference() {
        let samples = rows(&[&["1"], &["2"], &["x"]]);
        let detector = SchemaDetector::new().with_sample_size(2);
        assert_eq!(detector.analyze_column(&samples, 0), ColumnKindOverride::Numeric);
    }
}
