//! Statistics for numeric columns

use serde::Serialize;

use super::histogram::{BinLayout, Histogram};
use super::quartiles;
use crate::{Result, TableError};

/// Descriptive statistics over a set of doubles.
///
/// NaN and infinite entries are counted in `nan_count` and take no part in
/// any other field. Standard deviation is the population deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummaryStats {
    /// Number of finite values
    pub count: usize,
    /// Number of NaN or infinite values
    pub nan_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub histogram: Histogram,
}

impl NumericSummaryStats {
    /// Compute statistics with histogram bounds taken from the data
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        Self::compute(values, bins, None)
    }

    /// Compute statistics with a histogram over fixed `bounds`, so the bins
    /// line up with another histogram over the same column
    pub fn with_bounds(values: &[f64], bins: usize, bounds: (f64, f64)) -> Result<Self> {
        Self::compute(values, bins, Some(bounds))
    }

    /// Replace the value set and recompute everything
    pub fn set_values(&mut self, values: &[f64], bins: usize) -> Result<()> {
        *self = Self::from_values(values, bins)?;
        Ok(())
    }

    /// Rebuild only the histogram, keeping its bounds
    pub fn set_num_histogram_bins(&mut self, values: &[f64], bins: usize) {
        let layout = BinLayout::new(self.histogram.layout.min, self.histogram.layout.max, bins);
        self.histogram = Histogram::build(values.iter().copied(), layout);
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub(crate) fn compute(values: &[f64], bins: usize, bounds: Option<(f64, f64)>) -> Result<Self> {
        if values.is_empty() {
            return Err(TableError::EmptyDataSet);
        }

        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let nan_count = values.len() - finite.len();
        if finite.is_empty() {
            return Err(TableError::EmptyDataSet);
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        finite.sort_by(|a, b| a.total_cmp(b));
        let min = finite[0];
        let max = finite[finite.len() - 1];
        let (q1, median, q3) = quartiles(&finite);

        let (lower, upper) = bounds.unwrap_or((min, max));
        let histogram = Histogram::build(finite.iter().copied(), BinLayout::new(lower, upper, bins));

        Ok(Self {
            count: finite.len(),
            nan_count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            median,
            q1,
            q3,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_statistics() {
        let stats = NumericSummaryStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert!((stats.std_dev - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.iqr(), 2.0);
    }

    #[test]
    fn test_nan_values_are_tracked_not_zeroed() {
        let stats = NumericSummaryStats::from_values(&[f64::NAN, 4.0, 6.0, f64::NAN], 2).unwrap();

        assert_eq!(stats.nan_count, 2);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 4.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.histogram.total(), 2);
    }

    #[test]
    fn test_infinite_values_are_excluded() {
        let stats =
            NumericSummaryStats::from_values(&[1.0, 2.0, f64::INFINITY, 3.0, f64::NEG_INFINITY], 2).unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.nan_count, 2);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, 2.0);
        assert!(stats.std_dev.is_finite());
        assert_eq!(stats.histogram.counts, vec![1, 2]);
        assert_eq!(stats.histogram.out_of_range, 0);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(
            NumericSummaryStats::from_values(&[], 10),
            Err(TableError::EmptyDataSet)
        ));
        assert!(matches!(
            NumericSummaryStats::from_values(&[f64::NAN], 10),
            Err(TableError::EmptyDataSet)
        ));
    }

    #[test]
    fn test_set_values_is_idempotent() {
        let values = [3.5, -1.0, 8.25, 0.0, 2.0, 2.0, 7.75];
        let mut stats = NumericSummaryStats::from_values(&values, 3).unwrap();
        let first = stats.clone();

        stats.set_values(&values, 3).unwrap();

        assert_eq!(stats, first);
    }

    #[test]
    fn test_one_through_ten_in_five_bins() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let stats = NumericSummaryStats::from_values(&values, 5).unwrap();

        assert_eq!(stats.histogram.counts, vec![2, 2, 2, 2, 2]);
        assert_eq!(stats.histogram.total(), 10);
    }

    #[test]
    fn test_rebin_keeps_bounds() {
        let values = [0.0, 1.0, 2.0, 3.0];
        let mut stats = NumericSummaryStats::with_bounds(&values, 2, (0.0, 10.0)).unwrap();
        assert_eq!(stats.histogram.counts, vec![4, 0]);

        stats.set_num_histogram_bins(&values, 5);

        assert_eq!(stats.histogram.layout.max, 10.0);
        assert_eq!(stats.histogram.counts, vec![2, 2, 0, 0, 0]);
        assert_eq!(stats.mean, 1.5);
    }
}
