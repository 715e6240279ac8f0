//! Statistics for a pair of numeric columns

use serde::Serialize;

use super::histogram::{BinLayout, Histogram2d};
use super::numeric::NumericSummaryStats;
use super::pearson_correlation;
use crate::{Result, TableError};

/// Joint statistics over `(x, y)` pairs. Pairs with a NaN on either side
/// are skipped entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BivariateSummaryStats {
    pub x: NumericSummaryStats,
    pub y: NumericSummaryStats,
    pub pair_count: usize,
    /// Pearson coefficient, `None` with fewer than two pairs or no variance
    pub correlation: Option<f64>,
    pub histogram: Histogram2d,
}

/// Axis bounds used to align one 2-D histogram with another
pub type PairBounds = ((f64, f64), (f64, f64));

impl BivariateSummaryStats {
    pub fn from_values(xs: &[f64], ys: &[f64], bins: usize) -> Result<Self> {
        Self::compute(xs, ys, bins, None)
    }

    pub fn with_bounds(xs: &[f64], ys: &[f64], bins: usize, bounds: PairBounds) -> Result<Self> {
        Self::compute(xs, ys, bins, Some(bounds))
    }

    pub fn set_num_histogram_bins(&mut self, xs: &[f64], ys: &[f64], bins: usize) {
        let (px, py) = complete_pairs(xs, ys);
        let x = BinLayout::new(self.histogram.x.min, self.histogram.x.max, bins);
        let y = BinLayout::new(self.histogram.y.min, self.histogram.y.max, bins);
        self.histogram = Histogram2d::build(px.iter().copied().zip(py.iter().copied()), x, y);
        self.x.set_num_histogram_bins(&px, bins);
        self.y.set_num_histogram_bins(&py, bins);
    }

    pub(crate) fn compute(xs: &[f64], ys: &[f64], bins: usize, bounds: Option<PairBounds>) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(TableError::SchemaMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }

        let (px, py) = complete_pairs(xs, ys);
        if px.is_empty() {
            return Err(TableError::EmptyDataSet);
        }

        let x = NumericSummaryStats::compute(&px, bins, bounds.map(|b| b.0))?;
        let y = NumericSummaryStats::compute(&py, bins, bounds.map(|b| b.1))?;
        let histogram = Histogram2d::build(
            px.iter().copied().zip(py.iter().copied()),
            x.histogram.layout,
            y.histogram.layout,
        );

        Ok(Self {
            pair_count: px.len(),
            correlation: pearson_correlation(&px, &py),
            x,
            y,
            histogram,
        })
    }
}

fn complete_pairs(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    xs.iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let stats = BivariateSummaryStats::from_values(&xs, &ys, 2).unwrap();

        assert_eq!(stats.pair_count, 4);
        assert!((stats.correlation.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(stats.histogram.bin_count(0, 0), 2);
        assert_eq!(stats.histogram.bin_count(1, 1), 2);
    }

    #[test]
    fn test_nan_pairs_are_skipped() {
        let xs = [1.0, f64::NAN, 3.0];
        let ys = [1.0, 2.0, f64::NAN];
        let stats = BivariateSummaryStats::from_values(&xs, &ys, 1).unwrap();

        assert_eq!(stats.pair_count, 1);
        assert_eq!(stats.correlation, None);
    }

    #[test]
    fn test_length_mismatch() {
        let result = BivariateSummaryStats::from_values(&[1.0], &[1.0, 2.0], 1);
        assert!(matches!(result, Err(TableError::SchemaMismatch { .. })));
    }
}
