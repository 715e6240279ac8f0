//! Summary statistics per column kind
//!
//! Statistics are always recomputed in full from a value array. The table
//! keeps one set per column over every tuple; the query keeps a second and
//! third set over the queried and non-queried subsets, aligned to the first
//! so the histograms share bins.

pub mod bivariate;
pub mod categorical;
pub mod histogram;
pub mod numeric;
pub mod temporal;

use std::borrow::Cow;

use serde::Serialize;

use crate::column::{Column, ColumnData, ColumnId, ColumnMap};
use crate::{Result, TableError};

pub use bivariate::{BivariateSummaryStats, PairBounds};
pub use categorical::CategoricalSummaryStats;
pub use histogram::{BinLayout, Histogram, Histogram2d};
pub use numeric::NumericSummaryStats;
pub use temporal::TemporalSummaryStats;

/// Which tuples a statistic is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatsScope {
    All,
    Queried,
    NonQueried,
}

/// Statistics for one column, tagged by column kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnSummaryStats {
    Numeric(NumericSummaryStats),
    Temporal(TemporalSummaryStats),
    Categorical(CategoricalSummaryStats),
    Bivariate(BivariateSummaryStats),
}

impl ColumnSummaryStats {
    pub fn as_numeric(&self) -> Option<&NumericSummaryStats> {
        match self {
            ColumnSummaryStats::Numeric(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_temporal(&self) -> Option<&TemporalSummaryStats> {
        match self {
            ColumnSummaryStats::Temporal(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalSummaryStats> {
        match self {
            ColumnSummaryStats::Categorical(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_bivariate(&self) -> Option<&BivariateSummaryStats> {
        match self {
            ColumnSummaryStats::Bivariate(stats) => Some(stats),
            _ => None,
        }
    }

    /// Number of values the statistics were computed over
    pub fn count(&self) -> usize {
        match self {
            ColumnSummaryStats::Numeric(stats) => stats.count,
            ColumnSummaryStats::Temporal(stats) => stats.count,
            ColumnSummaryStats::Categorical(stats) => stats.count,
            ColumnSummaryStats::Bivariate(stats) => stats.pair_count,
        }
    }

    pub fn num_bins(&self) -> usize {
        match self {
            ColumnSummaryStats::Numeric(stats) => stats.histogram.num_bins(),
            ColumnSummaryStats::Temporal(stats) => stats.histogram.num_bins(),
            ColumnSummaryStats::Categorical(stats) => stats.num_bins(),
            ColumnSummaryStats::Bivariate(stats) => stats.histogram.x.bins,
        }
    }

    pub fn max_bin_count(&self) -> usize {
        match self {
            ColumnSummaryStats::Numeric(stats) => stats.histogram.max_bin_count(),
            ColumnSummaryStats::Temporal(stats) => stats.histogram.max_bin_count(),
            ColumnSummaryStats::Categorical(stats) => stats.max_bin_count(),
            ColumnSummaryStats::Bivariate(stats) => stats.histogram.max_bin_count(),
        }
    }
}

/// Lower quartile, median and upper quartile of sorted, non-empty values,
/// linearly interpolated between ranks
pub(crate) fn quartiles(sorted: &[f64]) -> (f64, f64, f64) {
    let last = (sorted.len() - 1) as f64;
    (
        interpolate(sorted, last * 0.25),
        interpolate(sorted, last * 0.5),
        interpolate(sorted, last * 0.75),
    )
}

fn interpolate(sorted: &[f64], idx: f64) -> f64 {
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper || upper >= sorted.len() {
        sorted[lower]
    } else {
        let fraction = idx - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Pearson correlation over pairs where both sides are finite
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Values at `rows`, or every value when `rows` is `None`
pub(crate) fn gather<'a, T: Clone>(values: &'a [T], rows: Option<&[usize]>) -> Cow<'a, [T]> {
    match rows {
        None => Cow::Borrowed(values),
        Some(rows) => Cow::Owned(rows.iter().filter_map(|&row| values.get(row).cloned()).collect()),
    }
}

fn source<'a>(columns: &'a ColumnMap, id: ColumnId, dependent: &Column) -> Result<&'a [f64]> {
    let column = columns.get(&id).ok_or_else(|| TableError::ColumnNotFound {
        column: format!("source of '{}'", dependent.name()),
    })?;
    column.numeric_values().ok_or_else(|| TableError::UnsupportedColumnKind {
        column: column.name().to_string(),
        expected: "numeric".to_string(),
    })
}

/// Compute statistics for `column` over `rows` (all rows when `None`).
///
/// With `align`, histogram bounds (numeric / temporal / bivariate) or the
/// category domain (categorical) are taken from those statistics instead of
/// from the subset itself.
pub(crate) fn summarize(
    column: &Column,
    columns: &ColumnMap,
    rows: Option<&[usize]>,
    bins: usize,
    align: Option<&ColumnSummaryStats>,
) -> Result<ColumnSummaryStats> {
    let stats = match column.data() {
        ColumnData::Numeric(values) => {
            let values = gather(values, rows);
            let bounds = align
                .and_then(ColumnSummaryStats::as_numeric)
                .map(|s| (s.histogram.layout.min, s.histogram.layout.max));
            ColumnSummaryStats::Numeric(NumericSummaryStats::compute(&values, bins, bounds)?)
        }
        ColumnData::Temporal(values) => {
            let values = gather(values, rows);
            let bounds = align.and_then(ColumnSummaryStats::as_temporal).map(|s| (s.start, s.end));
            ColumnSummaryStats::Temporal(TemporalSummaryStats::compute(&values, bins, bounds)?)
        }
        ColumnData::Categorical(categories) => {
            let domain = align.and_then(ColumnSummaryStats::as_categorical);
            let stats = match rows {
                None => CategoricalSummaryStats::with_domain(
                    categories.iter(),
                    domain.into_iter().flat_map(|d| d.categories()),
                ),
                Some(rows) => CategoricalSummaryStats::with_domain(
                    rows.iter().filter_map(|&row| categories.get(row)),
                    domain.into_iter().flat_map(|d| d.categories()),
                ),
            }?;
            ColumnSummaryStats::Categorical(stats)
        }
        ColumnData::Bivariate { x, y } => {
            let xs = gather(source(columns, *x, column)?, rows);
            let ys = gather(source(columns, *y, column)?, rows);
            let bounds = align.and_then(ColumnSummaryStats::as_bivariate).map(|s| {
                (
                    (s.histogram.x.min, s.histogram.x.max),
                    (s.histogram.y.min, s.histogram.y.max),
                )
            });
            ColumnSummaryStats::Bivariate(BivariateSummaryStats::compute(&xs, &ys, bins, bounds)?)
        }
    };
    Ok(stats)
}

/// Rebuild only the histograms of `stats`, keeping their bounds
pub(crate) fn rebin(
    stats: &mut ColumnSummaryStats,
    column: &Column,
    columns: &ColumnMap,
    rows: Option<&[usize]>,
    bins: usize,
) -> Result<()> {
    match (stats, column.data()) {
        (ColumnSummaryStats::Numeric(stats), ColumnData::Numeric(values)) => {
            stats.set_num_histogram_bins(&gather(values, rows), bins);
        }
        (ColumnSummaryStats::Temporal(stats), ColumnData::Temporal(values)) => {
            stats.set_num_histogram_bins(&gather(values, rows), bins);
        }
        // One bin per category regardless of the bin setting
        (ColumnSummaryStats::Categorical(_), ColumnData::Categorical(_)) => {}
        (ColumnSummaryStats::Bivariate(stats), ColumnData::Bivariate { x, y }) => {
            let xs = gather(source(columns, *x, column)?, rows);
            let ys = gather(source(columns, *y, column)?, rows);
            stats.set_num_histogram_bins(&xs, &ys, bins);
        }
        _ => {
            return Err(TableError::UnsupportedColumnKind {
                column: column.name().to_string(),
                expected: column.kind().label().to_string(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Categories;

    fn column_map(columns: Vec<Column>) -> ColumnMap {
        columns.into_iter().map(|c| (c.id(), c)).collect()
    }

    #[test]
    fn test_quartiles_interpolate() {
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0]), (1.75, 2.5, 3.25));
        assert_eq!(quartiles(&[7.0]), (7.0, 7.0, 7.0));
    }

    #[test]
    fn test_pearson_correlation() {
        let xs = [1.0, 2.0, 3.0];
        assert!((pearson_correlation(&xs, &[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson_correlation(&xs, &[5.0, 5.0, 5.0]), None);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), None);
    }

    #[test]
    fn test_gather_rows() {
        let values = [10, 20, 30];
        assert_eq!(gather(&values, None).as_ref(), &[10, 20, 30]);
        assert_eq!(gather(&values, Some(&[2, 0])).as_ref(), &[30, 10]);
    }

    #[test]
    fn test_subset_aligns_to_overall_bounds() {
        let column = Column::new(ColumnId(0), "x".to_string(), ColumnData::Numeric(vec![0.0, 5.0, 10.0]));
        let columns = column_map(vec![column.clone()]);

        let overall = summarize(&column, &columns, None, 2, None).unwrap();
        let subset = summarize(&column, &columns, Some(&[1]), 2, Some(&overall)).unwrap();

        let subset = subset.as_numeric().unwrap();
        assert_eq!(subset.histogram.layout, overall.as_numeric().unwrap().histogram.layout);
        assert_eq!(subset.histogram.counts, vec![0, 1]);
        assert_eq!(subset.min, 5.0);
    }

    #[test]
    fn test_categorical_subset_keeps_domain() {
        let column = Column::new(
            ColumnId(0),
            "y".to_string(),
            ColumnData::Categorical(Categories::from_values(["A", "A", "B"])),
        );
        let columns = column_map(vec![column.clone()]);

        let overall = summarize(&column, &columns, None, 10, None).unwrap();
        let subset = summarize(&column, &columns, Some(&[2]), 10, Some(&overall)).unwrap();

        let subset = subset.as_categorical().unwrap();
        assert_eq!(subset.num_bins(), 2);
        assert_eq!(subset.count_of("A"), 0);
        assert_eq!(subset.count_of("B"), 1);
    }

    #[test]
    fn test_bivariate_reads_sources() {
        let x = Column::new(ColumnId(0), "x".to_string(), ColumnData::Numeric(vec![1.0, 2.0, 3.0]));
        let y = Column::new(ColumnId(1), "y".to_string(), ColumnData::Numeric(vec![3.0, 2.0, 1.0]));
        let xy = Column::new(
            ColumnId(2),
            "x vs y".to_string(),
            ColumnData::Bivariate { x: ColumnId(0), y: ColumnId(1) },
        );
        let columns = column_map(vec![x, y, xy.clone()]);

        let stats = summarize(&xy, &columns, None, 3, None).unwrap();
        let stats = stats.as_bivariate().unwrap();
        assert_eq!(stats.pair_count, 3);
        assert!((stats.correlation.unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rebin_numeric() {
        let column = Column::new(ColumnId(0), "x".to_string(), ColumnData::Numeric(vec![1.0, 2.0, 3.0, 4.0]));
        let columns = column_map(vec![column.clone()]);
        let mut stats = summarize(&column, &columns, None, 2, None).unwrap();

        rebin(&mut stats, &column, &columns, None, 4).unwrap();

        assert_eq!(stats.num_bins(), 4);
        assert_eq!(stats.as_numeric().unwrap().histogram.counts, vec![1, 1, 1, 1]);
    }
}
