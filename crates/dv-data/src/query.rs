//! The active query and its partition of the table's rows
//!
//! A row is queried when, for every column that carries at least one
//! selection range, it falls inside at least one of that column's ranges.
//! Columns without ranges impose no constraint. With no ranges at all every
//! row is queried and the non-queried set is empty.

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::column::{ColumnData, ColumnId, ColumnMap};
use crate::selection::{ColumnSelectionRange, RangeId, SelectionBounds};
use crate::stats::{self, ColumnSummaryStats};
use crate::TableError;

/// Selection ranges keyed by column, with the derived row partition and the
/// per-column statistics of both sides of it
#[derive(Debug, Clone, Default)]
pub struct Query {
    ranges: IndexMap<ColumnId, Vec<ColumnSelectionRange>>,
    flags: Vec<bool>,
    queried: Vec<usize>,
    non_queried: Vec<usize>,
    query_stats: AHashMap<ColumnId, ColumnSummaryStats>,
    nonquery_stats: AHashMap<ColumnId, ColumnSummaryStats>,
    next_range_id: u64,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any column carries a selection range
    pub fn has_column_selections(&self) -> bool {
        self.ranges.values().any(|ranges| !ranges.is_empty())
    }

    pub fn range_count(&self) -> usize {
        self.ranges.values().map(Vec::len).sum()
    }

    /// All ranges, grouped by column in the order columns were first selected
    pub fn ranges(&self) -> impl Iterator<Item = &ColumnSelectionRange> {
        self.ranges.values().flatten()
    }

    pub fn ranges_for(&self, column: ColumnId) -> &[ColumnSelectionRange] {
        self.ranges.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn range(&self, id: RangeId) -> Option<&ColumnSelectionRange> {
        self.ranges().find(|range| range.id == id)
    }

    /// Columns that currently constrain the query
    pub fn selected_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.ranges
            .iter()
            .filter(|(_, ranges)| !ranges.is_empty())
            .map(|(column, _)| *column)
    }

    /// Row indices inside the query, ascending
    pub fn queried_rows(&self) -> &[usize] {
        &self.queried
    }

    /// Row indices outside the query, ascending
    pub fn non_queried_rows(&self) -> &[usize] {
        &self.non_queried
    }

    pub fn queried_count(&self) -> usize {
        self.queried.len()
    }

    pub fn non_queried_count(&self) -> usize {
        self.non_queried.len()
    }

    pub fn is_queried(&self, row: usize) -> bool {
        self.flags.get(row).copied().unwrap_or(false)
    }

    /// Statistics of `column` over the queried rows
    pub fn query_stats(&self, column: ColumnId) -> Option<&ColumnSummaryStats> {
        self.query_stats.get(&column)
    }

    /// Statistics of `column` over the non-queried rows
    pub fn nonquery_stats(&self, column: ColumnId) -> Option<&ColumnSummaryStats> {
        self.nonquery_stats.get(&column)
    }

    pub(crate) fn insert_range(&mut self, column: ColumnId, bounds: SelectionBounds) -> RangeId {
        self.next_range_id += 1;
        let id = RangeId(self.next_range_id);
        self.ranges
            .entry(column)
            .or_default()
            .push(ColumnSelectionRange { id, column, bounds });
        id
    }

    pub(crate) fn remove_range(&mut self, id: RangeId) -> Option<ColumnSelectionRange> {
        let (column, idx) = self.locate(id)?;
        let ranges = self.ranges.get_mut(&column)?;
        let removed = ranges.remove(idx);
        if ranges.is_empty() {
            self.ranges.shift_remove(&column);
        }
        Some(removed)
    }

    /// Swap in new bounds for a range, returning the old ones
    pub(crate) fn replace_bounds(&mut self, id: RangeId, bounds: SelectionBounds) -> Option<SelectionBounds> {
        let (column, idx) = self.locate(id)?;
        let range = self.ranges.get_mut(&column)?.get_mut(idx)?;
        Some(std::mem::replace(&mut range.bounds, bounds))
    }

    /// Drop every range; returns whether there were any
    pub(crate) fn clear(&mut self) -> bool {
        let had_ranges = self.has_column_selections();
        self.ranges.clear();
        had_ranges
    }

    /// Drop the ranges of one column
    pub(crate) fn clear_column(&mut self, column: ColumnId) -> Vec<ColumnSelectionRange> {
        self.ranges.shift_remove(&column).unwrap_or_default()
    }

    pub(crate) fn forget_column(&mut self, column: ColumnId) {
        self.query_stats.remove(&column);
        self.nonquery_stats.remove(&column);
    }

    fn locate(&self, id: RangeId) -> Option<(ColumnId, usize)> {
        self.ranges.iter().find_map(|(column, ranges)| {
            ranges
                .iter()
                .position(|range| range.id == id)
                .map(|idx| (*column, idx))
        })
    }

    /// Recompute the row partition over `row_count` rows
    pub(crate) fn evaluate(&mut self, columns: &ColumnMap, row_count: usize) {
        let matchers: Vec<Matcher<'_>> = self
            .ranges
            .iter()
            .filter(|(_, ranges)| !ranges.is_empty())
            .filter_map(|(column, ranges)| match columns.get(column) {
                Some(column) => Some(Matcher::new(column.data(), columns, ranges)),
                None => {
                    warn!(column = column.raw(), "selection on a missing column ignored");
                    None
                }
            })
            .collect();

        self.flags = (0..row_count)
            .map(|row| matchers.iter().all(|matcher| matcher.matches(row)))
            .collect();

        self.queried.clear();
        self.non_queried.clear();
        for (row, &flag) in self.flags.iter().enumerate() {
            if flag {
                self.queried.push(row);
            } else {
                self.non_queried.push(row);
            }
        }

        debug!(
            queried = self.queried.len(),
            non_queried = self.non_queried.len(),
            constraints = matchers.len(),
            "query evaluated"
        );
    }

    /// Recompute queried and non-queried statistics for `targets`, aligned
    /// with each column's overall statistics
    pub(crate) fn refresh_statistics(
        &mut self,
        columns: &ColumnMap,
        targets: &[ColumnId],
        bins: usize,
        with_query: bool,
        with_nonquery: bool,
    ) {
        let active = self.has_column_selections();
        self.query_stats = if active && with_query {
            subset_statistics(columns, targets, &self.queried, bins)
        } else {
            AHashMap::new()
        };
        self.nonquery_stats = if active && with_nonquery {
            subset_statistics(columns, targets, &self.non_queried, bins)
        } else {
            AHashMap::new()
        };
    }

    /// Recompute the subset statistics of a single column
    pub(crate) fn refresh_column_statistics(
        &mut self,
        columns: &ColumnMap,
        column: ColumnId,
        bins: usize,
        with_query: bool,
        with_nonquery: bool,
    ) {
        self.forget_column(column);
        if !self.has_column_selections() {
            return;
        }
        if with_query {
            self.query_stats
                .extend(subset_statistics(columns, &[column], &self.queried, bins));
        }
        if with_nonquery {
            self.nonquery_stats
                .extend(subset_statistics(columns, &[column], &self.non_queried, bins));
        }
    }

    /// Rebuild the subset histograms with a new bin count
    pub(crate) fn rebin(&mut self, columns: &ColumnMap, bins: usize) {
        let scopes = [
            (&mut self.query_stats, &self.queried),
            (&mut self.nonquery_stats, &self.non_queried),
        ];
        for (cache, rows) in scopes {
            for (id, summary) in cache.iter_mut() {
                let Some(column) = columns.get(id) else { continue };
                if let Err(err) = stats::rebin(summary, column, columns, Some(rows.as_slice()), bins) {
                    warn!(column = column.name(), error = %err, "failed to rebin subset histogram");
                }
            }
        }
    }
}

fn subset_statistics(
    columns: &ColumnMap,
    targets: &[ColumnId],
    rows: &[usize],
    bins: usize,
) -> AHashMap<ColumnId, ColumnSummaryStats> {
    if rows.is_empty() {
        return AHashMap::new();
    }

    let computed: Vec<(ColumnId, ColumnSummaryStats)> = targets
        .par_iter()
        .filter_map(|id| {
            let column = columns.get(id)?;
            match stats::summarize(column, columns, Some(rows), bins, column.statistics()) {
                Ok(summary) => Some((*id, summary)),
                Err(TableError::EmptyDataSet) => None,
                Err(err) => {
                    warn!(column = column.name(), error = %err, "subset statistics skipped");
                    None
                }
            }
        })
        .collect();
    computed.into_iter().collect()
}

/// A column's ranges compiled against its storage
enum Matcher<'a> {
    Numeric {
        values: &'a [f64],
        intervals: Vec<(f64, f64)>,
    },
    Temporal {
        values: &'a [DateTime<Utc>],
        intervals: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    },
    Categorical {
        codes: &'a [u32],
        accepted: AHashSet<u32>,
    },
    Region {
        xs: &'a [f64],
        ys: &'a [f64],
        rects: Vec<[f64; 4]>,
    },
    Nothing,
}

impl<'a> Matcher<'a> {
    fn new(data: &'a ColumnData, columns: &'a ColumnMap, ranges: &[ColumnSelectionRange]) -> Self {
        match data {
            ColumnData::Numeric(values) => Matcher::Numeric {
                values,
                intervals: ranges
                    .iter()
                    .filter_map(|range| match range.bounds {
                        SelectionBounds::Numeric { min, max } => Some((min, max)),
                        _ => None,
                    })
                    .collect(),
            },
            ColumnData::Temporal(values) => Matcher::Temporal {
                values,
                intervals: ranges
                    .iter()
                    .filter_map(|range| match range.bounds {
                        SelectionBounds::Temporal { start, end } => Some((start, end)),
                        _ => None,
                    })
                    .collect(),
            },
            ColumnData::Categorical(categories) => Matcher::Categorical {
                codes: categories.codes(),
                accepted: ranges
                    .iter()
                    .filter_map(|range| match &range.bounds {
                        SelectionBounds::Categorical(set) => Some(set),
                        _ => None,
                    })
                    .flatten()
                    .filter_map(|name| categories.code_of(name))
                    .collect(),
            },
            ColumnData::Bivariate { x, y } => {
                let xs = columns.get(x).and_then(|c| c.numeric_values());
                let ys = columns.get(y).and_then(|c| c.numeric_values());
                let (Some(xs), Some(ys)) = (xs, ys) else {
                    return Matcher::Nothing;
                };
                Matcher::Region {
                    xs,
                    ys,
                    rects: ranges
                        .iter()
                        .filter_map(|range| match range.bounds {
                            SelectionBounds::Region { x_min, x_max, y_min, y_max } => {
                                Some([x_min, x_max, y_min, y_max])
                            }
                            _ => None,
                        })
                        .collect(),
                }
            }
        }
    }

    fn matches(&self, row: usize) -> bool {
        match self {
            Matcher::Numeric { values, intervals } => values
                .get(row)
                .is_some_and(|v| intervals.iter().any(|(min, max)| min <= v && v <= max)),
            Matcher::Temporal { values, intervals } => values
                .get(row)
                .is_some_and(|v| intervals.iter().any(|(start, end)| start <= v && v <= end)),
            Matcher::Categorical { codes, accepted } => {
                codes.get(row).is_some_and(|code| accepted.contains(code))
            }
            Matcher::Region { xs, ys, rects } => match (xs.get(row), ys.get(row)) {
                (Some(x), Some(y)) => rects
                    .iter()
                    .any(|r| r[0] <= *x && *x <= r[1] && r[2] <= *y && *y <= r[3]),
                _ => false,
            },
            Matcher::Nothing => false,
        }
    }
}
