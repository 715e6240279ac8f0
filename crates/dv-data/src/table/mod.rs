//! The data table: columns, tuples, the active query and their statistics
//!
//! Every mutating operation validates its input before touching any state,
//! so an error means nothing changed. After a successful mutation the
//! overall, queried and non-queried statistics are brought up to date and
//! only then are listeners notified.

mod correlation;
mod events;

use std::sync::Arc;

use ahash::AHashSet;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use dv_core::{Subscribers, SubscriptionId, TableSettings};

use crate::column::{
    retain_rows, Column, ColumnData, ColumnId, ColumnMap, ColumnSpec, FocusContext, FocusRange,
};
use crate::query::Query;
use crate::selection::{ColumnSelectionRange, RangeId, SelectionBounds};
use crate::stats::{self, pearson_correlation, ColumnSummaryStats, StatsScope};
use crate::tuple::{Tuple, TupleId, Value};
use crate::{Result, TableError};

pub use correlation::CorrelationMatrix;
pub use events::{TableEvent, TableListener};

/// In-memory table of typed columns
#[derive(Debug, Default)]
pub struct DataTable {
    settings: TableSettings,
    columns: ColumnMap,
    enabled: Vec<ColumnId>,
    disabled: Vec<ColumnId>,
    tuple_ids: Vec<TupleId>,
    order_factors: Vec<f64>,
    next_column_id: u32,
    next_tuple_id: u64,
    query: Query,
    highlighted: Option<ColumnId>,
    listeners: Subscribers<dyn TableListener>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: TableSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    pub fn subscribe(&self, listener: &Arc<dyn TableListener>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // ---- Columns ----

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.values().find(|column| column.name() == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Enabled column ids in display order
    pub fn enabled_column_ids(&self) -> &[ColumnId] {
        &self.enabled
    }

    pub fn disabled_column_ids(&self) -> &[ColumnId] {
        &self.disabled
    }

    pub fn enabled_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.enabled.iter().filter_map(|id| self.columns.get(id))
    }

    pub fn disabled_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.disabled.iter().filter_map(|id| self.columns.get(id))
    }

    /// Position of an enabled column in display order
    pub fn column_position(&self, id: ColumnId) -> Option<usize> {
        self.enabled.iter().position(|c| *c == id)
    }

    /// Order in which [`DataTable::append_tuples`] expects row values: the
    /// enabled stored columns in display order, then the disabled stored
    /// columns. Bivariate columns take no value.
    pub fn append_layout(&self) -> Vec<ColumnId> {
        self.enabled
            .iter()
            .chain(&self.disabled)
            .filter(|id| self.columns.get(id).is_some_and(|c| !c.data().is_derived()))
            .copied()
            .collect()
    }

    /// Replace every column and tuple. The query, the highlighted column
    /// and all order factors are reset.
    pub fn set_data(&mut self, specs: Vec<ColumnSpec>) -> Result<()> {
        let mut rows = None;
        {
            let mut names = AHashSet::new();
            for spec in &specs {
                if !names.insert(spec.name.as_str()) {
                    return Err(TableError::DuplicateColumnName {
                        name: spec.name.clone(),
                    });
                }
                let len = stored_len(spec)?;
                match rows {
                    Some(expected) if expected != len => {
                        return Err(TableError::SchemaMismatch { expected, actual: len });
                    }
                    Some(_) => {}
                    None => rows = Some(len),
                }
            }
        }

        self.columns.clear();
        self.enabled.clear();
        self.disabled.clear();
        self.query = Query::new();
        self.highlighted = None;
        for spec in specs {
            let id = self.allocate_column_id();
            self.columns.insert(id, Column::new(id, spec.name, spec.data));
            self.enabled.push(id);
        }

        let count = rows.unwrap_or(0);
        self.tuple_ids.clear();
        self.order_factors.clear();
        self.allocate_tuples(count);

        self.recompute_statistics();
        self.refresh_query();

        info!(columns = self.columns.len(), tuples = count, "table data set");
        self.notify(TableEvent::Reset);
        Ok(())
    }

    /// Append a stored column. Its values must cover every existing tuple;
    /// on a table without stored columns or tuples they define the tuples.
    pub fn add_column(&mut self, spec: ColumnSpec) -> Result<ColumnId> {
        self.check_name_free(&spec.name, None)?;
        let len = stored_len(&spec)?;
        let creates_rows = self.tuple_count() == 0 && self.stored_column_count() == 0;
        if !creates_rows && len != self.tuple_count() {
            return Err(TableError::SchemaMismatch {
                expected: self.tuple_count(),
                actual: len,
            });
        }

        let id = self.allocate_column_id();
        if creates_rows {
            self.allocate_tuples(len);
        }
        self.columns.insert(id, Column::new(id, spec.name, spec.data));
        self.enabled.push(id);
        self.recompute_column_statistics(&[id]);

        if creates_rows {
            self.refresh_query();
        } else {
            self.refresh_column_query_statistics(id);
        }

        debug!(column = %id, "column added");
        self.notify(TableEvent::ColumnAdded { column: id });
        Ok(id)
    }

    /// Add a column derived from two numeric columns, shown at `position`
    /// among the enabled columns
    pub fn add_bivariate_column(&mut self, x: ColumnId, y: ColumnId, position: usize) -> Result<ColumnId> {
        let x_name = self.numeric_column(x)?.name().to_string();
        let y_name = self.numeric_column(y)?.name().to_string();
        let name = format!("{} vs {}", x_name, y_name);
        self.check_name_free(&name, None)?;

        let id = self.allocate_column_id();
        self.columns
            .insert(id, Column::new(id, name, ColumnData::Bivariate { x, y }));
        let position = position.min(self.enabled.len());
        self.enabled.insert(position, id);
        self.recompute_column_statistics(&[id]);
        self.refresh_column_query_statistics(id);

        debug!(column = %id, x = %x, y = %y, "bivariate column added");
        self.notify(TableEvent::ColumnAdded { column: id });
        Ok(id)
    }

    /// Remove a column and its values. Rejected while a bivariate column
    /// reads from it.
    pub fn remove_column(&mut self, id: ColumnId) -> Result<()> {
        let column = self.lookup(id)?;
        if let Some(dependent) = self.columns.values().find(|c| c.depends_on(id)) {
            return Err(TableError::ColumnInUse {
                column: column.name().to_string(),
                dependent: dependent.name().to_string(),
            });
        }

        let dropped_ranges = !self.query.clear_column(id).is_empty();
        self.query.forget_column(id);
        self.enabled.retain(|c| *c != id);
        self.disabled.retain(|c| *c != id);
        let name = self
            .columns
            .remove(&id)
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        let unhighlighted = self.unhighlight(id);
        if dropped_ranges {
            self.refresh_query();
        }

        debug!(column = %id, "column removed");
        self.notify(TableEvent::ColumnRemoved { column: id, name });
        self.notify_side_effects(id, dropped_ranges, unhighlighted);
        Ok(())
    }

    /// Move a disabled column back to the end of the enabled columns. The
    /// values it held while disabled are kept as they were.
    pub fn enable_column(&mut self, id: ColumnId) -> Result<()> {
        let Some(idx) = self.disabled.iter().position(|c| *c == id) else {
            return Err(self.not_found(id));
        };

        self.disabled.remove(idx);
        self.enabled.push(id);
        if let Some(column) = self.columns.get_mut(&id) {
            column.set_enabled(true);
        }
        self.refresh_column_query_statistics(id);

        debug!(column = %id, "column enabled");
        self.notify(TableEvent::ColumnEnabled { column: id });
        Ok(())
    }

    /// Move an enabled column to the disabled list. Its selection ranges are
    /// dropped.
    pub fn disable_column(&mut self, id: ColumnId) -> Result<()> {
        if !self.enabled.contains(&id) {
            return Err(self.not_found(id));
        }

        let (dropped_ranges, unhighlighted) = self.disable_unchecked(id);
        if dropped_ranges {
            self.refresh_query();
        }

        debug!(column = %id, "column disabled");
        self.notify(TableEvent::ColumnDisabled { column: id });
        self.notify_side_effects(id, dropped_ranges, unhighlighted);
        Ok(())
    }

    /// Disable several columns with a single notification
    pub fn disable_columns(&mut self, ids: &[ColumnId]) -> Result<()> {
        let mut seen = AHashSet::new();
        for id in ids {
            if !self.enabled.contains(id) || !seen.insert(*id) {
                return Err(self.not_found(*id));
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let mut cleared = Vec::new();
        let mut unhighlighted = None;
        for id in ids {
            let (dropped_ranges, was_highlighted) = self.disable_unchecked(*id);
            if dropped_ranges {
                cleared.push(*id);
            }
            if was_highlighted {
                unhighlighted = Some(*id);
            }
        }
        if !cleared.is_empty() {
            self.refresh_query();
        }

        debug!(count = ids.len(), "columns disabled");
        self.notify(TableEvent::ColumnsDisabled { columns: ids.to_vec() });
        for id in cleared {
            self.notify(TableEvent::QueryColumnCleared { column: id });
        }
        if let Some(old) = unhighlighted {
            self.notify(TableEvent::HighlightedColumnChanged { old: Some(old), new: None });
        }
        Ok(())
    }

    pub fn rename_column(&mut self, id: ColumnId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let old_name = self.lookup(id)?.name().to_string();
        if old_name == name {
            return Ok(());
        }
        self.check_name_free(&name, Some(id))?;

        if let Some(column) = self.columns.get_mut(&id) {
            column.set_name(name);
        }

        self.notify(TableEvent::ColumnRenamed { column: id, old_name });
        Ok(())
    }

    /// Move an enabled column to `position` in display order; positions past
    /// the end move it to the last place
    pub fn move_column(&mut self, id: ColumnId, position: usize) -> Result<()> {
        let Some(from) = self.column_position(id) else {
            return Err(self.not_found(id));
        };
        let to = position.min(self.enabled.len() - 1);
        if from == to {
            return Ok(());
        }

        self.enabled.remove(from);
        self.enabled.insert(to, id);

        self.notify(TableEvent::ColumnReordered { column: id, from, to });
        Ok(())
    }

    /// Replace all values of a stored column. Statistics of the column and
    /// of every bivariate column derived from it are recomputed and the
    /// query is re-evaluated.
    pub fn replace_column_values(&mut self, id: ColumnId, data: ColumnData) -> Result<()> {
        let column = self.lookup(id)?;
        if column.data().is_derived() || column.kind() != data.kind() {
            return Err(TableError::UnsupportedColumnKind {
                column: column.name().to_string(),
                expected: column.kind().label().to_string(),
            });
        }
        let len = data.len().unwrap_or(0);
        if len != self.tuple_count() {
            return Err(TableError::SchemaMismatch {
                expected: self.tuple_count(),
                actual: len,
            });
        }

        if let Some(column) = self.columns.get_mut(&id) {
            column.set_data(data);
        }
        let mut targets = vec![id];
        targets.extend(self.columns.values().filter(|c| c.depends_on(id)).map(Column::id));
        self.recompute_column_statistics(&targets);
        self.refresh_query();

        debug!(column = %id, dependents = targets.len() - 1, "column values replaced");
        self.notify(TableEvent::ColumnValuesChanged { column: id });
        Ok(())
    }

    // ---- Tuples ----

    pub fn tuple_count(&self) -> usize {
        self.tuple_ids.len()
    }

    pub fn tuple_id(&self, row: usize) -> Option<TupleId> {
        self.tuple_ids.get(row).copied()
    }

    /// Current row index of a tuple
    pub fn row_of(&self, id: TupleId) -> Option<usize> {
        self.tuple_ids.binary_search(&id).ok()
    }

    /// Value of `column` at `row`; bivariate columns yield the source pair
    pub fn value(&self, row: usize, column: ColumnId) -> Option<Value> {
        let column = self.columns.get(&column)?;
        match column.data() {
            ColumnData::Bivariate { x, y } => {
                let xs = self.columns.get(x)?.numeric_values()?;
                let ys = self.columns.get(y)?.numeric_values()?;
                Some(Value::Pair(*xs.get(row)?, *ys.get(row)?))
            }
            data => data.value(row),
        }
    }

    /// Row `row` with one value per enabled column, in display order
    pub fn tuple(&self, row: usize) -> Result<Tuple> {
        let Some(id) = self.tuple_id(row) else {
            return Err(TableError::TupleOutOfRange {
                index: row,
                count: self.tuple_count(),
            });
        };
        Ok(Tuple {
            id,
            values: self.enabled.iter().filter_map(|c| self.value(row, *c)).collect(),
            query_flag: self.query.is_queried(row),
            order_factor: self.order_factors[row],
        })
    }

    pub fn tuples(&self) -> impl Iterator<Item = Tuple> + '_ {
        (0..self.tuple_count()).filter_map(|row| self.tuple(row).ok())
    }

    /// Rows of values laid out as [`DataTable::append_layout`] describes.
    /// Returns the ids of the new tuples.
    pub fn append_tuples(&mut self, rows: Vec<Vec<Value>>) -> Result<Vec<TupleId>> {
        let layout = self.append_layout();
        for row in &rows {
            if row.len() != layout.len() {
                return Err(TableError::SchemaMismatch {
                    expected: layout.len(),
                    actual: row.len(),
                });
            }
            for (id, value) in layout.iter().zip(row) {
                let column = self.lookup(*id)?;
                if !column.data().accepts(value) {
                    return Err(TableError::UnsupportedColumnKind {
                        column: column.name().to_string(),
                        expected: column.kind().label().to_string(),
                    });
                }
            }
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        for row in &rows {
            for (id, value) in layout.iter().zip(row) {
                if let Some(column) = self.columns.get_mut(id) {
                    column.data_mut().push(value);
                }
            }
        }
        let first = self.tuple_count();
        self.allocate_tuples(rows.len());

        self.recompute_statistics();
        self.refresh_query();

        info!(count = rows.len(), total = self.tuple_count(), "tuples appended");
        self.notify(TableEvent::TuplesAdded { count: rows.len() });
        Ok(self.tuple_ids[first..].to_vec())
    }

    /// Delete every tuple inside the query, then clear the query
    pub fn remove_queried_tuples(&mut self) -> Result<usize> {
        self.remove_partition(true)
    }

    /// Delete every tuple outside the query, then clear the query
    pub fn remove_unqueried_tuples(&mut self) -> Result<usize> {
        self.remove_partition(false)
    }

    fn remove_partition(&mut self, queried: bool) -> Result<usize> {
        if !self.query.has_column_selections() {
            return Err(TableError::NoActiveQuery);
        }

        let keep: Vec<bool> = (0..self.tuple_count())
            .map(|row| self.query.is_queried(row) != queried)
            .collect();
        let removed = keep.iter().filter(|kept| !**kept).count();

        for column in self.columns.values_mut() {
            column.data_mut().retain_rows(&keep);
        }
        retain_rows(&mut self.tuple_ids, &keep);
        retain_rows(&mut self.order_factors, &keep);
        self.query.clear();

        self.recompute_statistics();
        self.refresh_query();

        info!(removed, remaining = self.tuple_count(), queried, "tuples removed");
        self.notify(TableEvent::TuplesRemoved { count: removed });
        self.notify(TableEvent::QueryCleared);
        Ok(removed)
    }

    pub fn order_factor(&self, row: usize) -> Option<f64> {
        self.order_factors.get(row).copied()
    }

    pub fn set_order_factor(&mut self, row: usize, factor: f64) -> Result<()> {
        let count = self.tuple_count();
        let Some(slot) = self.order_factors.get_mut(row) else {
            return Err(TableError::TupleOutOfRange { index: row, count });
        };
        *slot = factor;
        Ok(())
    }

    /// Row indices sorted by descending order factor; equal factors keep
    /// their row order
    pub fn rows_by_order_factor(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..self.tuple_count()).collect();
        rows.sort_by(|a, b| self.order_factors[*b].total_cmp(&self.order_factors[*a]));
        rows
    }

    // ---- Query ----

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn is_queried(&self, row: usize) -> bool {
        self.query.is_queried(row)
    }

    pub fn add_selection_range(&mut self, column: ColumnId, bounds: SelectionBounds) -> Result<RangeId> {
        if !self.enabled.contains(&column) {
            return Err(self.not_found(column));
        }
        let target = self.lookup(column)?;
        bounds.validate(target.kind(), target.name())?;

        let range = self.query.insert_range(column, bounds);
        self.refresh_query();

        debug!(column = %column, range = %range, queried = self.query.queried_count(), "selection added");
        self.notify(TableEvent::SelectionRangeAdded { column, range });
        Ok(range)
    }

    pub fn remove_selection_range(&mut self, range: RangeId) -> Result<ColumnSelectionRange> {
        let removed = self
            .query
            .remove_range(range)
            .ok_or_else(|| unknown_range(range))?;
        self.refresh_query();

        self.notify(TableEvent::SelectionRangeRemoved {
            column: removed.column,
            range,
        });
        Ok(removed)
    }

    pub fn update_selection_range(&mut self, range: RangeId, bounds: SelectionBounds) -> Result<()> {
        let column = self
            .query
            .range(range)
            .map(|r| r.column)
            .ok_or_else(|| unknown_range(range))?;
        let target = self.lookup(column)?;
        bounds.validate(target.kind(), target.name())?;

        self.query.replace_bounds(range, bounds);
        self.refresh_query();

        self.notify(TableEvent::SelectionRangeChanged { column, range });
        Ok(())
    }

    /// Drop every selection range. Does nothing when there are none.
    pub fn clear_query(&mut self) {
        if !self.query.clear() {
            return;
        }
        self.refresh_query();
        self.notify(TableEvent::QueryCleared);
    }

    /// Drop the selection ranges of one column, returning how many there were
    pub fn clear_column_query(&mut self, column: ColumnId) -> Result<usize> {
        self.lookup(column)?;
        let removed = self.query.clear_column(column);
        if removed.is_empty() {
            return Ok(0);
        }
        self.refresh_query();
        self.notify(TableEvent::QueryColumnCleared { column });
        Ok(removed.len())
    }

    // ---- Statistics ----

    /// Histogram bin count currently in effect
    pub fn num_histogram_bins(&self) -> usize {
        self.settings.bins_for(self.tuple_count())
    }

    /// Fix the histogram bin count and rebuild every histogram in all three
    /// scopes. Other statistics are left as they are.
    pub fn set_num_histogram_bins(&mut self, bins: usize) -> Result<()> {
        if bins == 0 {
            return Err(TableError::InvalidBinCount(bins));
        }
        self.settings.num_histogram_bins = Some(bins);

        let ids: Vec<ColumnId> = self.columns.keys().copied().collect();
        for id in ids {
            let Some(mut summary) = self.columns.get_mut(&id).and_then(Column::take_statistics) else {
                continue;
            };
            if let Some(column) = self.columns.get(&id) {
                if let Err(err) = stats::rebin(&mut summary, column, &self.columns, None, bins) {
                    warn!(column = column.name(), error = %err, "failed to rebin histogram");
                }
            }
            if let Some(column) = self.columns.get_mut(&id) {
                column.set_statistics(Some(summary));
            }
        }
        self.query.rebin(&self.columns, bins);

        debug!(bins, "histogram bins changed");
        self.notify(TableEvent::HistogramBinsChanged { bins });
        Ok(())
    }

    pub fn set_calculate_query_statistics(&mut self, enabled: bool) {
        if self.settings.calculate_query_statistics == enabled {
            return;
        }
        self.settings.calculate_query_statistics = enabled;
        self.refresh_subset_statistics();
        self.notify(TableEvent::StatisticsSettingsChanged);
    }

    pub fn set_calculate_nonquery_statistics(&mut self, enabled: bool) {
        if self.settings.calculate_nonquery_statistics == enabled {
            return;
        }
        self.settings.calculate_nonquery_statistics = enabled;
        self.refresh_subset_statistics();
        self.notify(TableEvent::StatisticsSettingsChanged);
    }

    pub fn statistics(&self, column: ColumnId, scope: StatsScope) -> Option<&ColumnSummaryStats> {
        match scope {
            StatsScope::All => self.columns.get(&column)?.statistics(),
            StatsScope::Queried => self.query.query_stats(column),
            StatsScope::NonQueried => self.query.nonquery_stats(column),
        }
    }

    pub fn query_stats(&self, column: ColumnId) -> Option<&ColumnSummaryStats> {
        self.query.query_stats(column)
    }

    pub fn nonquery_stats(&self, column: ColumnId) -> Option<&ColumnSummaryStats> {
        self.query.nonquery_stats(column)
    }

    /// Pearson correlation between every pair of enabled numeric columns
    /// over the rows of `scope`
    pub fn correlation_matrix(&self, scope: StatsScope) -> CorrelationMatrix {
        let rows = match scope {
            StatsScope::All => None,
            StatsScope::Queried => Some(self.query.queried_rows()),
            StatsScope::NonQueried => Some(self.query.non_queried_rows()),
        };
        let (columns, values): (Vec<ColumnId>, Vec<_>) = self
            .enabled_columns()
            .filter_map(|c| Some((c.id(), stats::gather(c.numeric_values()?, rows))))
            .unzip();

        let n = columns.len();
        let mut coefficients = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = pearson_correlation(&values[i], &values[j]);
                coefficients[i][j] = r;
                coefficients[j][i] = r;
            }
        }

        CorrelationMatrix { columns, coefficients }
    }

    // ---- Highlight and focus ----

    pub fn highlighted_column(&self) -> Option<ColumnId> {
        self.highlighted
    }

    pub fn set_highlighted_column(&mut self, column: Option<ColumnId>) -> Result<()> {
        if let Some(id) = column {
            if !self.enabled.contains(&id) {
                return Err(self.not_found(id));
            }
        }
        if self.highlighted == column {
            return Ok(());
        }
        let old = std::mem::replace(&mut self.highlighted, column);
        self.notify(TableEvent::HighlightedColumnChanged { old, new: column });
        Ok(())
    }

    /// Restrict the focus region of a numeric column to `[min, max]`,
    /// clipped to the column's scale range
    pub fn set_focus_range(&mut self, column: ColumnId, min: f64, max: f64) -> Result<()> {
        let target = self.numeric_column(column)?;
        let invalid = |reason: &str| {
            TableError::InvalidRange(format!("focus [{}, {}] on '{}' {}", min, max, target.name(), reason))
        };
        if min.is_nan() || max.is_nan() || min > max {
            return Err(invalid("is reversed or NaN"));
        }
        let Some((lower, upper)) = target.scale_range() else {
            return Err(TableError::EmptyDataSet);
        };
        if max < lower || min > upper {
            return Err(invalid(&format!("lies outside the scale [{}, {}]", lower, upper)));
        }
        let focus = FocusRange {
            min: min.max(lower),
            max: max.min(upper),
        };
        if let Some(target) = self.columns.get_mut(&column) {
            target.set_focus(Some(focus));
        }
        self.notify(TableEvent::FocusRangeChanged { column });
        Ok(())
    }

    /// Reset the focus region to the column's full scale
    pub fn clear_focus_range(&mut self, column: ColumnId) -> Result<()> {
        self.numeric_column(column)?;
        if let Some(target) = self.columns.get_mut(&column) {
            target.set_focus(None);
        }
        self.notify(TableEvent::FocusRangeChanged { column });
        Ok(())
    }

    /// Split rows into those below, inside and above the focus range
    pub fn focus_context(&self, column: ColumnId) -> Result<FocusContext> {
        let target = self.numeric_column(column)?;
        let mut context = FocusContext::default();
        let (Some(values), Some(focus)) = (target.numeric_values(), target.focus_range()) else {
            return Ok(context);
        };
        for (row, value) in values.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            if *value < focus.min {
                context.lower.push(row);
            } else if *value > focus.max {
                context.upper.push(row);
            } else {
                context.focus.push(row);
            }
        }
        Ok(context)
    }

    // ---- Internals ----

    fn notify(&self, event: TableEvent) {
        let failures = self
            .listeners
            .notify(|listener| listener.on_table_event(self, &event));
        if failures > 0 {
            warn!(failures, event = ?event, "listeners failed while handling table event");
        }
    }

    fn notify_side_effects(&self, column: ColumnId, dropped_ranges: bool, unhighlighted: bool) {
        if dropped_ranges {
            self.notify(TableEvent::QueryColumnCleared { column });
        }
        if unhighlighted {
            self.notify(TableEvent::HighlightedColumnChanged {
                old: Some(column),
                new: None,
            });
        }
    }

    fn lookup(&self, id: ColumnId) -> Result<&Column> {
        self.columns.get(&id).ok_or_else(|| self.not_found(id))
    }

    fn numeric_column(&self, id: ColumnId) -> Result<&Column> {
        let column = self.lookup(id)?;
        if column.numeric_values().is_none() {
            return Err(TableError::UnsupportedColumnKind {
                column: column.name().to_string(),
                expected: "numeric".to_string(),
            });
        }
        Ok(column)
    }

    fn not_found(&self, id: ColumnId) -> TableError {
        let column = match self.columns.get(&id) {
            Some(column) => column.name().to_string(),
            None => id.to_string(),
        };
        TableError::ColumnNotFound { column }
    }

    fn check_name_free(&self, name: &str, except: Option<ColumnId>) -> Result<()> {
        let taken = self
            .columns
            .values()
            .any(|c| c.name() == name && Some(c.id()) != except);
        if taken {
            return Err(TableError::DuplicateColumnName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn stored_column_count(&self) -> usize {
        self.columns.values().filter(|c| !c.data().is_derived()).count()
    }

    fn allocate_column_id(&mut self) -> ColumnId {
        let id = ColumnId(self.next_column_id);
        self.next_column_id += 1;
        id
    }

    fn allocate_tuples(&mut self, count: usize) {
        for _ in 0..count {
            self.tuple_ids.push(TupleId(self.next_tuple_id));
            self.next_tuple_id += 1;
            self.order_factors.push(0.0);
        }
    }

    /// Returns whether ranges were dropped and whether the column was
    /// highlighted
    fn disable_unchecked(&mut self, id: ColumnId) -> (bool, bool) {
        self.enabled.retain(|c| *c != id);
        self.disabled.push(id);
        if let Some(column) = self.columns.get_mut(&id) {
            column.set_enabled(false);
        }
        let dropped_ranges = !self.query.clear_column(id).is_empty();
        self.query.forget_column(id);
        (dropped_ranges, self.unhighlight(id))
    }

    fn unhighlight(&mut self, id: ColumnId) -> bool {
        if self.highlighted == Some(id) {
            self.highlighted = None;
            return true;
        }
        false
    }

    /// Recompute overall statistics of every column in parallel
    fn recompute_statistics(&mut self) {
        let ids: Vec<ColumnId> = self.columns.keys().copied().collect();
        self.recompute_column_statistics(&ids);
    }

    fn recompute_column_statistics(&mut self, ids: &[ColumnId]) {
        let bins = self.num_histogram_bins();
        let columns = &self.columns;
        let computed: Vec<(ColumnId, Option<ColumnSummaryStats>)> = ids
            .par_iter()
            .filter_map(|id| {
                let column = columns.get(id)?;
                let summary = match stats::summarize(column, columns, None, bins, None) {
                    Ok(summary) => Some(summary),
                    Err(TableError::EmptyDataSet) => None,
                    Err(err) => {
                        warn!(column = column.name(), error = %err, "statistics skipped");
                        None
                    }
                };
                Some((*id, summary))
            })
            .collect();

        for (id, summary) in computed {
            if let Some(column) = self.columns.get_mut(&id) {
                column.set_statistics(summary);
            }
        }
        debug!(columns = ids.len(), bins, "column statistics recomputed");
    }

    /// Re-evaluate the partition and the subset statistics
    fn refresh_query(&mut self) {
        self.query.evaluate(&self.columns, self.tuple_ids.len());
        self.refresh_subset_statistics();
    }

    fn refresh_subset_statistics(&mut self) {
        let bins = self.num_histogram_bins();
        self.query.refresh_statistics(
            &self.columns,
            &self.enabled,
            bins,
            self.settings.calculate_query_statistics,
            self.settings.calculate_nonquery_statistics,
        );
    }

    fn refresh_column_query_statistics(&mut self, id: ColumnId) {
        let bins = self.num_histogram_bins();
        self.query.refresh_column_statistics(
            &self.columns,
            id,
            bins,
            self.settings.calculate_query_statistics,
            self.settings.calculate_nonquery_statistics,
        );
    }
}

fn stored_len(spec: &ColumnSpec) -> Result<usize> {
    spec.data.len().ok_or_else(|| TableError::UnsupportedColumnKind {
        column: spec.name.clone(),
        expected: "numeric, temporal or categorical".to_string(),
    })
}

fn unknown_range(range: RangeId) -> TableError {
    TableError::InvalidRange(format!("unknown selection range {}", range))
}
