//! Change notifications published by a [`DataTable`]

use crate::column::ColumnId;
use crate::selection::RangeId;
use crate::table::DataTable;

/// A single change to a table. Each variant carries only the delta; the
/// updated state is read back from the table passed alongside it.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// Columns and tuples were replaced wholesale
    Reset,
    TuplesAdded { count: usize },
    TuplesRemoved { count: usize },
    ColumnAdded { column: ColumnId },
    ColumnRemoved { column: ColumnId, name: String },
    ColumnEnabled { column: ColumnId },
    ColumnDisabled { column: ColumnId },
    ColumnsDisabled { columns: Vec<ColumnId> },
    ColumnReordered { column: ColumnId, from: usize, to: usize },
    ColumnRenamed { column: ColumnId, old_name: String },
    ColumnValuesChanged { column: ColumnId },
    FocusRangeChanged { column: ColumnId },
    QueryCleared,
    QueryColumnCleared { column: ColumnId },
    SelectionRangeAdded { column: ColumnId, range: RangeId },
    SelectionRangeRemoved { column: ColumnId, range: RangeId },
    SelectionRangeChanged { column: ColumnId, range: RangeId },
    HighlightedColumnChanged { old: Option<ColumnId>, new: Option<ColumnId> },
    HistogramBinsChanged { bins: usize },
    StatisticsSettingsChanged,
}

impl TableEvent {
    /// Whether the event changes the query partition
    pub fn affects_query(&self) -> bool {
        matches!(
            self,
            TableEvent::Reset
                | TableEvent::TuplesAdded { .. }
                | TableEvent::TuplesRemoved { .. }
                | TableEvent::ColumnValuesChanged { .. }
                | TableEvent::QueryCleared
                | TableEvent::QueryColumnCleared { .. }
                | TableEvent::SelectionRangeAdded { .. }
                | TableEvent::SelectionRangeRemoved { .. }
                | TableEvent::SelectionRangeChanged { .. }
        )
    }
}

/// Receives table changes after the table has reached a consistent state
pub trait TableListener: Send + Sync {
    fn on_table_event(&self, table: &DataTable, event: &TableEvent);
}

impl<F> TableListener for F
where
    F: Fn(&DataTable, &TableEvent) + Send + Sync,
{
    fn on_table_event(&self, table: &DataTable, event: &TableEvent) {
        self(table, event)
    }
}
