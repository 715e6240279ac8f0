//! In-memory data table and query engine for linked visual analytics
//!
//! A [`DataTable`] owns typed columns, the tuples (rows) across them and the
//! active [`Query`]. Every mutation recomputes the affected summary
//! statistics for the whole table and for the queried / non-queried subsets
//! before listeners are notified.

pub mod column;
pub mod config;
pub mod query;
pub mod schema;
pub mod selection;
pub mod shared;
pub mod sources;
pub mod stats;
pub mod table;
pub mod tuple;

use thiserror::Error;
use tokio::task::JoinError;

use dv_core::CoreError;

// Re-exports
pub use column::{Column, ColumnData, ColumnId, ColumnKind, ColumnSpec, FocusContext, FocusRange};
pub use config::{ColumnKindOverride, CsvConfig, NullConfig};
pub use query::Query;
pub use selection::{ColumnSelectionRange, RangeId, SelectionBounds};
pub use shared::SharedDataTable;
pub use sources::{CsvSource, TableData, TableSource};
pub use stats::{ColumnSummaryStats, StatsScope};
pub use table::{CorrelationMatrix, DataTable, TableEvent, TableListener};
pub use tuple::{Tuple, TupleId, Value};

/// Errors that can occur in table and query operations
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Column '{column}' not found")]
    ColumnNotFound { column: String },

    #[error("A column named '{name}' already exists")]
    DuplicateColumnName { name: String },

    #[error("Column '{column}' must be {expected}")]
    UnsupportedColumnKind { column: String, expected: String },

    #[error("Column '{column}' is used by '{dependent}'")]
    ColumnInUse { column: String, dependent: String },

    #[error("Statistics requested on an empty data set")]
    EmptyDataSet,

    #[error("Invalid selection range: {0}")]
    InvalidRange(String),

    #[error("Invalid histogram bin count: {0}")]
    InvalidBinCount(usize),

    #[error("Tuple index {index} out of range ({count} tuples)")]
    TupleOutOfRange { index: usize, count: usize },

    #[error("The active query has no selection ranges")]
    NoActiveQuery,

    #[error("Table is already being recomputed")]
    ConcurrentRecomputation,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("Line {line}, column '{column}': cannot parse '{value}' as {expected}")]
    Parse {
        line: u64,
        column: String,
        value: String,
        expected: String,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

/// Result type alias for table operations
pub type Result<T> = std::result::Result<T, TableError>;

impl From<csv::Error> for TableError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => TableError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => TableError::Csv(error.to_string()),
        }
    }
}

impl From<CoreError> for TableError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Io(e) => TableError::Io(e),
            CoreError::Settings(msg) => TableError::Settings(msg),
            CoreError::Reentrant => TableError::ConcurrentRecomputation,
        }
    }
}
