//! Sources that produce table contents

pub mod csv_source;

use async_trait::async_trait;

use crate::column::ColumnSpec;
use crate::Result;

pub use csv_source::CsvSource;

/// Columns read from a source, ready for [`crate::DataTable::set_data`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub columns: Vec<ColumnSpec>,
}

impl TableData {
    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .and_then(|column| column.data.len())
            .unwrap_or(0)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}

/// Trait for table sources
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Read the whole source. Any malformed row fails the read.
    async fn read_table(&self) -> Result<TableData>;

    /// Get the source name/path
    fn source_name(&self) -> String;
}
