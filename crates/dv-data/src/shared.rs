//! A data table shared between threads and views

use std::sync::Arc;

use tracing::info;

use dv_core::ExclusiveCell;

use crate::sources::TableSource;
use crate::table::DataTable;
use crate::Result;

/// Cloneable handle to one [`DataTable`].
///
/// Mutations are serialised. A listener that tries to read or mutate the
/// table through a handle while a mutation is being published gets
/// [`crate::TableError::ConcurrentRecomputation`]; the listener already
/// receives the table by reference.
#[derive(Debug, Clone, Default)]
pub struct SharedDataTable {
    inner: Arc<ExclusiveCell<DataTable>>,
}

impl SharedDataTable {
    pub fn new(table: DataTable) -> Self {
        Self {
            inner: Arc::new(ExclusiveCell::new(table)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DataTable) -> R) -> Result<R> {
        Ok(self.inner.read(f)?)
    }

    pub fn mutate<R>(&self, f: impl FnOnce(&mut DataTable) -> R) -> Result<R> {
        Ok(self.inner.mutate(f)?)
    }

    /// Like [`Self::mutate`] for operations that can fail
    pub fn try_mutate<R>(&self, f: impl FnOnce(&mut DataTable) -> Result<R>) -> Result<R> {
        self.inner.mutate(f)?
    }

    /// Read `source` off the lock, then replace the table contents with it
    pub async fn load(&self, source: &dyn TableSource) -> Result<()> {
        let data = source.read_table().await?;
        let rows = data.row_count();
        self.try_mutate(|table| table.set_data(data.columns))?;
        info!(source = %source.source_name(), rows, "table loaded");
        Ok(())
    }
}
