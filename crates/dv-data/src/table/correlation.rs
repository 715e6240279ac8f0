use serde::Serialize;

use crate::column::ColumnId;

/// Pearson coefficients between every pair of enabled numeric columns,
/// ordered as the columns are displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<ColumnId>,
    /// `coefficients[i][j]` is `None` when either column has no variance
    /// over the chosen rows or fewer than two complete pairs
    pub coefficients: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, a: ColumnId, b: ColumnId) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == a)?;
        let j = self.columns.iter().position(|c| *c == b)?;
        self.coefficients[i][j]
    }
}
