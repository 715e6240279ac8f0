//! Selection ranges: one brush constraint on one column

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::column::{ColumnId, ColumnKind};
use crate::{Result, TableError};

/// Identifier of a selection range within a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeId(pub(crate) u64);

impl RangeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The accepted region of a selection. Interval bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionBounds {
    Numeric { min: f64, max: f64 },
    Temporal { start: DateTime<Utc>, end: DateTime<Utc> },
    Categorical(BTreeSet<String>),
    /// Rectangle over a bivariate column's `(x, y)` plane
    Region { x_min: f64, x_max: f64, y_min: f64, y_max: f64 },
}

impl SelectionBounds {
    pub fn numeric(min: f64, max: f64) -> Self {
        SelectionBounds::Numeric { min, max }
    }

    pub fn temporal(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        SelectionBounds::Temporal { start, end }
    }

    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectionBounds::Categorical(categories.into_iter().map(Into::into).collect())
    }

    pub fn region(x: (f64, f64), y: (f64, f64)) -> Self {
        SelectionBounds::Region {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
        }
    }

    /// Check the bounds are well formed and fit a column of `kind`
    pub fn validate(&self, kind: ColumnKind, column: &str) -> Result<()> {
        match (self, kind) {
            (SelectionBounds::Numeric { min, max }, ColumnKind::Numeric) => check_interval(*min, *max, column),
            (SelectionBounds::Temporal { start, end }, ColumnKind::Temporal) => {
                if start > end {
                    return Err(TableError::InvalidRange(format!(
                        "start {} is after end {} on '{}'",
                        start, end, column
                    )));
                }
                Ok(())
            }
            (SelectionBounds::Categorical(set), ColumnKind::Categorical) => {
                if set.is_empty() {
                    return Err(TableError::InvalidRange(format!("no categories selected on '{}'", column)));
                }
                Ok(())
            }
            (
                SelectionBounds::Region { x_min, x_max, y_min, y_max },
                ColumnKind::Bivariate { .. },
            ) => {
                check_interval(*x_min, *x_max, column)?;
                check_interval(*y_min, *y_max, column)
            }
            (bounds, kind) => Err(TableError::InvalidRange(format!(
                "{} bounds on {} column '{}'",
                bounds.label(),
                kind.label(),
                column
            ))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SelectionBounds::Numeric { .. } => "numeric",
            SelectionBounds::Temporal { .. } => "temporal",
            SelectionBounds::Categorical(_) => "categorical",
            SelectionBounds::Region { .. } => "region",
        }
    }
}

fn check_interval(min: f64, max: f64, column: &str) -> Result<()> {
    if min.is_nan() || max.is_nan() {
        return Err(TableError::InvalidRange(format!("NaN bound on '{}'", column)));
    }
    if min > max {
        return Err(TableError::InvalidRange(format!(
            "min {} is greater than max {} on '{}'",
            min, max, column
        )));
    }
    Ok(())
}

/// A selection on one column. Ranges on the same column are OR-ed; columns
/// with ranges are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelectionRange {
    pub id: RangeId,
    pub column: ColumnId,
    pub bounds: SelectionBounds,
}
