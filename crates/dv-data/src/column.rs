//! Columns and their storage
//!
//! Values live in per-column arrays addressed by a stable [`ColumnId`].
//! Enabling or disabling a column only flips its flag and moves its id
//! between the table's two ordering lists; the values are never moved.

use std::fmt;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::stats::ColumnSummaryStats;
use crate::tuple::Value;

/// Stable column identifier, unaffected by reordering or renaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub(crate) u32);

impl ColumnId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type ColumnMap = AHashMap<ColumnId, Column>;

/// The kind of values a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
    /// Derived from two numeric columns
    Bivariate { x: ColumnId, y: ColumnId },
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Bivariate { .. } => "bivariate",
        }
    }
}

/// Dictionary-encoded category values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categories {
    dictionary: IndexSet<String>,
    codes: Vec<u32>,
}

impl Categories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut categories = Self::new();
        for value in values {
            categories.push(value.as_ref());
        }
        categories
    }

    pub fn push(&mut self, value: &str) {
        let code = match self.dictionary.get_index_of(value) {
            Some(idx) => idx,
            None => self.dictionary.insert_full(value.to_string()).0,
        };
        self.codes.push(code as u32);
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .and_then(|&code| self.category(code))
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn code_of(&self, value: &str) -> Option<u32> {
        self.dictionary.get_index_of(value).map(|idx| idx as u32)
    }

    pub fn category(&self, code: u32) -> Option<&str> {
        self.dictionary.get_index(code as usize).map(String::as_str)
    }

    /// Values in row order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.codes.iter().filter_map(|&code| self.category(code))
    }

    /// Distinct categories in order of first appearance
    pub fn dictionary(&self) -> impl Iterator<Item = &str> + '_ {
        self.dictionary.iter().map(String::as_str)
    }

    /// Keep the rows flagged in `keep`. Categories left without rows are
    /// dropped from the dictionary and the remaining codes renumbered.
    fn retain_rows(&mut self, keep: &[bool]) {
        retain_rows(&mut self.codes, keep);

        let mut used = vec![false; self.dictionary.len()];
        for &code in &self.codes {
            used[code as usize] = true;
        }
        if used.iter().all(|u| *u) {
            return;
        }

        let mut remap = vec![0u32; used.len()];
        let mut dictionary = IndexSet::with_capacity(used.iter().filter(|u| **u).count());
        for (old, name) in std::mem::take(&mut self.dictionary).into_iter().enumerate() {
            if used[old] {
                remap[old] = dictionary.insert_full(name).0 as u32;
            }
        }
        for code in &mut self.codes {
            *code = remap[*code as usize];
        }
        self.dictionary = dictionary;
    }
}

/// Storage behind a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Temporal(Vec<DateTime<Utc>>),
    Categorical(Categories),
    /// Values are read from the two source columns
    Bivariate { x: ColumnId, y: ColumnId },
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Temporal(_) => ColumnKind::Temporal,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Bivariate { x, y } => ColumnKind::Bivariate { x: *x, y: *y },
        }
    }

    /// Number of stored values, `None` for derived columns
    pub fn len(&self) -> Option<usize> {
        match self {
            ColumnData::Numeric(values) => Some(values.len()),
            ColumnData::Temporal(values) => Some(values.len()),
            ColumnData::Categorical(categories) => Some(categories.len()),
            ColumnData::Bivariate { .. } => None,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, ColumnData::Bivariate { .. })
    }

    /// Stored value at `row`; derived columns have none
    pub(crate) fn value(&self, row: usize) -> Option<Value> {
        match self {
            ColumnData::Numeric(values) => values.get(row).map(|v| Value::Double(*v)),
            ColumnData::Temporal(values) => values.get(row).map(|v| Value::Instant(*v)),
            ColumnData::Categorical(categories) => {
                categories.get(row).map(|v| Value::Category(v.to_string()))
            }
            ColumnData::Bivariate { .. } => None,
        }
    }

    pub(crate) fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnData::Numeric(_), Value::Double(_))
                | (ColumnData::Temporal(_), Value::Instant(_))
                | (ColumnData::Categorical(_), Value::Category(_))
        )
    }

    /// Append a value of the matching kind; returns false otherwise
    pub(crate) fn push(&mut self, value: &Value) -> bool {
        match (self, value) {
            (ColumnData::Numeric(values), Value::Double(v)) => values.push(*v),
            (ColumnData::Temporal(values), Value::Instant(v)) => values.push(*v),
            (ColumnData::Categorical(categories), Value::Category(v)) => categories.push(v),
            _ => return false,
        }
        true
    }

    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        match self {
            ColumnData::Numeric(values) => retain_rows(values, keep),
            ColumnData::Temporal(values) => retain_rows(values, keep),
            ColumnData::Categorical(categories) => categories.retain_rows(keep),
            ColumnData::Bivariate { .. } => {}
        }
    }
}

/// Keep the entries whose flag in `keep` is set; rows past the end of
/// `keep` are kept
pub(crate) fn retain_rows<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut row = 0;
    values.retain(|_| {
        let kept = keep.get(row).copied().unwrap_or(true);
        row += 1;
        kept
    });
}

/// A named column definition together with its values
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data: ColumnData,
}

impl ColumnSpec {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn temporal(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Temporal(values),
        }
    }

    pub fn categorical<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(Categories::from_values(values)),
        }
    }
}

/// Focus interval of a numeric column; values outside it form the upper and
/// lower context regions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusRange {
    pub min: f64,
    pub max: f64,
}

/// Rows split by a column's focus range. NaN rows appear in none of the
/// three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusContext {
    pub lower: Vec<usize>,
    pub focus: Vec<usize>,
    pub upper: Vec<usize>,
}

/// One attribute of the table
#[derive(Debug, Clone)]
pub struct Column {
    id: ColumnId,
    name: String,
    enabled: bool,
    data: ColumnData,
    focus: Option<FocusRange>,
    stats: Option<ColumnSummaryStats>,
}

impl Column {
    pub(crate) fn new(id: ColumnId, name: String, data: ColumnData) -> Self {
        Self {
            id,
            name,
            enabled: true,
            data,
            focus: None,
            stats: None,
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Statistics over every tuple, `None` while the table is empty
    pub fn statistics(&self) -> Option<&ColumnSummaryStats> {
        self.stats.as_ref()
    }

    pub fn numeric_values(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            _ => None,
        }
    }

    pub fn temporal_values(&self) -> Option<&[DateTime<Utc>]> {
        match &self.data {
            ColumnData::Temporal(values) => Some(values),
            _ => None,
        }
    }

    pub fn categories(&self) -> Option<&Categories> {
        match &self.data {
            ColumnData::Categorical(categories) => Some(categories),
            _ => None,
        }
    }

    /// Whether this column reads its values from `source`
    pub fn depends_on(&self, source: ColumnId) -> bool {
        matches!(self.data, ColumnData::Bivariate { x, y } if x == source || y == source)
    }

    /// Full value extent of a numeric column
    pub fn scale_range(&self) -> Option<(f64, f64)> {
        match &self.stats {
            Some(ColumnSummaryStats::Numeric(stats)) => Some((stats.min, stats.max)),
            _ => None,
        }
    }

    /// Explicit focus range kept inside the scale range, or the scale range
    /// when none was set
    pub fn focus_range(&self) -> Option<FocusRange> {
        let (lower, upper) = self.scale_range()?;
        Some(match self.focus {
            Some(focus) => FocusRange {
                min: focus.min.clamp(lower, upper),
                max: focus.max.clamp(lower, upper),
            },
            None => FocusRange { min: lower, max: upper },
        })
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_data(&mut self, data: ColumnData) {
        self.data = data;
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub(crate) fn set_focus(&mut self, focus: Option<FocusRange>) {
        self.focus = focus;
    }

    pub(crate) fn set_statistics(&mut self, stats: Option<ColumnSummaryStats>) {
        self.stats = stats;
    }

    pub(crate) fn take_statistics(&mut self) -> Option<ColumnSummaryStats> {
        self.stats.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_dictionary_encoding() {
        let categories = Categories::from_values(["B", "A", "B"]);

        assert_eq!(categories.len(), 3);
        assert_eq!(categories.codes(), &[0, 1, 0]);
        assert_eq!(categories.get(1), Some("A"));
        assert_eq!(categories.code_of("B"), Some(0));
        assert_eq!(categories.code_of("C"), None);
        assert_eq!(categories.dictionary().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_retain_rows() {
        let mut data = ColumnData::Numeric(vec![1.0, 2.0, 3.0]);
        data.retain_rows(&[true, false, true]);
        assert_eq!(data, ColumnData::Numeric(vec![1.0, 3.0]));

        let mut data = ColumnData::Categorical(Categories::from_values(["x", "y", "z"]));
        data.retain_rows(&[false, true, true]);
        let ColumnData::Categorical(categories) = data else {
            panic!("expected categorical data");
        };
        assert_eq!(categories.iter().collect::<Vec<_>>(), vec!["y", "z"]);
    }

    #[test]
    fn test_retain_rows_drops_unused_categories() {
        let mut categories = Categories::from_values(["x", "y", "x", "z"]);
        categories.retain_rows(&[false, true, false, true]);

        assert_eq!(categories.dictionary().collect::<Vec<_>>(), vec!["y", "z"]);
        assert_eq!(categories.code_of("x"), None);
        assert_eq!(categories.codes(), &[0, 1]);
        assert_eq!(categories.iter().collect::<Vec<_>>(), vec!["y", "z"]);
    }

    #[test]
    fn test_push_checks_kind() {
        let mut data = ColumnData::Numeric(Vec::new());
        assert!(data.push(&Value::Double(1.5)));
        assert!(!data.push(&Value::Category("a".to_string())));
        assert_eq!(data.len(), Some(1));
    }

    #[test]
    fn test_depends_on() {
        let column = Column::new(
            ColumnId(2),
            "x vs y".to_string(),
            ColumnData::Bivariate { x: ColumnId(0), y: ColumnId(1) },
        );
        assert!(column.depends_on(ColumnId(1)));
        assert!(!column.depends_on(ColumnId(2)));
        assert_eq!(column.kind().label(), "bivariate");
    }
}
