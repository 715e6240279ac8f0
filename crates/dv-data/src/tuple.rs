//! Row views over the columnar store

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Double(f64),
    Instant(DateTime<Utc>),
    Category(String),
    /// Value of a bivariate column: the `(x, y)` source values
    Pair(f64, f64),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Instant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Value::Category(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::Instant(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Category(v) => write!(f, "{}", v),
            Value::Pair(x, y) => write!(f, "({}, {})", x, y),
        }
    }
}

/// Identifier assigned to a tuple when it is added; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TupleId(pub(crate) u64);

impl TupleId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One row, materialized with values in enabled-column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tuple {
    pub id: TupleId,
    pub values: Vec<Value>,
    /// Whether the row satisfies the active query
    pub query_flag: bool,
    pub order_factor: f64,
}

impl Tuple {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Double(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Category("A".to_string()).as_category(), Some("A"));
        assert_eq!(Value::Category("A".to_string()).as_f64(), None);
        assert_eq!(Value::Pair(1.0, 2.0).to_string(), "(1, 2)");
    }
}
