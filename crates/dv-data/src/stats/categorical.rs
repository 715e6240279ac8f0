//! Statistics for categorical columns

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Result, TableError};

/// Per-category counts; the histogram has one bin per category, ordered by
/// category name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummaryStats {
    pub count: usize,
    pub category_counts: BTreeMap<String, usize>,
}

impl CategoricalSummaryStats {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Self::compute(values, std::iter::empty())
    }

    /// Count `values` over a fixed category domain; domain categories that
    /// do not occur keep a zero bin
    pub fn with_domain<'a, 'b>(
        values: impl IntoIterator<Item = &'a str>,
        domain: impl IntoIterator<Item = &'b str>,
    ) -> Result<Self> {
        Self::compute(values, domain)
    }

    /// Replace the value set and recount
    pub fn set_values<'a>(&mut self, values: impl IntoIterator<Item = &'a str>) -> Result<()> {
        *self = Self::from_values(values)?;
        Ok(())
    }

    pub fn count_of(&self, category: &str) -> usize {
        self.category_counts.get(category).copied().unwrap_or(0)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category_counts.keys().map(String::as_str)
    }

    pub fn num_bins(&self) -> usize {
        self.category_counts.len()
    }

    pub fn max_bin_count(&self) -> usize {
        self.category_counts.values().copied().max().unwrap_or(0)
    }

    /// Most frequent category; ties go to the first name in order
    pub fn mode(&self) -> Option<(&str, usize)> {
        let mut best = None;
        for (name, &count) in &self.category_counts {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((name.as_str(), count)),
            }
        }
        best
    }

    fn compute<'a, 'b>(
        values: impl IntoIterator<Item = &'a str>,
        domain: impl IntoIterator<Item = &'b str>,
    ) -> Result<Self> {
        let mut category_counts: BTreeMap<String, usize> =
            domain.into_iter().map(|name| (name.to_string(), 0)).collect();

        let mut count = 0;
        for value in values {
            count += 1;
            match category_counts.get_mut(value) {
                Some(n) => *n += 1,
                None => {
                    category_counts.insert(value.to_string(), 1);
                }
            }
        }

        if count == 0 {
            return Err(TableError::EmptyDataSet);
        }

        Ok(Self { count, category_counts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_category() {
        let stats = CategoricalSummaryStats::from_values(["b", "a", "b", "c", "b"]).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.count_of("b"), 3);
        assert_eq!(stats.count_of("z"), 0);
        assert_eq!(stats.categories().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(stats.mode(), Some(("b", 3)));
        assert_eq!(stats.max_bin_count(), 3);
    }

    #[test]
    fn test_domain_keeps_empty_bins() {
        let stats = CategoricalSummaryStats::with_domain(["a"], ["a", "b"]).unwrap();

        assert_eq!(stats.num_bins(), 2);
        assert_eq!(stats.count_of("b"), 0);
    }

    #[test]
    fn test_set_values_is_idempotent() {
        let values = ["USA", "Japan", "USA", "Europe"];
        let mut stats = CategoricalSummaryStats::from_values(values).unwrap();
        let first = stats.clone();

        stats.set_values(values).unwrap();

        assert_eq!(stats, first);
    }

    #[test]
    fn test_mode_tie_prefers_first_name() {
        let stats = CategoricalSummaryStats::from_values(["y", "x"]).unwrap();
        assert_eq!(stats.mode(), Some(("x", 1)));
    }

    #[test]
    fn test_empty_input_fails() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            CategoricalSummaryStats::from_values(empty),
            Err(TableError::EmptyDataSet)
        ));
    }
}
