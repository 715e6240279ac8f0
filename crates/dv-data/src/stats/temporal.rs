//! Statistics for temporal columns

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::histogram::{BinLayout, Histogram};
use crate::{Result, TableError};

/// Descriptive statistics over a set of instants.
///
/// The histogram is laid out over epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalSummaryStats {
    pub count: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub mean: DateTime<Utc>,
    /// Population standard deviation in milliseconds
    pub std_dev_millis: f64,
    pub histogram: Histogram,
}

impl TemporalSummaryStats {
    pub fn from_values(values: &[DateTime<Utc>], bins: usize) -> Result<Self> {
        Self::compute(values, bins, None)
    }

    pub fn with_bounds(
        values: &[DateTime<Utc>],
        bins: usize,
        bounds: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Self> {
        Self::compute(values, bins, Some(bounds))
    }

    pub fn set_values(&mut self, values: &[DateTime<Utc>], bins: usize) -> Result<()> {
        *self = Self::from_values(values, bins)?;
        Ok(())
    }

    pub fn set_num_histogram_bins(&mut self, values: &[DateTime<Utc>], bins: usize) {
        let layout = BinLayout::new(self.histogram.layout.min, self.histogram.layout.max, bins);
        self.histogram = Histogram::build(values.iter().map(millis), layout);
    }

    /// Time span covered by histogram bin `idx`
    pub fn bin_range(&self, idx: usize) -> (DateTime<Utc>, DateTime<Utc>) {
        let (lower, upper) = self.histogram.layout.bin_bounds(idx);
        (from_millis(lower, self.start), from_millis(upper, self.end))
    }

    pub(crate) fn compute(
        values: &[DateTime<Utc>],
        bins: usize,
        bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Self> {
        let (Some(start), Some(end)) = (values.iter().min().copied(), values.iter().max().copied())
        else {
            return Err(TableError::EmptyDataSet);
        };

        // Offsets from the start keep the sums small enough for f64
        let n = values.len() as f64;
        let origin = millis(&start);
        let mean_offset = values.iter().map(|v| millis(v) - origin).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|v| (millis(v) - origin - mean_offset).powi(2))
            .sum::<f64>()
            / n;
        let mean = from_millis(origin + mean_offset, start);

        let (lower, upper) = bounds.unwrap_or((start, end));
        let layout = BinLayout::new(millis(&lower), millis(&upper), bins);
        let histogram = Histogram::build(values.iter().map(millis), layout);

        Ok(Self {
            count: values.len(),
            start,
            end,
            mean,
            std_dev_millis: variance.sqrt(),
            histogram,
        })
    }
}

fn millis(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64
}

fn from_millis(ms: f64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms.round() as i64).unwrap_or(fallback)
}
