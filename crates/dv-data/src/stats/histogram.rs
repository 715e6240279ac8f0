//! Equal-width histograms

use serde::Serialize;

/// Equal-width bins over a closed interval.
///
/// `index = floor((v - min) / width)`, clamped to the last bin so that a
/// value equal to `max` lands in bin `bins - 1`. A zero-width interval puts
/// every in-range value in bin 0. Values outside `[min, max]` and
/// non-finite values have no bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinLayout {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}

impl BinLayout {
    pub fn new(min: f64, max: f64, bins: usize) -> Self {
        Self { min, max, bins: bins.max(1) }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    pub fn index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let width = self.bin_width();
        if width <= 0.0 {
            return Some(0);
        }
        let idx = ((value - self.min) / width).floor() as usize;
        Some(idx.min(self.bins - 1))
    }

    /// Lower and upper edge of bin `idx`
    pub fn bin_bounds(&self, idx: usize) -> (f64, f64) {
        let width = self.bin_width();
        let lower = self.min + width * idx as f64;
        let upper = if idx + 1 >= self.bins { self.max } else { lower + width };
        (lower, upper)
    }
}

/// One-dimensional histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub layout: BinLayout,
    pub counts: Vec<usize>,
    /// Finite values that fell outside the layout bounds
    pub out_of_range: usize,
}

impl Histogram {
    pub fn build(values: impl IntoIterator<Item = f64>, layout: BinLayout) -> Self {
        let mut counts = vec![0; layout.bins];
        let mut out_of_range = 0;
        for value in values {
            if !value.is_finite() {
                continue;
            }
            match layout.index(value) {
                Some(idx) => counts[idx] += 1,
                None => out_of_range += 1,
            }
        }
        Self { layout, counts, out_of_range }
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_count(&self, idx: usize) -> usize {
        self.counts.get(idx).copied().unwrap_or(0)
    }

    pub fn max_bin_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Number of values that landed in a bin
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Two-dimensional histogram, `counts[x_bin][y_bin]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram2d {
    pub x: BinLayout,
    pub y: BinLayout,
    pub counts: Vec<Vec<usize>>,
}

impl Histogram2d {
    pub fn build(pairs: impl IntoIterator<Item = (f64, f64)>, x: BinLayout, y: BinLayout) -> Self {
        let mut counts = vec![vec![0; y.bins]; x.bins];
        for (vx, vy) in pairs {
            if let (Some(ix), Some(iy)) = (x.index(vx), y.index(vy)) {
                counts[ix][iy] += 1;
            }
        }
        Self { x, y, counts }
    }

    pub fn bin_count(&self, ix: usize, iy: usize) -> usize {
        self.counts.get(ix).and_then(|row| row.get(iy)).copied().unwrap_or(0)
    }

    pub fn max_bin_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_value_falls_in_last_bin() {
        let layout = BinLayout::new(0.0, 10.0, 4);
        assert_eq!(layout.index(10.0), Some(3));
        assert_eq!(layout.index(0.0), Some(0));
        assert_eq!(layout.index(10.5), None);
        assert_eq!(layout.index(f64::NAN), None);
    }

    #[test]
    fn test_ten_values_five_bins() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let histogram = Histogram::build(values, BinLayout::new(1.0, 10.0, 5));

        assert!((histogram.layout.bin_width() - 1.8).abs() < 1e-12);
        assert_eq!(histogram.counts, vec![2, 2, 2, 2, 2]);
        assert_eq!(histogram.total(), 10);
    }

    #[test]
    fn test_zero_width_layout() {
        let histogram = Histogram::build(vec![3.0, 3.0, 3.0], BinLayout::new(3.0, 3.0, 4));
        assert_eq!(histogram.counts, vec![3, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_is_counted() {
        let histogram = Histogram::build(vec![-1.0, 0.5, 2.0, f64::NAN], BinLayout::new(0.0, 1.0, 2));
        assert_eq!(histogram.counts, vec![0, 1]);
        assert_eq!(histogram.out_of_range, 2);
    }

    #[test]
    fn test_bin_bounds_end_at_max() {
        let layout = BinLayout::new(1.0, 10.0, 5);
        assert_eq!(layout.bin_bounds(4).1, 10.0);
        assert!((layout.bin_bounds(1).0 - 2.8).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_2d() {
        let pairs = vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0)];
        let histogram = Histogram2d::build(pairs, BinLayout::new(0.0, 1.0, 2), BinLayout::new(0.0, 1.0, 2));
        assert_eq!(histogram.bin_count(0, 0), 1);
        assert_eq!(histogram.bin_count(1, 1), 1);
        assert_eq!(histogram.bin_count(1, 0), 1);
        assert_eq!(histogram.max_bin_count(), 1);
    }
}
