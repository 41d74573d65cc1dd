use argminmax::ArgMinMax;

/// A price interval split into `n_bins` equal-width bins.
#[derive(serde::Deserialize, serde::Serialize, Default, Debug, Clone, PartialEq)]
pub struct PriceBins {
    pub min_price: f64,
    pub max_price: f64,
    pub n_bins: usize,
}

impl PriceBins {
    pub fn new(min_price: f64, max_price: f64, n_bins: usize) -> Self {
        Self {
            min_price,
            max_price,
            n_bins,
        }
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn range_length(&self) -> f64 {
        self.max_price - self.min_price
    }

    pub fn bin_size(&self) -> f64 {
        self.range_length() / (self.n_bins as f64)
    }

    /// (low, high) bounds of a bin. The high bound is computed as `low + step`
    /// so adjacent bins share a boundary.
    pub fn bin_bounds(&self, bin_index: usize) -> (f64, f64) {
        debug_assert!(bin_index < self.n_bins);
        let step = self.bin_size();
        let lower_bound = self.min_price + step * bin_index as f64;
        (lower_bound, lower_bound + step)
    }

    /// Range of bin indices that `[low, high]` can touch, clamped to the bins.
    pub fn touched_bins(&self, low: f64, high: f64) -> std::ops::Range<usize> {
        let step = self.bin_size();
        if self.n_bins == 0 || step <= 0.0 {
            return 0..0;
        }
        let first = ((low - self.min_price) / step).floor().max(0.0) as usize;
        let last = ((high - self.min_price) / step).floor().max(0.0) as usize;
        // One bin of slack each side absorbs floating-point error at the edges.
        first.saturating_sub(1).min(self.n_bins)..(last + 2).min(self.n_bins)
    }
}

/// Fraction of `[low, high]` that falls inside `[bin_low, bin_high]`.
/// A zero-width candle contributes nothing.
pub fn overlap_fraction(low: f64, high: f64, bin_low: f64, bin_high: f64) -> f64 {
    let overlap = (high.min(bin_high) - low.max(bin_low)).max(0.0);
    let span = high - low;
    if overlap > 0.0 && span > 0.0 {
        overlap / span
    } else {
        0.0
    }
}

pub fn get_max(vec: &[f64]) -> f64 {
    let max_index: usize = vec.argmax();
    vec[max_index]
}

pub fn get_min(vec: &[f64]) -> f64 {
    let min_index: usize = vec.argmin();
    vec[min_index]
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
