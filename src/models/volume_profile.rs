use serde::{Deserialize, Serialize};

/// One price bin of a volume profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileLevel {
    /// Bin midpoint.
    pub price: f64,
    pub volume: f64,
    pub level_low: f64,
    pub level_high: f64,
    pub is_value_area: bool,
    pub is_cluster: bool,
}

/// Point of Control: the bin with the most volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOfControl {
    pub index: usize,
    pub price: f64,
    pub volume: f64,
}

/// Contiguous band of bins around the POC holding the configured share of volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    pub low_index: usize,
    pub high_index: usize,
    /// Value Area High (midpoint of the top bin).
    pub vah_price: f64,
    /// Value Area Low (midpoint of the bottom bin).
    pub val_price: f64,
    /// Configured share as a percentage, e.g. 70.0.
    pub percentage: f64,
}

impl ValueArea {
    pub fn rows(&self) -> usize {
        self.high_index - self.low_index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub levels: Vec<ProfileLevel>,
    pub poc: PointOfControl,
    pub value_area: ValueArea,
    pub min_price: f64,
    pub max_price: f64,
    pub total_volume: f64,
    pub max_volume: f64,
}

impl VolumeProfile {
    pub fn rows(&self) -> usize {
        self.levels.len()
    }

    pub fn value_area_volume(&self) -> f64 {
        self.levels[self.value_area.low_index..=self.value_area.high_index]
            .iter()
            .map(|l| l.volume)
            .sum()
    }

    pub fn cluster_count(&self) -> usize {
        self.levels.iter().filter(|l| l.is_cluster).count()
    }

    /// Index of the bin containing `price`, if it lies inside the profile.
    pub fn level_index_at(&self, price: f64) -> Option<usize> {
        if price < self.min_price || price > self.max_price || self.levels.is_empty() {
            return None;
        }
        let step = (self.max_price - self.min_price) / self.levels.len() as f64;
        let index = ((price - self.min_price) / step) as usize;
        // Clamping handles the top edge and floating-point inaccuracies.
        Some(index.min(self.levels.len() - 1))
    }
}
