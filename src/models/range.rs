use serde::{Deserialize, Serialize};

/// Whether a range's outcome is settled.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    Debug,
    Serialize,
    Deserialize,
    strum_macros::EnumIter,
    strum_macros::Display,
)]
pub enum RangeStatus {
    /// Price is outside the channel but still within breakout tolerance.
    Monitoring,
    #[default]
    Confirmed,
}

/// A consolidation zone: a time span where closes stayed inside an ATR
/// channel around their moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub id: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub high: f64,
    pub low: f64,
    /// Channel center when the range was last extended.
    pub ma: f64,
    /// Channel half-width (ATR x multiplier) when the range was last extended.
    pub atr: f64,
    pub candle_count: usize,
    pub status: RangeStatus,
    pub is_auto_detected: bool,
    /// Timestamp of the candle on which the range was emitted.
    pub detected_at: i64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Range {
    pub fn id_for(start_timestamp: i64) -> String {
        format!("range_{start_timestamp}")
    }

    pub fn overlaps_in_time(&self, other: &Range) -> bool {
        self.start_timestamp <= other.end_timestamp && other.start_timestamp <= self.end_timestamp
    }

    /// Either band touches or contains the other.
    pub fn overlaps_in_price(&self, other: &Range) -> bool {
        self.low <= other.high && other.low <= self.high
    }

    /// Absorb `other` into `self`: union of time span and price band.
    pub fn absorb(&mut self, other: &Range) {
        self.start_timestamp = self.start_timestamp.min(other.start_timestamp);
        self.end_timestamp = self.end_timestamp.max(other.end_timestamp);
        self.high = self.high.max(other.high);
        self.low = self.low.min(other.low);
        self.candle_count += other.candle_count;
        self.detected_at = self.detected_at.max(other.detected_at);
        if other.status == RangeStatus::Confirmed {
            self.status = RangeStatus::Confirmed;
        }
        self.id = Self::id_for(self.start_timestamp);
    }

    /// Band size as a percentage of the low, e.g. `2.35` for 2.35%.
    pub fn size_pct(&self) -> f64 {
        if self.low > 0.0 {
            (self.high - self.low) / self.low * 100.0
        } else {
            0.0
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_timestamp - self.start_timestamp
    }

    pub fn is_well_formed(&self) -> bool {
        self.low <= self.high && self.end_timestamp >= self.start_timestamp
    }
}
