use serde::{Deserialize, Serialize};

/// One OHLCV bar. Timestamps are the bar open time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// The live bar that is still being updated by the feed.
    #[serde(default, alias = "inProgress")]
    pub in_progress: bool,
}

impl Candle {
    // A constructor for convenience (closed bar)
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            in_progress: false,
        }
    }

    /// Full high-to-low extent of the bar.
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// True Range against the previous bar's close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        self.span()
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }
}

/// Inclusive timestamp window used to restrict which candles get analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    pub start: i64,
    pub end: i64,
}

impl DateFilter {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    pub fn apply(&self, candles: &[Candle]) -> Vec<Candle> {
        candles
            .iter()
            .filter(|c| self.contains(c.timestamp))
            .copied()
            .collect()
    }
}

/// Candles whose timestamp lies in `[start, end]`.
pub fn candles_in_span(candles: &[Candle], start: i64, end: i64) -> &[Candle] {
    let from = candles.partition_point(|c| c.timestamp < start);
    let to = candles.partition_point(|c| c.timestamp <= end);
    if from >= to { &[] } else { &candles[from..to] }
}

/// Drops the trailing in-progress bar(s) so that re-running on a ticking feed is stable.
pub fn closed_candles(candles: &[Candle]) -> &[Candle] {
    let closed = candles.len() - candles.iter().rev().take_while(|c| c.in_progress).count();
    &candles[..closed]
}
