//! Analysis and computation defaults

/// Defaults for the ATR channel range detector
pub struct RangeDetectionDefaults {
    // Minimum consecutive candles inside the channel (also the SMA period)
    pub min_range_length: usize,
    pub atr_multiplier: f64,
    // 200 rather than 500 so that short timeframes still warm up
    pub atr_length: usize,
    pub max_active_ranges: usize,
    // Consecutive closes outside the channel tolerated before a range is finalized
    pub max_breakout_candles: usize,
    pub create_trend_profiles: bool,
    // Ranges that ended longer ago than this (relative to the newest candle) are pruned
    pub lookback_days: u32,
}

/// Defaults for fixed-range volume profiles
pub struct VolumeProfileDefaults {
    pub rows: usize,
    pub value_area_percent: f64,
    pub cluster_threshold: f64,
    // Rows used by the whole-window profile indicator
    pub window_rows: usize,
}

/// Defaults for the range/profile coordinator
pub struct CoordinatorDefaults {
    // Gaps between ranges must be strictly longer than this to get a trend profile
    pub min_trend_gap_ms: i64,
}

/// The Master Analysis Configuration
pub struct AnalysisConfig {
    pub ranges: RangeDetectionDefaults,
    pub profile: VolumeProfileDefaults,
    pub coordinator: CoordinatorDefaults,
}

pub const ANALYSIS: AnalysisConfig = AnalysisConfig {
    ranges: RangeDetectionDefaults {
        min_range_length: 20,
        atr_multiplier: 1.0,
        atr_length: 200,
        max_active_ranges: 10,
        max_breakout_candles: 5,
        create_trend_profiles: false,
        lookback_days: 30,
    },

    profile: VolumeProfileDefaults {
        rows: 50,
        value_area_percent: 0.70,
        cluster_threshold: 1.5,
        window_rows: 100,
    },

    coordinator: CoordinatorDefaults {
        min_trend_gap_ms: 60_000,
    },
};
