//! ATR-channel consolidation detector.
//!
//! For every candle past the warm-up, a channel of `SMA ± ATR * multiplier` is
//! built and the last `min_range_length` closes are checked against it. A
//! fully-contained window opens (or extends) a range; closes outside the
//! channel are tolerated for up to `max_breakout_candles` consecutive candles
//! before the range is finalized.
//!
//! Every call to [`RangeDetector::analyze`] rescans the supplied candles from
//! scratch, so re-running on an unchanged batch gives the same ranges.

use crate::analysis::indicators::{compute_atr, compute_sma};
use crate::config::RangeDetectionConfig;
#[allow(unused_imports)]
use crate::config::debug::{PRINT_RANGE_EVENTS, PRINT_RANGE_SUMMARY};
use crate::domain::{Candle, DateFilter, closed_candles};
use crate::models::{Range, RangeStatus};
use crate::utils::TimeUtils;
use crate::utils::time_utils::epoch_ms_to_utc;

/// Where the scanner stands after the last analyzed candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Idle,
    /// An active range is being extended.
    Building,
    /// The active range is waiting out consecutive closes outside the channel.
    PausedBreakout { breakout_candles: usize },
}

#[derive(Debug, Clone)]
pub struct RangeDetector {
    config: RangeDetectionConfig,
    date_filter: Option<DateFilter>,
    ranges: Vec<Range>,
    state: DetectorState,
}

impl RangeDetector {
    pub fn new(config: RangeDetectionConfig) -> Self {
        Self {
            config,
            date_filter: None,
            ranges: Vec::new(),
            state: DetectorState::Idle,
        }
    }

    pub fn config(&self) -> &RangeDetectionConfig {
        &self.config
    }

    /// Replace the configuration. The caller validates it first.
    pub fn set_config(&mut self, config: RangeDetectionConfig) {
        self.config = config;
    }

    pub fn set_date_filter(&mut self, filter: DateFilter) {
        log::debug!(
            "Range detection date filter set: {} -> {}",
            epoch_ms_to_utc(filter.start),
            epoch_ms_to_utc(filter.end)
        );
        self.date_filter = Some(filter);
    }

    pub fn clear_date_filter(&mut self) {
        self.date_filter = None;
    }

    pub fn date_filter(&self) -> Option<DateFilter> {
        self.date_filter
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.state = DetectorState::Idle;
    }

    /// Scan `candles` and return the detected ranges.
    ///
    /// With fewer candles than `min_range_length + atr_length` (after the
    /// date filter and dropping a trailing live candle) the previous result is
    /// returned untouched.
    pub fn analyze(&mut self, candles: &[Candle]) -> &[Range] {
        let filtered;
        let candles = match self.date_filter {
            Some(filter) => {
                filtered = filter.apply(candles);
                closed_candles(&filtered)
            }
            None => closed_candles(candles),
        };

        if candles.len() < self.config.required_candles() {
            log::debug!(
                "Not enough candles for range detection: {} < {}",
                candles.len(),
                self.config.required_candles()
            );
            return &self.ranges;
        }

        let atr = compute_atr(candles, self.config.atr_length);
        let sma = compute_sma(candles, self.config.min_range_length);

        let mut scan = Scan::new(&self.config, candles);
        let start = self.config.atr_length.max(self.config.min_range_length);
        for i in start..candles.len() {
            let (Some(&atr_value), Some(&center)) = (
                atr.get(i - self.config.atr_length),
                sma.get(i - self.config.min_range_length),
            ) else {
                continue;
            };
            scan.step(i, center, atr_value * self.config.atr_multiplier);
        }
        let (found, state) = scan.finish();

        let before_merge = found.len();
        let merged = merge_overlapping(found);
        let newest = candles[candles.len() - 1].timestamp;
        let pruned = prune(merged, &self.config, newest);

        #[cfg(debug_assertions)]
        if PRINT_RANGE_SUMMARY {
            log::info!(
                "Range scan over {} candles: {} found, {} after merge/prune, state {:?}",
                candles.len(),
                before_merge,
                pruned.len(),
                state
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = before_merge;

        self.ranges = pruned;
        self.state = state;
        &self.ranges
    }
}

struct Tracked {
    range: Range,
    start_index: usize,
}

/// Mutable state of a single pass over the candles.
struct Scan<'a> {
    config: &'a RangeDetectionConfig,
    candles: &'a [Candle],
    active: Option<Tracked>,
    state: DetectorState,
    finalized: Vec<Tracked>,
}

impl<'a> Scan<'a> {
    fn new(config: &'a RangeDetectionConfig, candles: &'a [Candle]) -> Self {
        Self {
            config,
            candles,
            active: None,
            state: DetectorState::Idle,
            finalized: Vec::new(),
        }
    }

    fn step(&mut self, i: usize, center: f64, half_width: f64) {
        let window_start = i + 1 - self.config.min_range_length;
        let count_outside = self.candles[window_start..=i]
            .iter()
            .filter(|c| (c.close - center).abs() > half_width)
            .count();

        if count_outside == 0 {
            if self.active.is_some() {
                self.extend_to_channel(i, center, half_width);
            } else {
                self.open(i, window_start, center, half_width);
            }
            return;
        }

        let Some(active) = self.active.as_mut() else {
            return;
        };

        let candle = &self.candles[i];
        let inside = candle.close >= center - half_width && candle.close <= center + half_width;
        if inside {
            // Re-entry: keep the band, only widen it by this candle's own wicks.
            #[cfg(debug_assertions)]
            if PRINT_RANGE_EVENTS {
                if let DetectorState::PausedBreakout { breakout_candles } = self.state {
                    log::info!("Re-entry into {} after {} candles outside", active.range.id, breakout_candles);
                }
            }
            let range = &mut active.range;
            range.end_timestamp = candle.timestamp;
            range.candle_count += 1;
            range.high = range.high.max(candle.high);
            range.low = range.low.min(candle.low);
            self.state = DetectorState::Building;
            return;
        }

        let breakout_candles = match self.state {
            DetectorState::PausedBreakout { breakout_candles } => breakout_candles + 1,
            _ => 1,
        };
        if breakout_candles > self.config.max_breakout_candles {
            self.finalize(i);
        } else {
            #[cfg(debug_assertions)]
            if PRINT_RANGE_EVENTS {
                log::info!(
                    "Temporary breakout of {}: {}/{} candles outside",
                    active.range.id,
                    breakout_candles,
                    self.config.max_breakout_candles
                );
            }
            self.state = DetectorState::PausedBreakout { breakout_candles };
        }
    }

    /// Extend the active range to candle `i`, widening it to the channel bounds.
    fn extend_to_channel(&mut self, i: usize, center: f64, half_width: f64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let range = &mut active.range;
        range.end_timestamp = self.candles[i].timestamp;
        range.candle_count += 1;
        range.high = range.high.max(center + half_width);
        range.low = range.low.min(center - half_width);
        range.ma = center;
        range.atr = half_width;
        self.state = DetectorState::Building;
    }

    fn open(&mut self, i: usize, start_index: usize, center: f64, half_width: f64) {
        let start_timestamp = self.candles[start_index].timestamp;

        // A window starting inside the last finalized range continues it.
        let reopen = self
            .finalized
            .last()
            .is_some_and(|last| start_timestamp <= last.range.end_timestamp);
        if reopen {
            if let Some(mut previous) = self.finalized.pop() {
                #[cfg(debug_assertions)]
                if PRINT_RANGE_EVENTS {
                    log::info!(
                        "Window starting {} overlaps {}; reopening it",
                        epoch_ms_to_utc(start_timestamp),
                        previous.range.id
                    );
                }
                let range = &mut previous.range;
                range.end_timestamp = self.candles[i].timestamp;
                range.candle_count = range.candle_count.max(i - previous.start_index + 1);
                range.high = range.high.max(center + half_width);
                range.low = range.low.min(center - half_width);
                range.ma = center;
                range.atr = half_width;
                self.active = Some(previous);
                self.state = DetectorState::Building;
                return;
            }
        }

        let range = Range {
            id: Range::id_for(start_timestamp),
            start_timestamp,
            end_timestamp: self.candles[i].timestamp,
            high: center + half_width,
            low: center - half_width,
            ma: center,
            atr: half_width,
            candle_count: self.config.min_range_length,
            status: RangeStatus::Confirmed,
            is_auto_detected: true,
            detected_at: self.candles[i].timestamp,
            enabled: true,
        };
        #[cfg(debug_assertions)]
        if PRINT_RANGE_EVENTS {
            log::info!(
                "Opened {} at {} ({:.4} - {:.4})",
                range.id,
                epoch_ms_to_utc(range.end_timestamp),
                range.low,
                range.high
            );
        }
        self.active = Some(Tracked { range, start_index });
        self.state = DetectorState::Building;
    }

    /// Close the active range on candle `i`.
    fn finalize(&mut self, i: usize) {
        if let Some(mut tracked) = self.active.take() {
            if tracked.range.candle_count >= self.config.min_range_length {
                tracked.range.status = RangeStatus::Confirmed;
                tracked.range.detected_at = self.candles[i].timestamp;
                #[cfg(debug_assertions)]
                if PRINT_RANGE_EVENTS {
                    log::info!(
                        "Finalized {} on breakout at {} ({} candles)",
                        tracked.range.id,
                        epoch_ms_to_utc(self.candles[i].timestamp),
                        tracked.range.candle_count
                    );
                }
                self.finalized.push(tracked);
            }
        }
        self.state = DetectorState::Idle;
    }

    fn finish(mut self) -> (Vec<Range>, DetectorState) {
        if let Some(mut tracked) = self.active.take() {
            if tracked.range.candle_count >= self.config.min_range_length {
                tracked.range.status = match self.state {
                    DetectorState::PausedBreakout { .. } => RangeStatus::Monitoring,
                    _ => RangeStatus::Confirmed,
                };
                if let Some(last) = self.candles.last() {
                    tracked.range.detected_at = last.timestamp;
                }
                self.finalized.push(tracked);
            }
        }
        let ranges = self.finalized.into_iter().map(|t| t.range).collect();
        (ranges, self.state)
    }
}

/// Sort by start and fold together neighbours that overlap in time or price.
pub fn merge_overlapping(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| r.start_timestamp);
    let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(current) if current.overlaps_in_time(&range) || current.overlaps_in_price(&range) => {
                #[cfg(debug_assertions)]
                if PRINT_RANGE_SUMMARY {
                    log::info!("Merging {} into {}", range.id, current.id);
                }
                current.absorb(&range);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Drop ranges that ended before the lookback window, then keep the
/// `max_active_ranges` most recently detected. Output is ordered by start.
pub fn prune(mut ranges: Vec<Range>, config: &RangeDetectionConfig, newest_timestamp: i64) -> Vec<Range> {
    let oldest_allowed = newest_timestamp - TimeUtils::days_to_ms(config.lookback_days);
    ranges.retain(|r| r.end_timestamp >= oldest_allowed);

    if ranges.len() > config.max_active_ranges {
        ranges.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        ranges.truncate(config.max_active_ranges);
        ranges.sort_by_key(|r| r.start_timestamp);
    }
    ranges
}
