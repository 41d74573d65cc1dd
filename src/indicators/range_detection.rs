//! ATR channel consolidation zones as an indicator.

use anyhow::Result;

use crate::analysis::RangeDetector;
use crate::config::{RangeDetectionConfig, merge_patch};
use crate::domain::Candle;

use super::indicator::{Indicator, IndicatorOutput};

pub struct RangeDetectionIndicator {
    detector: RangeDetector,
    enabled: bool,
}

impl RangeDetectionIndicator {
    pub fn new(config: RangeDetectionConfig) -> Self {
        Self {
            detector: RangeDetector::new(config),
            enabled: true,
        }
    }

    pub fn config(&self) -> &RangeDetectionConfig {
        self.detector.config()
    }

    pub fn detector(&self) -> &RangeDetector {
        &self.detector
    }
}

impl Default for RangeDetectionIndicator {
    fn default() -> Self {
        Self::new(RangeDetectionConfig::default())
    }
}

impl Indicator for RangeDetectionIndicator {
    fn name(&self) -> &str {
        "Range Detection"
    }

    fn fetch(&mut self, candles: &[Candle]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let found = self.detector.analyze(candles).len();
        log::debug!("{}: {} ranges over {} candles", self.name(), found, candles.len());
        Ok(())
    }

    fn render(&self) -> Option<IndicatorOutput> {
        if !self.enabled || self.detector.ranges().is_empty() {
            return None;
        }
        Some(IndicatorOutput::Ranges(self.detector.ranges().to_vec()))
    }

    fn apply_config(&mut self, patch: serde_json::Value) -> Result<()> {
        let merged = merge_patch(self.detector.config(), patch, |c: &RangeDetectionConfig| c.validate())?;
        self.detector.set_config(merged);
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candles() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..200)
            .map(|k| {
                let open = 100.0 + k as f64;
                Candle::new(k as i64 * 60_000, open, open + 1.0, open, open + 1.0, 10.0)
            })
            .collect();
        candles.extend((200..230).map(|k| Candle::new(k as i64 * 60_000, 310.0, 310.1, 309.9, 310.0, 10.0)));
        candles
    }

    #[test]
    fn renders_detected_ranges() {
        let mut indicator = RangeDetectionIndicator::default();
        assert!(indicator.render().is_none());
        indicator.fetch(&candles()).unwrap();
        match indicator.render() {
            Some(IndicatorOutput::Ranges(ranges)) => assert_eq!(ranges.len(), 1),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn disabled_indicator_renders_nothing() {
        let mut indicator = RangeDetectionIndicator::default();
        indicator.fetch(&candles()).unwrap();
        indicator.set_enabled(false);
        assert!(!indicator.is_enabled());
        assert!(indicator.render().is_none());
    }

    #[test]
    fn apply_config_merges_partial_settings() {
        let mut indicator = RangeDetectionIndicator::default();
        indicator
            .apply_config(json!({"atr_length": 14, "max_breakout_candles": 2}))
            .unwrap();
        assert_eq!(indicator.config().atr_length, 14);
        assert_eq!(indicator.config().max_breakout_candles, 2);
        assert_eq!(indicator.config().min_range_length, 20);

        assert!(indicator.apply_config(json!({"atr_multiplier": -1.0})).is_err());
        assert_eq!(indicator.config().atr_length, 14);
    }

    #[test]
    fn too_short_history_renders_nothing() {
        let mut indicator = RangeDetectionIndicator::default();
        indicator.fetch(&candles()[..100]).unwrap();
        assert!(indicator.render().is_none());
    }
}
