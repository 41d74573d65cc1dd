//! Volume profile of whatever window is handed to `fetch`.

use anyhow::Result;

use crate::analysis::compute_profile;
use crate::config::{ANALYSIS, VolumeProfileConfig, merge_patch};
#[allow(unused_imports)]
use crate::config::debug::PRINT_PROFILE_CACHE_EVENTS;
use crate::domain::Candle;
use crate::models::VolumeProfile;

use super::indicator::{Indicator, IndicatorOutput};

// First timestamp, last timestamp, candle count.
type WindowKey = (i64, i64, usize);

pub struct VolumeProfileIndicator {
    config: VolumeProfileConfig,
    enabled: bool,
    window: Option<WindowKey>,
    profile: Option<VolumeProfile>,
}

impl VolumeProfileIndicator {
    pub fn new(config: VolumeProfileConfig) -> Self {
        Self {
            config,
            enabled: true,
            window: None,
            profile: None,
        }
    }

    pub fn config(&self) -> &VolumeProfileConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&VolumeProfile> {
        self.profile.as_ref()
    }

    fn window_key(candles: &[Candle]) -> Option<WindowKey> {
        let first = candles.first()?;
        let last = candles.last()?;
        Some((first.timestamp, last.timestamp, candles.len()))
    }
}

impl Default for VolumeProfileIndicator {
    fn default() -> Self {
        Self::new(VolumeProfileConfig {
            rows: ANALYSIS.profile.window_rows,
            ..VolumeProfileConfig::default()
        })
    }
}

impl Indicator for VolumeProfileIndicator {
    fn name(&self) -> &str {
        "Volume Profile"
    }

    fn fetch(&mut self, candles: &[Candle]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let key = Self::window_key(candles);
        if key.is_some() && key == self.window {
            #[cfg(debug_assertions)]
            if PRINT_PROFILE_CACHE_EVENTS {
                log::info!("{}: window unchanged, keeping cached profile", self.name());
            }
            return Ok(());
        }
        self.profile = compute_profile(candles, &self.config);
        self.window = key;
        Ok(())
    }

    fn render(&self) -> Option<IndicatorOutput> {
        if !self.enabled {
            return None;
        }
        self.profile.clone().map(IndicatorOutput::Profile)
    }

    fn apply_config(&mut self, patch: serde_json::Value) -> Result<()> {
        self.config = merge_patch(&self.config, patch, |c: &VolumeProfileConfig| c.validate())?;
        // Force a recompute on the next fetch.
        self.window = None;
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

    fn window() -> Vec<Candle> {
        (0..10)
            .map(|k| {
                let low = 100.0 + k as f64;
                Candle::new(k * 60_000, low, low + 2.0, low, low + 1.0, 5.0)
            })
            .collect()
    }

    fn rendered(indicator: &VolumeProfileIndicator) -> VolumeProfile {
        match indicator.render() {
            Some(IndicatorOutput::Profile(profile)) => profile,
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn profiles_the_fetched_window() {
        let mut indicator = VolumeProfileIndicator::default();
        assert_eq!(indicator.config().rows, 100);
        indicator.fetch(&window()).unwrap();

        let profile = rendered(&indicator);
        assert_eq!(profile.rows(), 100);
        assert_eq!(profile.min_price, 100.0);
        assert_eq!(profile.max_price, 111.0);
        assert!((profile.total_volume - 50.0).abs() < 1e-9);
    }

    #[test]
    fn apply_config_takes_effect_on_next_fetch() {
        let mut indicator = VolumeProfileIndicator::default();
        indicator.fetch(&window()).unwrap();
        indicator
            .apply_config(json!({"rows": 11, "value_area_percent": 0.5}))
            .unwrap();
        assert_eq!(indicator.profile().map(VolumeProfile::rows), Some(100));

        indicator.fetch(&window()).unwrap();
        let profile = rendered(&indicator);
        assert_eq!(profile.rows(), 11);
        assert_eq!(indicator.config().value_area_percent, 0.5);
        assert!(indicator.apply_config(json!({"rows": 0})).is_err());
    }

    #[test]
    fn flat_or_empty_window_renders_nothing() {
        let mut indicator = VolumeProfileIndicator::default();
        indicator.fetch(&[]).unwrap();
        assert!(indicator.render().is_none());

        let flat = vec![Candle::new(0, 5.0, 5.0, 5.0, 5.0, 1.0)];
        indicator.fetch(&flat).unwrap();
        assert!(indicator.render().is_none());
    }

    #[test]
    fn disabled_indicator_skips_work() {
        let mut indicator = VolumeProfileIndicator::default();
        indicator.set_enabled(false);
        indicator.fetch(&window()).unwrap();
        assert!(indicator.profile().is_none());
        assert!(indicator.render().is_none());
    }
}
