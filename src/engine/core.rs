use std::collections::HashMap;

use anyhow::Result;

use crate::analysis::{DetectorState, SyncReport};
use crate::config::{ConfigError, EngineConfig, VolumeProfileConfig, merge_patch};
use crate::data::ProfileStore;
use crate::domain::{Candle, DateFilter};
use crate::models::{FixedRangeProfile, Range, VolumeProfile};
use crate::utils::TimeUtils;

use super::state::SymbolState;

/// Per-symbol range detection and volume profiles behind one configuration.
///
/// All operations run to completion on the caller's thread. Unknown symbols
/// read as empty; mutations on them return `false`.
pub struct RangeEngine {
    config: EngineConfig,
    symbols: HashMap<String, SymbolState>,
}

impl RangeEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            symbols: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- CONFIG UPDATES ---

    /// Swap in a new configuration.
    ///
    /// Detectors pick up the new settings on their next `analyze`. Auto
    /// profiles take the new profile settings, which drops their cached
    /// histograms; every other cache is dropped too so nothing stale survives.
    pub fn update_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        for state in self.symbols.values_mut() {
            state.detector.set_config(config.detection.clone());
            state.coordinator.apply_auto_settings(&config.profile);
            state.coordinator.invalidate_all();
        }
        log::info!("Range engine config updated: {:?}", config);
        self.config = config;
        Ok(())
    }

    /// Merge a partial JSON object (e.g. `{"detection": {"atr_length": 50}}`)
    /// into the current configuration. Fields the patch does not name keep
    /// their current values.
    pub fn patch_config(&mut self, patch: serde_json::Value) -> Result<(), ConfigError> {
        let merged = merge_patch(&self.config, patch, |c: &EngineConfig| c.validate())?;
        self.update_config(merged)
    }

    pub fn set_detection_enabled(&mut self, symbol: &str, enabled: bool) {
        self.state_mut(symbol).detection_enabled = enabled;
        log::info!(
            "[{}] Range detection {}",
            symbol,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_detection_enabled(&self, symbol: &str) -> bool {
        self.symbols.get(symbol).is_none_or(|s| s.detection_enabled)
    }

    pub fn set_date_filter(&mut self, symbol: &str, start: i64, end: i64) {
        self.state_mut(symbol)
            .detector
            .set_date_filter(DateFilter::new(start.min(end), start.max(end)));
    }

    pub fn clear_date_filter(&mut self, symbol: &str) {
        if let Some(state) = self.symbols.get_mut(symbol) {
            state.detector.clear_date_filter();
        }
    }

    // --- ANALYSIS ---

    /// Run detection over the latest candle batch for `symbol` and sync the
    /// bound profiles. The batch is kept for on-demand profile computation.
    ///
    /// With detection disabled the batch is still stored and the published
    /// ranges are returned unchanged.
    pub fn analyze(&mut self, symbol: &str, candles: &[Candle]) -> &[Range] {
        let settings = self.config.profile.clone();
        let create_trend_profiles = self.config.detection.create_trend_profiles;
        let lookback_ms = TimeUtils::days_to_ms(self.config.detection.lookback_days);

        let state = self.state_mut(symbol);
        state.candles = candles.to_vec();
        // Histograms of open spans depend on the batch.
        state.coordinator.invalidate_all();

        if !state.detection_enabled {
            log::debug!("[{}] Range detection disabled, skipping analysis", symbol);
            return state.coordinator.ranges();
        }

        let detected = state.detector.analyze(&state.candles);
        let report: SyncReport = state.coordinator.sync(detected, &settings, create_trend_profiles);
        if let Some(newest) = state.candles.last() {
            state.coordinator.prune(newest.timestamp - lookback_ms);
        }

        log::info!(
            "[{}] Analysis over {} candles: {} ranges, {} profiles ({} new)",
            symbol,
            state.candles.len(),
            state.coordinator.ranges().len(),
            state.coordinator.profiles().len(),
            report.created + report.trend_created
        );
        state.coordinator.ranges()
    }

    // --- QUERIES ---

    pub fn symbols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn ranges(&self, symbol: &str) -> &[Range] {
        self.symbols.get(symbol).map_or(&[], |s| s.coordinator.ranges())
    }

    pub fn active_ranges(&self, symbol: &str) -> Vec<&Range> {
        self.symbols
            .get(symbol)
            .map_or_else(Vec::new, |s| s.coordinator.active_ranges())
    }

    pub fn profiles(&self, symbol: &str) -> &[FixedRangeProfile] {
        self.symbols.get(symbol).map_or(&[], |s| s.coordinator.profiles())
    }

    pub fn detector_state(&self, symbol: &str) -> Option<DetectorState> {
        self.symbols.get(symbol).map(|s| s.detector.state())
    }

    /// Histogram of a profile over the latest stored candles.
    /// `None` for unknown ids or a degenerate span.
    pub fn volume_profile(&mut self, symbol: &str, profile_id: &str) -> Option<&VolumeProfile> {
        let state = self.symbols.get_mut(symbol)?;
        state.coordinator.volume_profile(profile_id, &state.candles)
    }

    // --- MUTATIONS ---

    pub fn set_range_enabled(&mut self, symbol: &str, range_id: &str, enabled: bool) -> bool {
        self.symbols
            .get_mut(symbol)
            .is_some_and(|s| s.coordinator.set_range_enabled(range_id, enabled))
    }

    pub fn delete_range(&mut self, symbol: &str, range_id: &str) -> bool {
        self.symbols
            .get_mut(symbol)
            .is_some_and(|s| s.coordinator.delete_range(range_id))
    }

    pub fn set_profile_enabled(&mut self, symbol: &str, profile_id: &str, enabled: bool) -> bool {
        self.symbols
            .get_mut(symbol)
            .is_some_and(|s| s.coordinator.set_profile_enabled(profile_id, enabled))
    }

    pub fn delete_profile(&mut self, symbol: &str, profile_id: &str) -> bool {
        self.symbols
            .get_mut(symbol)
            .is_some_and(|s| s.coordinator.delete_profile(profile_id))
    }

    /// Remove all auto-detected ranges and profiles for `symbol`.
    pub fn clear_auto_detected(&mut self, symbol: &str) -> usize {
        let Some(state) = self.symbols.get_mut(symbol) else {
            return 0;
        };
        state.detector.clear();
        let removed = state.coordinator.clear_auto_detected();
        log::info!("[{}] {} auto-detected profiles removed", symbol, removed);
        removed
    }

    /// Add a manual profile over `[start, end]`, using the default profile
    /// settings unless `settings` is given.
    pub fn create_manual_profile(
        &mut self,
        symbol: &str,
        start: i64,
        end: i64,
        settings: Option<VolumeProfileConfig>,
    ) -> Result<String, ConfigError> {
        let settings = settings.unwrap_or_default();
        settings.validate()?;
        Ok(self
            .state_mut(symbol)
            .coordinator
            .create_manual_profile(start, end, settings))
    }

    // --- PERSISTENCE ---

    pub fn snapshot(&self) -> ProfileStore {
        ProfileStore::new(
            self.symbols
                .iter()
                .map(|(symbol, state)| (symbol.clone(), state.snapshot()))
                .collect(),
        )
    }

    /// Replace the ranges and profiles of every symbol in `store`.
    /// Candle batches are not persisted; histograms recompute after the next `analyze`.
    pub fn restore(&mut self, store: ProfileStore) -> Result<()> {
        store.check_version()?;
        let count = store.symbols.len();
        for (symbol, snapshot) in store.symbols {
            let restored = SymbolState::from_snapshot(&self.config, snapshot);
            match self.symbols.get_mut(&symbol) {
                Some(state) => state.coordinator = restored.coordinator,
                None => {
                    self.symbols.insert(symbol, restored);
                }
            }
        }
        log::info!("Restored range profiles for {} symbols", count);
        Ok(())
    }

    // --- INTERNAL LOGIC ---

    fn state_mut(&mut self, symbol: &str) -> &mut SymbolState {
        let config = &self.config;
        self.symbols
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolState::new(config))
    }
}
