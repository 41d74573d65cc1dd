use crate::analysis::{RangeDetector, RangeProfileCoordinator};
use crate::config::EngineConfig;
use crate::data::SymbolSnapshot;
use crate::domain::Candle;

/// Represents the state of a single symbol in the engine.
#[derive(Debug, Clone)]
pub struct SymbolState {
    pub detector: RangeDetector,

    /// Sole owner of the published ranges and profiles.
    pub coordinator: RangeProfileCoordinator,

    /// Latest candle batch, kept so profiles can be computed on demand.
    pub candles: Vec<Candle>,

    pub detection_enabled: bool,
}

impl SymbolState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            detector: RangeDetector::new(config.detection.clone()),
            coordinator: RangeProfileCoordinator::new(),
            candles: Vec::new(),
            detection_enabled: true,
        }
    }

    pub fn from_snapshot(config: &EngineConfig, snapshot: SymbolSnapshot) -> Self {
        Self {
            coordinator: RangeProfileCoordinator::restore(
                snapshot.ranges,
                snapshot.profiles,
                snapshot.deleted_ranges,
                snapshot.dismissed_profiles,
            ),
            ..Self::new(config)
        }
    }

    pub fn snapshot(&self) -> SymbolSnapshot {
        SymbolSnapshot {
            ranges: self.coordinator.ranges().to_vec(),
            profiles: self.coordinator.profiles().to_vec(),
            deleted_ranges: self.coordinator.deleted_ranges().clone(),
            dismissed_profiles: self.coordinator.dismissed_profiles().clone(),
        }
    }
}
