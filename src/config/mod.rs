//! Configuration module for the range profiler.

pub mod analysis;
pub mod debug;
pub mod persistence;
pub mod settings;

// Re-export commonly used items
pub use analysis::{ANALYSIS, AnalysisConfig};
pub use persistence::{SNAPSHOT_PATH, SNAPSHOT_VERSION};
pub use settings::{
    ConfigError, EngineConfig, RangeDetectionConfig, VolumeProfileConfig, merge_patch,
};
