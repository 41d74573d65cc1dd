//! Indicators fed with candle batches.

pub mod indicator;
pub mod range_detection;
pub mod volume_profile;

pub use indicator::{Indicator, IndicatorOutput};
pub use range_detection::RangeDetectionIndicator;
pub use volume_profile::VolumeProfileIndicator;
