//! Core indicator trait and output types.

use anyhow::Result;

use crate::domain::Candle;
use crate::models::{Range, VolumeProfile};

/// Output from an indicator after a successful `fetch`.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    /// Consolidation zones, sorted by start.
    Ranges(Vec<Range>),
    /// Volume histogram of the fetched window.
    Profile(VolumeProfile),
}

/// A chart study fed with candle batches.
///
/// Implementations keep their own configuration and last result; `render`
/// never recomputes.
pub trait Indicator {
    /// Human-readable name of the indicator.
    fn name(&self) -> &str;

    /// Recompute from the given candles.
    fn fetch(&mut self, candles: &[Candle]) -> Result<()>;

    /// Last computed output, or `None` when disabled or nothing is available yet.
    fn render(&self) -> Option<IndicatorOutput>;

    /// Merge a partial JSON object into the current configuration.
    /// The change takes effect on the next `fetch`.
    fn apply_config(&mut self, patch: serde_json::Value) -> Result<()>;

    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;
}
