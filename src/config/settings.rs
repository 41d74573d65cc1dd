//! Runtime configuration records.
//!
//! Every record is validated before it reaches the detector or the profile
//! engine, so a bad period or bin count is reported here instead of turning
//! into NaN halfway through an analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::analysis::ANALYSIS;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: String },
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("value_area_percent must be in (0, 1] (got {0})")]
    ValueAreaOutOfRange(f64),
    #[error("invalid config patch: {0}")]
    Patch(String),
}

fn positive_usize(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NotPositive {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeDetectionConfig {
    pub min_range_length: usize,
    pub atr_multiplier: f64,
    pub atr_length: usize,
    pub max_active_ranges: usize,
    pub max_breakout_candles: usize,
    pub create_trend_profiles: bool,
    pub lookback_days: u32,
}

impl Default for RangeDetectionConfig {
    fn default() -> Self {
        let d = &ANALYSIS.ranges;
        Self {
            min_range_length: d.min_range_length,
            atr_multiplier: d.atr_multiplier,
            atr_length: d.atr_length,
            max_active_ranges: d.max_active_ranges,
            max_breakout_candles: d.max_breakout_candles,
            create_trend_profiles: d.create_trend_profiles,
            lookback_days: d.lookback_days,
        }
    }
}

impl RangeDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_usize("min_range_length", self.min_range_length)?;
        positive_usize("atr_length", self.atr_length)?;
        positive_usize("max_active_ranges", self.max_active_ranges)?;
        positive_f64("atr_multiplier", self.atr_multiplier)?;
        Ok(())
    }

    /// Candles needed before the detector produces anything.
    pub fn required_candles(&self) -> usize {
        self.min_range_length + self.atr_length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub rows: usize,
    /// Fraction of total volume, e.g. 0.70.
    pub value_area_percent: f64,
    /// `None` disables cluster flags.
    pub cluster_threshold: Option<f64>,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            rows: ANALYSIS.profile.rows,
            value_area_percent: ANALYSIS.profile.value_area_percent,
            cluster_threshold: None,
        }
    }
}

impl VolumeProfileConfig {
    /// Settings given to profiles the coordinator creates on its own.
    pub fn auto_detected() -> Self {
        Self {
            cluster_threshold: Some(ANALYSIS.profile.cluster_threshold),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_usize("rows", self.rows)?;
        positive_f64("value_area_percent", self.value_area_percent)?;
        if self.value_area_percent > 1.0 {
            return Err(ConfigError::ValueAreaOutOfRange(self.value_area_percent));
        }
        if let Some(threshold) = self.cluster_threshold {
            positive_f64("cluster_threshold", threshold)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: RangeDetectionConfig,
    pub profile: VolumeProfileConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection: RangeDetectionConfig::default(),
            profile: VolumeProfileConfig::auto_detected(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.profile.validate()
    }
}

/// Merge a partial JSON object into `current`, re-validating the result.
///
/// Keys that are absent keep their current values, at every nesting level,
/// so `{"detection": {"atr_length": 50}}` only touches the ATR period.
pub fn merge_patch<T>(
    current: &T,
    patch: serde_json::Value,
    validate: impl Fn(&T) -> Result<(), ConfigError>,
) -> Result<T, ConfigError>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let serde_json::Value::Object(patch) = patch else {
        return Err(ConfigError::Patch("expected a JSON object".to_string()));
    };
    let mut merged = serde_json::to_value(current).map_err(|e| ConfigError::Patch(e.to_string()))?;
    if let serde_json::Value::Object(fields) = &mut merged {
        merge_fields(fields, patch, "")?;
    }
    let updated: T = serde_json::from_value(merged).map_err(|e| ConfigError::Patch(e.to_string()))?;
    validate(&updated)?;
    Ok(updated)
}

fn merge_fields(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    patch: serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Result<(), ConfigError> {
    for (key, value) in patch {
        let Some(existing) = fields.get_mut(&key) else {
            return Err(ConfigError::Patch(format!("unknown field `{path}{key}`")));
        };
        match (existing, value) {
            (serde_json::Value::Object(inner), serde_json::Value::Object(nested)) => {
                merge_fields(inner, nested, &format!("{path}{key}."))?;
            }
            (slot, value) => *slot = value,
        }
    }
    Ok(())
}
