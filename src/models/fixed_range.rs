use serde::{Deserialize, Serialize};

use crate::config::VolumeProfileConfig;
use crate::models::VolumeProfile;

/// A volume profile pinned to a fixed time span.
///
/// Auto-detected profiles are bound to a [`crate::models::Range`] through
/// `range_id`; trend profiles cover the gap between two ranges; manual ones
/// cover a span chosen by the user. The computed histogram is a cache and is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRangeProfile {
    pub id: String,
    pub range_id: Option<String>,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// "A", "B", ... for auto-detected range profiles.
    pub label: Option<String>,
    pub is_auto_detected: bool,
    pub is_trend_profile: bool,
    pub enabled: bool,
    pub settings: VolumeProfileConfig,

    #[serde(skip)]
    cached: Option<VolumeProfile>,
    #[serde(skip, default = "stale_by_default")]
    stale: bool,
}

fn stale_by_default() -> bool {
    true
}

impl FixedRangeProfile {
    pub fn for_range(range_id: &str, start: i64, end: i64, label: String, settings: VolumeProfileConfig) -> Self {
        Self::build(
            format!("vp_{range_id}"),
            Some(range_id.to_string()),
            start,
            end,
            Some(label),
            true,
            false,
            settings,
        )
    }

    pub fn for_trend_gap(start: i64, end: i64, settings: VolumeProfileConfig) -> Self {
        Self::build(
            format!("trend_{start}_{end}"),
            None,
            start,
            end,
            None,
            true,
            true,
            settings,
        )
    }

    pub fn manual(id: String, start: i64, end: i64, settings: VolumeProfileConfig) -> Self {
        Self::build(id, None, start, end, None, false, false, settings)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: String,
        range_id: Option<String>,
        start_timestamp: i64,
        end_timestamp: i64,
        label: Option<String>,
        is_auto_detected: bool,
        is_trend_profile: bool,
        settings: VolumeProfileConfig,
    ) -> Self {
        Self {
            id,
            range_id,
            start_timestamp,
            end_timestamp,
            label,
            is_auto_detected,
            is_trend_profile,
            enabled: true,
            settings,
            cached: None,
            stale: true,
        }
    }

    /// Auto-detected and bound to a detector range (not a trend gap).
    pub fn is_range_profile(&self) -> bool {
        self.is_auto_detected && !self.is_trend_profile
    }

    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start_timestamp <= end && start <= self.end_timestamp
    }

    /// Move the span, dropping the cached histogram when it actually changes.
    pub fn set_span(&mut self, start: i64, end: i64) -> bool {
        if self.start_timestamp == start && self.end_timestamp == end {
            return false;
        }
        self.start_timestamp = start;
        self.end_timestamp = end;
        self.invalidate();
        true
    }

    pub fn set_settings(&mut self, settings: VolumeProfileConfig) {
        if self.settings != settings {
            self.settings = settings;
            self.invalidate();
        }
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Last computed histogram. `None` while stale or when the span was degenerate.
    pub fn cached_profile(&self) -> Option<&VolumeProfile> {
        if self.stale { None } else { self.cached.as_ref() }
    }

    pub(crate) fn store_profile(&mut self, profile: Option<VolumeProfile>) {
        self.cached = profile;
        self.stale = false;
    }
}
