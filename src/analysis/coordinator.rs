//! Binds detected ranges to fixed-range volume profiles.
//!
//! The coordinator is the only owner of a symbol's published ranges and
//! profiles. Detector output flows in through [`RangeProfileCoordinator::sync`],
//! which creates, extends or merges the bound profiles; every other mutation
//! goes through the explicit toggle/delete/clear/prune operations below.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::analysis::volume_profile::compute_profile;
#[allow(unused_imports)]
use crate::config::debug::{PRINT_PROFILE_CACHE_EVENTS, PRINT_PROFILE_EVENTS};
use crate::config::{ANALYSIS, VolumeProfileConfig};
use crate::domain::{Candle, candles_in_span, next_unused_label};
use crate::models::{FixedRangeProfile, Range, RangeStatus, VolumeProfile};

/// What binding a single range did to the profile list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileChange {
    Created,
    Extended,
    Merged,
    Unchanged,
    /// The user removed this range's profile; it is not recreated.
    Dismissed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub extended: usize,
    pub merged: usize,
    pub trend_created: usize,
    /// Range profiles whose range is no longer published.
    pub dropped: usize,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.created + self.extended + self.merged + self.trend_created + self.dropped > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RangeProfileCoordinator {
    ranges: Vec<Range>,
    profiles: Vec<FixedRangeProfile>,
    // Range ids the user deleted, with the latest end seen for each.
    // Filtered out of later detector output until pruned.
    deleted_ranges: BTreeMap<String, i64>,
    // Range ids (and trend profile ids) whose profile the user deleted, with end timestamps.
    dismissed_profiles: BTreeMap<String, i64>,
}

impl RangeProfileCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records. Cached histograms start out stale.
    pub fn restore(
        ranges: Vec<Range>,
        profiles: Vec<FixedRangeProfile>,
        deleted_ranges: BTreeMap<String, i64>,
        dismissed_profiles: BTreeMap<String, i64>,
    ) -> Self {
        Self {
            ranges,
            profiles,
            deleted_ranges,
            dismissed_profiles,
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Ranges that are currently enabled.
    pub fn active_ranges(&self) -> Vec<&Range> {
        self.ranges.iter().filter(|r| r.enabled).collect()
    }

    pub fn range(&self, id: &str) -> Option<&Range> {
        self.ranges.iter().find(|r| r.id == id)
    }

    pub fn profiles(&self) -> &[FixedRangeProfile] {
        &self.profiles
    }

    /// Auto-detected profiles, range-bound and trend alike.
    pub fn auto_profiles(&self) -> Vec<&FixedRangeProfile> {
        self.profiles.iter().filter(|p| p.is_auto_detected).collect()
    }

    pub fn profile(&self, id: &str) -> Option<&FixedRangeProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile_for_range(&self, range_id: &str) -> Option<&FixedRangeProfile> {
        self.profiles
            .iter()
            .find(|p| p.is_range_profile() && p.range_id.as_deref() == Some(range_id))
    }

    /// Deleted range ids mapped to the end timestamp used for pruning.
    pub fn deleted_ranges(&self) -> &BTreeMap<String, i64> {
        &self.deleted_ranges
    }

    /// Dismissed profile keys mapped to the end timestamp used for pruning.
    pub fn dismissed_profiles(&self) -> &BTreeMap<String, i64> {
        &self.dismissed_profiles
    }

    /// Publish a fresh detector result and bring the bound profiles in line.
    ///
    /// Only confirmed ranges get a profile, and each gets its own. Range
    /// profiles whose range is no longer published are dropped. Running this
    /// twice on the same ranges changes nothing the second time.
    pub fn sync(
        &mut self,
        detected: &[Range],
        settings: &VolumeProfileConfig,
        create_trend_profiles: bool,
    ) -> SyncReport {
        // Deleted or dismissed ranges may keep growing; track their latest end.
        for range in detected {
            for ends in [&mut self.deleted_ranges, &mut self.dismissed_profiles] {
                if let Some(end) = ends.get_mut(&range.id) {
                    *end = (*end).max(range.end_timestamp);
                }
            }
        }

        let disabled: BTreeSet<&str> = self
            .ranges
            .iter()
            .filter(|r| !r.enabled)
            .map(|r| r.id.as_str())
            .collect();
        let published: Vec<Range> = detected
            .iter()
            .filter(|r| !self.deleted_ranges.contains_key(&r.id))
            .map(|r| {
                let mut range = r.clone();
                range.enabled = !disabled.contains(range.id.as_str());
                range
            })
            .collect();
        self.ranges = published;

        let confirmed: Vec<Range> = self
            .ranges
            .iter()
            .filter(|r| r.is_auto_detected && r.status == RangeStatus::Confirmed)
            .cloned()
            .collect();

        let live: BTreeSet<String> = self.ranges.iter().map(|r| r.id.clone()).collect();
        let mut report = SyncReport::default();
        for range in &confirmed {
            match self.bind_range(range, settings, &live) {
                ProfileChange::Created => report.created += 1,
                ProfileChange::Extended => report.extended += 1,
                ProfileChange::Merged => report.merged += 1,
                ProfileChange::Unchanged | ProfileChange::Dismissed => {}
            }
        }

        let before = self.profiles.len();
        self.profiles.retain(|p| {
            !p.is_range_profile() || p.range_id.as_deref().is_some_and(|id| live.contains(id))
        });
        report.dropped = before - self.profiles.len();

        if create_trend_profiles {
            report.trend_created = self.create_trend_profiles(settings, ANALYSIS.coordinator.min_trend_gap_ms);
        }

        if report.changed() {
            log::debug!(
                "Profiles synced: {} created, {} extended, {} merged, {} trend, {} dropped",
                report.created,
                report.extended,
                report.merged,
                report.trend_created,
                report.dropped
            );
        }
        report
    }

    /// Create, extend or merge the profile for one confirmed range.
    ///
    /// `live` holds the ids of every range in the current batch. A profile
    /// bound to one of them is never taken over by another range.
    fn bind_range(
        &mut self,
        range: &Range,
        settings: &VolumeProfileConfig,
        live: &BTreeSet<String>,
    ) -> ProfileChange {
        if self.dismissed_profiles.contains_key(&range.id) {
            return ProfileChange::Dismissed;
        }

        if let Some(profile) = self
            .profiles
            .iter_mut()
            .find(|p| p.is_range_profile() && p.range_id.as_deref() == Some(range.id.as_str()))
        {
            if profile.set_span(range.start_timestamp, range.end_timestamp) {
                #[cfg(debug_assertions)]
                if PRINT_PROFILE_EVENTS {
                    log::info!("Extended profile {} to follow {}", profile.id, range.id);
                }
                return ProfileChange::Extended;
            }
            return ProfileChange::Unchanged;
        }

        if let Some(profile) = self
            .profiles
            .iter_mut()
            .find(|p| {
                p.is_range_profile()
                    && p.overlaps(range.start_timestamp, range.end_timestamp)
                    && !p.range_id.as_deref().is_some_and(|id| live.contains(id))
            })
        {
            let start = profile.start_timestamp.min(range.start_timestamp);
            let end = profile.end_timestamp.max(range.end_timestamp);
            profile.set_span(start, end);
            profile.range_id = Some(range.id.clone());
            #[cfg(debug_assertions)]
            if PRINT_PROFILE_EVENTS {
                log::info!("Merged {} into overlapping profile {}", range.id, profile.id);
            }
            return ProfileChange::Merged;
        }

        let label = next_unused_label(
            self.profiles
                .iter()
                .filter(|p| p.is_range_profile())
                .filter_map(|p| p.label.as_deref()),
        );
        #[cfg(debug_assertions)]
        if PRINT_PROFILE_EVENTS {
            log::info!("Created profile [{}] for {}", label, range.id);
        }
        let mut profile = FixedRangeProfile::for_range(
            &range.id,
            range.start_timestamp,
            range.end_timestamp,
            label,
            settings.clone(),
        );
        // A merged profile keeps the id of the range it was created for.
        let base_id = profile.id.clone();
        let mut suffix = 1;
        while self.profile(&profile.id).is_some() {
            profile.id = format!("{base_id}_{suffix}");
            suffix += 1;
        }
        self.profiles.push(profile);
        ProfileChange::Created
    }

    /// Add a trend profile for every gap longer than `min_gap_ms` between
    /// consecutive, non-overlapping range profiles. Existing gaps are skipped.
    pub fn create_trend_profiles(&mut self, settings: &VolumeProfileConfig, min_gap_ms: i64) -> usize {
        let spans: Vec<(i64, i64)> = self
            .profiles
            .iter()
            .filter(|p| p.is_range_profile())
            .map(|p| (p.start_timestamp, p.end_timestamp))
            .sorted()
            .collect();

        let gaps: Vec<(i64, i64)> = spans
            .iter()
            .tuple_windows()
            .filter(|(current, next)| current.1 < next.0)
            .map(|(current, next)| (current.1, next.0))
            .filter(|(start, end)| end - start > min_gap_ms)
            .collect();

        let mut created = 0;
        for (start, end) in gaps {
            let exists = self
                .profiles
                .iter()
                .any(|p| p.is_trend_profile && p.start_timestamp == start && p.end_timestamp == end);
            if exists {
                continue;
            }
            let profile = FixedRangeProfile::for_trend_gap(start, end, settings.clone());
            if self.dismissed_profiles.contains_key(&profile.id) {
                continue;
            }
            #[cfg(debug_assertions)]
            if PRINT_PROFILE_EVENTS {
                log::info!("Created trend profile {} ({} min)", profile.id, (end - start) / 60_000);
            }
            self.profiles.push(profile);
            created += 1;
        }
        created
    }

    /// Enable or disable a range together with its bound profile.
    pub fn set_range_enabled(&mut self, range_id: &str, enabled: bool) -> bool {
        let Some(range) = self.ranges.iter_mut().find(|r| r.id == range_id) else {
            return false;
        };
        range.enabled = enabled;
        for profile in self
            .profiles
            .iter_mut()
            .filter(|p| p.range_id.as_deref() == Some(range_id))
        {
            profile.enabled = enabled;
        }
        true
    }

    /// Remove a range and its bound profile. Later scans will not bring it back.
    pub fn delete_range(&mut self, range_id: &str) -> bool {
        let range_end = self.range(range_id).map(|r| r.end_timestamp);
        let profile_end = self.profile_for_range(range_id).map(|p| p.end_timestamp);
        let Some(end) = range_end.max(profile_end) else {
            return false;
        };
        self.ranges.retain(|r| r.id != range_id);
        self.profiles.retain(|p| p.range_id.as_deref() != Some(range_id));
        self.deleted_ranges.insert(range_id.to_string(), end);
        log::debug!("Deleted range {range_id}");
        true
    }

    pub fn set_profile_enabled(&mut self, profile_id: &str, enabled: bool) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == profile_id) {
            Some(profile) => {
                profile.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Remove a profile. An auto-detected one is not recreated by later scans.
    pub fn delete_profile(&mut self, profile_id: &str) -> bool {
        let Some(index) = self.profiles.iter().position(|p| p.id == profile_id) else {
            return false;
        };
        let profile = self.profiles.remove(index);
        if profile.is_range_profile() {
            if let Some(range_id) = profile.range_id {
                self.dismissed_profiles.insert(range_id, profile.end_timestamp);
            }
        } else if profile.is_trend_profile {
            self.dismissed_profiles.insert(profile.id, profile.end_timestamp);
        }
        log::debug!("Deleted profile {profile_id}");
        true
    }

    /// Drop every auto-detected range and profile. Manual profiles stay.
    ///
    /// This is a reset: earlier deletions are forgotten so the next scan can
    /// rebuild everything from scratch. Returns the number of profiles removed.
    pub fn clear_auto_detected(&mut self) -> usize {
        let before = self.profiles.len();
        self.profiles.retain(|p| !p.is_auto_detected);
        self.ranges.retain(|r| !r.is_auto_detected);
        self.deleted_ranges.clear();
        self.dismissed_profiles.clear();
        let removed = before - self.profiles.len();
        log::debug!("Cleared {removed} auto-detected profiles");
        removed
    }

    /// Add a user-chosen profile. Asking twice for the same span returns the
    /// existing profile's id.
    pub fn create_manual_profile(&mut self, start: i64, end: i64, settings: VolumeProfileConfig) -> String {
        let (start, end) = (start.min(end), start.max(end));
        let id = format!("manual_{start}_{end}");
        if !self.profiles.iter().any(|p| p.id == id) {
            self.profiles.push(FixedRangeProfile::manual(id.clone(), start, end, settings));
        }
        id
    }

    /// Drop auto-detected profiles that ended before `oldest_allowed`,
    /// together with deletion records for ranges that old.
    pub fn prune(&mut self, oldest_allowed: i64) -> usize {
        let before = self.profiles.len();
        self.profiles
            .retain(|p| !p.is_auto_detected || p.end_timestamp >= oldest_allowed);
        self.deleted_ranges.retain(|_, end| *end >= oldest_allowed);
        self.dismissed_profiles.retain(|_, end| *end >= oldest_allowed);
        before - self.profiles.len()
    }

    /// New settings for auto-detected profiles; manual profiles keep theirs.
    pub fn apply_auto_settings(&mut self, settings: &VolumeProfileConfig) {
        for profile in self.profiles.iter_mut().filter(|p| p.is_auto_detected) {
            profile.set_settings(settings.clone());
        }
    }

    pub fn invalidate_all(&mut self) {
        for profile in &mut self.profiles {
            profile.invalidate();
        }
    }

    /// Histogram for a profile, computed over `candles` on first use and
    /// cached until the profile's span or settings change.
    ///
    /// `None` when the profile does not exist or its span is degenerate.
    pub fn volume_profile(&mut self, profile_id: &str, candles: &[Candle]) -> Option<&VolumeProfile> {
        let profile = self.profiles.iter_mut().find(|p| p.id == profile_id)?;
        if profile.is_stale() {
            let subset = candles_in_span(candles, profile.start_timestamp, profile.end_timestamp);
            #[cfg(debug_assertions)]
            if PRINT_PROFILE_CACHE_EVENTS {
                log::info!("Computing profile {} over {} candles", profile.id, subset.len());
            }
            let computed = compute_profile(subset, &profile.settings);
            profile.store_profile(computed);
        }
        profile.cached_profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;

    fn range(start: i64, end: i64, low: f64, high: f64) -> Range {
        Range {
            id: Range::id_for(start),
            start_timestamp: start,
            end_timestamp: end,
            high,
            low,
            ma: (high + low) / 2.0,
            atr: (high - low) / 2.0,
            candle_count: 20,
            status: RangeStatus::Confirmed,
            is_auto_detected: true,
            detected_at: end,
            enabled: true,
        }
    }

    fn settings() -> VolumeProfileConfig {
        VolumeProfileConfig::auto_detected()
    }

    fn labels(coordinator: &RangeProfileCoordinator) -> Vec<String> {
        coordinator
            .profiles()
            .iter()
            .filter_map(|p| p.label.clone())
            .collect()
    }

    #[test]
    fn confirmed_ranges_get_labelled_profiles() {
        let mut monitoring = range(200 * MIN, 250 * MIN, 30.0, 31.0);
        monitoring.status = RangeStatus::Monitoring;
        let ranges = vec![
            range(0, 50 * MIN, 10.0, 11.0),
            range(100 * MIN, 150 * MIN, 20.0, 21.0),
            monitoring,
        ];

        let mut coordinator = RangeProfileCoordinator::new();
        let report = coordinator.sync(&ranges, &settings(), false);

        assert_eq!(report.created, 2);
        assert_eq!(coordinator.ranges().len(), 3);
        assert_eq!(labels(&coordinator), vec!["A", "B"]);
        assert!(coordinator.profile_for_range(&Range::id_for(200 * MIN)).is_none());
        let a = coordinator.profile_for_range(&Range::id_for(0)).unwrap();
        assert_eq!((a.start_timestamp, a.end_timestamp), (0, 50 * MIN));
        assert_eq!(a.settings.cluster_threshold, Some(1.5));
    }

    #[test]
    fn sync_is_idempotent() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&ranges, &settings(), true);
        let profiles = coordinator.profiles().to_vec();

        let report = coordinator.sync(&ranges, &settings(), true);
        assert!(!report.changed());
        assert_eq!(coordinator.profiles(), profiles.as_slice());
    }

    #[test]
    fn extended_range_moves_profile_and_drops_cache() {
        let candles: Vec<Candle> = (0..100)
            .map(|i| Candle::new(i * MIN, 10.0, 11.0, 10.0, 10.5, 5.0))
            .collect();
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(0, 50 * MIN, 10.0, 11.0)], &settings(), false);

        let id = coordinator.profiles()[0].id.clone();
        assert!(coordinator.volume_profile(&id, &candles).is_some());
        assert!(!coordinator.profile(&id).unwrap().is_stale());

        let report = coordinator.sync(&[range(0, 60 * MIN, 10.0, 11.0)], &settings(), false);
        assert_eq!(report.extended, 1);
        let profile = coordinator.profile(&id).unwrap();
        assert!(profile.is_stale());
        assert_eq!(profile.end_timestamp, 60 * MIN);
        assert_eq!(profile.label.as_deref(), Some("A"));
    }

    #[test]
    fn renamed_overlapping_range_merges_into_existing_profile() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(10 * MIN, 50 * MIN, 10.0, 11.0)], &settings(), false);

        // A later scan pulls the start earlier, so the id changes.
        let report = coordinator.sync(&[range(5 * MIN, 70 * MIN, 10.0, 11.0)], &settings(), false);
        assert_eq!(report.merged, 1);
        assert_eq!(coordinator.profiles().len(), 1);
        let profile = &coordinator.profiles()[0];
        assert_eq!(profile.range_id.as_deref(), Some("range_300000"));
        assert_eq!((profile.start_timestamp, profile.end_timestamp), (5 * MIN, 70 * MIN));
        assert_eq!(profile.label.as_deref(), Some("A"));
    }

    #[test]
    fn trend_profiles_fill_gaps_longer_than_a_minute() {
        let ranges = vec![
            range(0, 50 * MIN, 10.0, 11.0),
            range(50 * MIN + 30_000, 80 * MIN, 20.0, 21.0),
            range(200 * MIN, 250 * MIN, 30.0, 31.0),
        ];
        let mut coordinator = RangeProfileCoordinator::new();
        let report = coordinator.sync(&ranges, &settings(), true);

        assert_eq!(report.created, 3);
        assert_eq!(report.trend_created, 1);
        let trend: Vec<&FixedRangeProfile> =
            coordinator.profiles().iter().filter(|p| p.is_trend_profile).collect();
        assert_eq!(trend.len(), 1);
        assert_eq!((trend[0].start_timestamp, trend[0].end_timestamp), (80 * MIN, 200 * MIN));
        assert!(trend[0].label.is_none());

        assert_eq!(coordinator.create_trend_profiles(&settings(), MIN), 0);
        assert_eq!(labels(&coordinator), vec!["A", "B", "C"]);
    }

    #[test]
    fn trend_profiles_are_off_unless_requested() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0), range(200 * MIN, 250 * MIN, 30.0, 31.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        assert_eq!(coordinator.sync(&ranges, &settings(), false).trend_created, 0);
        assert!(coordinator.profiles().iter().all(|p| !p.is_trend_profile));
    }

    #[test]
    fn deleted_range_stays_deleted_until_cleared() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&ranges, &settings(), false);

        assert!(coordinator.delete_range("range_0"));
        assert!(!coordinator.delete_range("range_0"));
        coordinator.sync(&ranges, &settings(), false);
        assert_eq!(coordinator.ranges().len(), 1);
        assert_eq!(coordinator.profiles().len(), 1);

        assert_eq!(coordinator.clear_auto_detected(), 1);
        assert!(coordinator.ranges().is_empty());
        coordinator.sync(&ranges, &settings(), false);
        assert_eq!(coordinator.profiles().len(), 2);
    }

    #[test]
    fn deleted_profile_frees_its_label() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(
            &[range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)],
            &settings(),
            false,
        );
        assert!(coordinator.delete_profile("vp_range_0"));

        let ranges = vec![
            range(0, 50 * MIN, 10.0, 11.0),
            range(100 * MIN, 150 * MIN, 20.0, 21.0),
            range(300 * MIN, 350 * MIN, 40.0, 41.0),
        ];
        coordinator.sync(&ranges, &settings(), false);
        // The dismissed range keeps no profile, the new one reuses "A".
        assert!(coordinator.profile_for_range("range_0").is_none());
        let newest = coordinator.profile_for_range(&Range::id_for(300 * MIN)).unwrap();
        assert_eq!(newest.label.as_deref(), Some("A"));
    }

    #[test]
    fn toggles_survive_a_rescan() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&ranges, &settings(), false);

        assert!(coordinator.set_range_enabled("range_0", false));
        assert!(!coordinator.profiles()[0].enabled);
        coordinator.sync(&ranges, &settings(), false);
        assert!(coordinator.active_ranges().is_empty());
        assert!(!coordinator.range("range_0").unwrap().enabled);

        assert!(coordinator.set_profile_enabled("vp_range_0", true));
        assert!(coordinator.profiles()[0].enabled);
        assert!(!coordinator.set_range_enabled("missing", true));
    }

    #[test]
    fn manual_profiles_are_kept_apart_from_auto_ones() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(0, 50 * MIN, 10.0, 11.0)], &settings(), false);
        let id = coordinator.create_manual_profile(90 * MIN, 10 * MIN, VolumeProfileConfig::default());
        assert_eq!(id, format!("manual_{}_{}", 10 * MIN, 90 * MIN));
        assert_eq!(
            coordinator.create_manual_profile(10 * MIN, 90 * MIN, VolumeProfileConfig::default()),
            id
        );
        assert_eq!(coordinator.profiles().len(), 2);
        assert_eq!(coordinator.auto_profiles().len(), 1);

        coordinator.clear_auto_detected();
        assert_eq!(coordinator.profiles().len(), 1);
        assert_eq!(coordinator.profiles()[0].id, id);
    }

    #[test]
    fn prune_only_touches_old_auto_profiles() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(
            &[range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)],
            &settings(),
            false,
        );
        coordinator.create_manual_profile(0, 10 * MIN, VolumeProfileConfig::default());
        assert_eq!(coordinator.prune(60 * MIN), 1);
        assert_eq!(coordinator.profiles().len(), 2);
        assert!(coordinator.profile("vp_range_0").is_none());
    }

    #[test]
    fn settings_change_invalidates_auto_profiles_only() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| Candle::new(i * MIN, 10.0, 11.0, 9.0, 10.0, 1.0))
            .collect();
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(0, 50 * MIN, 10.0, 11.0)], &settings(), false);
        let manual = coordinator.create_manual_profile(0, 10 * MIN, VolumeProfileConfig::default());
        coordinator.volume_profile("vp_range_0", &candles);
        coordinator.volume_profile(&manual, &candles);

        let wider = VolumeProfileConfig {
            rows: 80,
            ..settings()
        };
        coordinator.apply_auto_settings(&wider);
        assert!(coordinator.profile("vp_range_0").unwrap().is_stale());
        assert!(!coordinator.profile(&manual).unwrap().is_stale());
        assert_eq!(coordinator.volume_profile("vp_range_0", &candles).unwrap().rows(), 80);

        coordinator.invalidate_all();
        assert!(coordinator.profiles().iter().all(|p| p.is_stale()));
    }

    #[test]
    fn degenerate_span_has_no_histogram() {
        let candles = vec![Candle::new(0, 5.0, 5.0, 5.0, 5.0, 1.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        let id = coordinator.create_manual_profile(0, MIN, VolumeProfileConfig::default());
        assert!(coordinator.volume_profile(&id, &candles).is_none());
        assert!(coordinator.volume_profile("missing", &candles).is_none());
    }

    #[test]
    fn split_range_keeps_one_profile_per_live_range() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(0, 100 * MIN, 10.0, 11.0)], &settings(), false);

        // A rescan splits the old range in two.
        let split = vec![range(50 * MIN, 70 * MIN, 10.0, 11.0), range(80 * MIN, 120 * MIN, 10.2, 11.2)];
        let first = coordinator.sync(&split, &settings(), false);
        assert_eq!(first.merged, 1);
        assert_eq!(first.created, 1);

        coordinator.sync(&split, &settings(), false);
        let settled = coordinator.sync(&split, &settings(), false);
        assert!(!settled.changed());

        assert_eq!(coordinator.profiles().len(), 2);
        let left = coordinator.profile_for_range(&Range::id_for(50 * MIN)).unwrap();
        let right = coordinator.profile_for_range(&Range::id_for(80 * MIN)).unwrap();
        assert_ne!(left.id, right.id);
        assert_eq!((left.start_timestamp, left.end_timestamp), (50 * MIN, 70 * MIN));
        assert_eq!((right.start_timestamp, right.end_timestamp), (80 * MIN, 120 * MIN));
        assert_eq!(labels(&coordinator), vec!["A", "B"]);
    }

    #[test]
    fn new_profile_id_does_not_collide_with_a_merged_one() {
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&[range(0, 50 * MIN, 10.0, 11.0)], &settings(), false);
        // vp_range_0 is taken over by a range with a later start.
        coordinator.sync(&[range(MIN, 60 * MIN, 10.0, 11.0)], &settings(), false);
        assert_eq!(coordinator.profiles()[0].id, "vp_range_0");
        assert_eq!(coordinator.profiles()[0].range_id.as_deref(), Some("range_60000"));

        coordinator.sync(
            &[range(0, 30 * MIN, 10.0, 11.0), range(MIN, 60 * MIN, 10.0, 11.0)],
            &settings(),
            false,
        );
        let ids: BTreeSet<&str> = coordinator.profiles().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(coordinator.profile_for_range("range_0").unwrap().id, "vp_range_0_1");
        assert_eq!(coordinator.profile_for_range("range_60000").unwrap().id, "vp_range_0");
    }

    #[test]
    fn profiles_of_unpublished_ranges_are_dropped() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&ranges, &settings(), false);
        let manual = coordinator.create_manual_profile(0, 10 * MIN, VolumeProfileConfig::default());

        let report = coordinator.sync(&ranges[1..], &settings(), false);
        assert_eq!(report.dropped, 1);
        assert!(coordinator.profile("vp_range_0").is_none());
        assert!(coordinator.profile(&manual).is_some());
        assert_eq!(coordinator.profiles().len(), 2);
    }

    #[test]
    fn prune_forgets_old_deletions() {
        let ranges = vec![range(0, 50 * MIN, 10.0, 11.0), range(100 * MIN, 150 * MIN, 20.0, 21.0)];
        let mut coordinator = RangeProfileCoordinator::new();
        coordinator.sync(&ranges, &settings(), false);
        coordinator.delete_range("range_0");
        coordinator.delete_profile(&format!("vp_{}", Range::id_for(100 * MIN)));
        assert_eq!(coordinator.deleted_ranges().get("range_0"), Some(&(50 * MIN)));

        // A later scan shows the deleted range still growing.
        let grown = vec![range(0, 90 * MIN, 10.0, 11.0), ranges[1].clone()];
        coordinator.sync(&grown, &settings(), false);
        assert_eq!(coordinator.deleted_ranges().get("range_0"), Some(&(90 * MIN)));

        coordinator.prune(60 * MIN);
        assert!(coordinator.deleted_ranges().contains_key("range_0"));
        assert_eq!(coordinator.dismissed_profiles().len(), 1);

        coordinator.prune(200 * MIN);
        assert!(coordinator.deleted_ranges().is_empty());
        assert!(coordinator.dismissed_profiles().is_empty());
    }
}
