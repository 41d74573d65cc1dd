use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::{SNAPSHOT_PATH, SNAPSHOT_VERSION};
#[allow(unused_imports)]
use crate::config::debug::PRINT_SERDE;
use crate::models::{FixedRangeProfile, Range};
use crate::utils::time_utils::now_timestamp_ms;

/// Everything persisted for one symbol.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SymbolSnapshot {
    pub ranges: Vec<Range>,
    pub profiles: Vec<FixedRangeProfile>,
    /// Deleted range ids and the end timestamp they are pruned by.
    #[serde(default)]
    pub deleted_ranges: BTreeMap<String, i64>,
    /// Dismissed profile keys and the end timestamp they are pruned by.
    #[serde(default)]
    pub dismissed_profiles: BTreeMap<String, i64>,
}

/// Flat JSON document holding ranges and profiles keyed by symbol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileStore {
    pub version: f64,
    pub saved_at_ms: i64,
    pub symbols: BTreeMap<String, SymbolSnapshot>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl ProfileStore {
    pub fn new(symbols: BTreeMap<String, SymbolSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at_ms: now_timestamp_ms(),
            symbols,
        }
    }

    /// Snapshots written by a newer major version are refused.
    pub fn check_version(&self) -> Result<()> {
        if self.version.trunc() > SNAPSHOT_VERSION.trunc() {
            bail!(
                "Snapshot version {} is newer than supported version {}",
                self.version,
                SNAPSHOT_VERSION
            );
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let store: Self = serde_json::from_str(json).context("Failed to deserialize snapshot")?;
        store.check_version()?;
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open snapshot file: {:?}", path))?;
        let reader = BufReader::new(file);
        let store: Self =
            serde_json::from_reader(reader).context(format!("Failed to deserialize snapshot: {:?}", path))?;
        store.check_version()?;

        #[cfg(debug_assertions)]
        if PRINT_SERDE {
            log::info!(
                "Loaded snapshot v{} with {} symbols from {:?}",
                store.version,
                store.symbols.len(),
                path
            );
        }
        Ok(store)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let file = File::create(path).context(format!("Failed to create file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .context(format!("Failed to serialize snapshot to: {}", path.display()))?;

        #[cfg(debug_assertions)]
        if PRINT_SERDE {
            log::info!("Saved snapshot with {} symbols to {}", self.symbols.len(), path.display());
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(SNAPSHOT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeProfileConfig;
    use crate::models::RangeStatus;

    fn sample() -> ProfileStore {
        let range = Range {
            id: Range::id_for(1_000),
            start_timestamp: 1_000,
            end_timestamp: 61_000,
            high: 10.5,
            low: 9.5,
            ma: 10.0 + 0.1 + 0.2,
            atr: 0.9290000000000124,
            candle_count: 20,
            status: RangeStatus::Confirmed,
            is_auto_detected: true,
            detected_at: 61_000,
            enabled: false,
        };
        let profile = FixedRangeProfile::for_range(
            &range.id,
            range.start_timestamp,
            range.end_timestamp,
            "A".to_string(),
            VolumeProfileConfig::auto_detected(),
        );
        let snapshot = SymbolSnapshot {
            ranges: vec![range],
            profiles: vec![profile],
            deleted_ranges: BTreeMap::from([("range_5".to_string(), 65_000)]),
            dismissed_profiles: BTreeMap::new(),
        };
        ProfileStore::new(BTreeMap::from([("BTCUSDT".to_string(), snapshot)]))
    }

    #[test]
    fn json_round_trip_keeps_the_data_model() {
        let store = sample();
        let back = ProfileStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(back, store);
        assert!(!back.symbols["BTCUSDT"].ranges[0].enabled);
        // Floats come back bit for bit.
        assert_eq!(back.symbols["BTCUSDT"].ranges[0].atr.to_bits(), 0.9290000000000124f64.to_bits());
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("range-profiler-store-{}", std::process::id()));
        let path = dir.join("snapshot.json");
        let store = sample();
        store.save_to_path(&path).unwrap();
        let back = ProfileStore::load_from_path(&path).unwrap();
        assert_eq!(back, store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn newer_major_version_is_refused() {
        let mut store = sample();
        store.version = SNAPSHOT_VERSION + 1.0;
        assert!(ProfileStore::from_json(&store.to_json().unwrap()).is_err());
        store.version = SNAPSHOT_VERSION + 0.5;
        assert!(ProfileStore::from_json(&store.to_json().unwrap()).is_ok());
    }

    #[test]
    fn older_snapshots_without_deletion_lists_still_load() {
        let json = r#"{"version":1.0,"saved_at_ms":0,"symbols":{"ETHUSDT":{"ranges":[],"profiles":[]}}}"#;
        let store = ProfileStore::from_json(json).unwrap();
        assert!(store.symbols["ETHUSDT"].deleted_ranges.is_empty());
    }
}
