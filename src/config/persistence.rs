//! File persistence and serialization configuration

/// Default snapshot path written by the CLI
pub const SNAPSHOT_PATH: &str = "range_profiles.json";

/// Current version of the snapshot format.
/// Readers refuse snapshots with a newer major version.
pub const SNAPSHOT_VERSION: f64 = 1.0;
