//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so release
//! builds remain quiet. Every flag is further gated by `cfg(debug_assertions)`
//! at the call site.

/// Emit a line for every range opened, re-entered, paused or finalized during a scan.
pub const PRINT_RANGE_EVENTS: bool = false;

/// Emit post-scan merge and prune summaries.
pub const PRINT_RANGE_SUMMARY: bool = false;

/// Emit profile create/extend/merge decisions made by the coordinator.
pub const PRINT_PROFILE_EVENTS: bool = false;

/// Emit volume profile cache hits and recomputations.
pub const PRINT_PROFILE_CACHE_EVENTS: bool = false;

/// Emit details of snapshot serialization/deserialization.
pub const PRINT_SERDE: bool = false;
