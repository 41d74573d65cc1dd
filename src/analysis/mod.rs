// Range detection and volume profile algorithms
pub mod coordinator;
pub mod indicators;
pub mod range_detector;
pub mod volume_profile;

// Re-export commonly used types
pub use coordinator::{ProfileChange, RangeProfileCoordinator, SyncReport};
pub use indicators::{compute_atr, compute_sma};
pub use range_detector::{DetectorState, RangeDetector};
pub use volume_profile::compute_profile;
