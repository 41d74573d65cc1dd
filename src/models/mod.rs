// Data model for detected ranges and their volume profiles.
// These modules hold plain records; the algorithms live in `analysis`.

pub mod fixed_range;
pub mod range;
pub mod volume_profile;

// Re-export key types for convenience
pub use fixed_range::FixedRangeProfile;
pub use range::{Range, RangeStatus};
pub use volume_profile::{PointOfControl, ProfileLevel, ValueArea, VolumeProfile};
