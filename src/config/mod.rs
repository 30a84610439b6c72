//! Configuration models for intersection runs, station runs, and pacing.

pub mod crossing;
pub mod pacing;
pub mod station;

pub use crossing::CrossingConfig;
pub use pacing::PacingConfig;
pub use station::{ClientSpec, StationConfig};
