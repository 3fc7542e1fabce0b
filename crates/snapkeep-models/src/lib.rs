//! Shared data models for the Snapkeep export pipeline.
//!
//! This crate provides Serde-backed types for:
//! - The saved-media export manifest and its loosely-keyed entries
//! - Geolocation parsing and EXIF/ISO-6709 coordinate formatting
//! - Capture-time parsing and the filename/metadata formats derived from it

pub mod geo;
pub mod manifest;
pub mod timestamp;

// Re-export common types
pub use geo::{parse_latlon, DmsRational, GeoPoint};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use timestamp::CaptureTime;
