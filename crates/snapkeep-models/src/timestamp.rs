//! Capture-time parsing and formatting.
//!
//! Export entries carry times as `"YYYY-MM-DD HH:MM:SS TZ"` strings (the
//! trailing timezone abbreviation, usually `UTC`, is informational only). The
//! parsed value stays naive; no timezone conversion is applied. All output
//! formats consumed elsewhere in the pipeline derive from this one type.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture-time format accepted from manifests.
const CAPTURE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureTimeError {
    #[error("empty capture time string")]
    Empty,

    #[error("unrecognized capture time format: {0}")]
    InvalidFormat(String),
}

/// A naive capture timestamp plus the raw manifest string it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTime {
    raw: String,
    parsed: NaiveDateTime,
}

impl CaptureTime {
    /// Parse `"YYYY-MM-DD HH:MM:SS"` with an optional trailing timezone
    /// abbreviation, which is discarded.
    pub fn parse(raw: &str) -> Result<Self, CaptureTimeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CaptureTimeError::Empty);
        }

        // Drop a trailing alphabetic token ("UTC", "GMT", ...) if present.
        let datetime_part = match trimmed.rsplit_once(' ') {
            Some((head, tail)) if tail.chars().all(|c| c.is_ascii_alphabetic()) => head,
            _ => trimmed,
        };

        let parsed = NaiveDateTime::parse_from_str(datetime_part, CAPTURE_FORMAT)
            .map_err(|_| CaptureTimeError::InvalidFormat(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            parsed,
        })
    }

    /// The manifest string this was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.parsed
    }

    /// Filename-safe prefix: colons become dashes, the ` UTC` suffix is
    /// stripped, remaining spaces become underscores.
    ///
    /// `"2021-10-06 23:09:21 UTC"` -> `"2021-10-06_23-09-21"`
    pub fn filename_prefix(&self) -> String {
        self.raw
            .replace(':', "-")
            .replace(" UTC", "")
            .replace(' ', "_")
    }

    /// EXIF date-time slot format: `"YYYY:MM:DD HH:MM:SS"`.
    pub fn exif_datetime(&self) -> String {
        self.parsed.format("%Y:%m:%d %H:%M:%S").to_string()
    }

    /// Container `creation_time` format: `"YYYY-MM-DDTHH:MM:SSZ"`.
    pub fn creation_time(&self) -> String {
        self.parsed.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_timezone_abbreviation() {
        let time = CaptureTime::parse("2021-10-06 23:09:21 UTC").unwrap();
        assert_eq!(time.exif_datetime(), "2021:10:06 23:09:21");
    }

    #[test]
    fn parses_without_timezone_abbreviation() {
        let time = CaptureTime::parse("2021-10-06 23:09:21").unwrap();
        assert_eq!(time.creation_time(), "2021-10-06T23:09:21Z");
    }

    #[test]
    fn filename_prefix_normalization() {
        let time = CaptureTime::parse("2021-10-06 23:09:21 UTC").unwrap();
        assert_eq!(time.filename_prefix(), "2021-10-06_23-09-21");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(CaptureTime::parse("   "), Err(CaptureTimeError::Empty));
        assert!(matches!(
            CaptureTime::parse("06/10/2021"),
            Err(CaptureTimeError::InvalidFormat(_))
        ));
    }
}
