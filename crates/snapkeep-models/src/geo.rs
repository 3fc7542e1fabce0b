//! Geolocation parsing and coordinate formatting.
//!
//! Export manifests carry location as free text; the only reliable signal is
//! a `"<lat>,<lon>"` decimal pair somewhere in the string. This module finds
//! that pair and converts it into the representations the embedders need:
//! EXIF degree/minute/second rationals and ISO 6709 container metadata.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A signed decimal-degree coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One coordinate component as EXIF rationals.
///
/// Degrees and minutes use a denominator of 1; seconds use a denominator of
/// 100, giving two decimal places of precision (within 1/720000 of a degree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmsRational {
    pub degrees: u32,
    pub minutes: u32,
    /// Seconds scaled by 100 (pair with [`DmsRational::SECONDS_DENOMINATOR`]).
    pub seconds_num: u32,
}

impl DmsRational {
    pub const SECONDS_DENOMINATOR: u32 = 100;

    /// Convert an absolute decimal-degree value.
    pub fn from_degrees(value: f64) -> Self {
        let abs = value.abs();
        let degrees = abs.trunc() as u32;
        let minutes_f = (abs - f64::from(degrees)) * 60.0;
        let minutes = minutes_f.trunc() as u32;
        let seconds_num = ((minutes_f - f64::from(minutes)) * 60.0
            * f64::from(Self::SECONDS_DENOMINATOR))
        .round() as u32;
        Self {
            degrees,
            minutes,
            seconds_num,
        }
    }

    /// Reconstruct the absolute decimal-degree value.
    pub fn to_degrees(self) -> f64 {
        f64::from(self.degrees)
            + f64::from(self.minutes) / 60.0
            + f64::from(self.seconds_num) / f64::from(Self::SECONDS_DENOMINATOR) / 3600.0
    }
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Hemisphere reference for the latitude ("N"/"S").
    pub fn latitude_ref(&self) -> &'static str {
        if self.latitude >= 0.0 {
            "N"
        } else {
            "S"
        }
    }

    /// Hemisphere reference for the longitude ("E"/"W").
    pub fn longitude_ref(&self) -> &'static str {
        if self.longitude >= 0.0 {
            "E"
        } else {
            "W"
        }
    }

    /// Latitude as EXIF rationals (unsigned; pair with [`Self::latitude_ref`]).
    pub fn latitude_dms(&self) -> DmsRational {
        DmsRational::from_degrees(self.latitude)
    }

    /// Longitude as EXIF rationals (unsigned; pair with [`Self::longitude_ref`]).
    pub fn longitude_dms(&self) -> DmsRational {
        DmsRational::from_degrees(self.longitude)
    }

    /// Format as ISO 6709 for container `location` metadata.
    ///
    /// Example: `+51.500700-0.124600/`
    pub fn to_iso6709(&self) -> String {
        format!("{:+.6}{:+.6}/", self.latitude, self.longitude)
    }
}

fn latlon_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(-?\d+\.\d+),\s*(-?\d+\.\d+)").expect("static regex must compile")
    })
}

/// Extract a `"<lat>,<lon>"` decimal pair from free-form location text.
///
/// Returns `None` when the input is absent, empty, or contains no such pair.
/// Values are passed through as parsed; range validation is not applied here.
pub fn parse_latlon(location: Option<&str>) -> Option<GeoPoint> {
    let text = location?;
    if text.is_empty() {
        return None;
    }

    let captures = latlon_pattern().captures(text)?;
    let latitude: f64 = captures.get(1)?.as_str().parse().ok()?;
    let longitude: f64 = captures.get(2)?.as_str().parse().ok()?;
    Some(GeoPoint::new(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pair() {
        let point = parse_latlon(Some("40.712800, -74.006000")).unwrap();
        assert!((point.latitude - 40.7128).abs() < 1e-9);
        assert!((point.longitude + 74.006).abs() < 1e-9);
    }

    #[test]
    fn parses_pair_embedded_in_text() {
        let point =
            parse_latlon(Some("Latitude, Longitude: -33.868800, 151.209300")).unwrap();
        assert!((point.latitude + 33.8688).abs() < 1e-9);
        assert!((point.longitude - 151.2093).abs() < 1e-9);
    }

    #[test]
    fn rejects_missing_or_empty() {
        assert!(parse_latlon(None).is_none());
        assert!(parse_latlon(Some("")).is_none());
        assert!(parse_latlon(Some("somewhere nice")).is_none());
        // Integers without a decimal part do not match the pattern.
        assert!(parse_latlon(Some("40, -74")).is_none());
    }

    #[test]
    fn dms_round_trip_stays_within_rounding_error() {
        // 2-decimal-place seconds bound: 0.005s = 1/720000 degree.
        let bound = 1.0 / 720_000.0 + 1e-12;
        for &value in &[0.0, 40.7128, -74.006, 89.999999, -179.999999, 12.345678] {
            let dms = DmsRational::from_degrees(value);
            assert!(
                (dms.to_degrees() - value.abs()).abs() <= bound,
                "round-trip drift too large for {value}"
            );
        }
    }

    #[test]
    fn hemisphere_refs() {
        let ny = GeoPoint::new(40.7128, -74.006);
        assert_eq!(ny.latitude_ref(), "N");
        assert_eq!(ny.longitude_ref(), "W");

        let sydney = GeoPoint::new(-33.8688, 151.2093);
        assert_eq!(sydney.latitude_ref(), "S");
        assert_eq!(sydney.longitude_ref(), "E");
    }

    #[test]
    fn iso6709_formatting() {
        let point = GeoPoint::new(40.7128, -74.006);
        assert_eq!(point.to_iso6709(), "+40.712800-74.006000/");
    }
}
