//! Geographic coordinates and their validation.
//!
//! Every coordinate that reaches a geocoder has been range-checked here first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude and longitude are required")]
    Missing,
    #[error("Invalid latitude or longitude")]
    Invalid,
    #[error("Coordinates out of valid range")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Fallback centre used when the user declines to share a location.
    pub const FALLBACK: Coordinate = Coordinate {
        latitude: 19.4326,
        longitude: -99.1332,
    };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::Invalid);
        }

        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
            || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
        {
            return Err(CoordinateError::OutOfRange);
        }

        Ok(Self { latitude, longitude })
    }

    /// Parse raw query values. Absent or blank values are `Missing`, values that
    /// are not finite decimal numbers are `Invalid`.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self, CoordinateError> {
        let lat = lat.map(str::trim).filter(|s| !s.is_empty());
        let lon = lon.map(str::trim).filter(|s| !s.is_empty());

        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Err(CoordinateError::Missing);
        };

        let latitude: f64 = lat.parse().map_err(|_| CoordinateError::Invalid)?;
        let longitude: f64 = lon.parse().map_err(|_| CoordinateError::Invalid)?;

        Self::new(latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_bounds() {
        for (lat, lon) in [(-90.0, -180.0), (90.0, 180.0), (0.0, 0.0), (19.4326, -99.1332)] {
            assert!(Coordinate::new(lat, lon).is_ok(), "{lat},{lon}");
        }
    }

    #[test]
    fn rejects_out_of_range() {
        for (lat, lon) in [(90.0001, 0.0), (-90.5, 0.0), (0.0, 180.01), (0.0, -181.0)] {
            assert_eq!(Coordinate::new(lat, lon), Err(CoordinateError::OutOfRange));
        }
    }

    #[test]
    fn parse_distinguishes_missing_and_invalid() {
        assert_eq!(Coordinate::parse(None, Some("1")), Err(CoordinateError::Missing));
        assert_eq!(Coordinate::parse(Some(" "), Some("1")), Err(CoordinateError::Missing));
        assert_eq!(Coordinate::parse(Some("abc"), Some("1")), Err(CoordinateError::Invalid));
        assert_eq!(Coordinate::parse(Some("NaN"), Some("1")), Err(CoordinateError::Invalid));
        assert_eq!(Coordinate::parse(Some("inf"), Some("1")), Err(CoordinateError::Invalid));
        assert_eq!(
            Coordinate::parse(Some("95"), Some("1")),
            Err(CoordinateError::OutOfRange)
        );

        let coord = Coordinate::parse(Some("19.4326"), Some("-99.1332")).unwrap();
        assert_eq!(coord, Coordinate::FALLBACK);
    }
}
