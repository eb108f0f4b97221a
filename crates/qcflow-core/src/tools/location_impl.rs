//! Station location provider.
//!
//! Fixed stations have no positioning hardware; their coordinates come from
//! configuration. A station without configured coordinates reports the
//! location as unavailable.

use crate::config::LocationConfig;
use crate::error::{QcError, Result};
use crate::tools::location::{GeoPoint, LocationProvider};

/// Location provider returning configured station coordinates.
#[derive(Debug, Clone, Default)]
pub struct FixedLocationProvider {
    point: Option<GeoPoint>,
}

impl FixedLocationProvider {
    /// Creates a provider that always reports `point` (or nothing).
    pub fn new(point: Option<GeoPoint>) -> Self {
        Self { point }
    }

    /// Creates a provider from the `[location]` config section.
    pub fn from_config(config: &LocationConfig) -> Self {
        let point = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
                accuracy: config.accuracy,
            }),
            _ => None,
        };
        Self { point }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn current_location(&self) -> Result<GeoPoint> {
        self.point
            .ok_or_else(|| QcError::LocationUnavailable("no station coordinates configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::location::locate_or_zero;

    #[test]
    fn test_configured_coordinates_are_reported() {
        let config = LocationConfig {
            latitude: Some(25.6866),
            longitude: Some(-100.3161),
            accuracy: Some(12.0),
        };
        let provider = FixedLocationProvider::from_config(&config);
        let point = provider.current_location().unwrap();
        assert_eq!(point.latitude, 25.6866);
        assert_eq!(point.accuracy, Some(12.0));
    }

    #[test]
    fn test_missing_coordinates_degrade_to_zero() {
        let provider = FixedLocationProvider::from_config(&LocationConfig {
            latitude: Some(25.0),
            longitude: None,
            accuracy: None,
        });
        assert!(provider.current_location().is_err());
        assert_eq!(locate_or_zero(&provider), GeoPoint::UNAVAILABLE);
    }
}
