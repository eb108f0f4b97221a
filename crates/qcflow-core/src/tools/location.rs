//! Geolocation adapter trait.
//!
//! Checkpoints carry the technician's position. Location is best effort:
//! when the provider fails for any reason the engine records zeroed
//! coordinates instead of failing the step.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A geographic position as reported by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Reported accuracy radius in meters, if known.
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    /// Zeroed position recorded when no location is available.
    pub const UNAVAILABLE: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
        accuracy: None,
    };

    /// Creates a position without accuracy information.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    /// Sets the accuracy radius in meters.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// Location provider trait.
///
/// Implementations may query a device, a station configuration, or a test
/// double.
pub trait LocationProvider: Send + Sync {
    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns `QcError::LocationUnavailable` on denial, timeout, or when
    /// no position source exists.
    fn current_location(&self) -> Result<GeoPoint>;
}

/// Queries the provider, degrading to [`GeoPoint::UNAVAILABLE`] on failure.
pub fn locate_or_zero(provider: &dyn LocationProvider) -> GeoPoint {
    match provider.current_location() {
        Ok(point) => point,
        Err(e) => {
            tracing::debug!(error = %e, "location unavailable, recording zeroed coordinates");
            GeoPoint::UNAVAILABLE
        }
    }
}
