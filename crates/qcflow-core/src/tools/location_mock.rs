//! Mock location provider for testing.

use crate::error::{QcError, Result};
use crate::tools::location::{GeoPoint, LocationProvider};
use std::sync::{Arc, Mutex};

/// Mock location provider.
///
/// Reports a settable position, or fails when denied. Counts lookups so
/// tests can check how often the engine asked.
///
/// # Examples
///
/// ```
/// use qcflow_core::tools::location::{GeoPoint, LocationProvider};
/// use qcflow_core::tools::location_mock::MockLocationProvider;
///
/// let location = MockLocationProvider::at(GeoPoint::new(19.43, -99.13));
/// assert_eq!(location.current_location().unwrap().latitude, 19.43);
///
/// location.deny();
/// assert!(location.current_location().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockLocationProvider {
    /// Position to report (`None` means denied).
    point: Arc<Mutex<Option<GeoPoint>>>,
    /// Number of lookups performed.
    calls: Arc<Mutex<usize>>,
}

impl MockLocationProvider {
    /// Creates a provider that denies every lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider reporting `point`.
    pub fn at(point: GeoPoint) -> Self {
        let provider = Self::new();
        provider.set_location(point);
        provider
    }

    /// Changes the reported position.
    pub fn set_location(&self, point: GeoPoint) {
        *self.point.lock().unwrap() = Some(point);
    }

    /// Makes subsequent lookups fail.
    pub fn deny(&self) {
        *self.point.lock().unwrap() = None;
    }

    /// Returns how many lookups have been made.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl LocationProvider for MockLocationProvider {
    fn current_location(&self) -> Result<GeoPoint> {
        *self.calls.lock().unwrap() += 1;
        self.point
            .lock()
            .unwrap()
            .ok_or_else(|| QcError::LocationUnavailable("permission denied".into()))
    }
}
