//! Location permission flow.
//!
//! A small state machine over the permission states a device reports for
//! geolocation access. The device side (permission query, position request)
//! sits behind [`LocationProvider`] so the flow can be driven by any client
//! runtime, and by fakes in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// A position fix, shared by scans and reports as their location payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when the device reports one
    pub accuracy: Option<f64>,
}

impl Coordinates {
    pub fn validate(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy.map_or(true, |a| a.is_finite() && a >= 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unknown,
    Prompt,
    Granted,
    Denied,
}

/// Why a position request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// The device has no geolocation capability
    Unsupported,
    Unknown(u16),
}

impl LocationError {
    /// Map a device error code (1, 2, 3) to a location error
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => LocationError::PermissionDenied,
            2 => LocationError::PositionUnavailable,
            3 => LocationError::Timeout,
            other => LocationError::Unknown(other),
        }
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::PermissionDenied => f.write_str("Location permission denied"),
            LocationError::PositionUnavailable => f.write_str("Location information unavailable"),
            LocationError::Timeout => f.write_str("Location request timed out"),
            LocationError::Unsupported => f.write_str("Geolocation is not supported"),
            LocationError::Unknown(code) => write!(f, "Unknown location error ({})", code),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Device capabilities the flow depends on
pub trait LocationProvider {
    /// Whether the device exposes geolocation at all
    fn has_geolocation(&self) -> bool;

    /// Query the permission API; `None` when the device has no permission API
    fn query_permission(&self) -> impl Future<Output = Option<PermissionState>> + Send;

    /// Request a position fix; errors carry the device error code
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Coordinates, u16>> + Send;
}

pub struct LocationFlow<P> {
    provider: P,
    options: PositionOptions,
    state: PermissionState,
    coordinates: Option<Coordinates>,
    error: Option<LocationError>,
}

impl<P: LocationProvider> LocationFlow<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, PositionOptions::default())
    }

    pub fn with_options(provider: P, options: PositionOptions) -> Self {
        Self {
            provider,
            options,
            state: PermissionState::Unknown,
            coordinates: None,
            error: None,
        }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn error(&self) -> Option<LocationError> {
        self.error
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.map(|e| e.to_string())
    }

    /// Resolve the initial permission state; a no-op once resolved
    pub async fn initialize(&mut self) -> PermissionState {
        if self.state != PermissionState::Unknown {
            return self.state;
        }

        self.state = match self.provider.query_permission().await {
            Some(PermissionState::Unknown) | None if self.provider.has_geolocation() => {
                PermissionState::Prompt
            }
            Some(PermissionState::Unknown) | None => PermissionState::Denied,
            Some(state) => state,
        };

        tracing::debug!("Location permission resolved to {:?}", self.state);
        self.state
    }

    /// User-initiated position request
    ///
    /// Success moves to `Granted` and stores the fix. Failure keeps the
    /// current state and records the error.
    pub async fn request(&mut self) -> Result<Coordinates, LocationError> {
        if !self.provider.has_geolocation() {
            self.error = Some(LocationError::Unsupported);
            return Err(LocationError::Unsupported);
        }

        match self.provider.current_position(&self.options).await {
            Ok(coordinates) => {
                self.state = PermissionState::Granted;
                self.coordinates = Some(coordinates);
                self.error = None;
                Ok(coordinates)
            }
            Err(code) => {
                let error = LocationError::from_code(code);
                tracing::debug!("Location request failed: {}", error);
                self.error = Some(error);
                Err(error)
            }
        }
    }

    /// Manual refresh of an existing fix
    pub async fn refresh(&mut self) -> Result<Coordinates, LocationError> {
        self.request().await
    }
}
