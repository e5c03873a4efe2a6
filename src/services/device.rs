//! Minimal device seam implementations for headless use.

use async_trait::async_trait;

use crate::error::{AcquireError, LocationError};
use crate::location::Coordinate;
use crate::services::{CameraDevice, CapturedFrame, GeolocationProvider};

/// A geolocation provider backed by a fixed coordinate, or by nothing.
///
/// Real device backends (browser geolocation, OS location services) are an
/// integration concern; this stands in where none is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPosition {
    coordinate: Option<Coordinate>,
}

impl StaticPosition {
    /// Always resolves to `coordinate`.
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
        }
    }

    /// Always fails with `PositionUnavailable`.
    pub fn unavailable() -> Self {
        Self { coordinate: None }
    }
}

#[async_trait]
impl GeolocationProvider for StaticPosition {
    async fn position(&self) -> Result<Coordinate, LocationError> {
        self.coordinate.ok_or(LocationError::PositionUnavailable)
    }
}

/// A camera seam for hosts with no capture device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    async fn capture(&self) -> Result<CapturedFrame, AcquireError> {
        Err(AcquireError::DeviceUnavailable)
    }
}
