//! Location resolution stage.
//!
//! Two mutually exclusive strategies, each attempted per user action and
//! never auto-chained: the device geolocation provider, or a lookup of a
//! user-supplied city name against a fixed table. Either success stores
//! the coordinate and immediately triggers a provider directory query;
//! the most recently resolved coordinate wins.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::directory::DirectoryStage;
use crate::error::LocationError;
use crate::services::GeolocationProvider;
use crate::session::SessionEvent;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Recognized city names and their coordinates. Immutable configuration;
/// lookups are case-insensitive.
pub const CITY_COORDS: &[(&str, Coordinate)] = &[
    ("delhi", Coordinate { lat: 28.6139, lng: 77.2090 }),
    ("mumbai", Coordinate { lat: 19.0760, lng: 72.8777 }),
    ("bangalore", Coordinate { lat: 12.9716, lng: 77.5946 }),
    ("chennai", Coordinate { lat: 13.0827, lng: 80.2707 }),
    ("kolkata", Coordinate { lat: 22.5726, lng: 88.3639 }),
    ("hyderabad", Coordinate { lat: 17.3850, lng: 78.4867 }),
    ("pune", Coordinate { lat: 18.5204, lng: 73.8567 }),
    ("ahmedabad", Coordinate { lat: 23.0225, lng: 72.5714 }),
];

/// Look up a city name, ignoring case and surrounding whitespace.
pub fn lookup_city(name: &str) -> Option<Coordinate> {
    let name = name.trim();
    CITY_COORDS
        .iter()
        .find(|(city, _)| city.eq_ignore_ascii_case(name))
        .map(|(_, coordinate)| *coordinate)
}

/// The location resolution stage.
pub struct LocationStage {
    current: RwLock<Option<Coordinate>>,
    geolocation: Arc<dyn GeolocationProvider>,
    directory: DirectoryStage,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl LocationStage {
    pub(crate) fn new(
        geolocation: Arc<dyn GeolocationProvider>,
        directory: DirectoryStage,
        timeout: Duration,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            current: RwLock::new(None),
            geolocation,
            directory,
            timeout,
            events,
        }
    }

    /// Resolve via the device geolocation provider.
    ///
    /// Failure is recoverable: the caller should offer the city strategy
    /// instead. No fallback happens automatically, and no directory query
    /// is issued.
    pub async fn from_device(&self) -> Result<Coordinate, LocationError> {
        let coordinate =
            match tokio::time::timeout(self.timeout, self.geolocation.position()).await {
                Ok(result) => result,
                Err(_) => Err(LocationError::PositionUnavailable),
            }
            .inspect_err(|error| warn!(%error, "Device position failed"))?;
        self.resolve(coordinate).await;
        Ok(coordinate)
    }

    /// Resolve via the static city table.
    ///
    /// Unknown names fail with `UnknownCity` and leave any previously
    /// resolved coordinate untouched.
    pub async fn from_city(&self, name: &str) -> Result<Coordinate, LocationError> {
        let coordinate = lookup_city(name).ok_or_else(|| {
            warn!(city = %name.trim(), "Unknown city");
            LocationError::UnknownCity {
                name: name.trim().to_string(),
            }
        })?;
        info!(city = %name.trim(), lat = coordinate.lat, lng = coordinate.lng, "City resolved");
        self.resolve(coordinate).await;
        Ok(coordinate)
    }

    /// The most recently resolved coordinate, if any.
    pub async fn current(&self) -> Option<Coordinate> {
        *self.current.read().await
    }

    async fn resolve(&self, coordinate: Coordinate) {
        *self.current.write().await = Some(coordinate);
        let _ = self.events.send(SessionEvent::LocationResolved(coordinate));
        self.directory.query(coordinate).await;
    }
}
