//! Service seams for the external collaborators.
//!
//! Each collaborator is a narrow async trait: the Analysis Service, the
//! Geolocation Provider, the Provider Directory Service, and the
//! Conversational Service, plus the camera device used by acquisition.
//! Transport lives behind these traits; the stages never see it.

pub mod device;
pub mod http;

pub use device::{NoCamera, StaticPosition};
pub use http::{HttpBackend, HttpConfig};

use async_trait::async_trait;

use crate::analysis::AnalysisResult;
use crate::directory::Provider;
use crate::error::{AcquireError, AnalysisError, ChatError, DirectoryError, LocationError};
use crate::location::Coordinate;

/// Remote image analysis.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyze an image and return the structured result.
    async fn analyze(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Device geolocation.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Resolve the device's current position.
    async fn position(&self) -> Result<Coordinate, LocationError>;
}

/// Professional provider directory lookup.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Search for providers near a coordinate, ordered by relevance.
    async fn search(&self, at: Coordinate) -> Result<Vec<Provider>, DirectoryError>;
}

/// Conversational assistant backend.
#[async_trait]
pub trait ConversationalService: Send + Sync {
    /// Produce a reply to a single user message.
    async fn respond(&self, message: &str) -> Result<String, ChatError>;
}

/// A single frame captured from a camera device.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Camera capture device.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Capture one frame, requesting device access if needed.
    async fn capture(&self) -> Result<CapturedFrame, AcquireError>;
}
