//! Image acquisition stage.
//!
//! Obtains image bytes from a file candidate or the camera seam,
//! validates the declared media type, and derives a displayable preview.
//! The asset is owned by this stage alone and lives only for the session.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use std::sync::Arc;

use crate::error::AcquireError;
use crate::services::CameraDevice;
use crate::session::SessionEvent;

/// An acquired image: raw bytes, declared media type, derived preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// `data:` URL preview for the presentation collaborator.
    pub preview: String,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, media_type: String) -> Self {
        let preview = format!("data:{};base64,{}", media_type, STANDARD.encode(&bytes));
        Self {
            bytes,
            media_type,
            preview,
        }
    }
}

/// A file offered by the user, before validation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// The image acquisition stage.
pub struct AcquireStage {
    asset: RwLock<Option<ImageAsset>>,
    camera: Arc<dyn CameraDevice>,
    events: broadcast::Sender<SessionEvent>,
}

impl AcquireStage {
    pub(crate) fn new(
        camera: Arc<dyn CameraDevice>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            asset: RwLock::new(None),
            camera,
            events,
        }
    }

    /// Accept a user-selected file as the current asset.
    ///
    /// Only candidates declaring an `image/` media type are accepted; a
    /// rejection leaves the current asset unchanged. On success the prior
    /// asset and its preview are discarded.
    pub async fn select_file(&self, candidate: FileCandidate) -> Result<(), AcquireError> {
        if !candidate.media_type.starts_with("image/") {
            warn!(
                name = %candidate.name,
                media_type = %candidate.media_type,
                "Rejected non-image candidate"
            );
            return Err(AcquireError::InvalidMediaType {
                media_type: candidate.media_type,
            });
        }

        let asset = ImageAsset::new(candidate.bytes, candidate.media_type);
        info!(name = %candidate.name, media_type = %asset.media_type, size = asset.bytes.len(), "Image selected");
        *self.asset.write().await = Some(asset);
        let _ = self.events.send(SessionEvent::AssetReplaced);
        Ok(())
    }

    /// Capture a frame from the camera and use it as the current asset.
    pub async fn capture(&self) -> Result<(), AcquireError> {
        let frame = self.camera.capture().await.inspect_err(|error| {
            warn!(%error, "Camera capture failed");
        })?;
        self.select_file(FileCandidate {
            name: "camera-capture".to_string(),
            media_type: frame.media_type,
            bytes: frame.bytes,
        })
        .await
    }

    /// Remove the current asset and preview. Idempotent.
    pub async fn clear(&self) {
        let removed = self.asset.write().await.take();
        if removed.is_some() {
            debug!("Image cleared");
            let _ = self.events.send(SessionEvent::AssetCleared);
        }
    }

    /// The current asset, if any.
    pub async fn current(&self) -> Option<ImageAsset> {
        self.asset.read().await.clone()
    }

    /// Preview of the current asset, if any.
    pub async fn preview(&self) -> Option<String> {
        self.asset.read().await.as_ref().map(|a| a.preview.clone())
    }
}
