//! Session facade wiring the stages together.
//!
//! Owns the five stage machines, connects location resolution to the
//! provider directory, and exposes one broadcast event feed so a
//! presentation collaborator can observe status changes without the core
//! depending on any rendering mechanism. All state is session-scoped.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::acquire::AcquireStage;
use crate::analysis::{AnalysisResult, AnalysisStage};
use crate::chat::{ChatMessage, ChatSession};
use crate::config::SessionConfig;
use crate::directory::{DirectoryStage, Provider};
use crate::error::{AnalysisError, ChatError, DirectoryError};
use crate::location::{Coordinate, LocationStage};
use crate::report::AnalysisReport;
use crate::services::{
    AnalysisService, CameraDevice, ConversationalService, DirectoryService, GeolocationProvider,
};
use crate::stage::StageStatus;

/// Broadcast capacity for the session event feed.
pub const EVENT_CAPACITY: usize = 256;

/// The external collaborators a session needs.
pub struct Services {
    pub analysis: Arc<dyn AnalysisService>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub directory: Arc<dyn DirectoryService>,
    pub conversation: Arc<dyn ConversationalService>,
    pub camera: Arc<dyn CameraDevice>,
}

/// State-change notifications for the presentation collaborator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new image asset replaced the previous one.
    AssetReplaced,
    /// The current asset was cleared.
    AssetCleared,
    /// The analysis stage changed status.
    AnalysisChanged(StageStatus<AnalysisResult, AnalysisError>),
    /// A coordinate was resolved (device or city strategy).
    LocationResolved(Coordinate),
    /// The provider directory stage changed status.
    DirectoryChanged(StageStatus<Vec<Provider>, DirectoryError>),
    /// A message was appended to the chat transcript.
    TranscriptAppended(ChatMessage),
    /// A single chat exchange failed; the session stays ready.
    ChatExchangeFailed(ChatError),
}

/// One advisory session. Stages are independent; none blocks another.
pub struct GlowSession {
    pub id: Uuid,
    pub acquire: AcquireStage,
    pub analysis: AnalysisStage,
    pub location: LocationStage,
    pub directory: DirectoryStage,
    pub chat: ChatSession,
    events: broadcast::Sender<SessionEvent>,
}

impl GlowSession {
    pub fn new(services: Services, config: SessionConfig) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let id = Uuid::new_v4();

        let directory = DirectoryStage::new(
            services.directory,
            config.directory_timeout,
            events.clone(),
        );
        let session = Self {
            id,
            acquire: AcquireStage::new(services.camera, events.clone()),
            analysis: AnalysisStage::new(
                services.analysis,
                config.analyze_timeout,
                events.clone(),
            ),
            location: LocationStage::new(
                services.geolocation,
                directory.clone(),
                config.device_timeout,
                events.clone(),
            ),
            directory,
            chat: ChatSession::new(
                services.conversation,
                config.chat_timeout,
                &config.greeting,
                events.clone(),
            ),
            events,
        };
        info!(session_id = %id, "Session started");
        session
    }

    /// Subscribe to stage status change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Submit the currently acquired image for analysis.
    ///
    /// Fails synchronously with `MissingAsset` when no image has been
    /// acquired; the analysis stage is not touched in that case.
    pub async fn analyze(&self) -> Result<(), AnalysisError> {
        let asset = self
            .acquire
            .current()
            .await
            .ok_or(AnalysisError::MissingAsset)?;
        self.analysis.submit(&asset).await;
        Ok(())
    }

    /// Display-ready projection of the latest analysis, if one exists.
    pub async fn report(&self) -> Option<AnalysisReport> {
        self.analysis
            .result()
            .await
            .map(|result| AnalysisReport::from(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::error::LocationError;
    use crate::services::{NoCamera, StaticPosition};

    struct UnreachableAnalysis;

    #[async_trait]
    impl AnalysisService for UnreachableAnalysis {
        async fn analyze(
            &self,
            _image: &[u8],
            _media_type: &str,
        ) -> Result<AnalysisResult, AnalysisError> {
            panic!("analysis service should not be called");
        }
    }

    struct EmptyDirectory;

    #[async_trait]
    impl DirectoryService for EmptyDirectory {
        async fn search(&self, _at: Coordinate) -> Result<Vec<Provider>, DirectoryError> {
            Ok(Vec::new())
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ConversationalService for EchoChat {
        async fn respond(&self, message: &str) -> Result<String, ChatError> {
            Ok(format!("echo: {message}"))
        }
    }

    fn build_session() -> GlowSession {
        GlowSession::new(
            Services {
                analysis: Arc::new(UnreachableAnalysis),
                geolocation: Arc::new(StaticPosition::unavailable()),
                directory: Arc::new(EmptyDirectory),
                conversation: Arc::new(EchoChat),
                camera: Arc::new(NoCamera),
            },
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn analyze_without_asset_fails_synchronously() {
        let session = build_session();
        assert_eq!(
            session.analyze().await.unwrap_err(),
            AnalysisError::MissingAsset
        );
        assert!(session.analysis.status().await.is_idle());
        assert!(session.report().await.is_none());
    }

    #[tokio::test]
    async fn stages_fail_independently() {
        let session = build_session();

        // A device-strategy failure leaves every other stage untouched.
        assert_eq!(
            session.location.from_device().await.unwrap_err(),
            LocationError::PositionUnavailable
        );
        assert!(session.directory.status().await.is_idle());
        assert!(session.analysis.status().await.is_idle());
        assert_eq!(session.chat.transcript().await.len(), 1);
    }
}
