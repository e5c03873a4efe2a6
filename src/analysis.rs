//! Skin analysis stage.
//!
//! `Idle → Pending → Succeeded | Failed`. Overlapping submissions follow
//! last-submitted-wins: every `submit` takes a fresh ticket and a
//! completion is applied only while its ticket is still current, so a
//! stale response can never clobber a newer one. There is no implicit
//! retry; a failed stage waits for the next user-initiated `submit`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::acquire::ImageAsset;
use crate::error::AnalysisError;
use crate::services::AnalysisService;
use crate::session::SessionEvent;
use crate::stage::{StageStatus, SubmissionTicket};

/// Skin type reported by the analysis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkinType {
    Dry,
    Oily,
    Combination,
    Normal,
    Sensitive,
    #[serde(rename = "Acne-prone")]
    AcneProne,
}

impl std::fmt::Display for SkinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dry => "Dry",
            Self::Oily => "Oily",
            Self::Combination => "Combination",
            Self::Normal => "Normal",
            Self::Sensitive => "Sensitive",
            Self::AcneProne => "Acne-prone",
        };
        write!(f, "{s}")
    }
}

/// Care advice accompanying an analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub home_remedies: Vec<String>,
    pub chemicals: Vec<String>,
}

/// A completed skin analysis. Immutable once produced; a new submission
/// discards the previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub skin_type: SkinType,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Identified concerns, in reported order.
    pub issues: Vec<String>,
    pub advice: Advice,
}

impl AnalysisResult {
    /// Reject responses that decode but violate the contract.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AnalysisError::MalformedResponse {
                reason: format!("confidence {} outside [0, 1]", self.confidence),
            });
        }
        Ok(())
    }
}

/// The analysis stage state machine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AnalysisStage {
    inner: Arc<AnalysisInner>,
}

struct AnalysisInner {
    status: RwLock<StageStatus<AnalysisResult, AnalysisError>>,
    tickets: SubmissionTicket,
    service: Arc<dyn AnalysisService>,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl AnalysisStage {
    pub(crate) fn new(
        service: Arc<dyn AnalysisService>,
        timeout: Duration,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(AnalysisInner {
                status: RwLock::new(StageStatus::Idle),
                tickets: SubmissionTicket::new(),
                service,
                timeout,
                events,
            }),
        }
    }

    /// Current status snapshot.
    pub async fn status(&self) -> StageStatus<AnalysisResult, AnalysisError> {
        self.inner.status.read().await.clone()
    }

    /// The latest successful result, if any.
    pub async fn result(&self) -> Option<AnalysisResult> {
        self.inner.status.read().await.payload().cloned()
    }

    /// Submit an image for analysis.
    ///
    /// Transitions to `Pending` and invokes the service in the
    /// background. A resubmission while pending supersedes the in-flight
    /// request; its response, whenever it arrives, is discarded.
    pub async fn submit(&self, asset: &ImageAsset) {
        let ticket = self.inner.tickets.issue();
        {
            let mut status = self.inner.status.write().await;
            *status = StageStatus::Pending;
        }
        info!(ticket, media_type = %asset.media_type, "Analysis submitted");
        let _ = self
            .inner
            .events
            .send(SessionEvent::AnalysisChanged(StageStatus::Pending));

        let inner = Arc::clone(&self.inner);
        let bytes = asset.bytes.clone();
        let media_type = asset.media_type.clone();
        tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(inner.timeout, inner.service.analyze(&bytes, &media_type))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AnalysisError::Timeout),
                };
            inner.apply(ticket, outcome).await;
        });
    }
}

impl AnalysisInner {
    /// Apply a completion if its ticket is still current.
    async fn apply(&self, ticket: u64, outcome: Result<AnalysisResult, AnalysisError>) {
        let mut status = self.status.write().await;
        if !self.tickets.is_current(ticket) {
            debug!(ticket, "Discarding stale analysis response");
            return;
        }
        let next = match outcome {
            Ok(result) => {
                info!(
                    ticket,
                    skin_type = %result.skin_type,
                    confidence = result.confidence,
                    issues = result.issues.len(),
                    "Analysis succeeded"
                );
                StageStatus::Succeeded(result)
            }
            Err(error) => {
                warn!(ticket, %error, "Analysis failed");
                StageStatus::Failed(error)
            }
        };
        *status = next.clone();
        drop(status);
        let _ = self.events.send(SessionEvent::AnalysisChanged(next));
    }
}
