//! Provider directory stage.
//!
//! Mirrors the analysis machine: `Idle → Pending → Succeeded | Failed`
//! with last-submitted-wins on requery. An empty result set is a valid
//! `Succeeded` outcome, distinct from `Failed`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::error::DirectoryError;
use crate::location::Coordinate;
use crate::services::DirectoryService;
use crate::session::SessionEvent;
use crate::stage::{StageStatus, SubmissionTicket};

/// A professional provider as returned by the directory service.
/// Result sets keep the service's relevance ordering; there is no
/// client-side re-sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(rename = "clinic")]
    pub clinic_name: String,
    pub address: String,
    pub distance_km: f64,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

/// The provider directory stage state machine. Cheap to clone; clones
/// share state.
#[derive(Clone)]
pub struct DirectoryStage {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    status: RwLock<StageStatus<Vec<Provider>, DirectoryError>>,
    tickets: SubmissionTicket,
    service: Arc<dyn DirectoryService>,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl DirectoryStage {
    pub(crate) fn new(
        service: Arc<dyn DirectoryService>,
        timeout: Duration,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                status: RwLock::new(StageStatus::Idle),
                tickets: SubmissionTicket::new(),
                service,
                timeout,
                events,
            }),
        }
    }

    /// Current status snapshot.
    pub async fn status(&self) -> StageStatus<Vec<Provider>, DirectoryError> {
        self.inner.status.read().await.clone()
    }

    /// The latest successful result set, if any.
    pub async fn providers(&self) -> Option<Vec<Provider>> {
        self.inner.status.read().await.payload().cloned()
    }

    /// Query the directory around a coordinate.
    ///
    /// A requery while pending supersedes the in-flight search; the
    /// superseded response is discarded whenever it arrives.
    pub async fn query(&self, at: Coordinate) {
        let ticket = self.inner.tickets.issue();
        {
            let mut status = self.inner.status.write().await;
            *status = StageStatus::Pending;
        }
        info!(ticket, lat = at.lat, lng = at.lng, "Directory search submitted");
        let _ = self
            .inner
            .events
            .send(SessionEvent::DirectoryChanged(StageStatus::Pending));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(inner.timeout, inner.service.search(at)).await {
                    Ok(result) => result,
                    Err(_) => Err(DirectoryError::Timeout),
                };
            inner.apply(ticket, outcome).await;
        });
    }
}

impl DirectoryInner {
    async fn apply(&self, ticket: u64, outcome: Result<Vec<Provider>, DirectoryError>) {
        let mut status = self.status.write().await;
        if !self.tickets.is_current(ticket) {
            debug!(ticket, "Discarding stale directory response");
            return;
        }
        let next = match outcome {
            Ok(providers) => {
                info!(ticket, found = providers.len(), "Directory search succeeded");
                StageStatus::Succeeded(providers)
            }
            Err(error) => {
                warn!(ticket, %error, "Directory search failed");
                StageStatus::Failed(error)
            }
        };
        *status = next.clone();
        drop(status);
        let _ = self.events.send(SessionEvent::DirectoryChanged(next));
    }
}
