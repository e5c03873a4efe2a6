//! Conversational session stage.
//!
//! Maintains an append-only transcript and a strict one-in-flight
//! request cycle with the conversational service: a `send` while an
//! exchange is outstanding is queued and dispatched only after the prior
//! response (or failure) has been applied, so assistant replies always
//! land in issuance order. This stage is fully independent of the
//! analysis and directory machines.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::services::ConversationalService;
use crate::session::SessionEvent;
use crate::stage::StageStatus;

/// Fixed assistant greeting seeded into every new transcript.
pub const DEFAULT_GREETING: &str = "Hi! I'm your GlowGuide assistant. I can help answer \
skincare questions, explain ingredients, or provide general guidance. How can I help you today?";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

/// One transcript entry. Never mutated or removed once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Unique, monotonically increasing by creation time.
    pub id: u64,
    pub text: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

/// Pending outbound messages plus the in-flight flag, guarded together
/// so a queue push and the dispatch decision are atomic.
#[derive(Debug, Default)]
struct Outbox {
    queue: VecDeque<String>,
    in_flight: bool,
}

/// The conversational session stage. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<ChatInner>,
}

struct ChatInner {
    transcript: RwLock<Vec<ChatMessage>>,
    outbox: Mutex<Outbox>,
    next_id: AtomicU64,
    exchanges_completed: AtomicU64,
    last_failure: RwLock<Option<ChatError>>,
    service: Arc<dyn ConversationalService>,
    timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub(crate) fn new(
        service: Arc<dyn ConversationalService>,
        timeout: Duration,
        greeting: &str,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let greeting = ChatMessage {
            id: 1,
            text: greeting.to_string(),
            origin: Origin::Assistant,
            created_at: Utc::now(),
        };
        Self {
            inner: Arc::new(ChatInner {
                transcript: RwLock::new(vec![greeting]),
                outbox: Mutex::new(Outbox::default()),
                next_id: AtomicU64::new(2),
                exchanges_completed: AtomicU64::new(0),
                last_failure: RwLock::new(None),
                service,
                timeout,
                events,
            }),
        }
    }

    /// Snapshot of the transcript in append order.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.inner.transcript.read().await.clone()
    }

    /// Failure indicator for the most recent exchange, if it failed.
    pub async fn last_failure(&self) -> Option<ChatError> {
        self.inner.last_failure.read().await.clone()
    }

    /// Status in the shared stage shape: `Pending` while an exchange is
    /// outstanding, `Failed` if the most recent one failed, `Succeeded`
    /// once at least one exchange has completed.
    pub async fn status(&self) -> StageStatus<(), ChatError> {
        if self.inner.outbox.lock().await.in_flight {
            return StageStatus::Pending;
        }
        if let Some(error) = self.inner.last_failure.read().await.clone() {
            return StageStatus::Failed(error);
        }
        if self.inner.exchanges_completed.load(Ordering::SeqCst) > 0 {
            StageStatus::Succeeded(())
        } else {
            StageStatus::Idle
        }
    }

    /// Send a user message.
    ///
    /// Whitespace-only text is rejected without touching the transcript.
    /// Otherwise the user message is appended immediately and the request
    /// queued; at most one request is outstanding at a time.
    pub async fn send(&self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // A new exchange supersedes the previous failure indicator.
        *self.inner.last_failure.write().await = None;

        let message = self.inner.append(Origin::User, text.to_string()).await;
        debug!(id = message.id, "User message appended");

        let dispatch = {
            let mut outbox = self.inner.outbox.lock().await;
            outbox.queue.push_back(text.to_string());
            if outbox.in_flight {
                false
            } else {
                outbox.in_flight = true;
                true
            }
        };
        if dispatch {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.drain().await;
            });
        }
        Ok(())
    }
}

impl ChatInner {
    async fn append(&self, origin: Origin, text: String) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            text,
            origin,
            created_at: Utc::now(),
        };
        self.transcript.write().await.push(message.clone());
        let _ = self
            .events
            .send(SessionEvent::TranscriptAppended(message.clone()));
        message
    }

    /// Dispatch queued messages one at a time, in submission order.
    async fn drain(&self) {
        loop {
            let next = {
                let mut outbox = self.outbox.lock().await;
                match outbox.queue.pop_front() {
                    Some(message) => message,
                    None => {
                        outbox.in_flight = false;
                        return;
                    }
                }
            };

            let outcome =
                match tokio::time::timeout(self.timeout, self.service.respond(&next)).await {
                    Ok(result) => result,
                    Err(_) => Err(ChatError::Timeout),
                };

            match outcome {
                Ok(reply) => {
                    self.exchanges_completed.fetch_add(1, Ordering::SeqCst);
                    *self.last_failure.write().await = None;
                    let message = self.append(Origin::Assistant, reply).await;
                    debug!(id = message.id, "Assistant reply appended");
                }
                Err(error) => {
                    // No assistant message; the failure marks this one
                    // exchange and the session stays ready.
                    warn!(%error, "Chat exchange failed");
                    *self.last_failure.write().await = Some(error.clone());
                    let _ = self.events.send(SessionEvent::ChatExchangeFailed(error));
                }
            }
        }
    }
}
