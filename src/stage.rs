//! Stage lifecycle primitives shared by the async stages.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lifecycle of an asynchronous stage.
///
/// Exactly one value holds at any instant per stage. `Succeeded` carries
/// the latest payload, `Failed` the reason; both persist until the next
/// submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus<T, E> {
    /// No request has been issued yet.
    Idle,
    /// A request is in flight.
    Pending,
    /// The most recent request completed with a payload.
    Succeeded(T),
    /// The most recent request failed.
    Failed(E),
}

impl<T, E> StageStatus<T, E> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The latest successful payload, if any.
    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    /// The failure reason, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

impl<T, E> std::fmt::Display for StageStatus<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Monotone submission counter implementing last-submitted-wins.
///
/// Each submission takes a ticket; a completion is applied only while its
/// ticket is still current. A stale in-flight response is discarded at
/// apply time rather than being actively cancelled.
#[derive(Debug, Default)]
pub struct SubmissionTicket {
    counter: AtomicU64,
}

impl SubmissionTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket, superseding all previously issued ones.
    pub fn issue(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is still the most recently issued one.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accessors() {
        let idle: StageStatus<u32, String> = StageStatus::Idle;
        assert!(idle.is_idle());
        assert!(idle.payload().is_none());

        let pending: StageStatus<u32, String> = StageStatus::Pending;
        assert!(pending.is_pending());

        let ok: StageStatus<u32, String> = StageStatus::Succeeded(7);
        assert!(ok.is_succeeded());
        assert_eq!(ok.payload(), Some(&7));
        assert!(ok.error().is_none());

        let failed: StageStatus<u32, String> = StageStatus::Failed("boom".into());
        assert!(failed.is_failed());
        assert_eq!(failed.error().map(String::as_str), Some("boom"));
    }

    #[test]
    fn status_display() {
        let pending: StageStatus<(), ()> = StageStatus::Pending;
        assert_eq!(pending.to_string(), "pending");
        let ok: StageStatus<u32, ()> = StageStatus::Succeeded(1);
        assert_eq!(ok.to_string(), "succeeded");
    }

    #[test]
    fn tickets_are_monotone() {
        let tickets = SubmissionTicket::new();
        let first = tickets.issue();
        let second = tickets.issue();
        assert!(second > first);
        assert!(tickets.is_current(second));
        assert!(!tickets.is_current(first));
    }

    #[test]
    fn reissue_supersedes_outstanding_ticket() {
        let tickets = SubmissionTicket::new();
        let stale = tickets.issue();
        assert!(tickets.is_current(stale));
        tickets.issue();
        assert!(!tickets.is_current(stale));
    }
}
