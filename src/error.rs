//! Error types for the GlowGuide workflow core.
//!
//! One enum per stage concern. Validation errors are detected
//! synchronously, before any service call; service errors are only
//! reachable while a stage is pending. Variants derive `Clone` and
//! `PartialEq` so stage statuses can be snapshotted and broadcast.

/// Top-level error type for the workflow core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Image acquisition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("Not an image: declared media type {media_type:?}")]
    InvalidMediaType { media_type: String },

    #[error("Camera access was denied")]
    DeviceAccessDenied,

    #[error("No capture device is available")]
    DeviceUnavailable,
}

/// Analysis stage errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// Synchronous precondition failure; never stored as a stage status.
    #[error("No image has been acquired")]
    MissingAsset,

    #[error("Analysis service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Analysis request timed out")]
    Timeout,

    #[error("Malformed analysis response: {reason}")]
    MalformedResponse { reason: String },
}

/// Location resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission was denied")]
    PermissionDenied,

    #[error("Device position is unavailable")]
    PositionUnavailable,

    #[error("Unknown city: {name:?}")]
    UnknownCity { name: String },
}

/// Provider directory errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Directory search timed out")]
    Timeout,
}

/// Conversational session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Synchronous validation failure; the transcript is not touched.
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Chat service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Chat request timed out")]
    Timeout,
}

/// Result type alias for the workflow core.
pub type Result<T> = std::result::Result<T, Error>;
