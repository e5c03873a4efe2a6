//! Configuration types.

use std::time::Duration;

use crate::chat::DEFAULT_GREETING;

/// Session configuration.
///
/// Timeouts bound each service invocation; the request is not guaranteed
/// to stop on the service side, only its result is ignored.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for a single analysis request.
    pub analyze_timeout: Duration,
    /// Timeout for a device position request.
    pub device_timeout: Duration,
    /// Timeout for a provider directory search.
    pub directory_timeout: Duration,
    /// Timeout for a single chat exchange.
    pub chat_timeout: Duration,
    /// Assistant greeting seeded into every new transcript.
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analyze_timeout: Duration::from_secs(30),
            device_timeout: Duration::from_secs(10),
            directory_timeout: Duration::from_secs(15),
            chat_timeout: Duration::from_secs(15),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}
