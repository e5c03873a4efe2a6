//! HTTP implementations of the service contracts.
//!
//! Speaks the advisory backend's API:
//! - `POST {base}/api/analyze-image` — multipart image upload
//! - `GET {base}/api/find-doctors?lat={lat}&lng={lng}`
//! - `POST {base}/api/chat` — `{"message": ...}` → `{"reply": ...}`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::analysis::AnalysisResult;
use crate::directory::Provider;
use crate::error::{AnalysisError, ChatError, DirectoryError};
use crate::location::Coordinate;
use crate::services::{AnalysisService, ConversationalService, DirectoryService};

/// Configuration for the HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the advisory backend, without a trailing slash.
    pub base_url: String,
    /// Optional bearer token sent with every request.
    pub api_key: Option<SecretString>,
}

impl HttpConfig {
    /// Build from `GLOWGUIDE_API_URL` / `GLOWGUIDE_API_KEY`.
    /// Returns `None` if no base URL is configured.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("GLOWGUIDE_API_URL").ok()?;
        let api_key = std::env::var("GLOWGUIDE_API_KEY")
            .ok()
            .map(SecretString::from);
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// One HTTP client implementing the analysis, directory, and chat
/// contracts against the same backend.
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpBackend {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl AnalysisService for HttpBackend {
    async fn analyze(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("image")
            .mime_str(media_type)
            .map_err(|e| AnalysisError::ServiceUnavailable {
                reason: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .authorize(self.client.post(self.url("/api/analyze-image")))
            .multipart(form)
            .send()
            .await
            .map_err(analysis_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::ServiceUnavailable {
                reason: format!("HTTP {status}"),
            });
        }

        let result: AnalysisResult =
            response
                .json()
                .await
                .map_err(|e| AnalysisError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        result.validate()?;
        Ok(result)
    }
}

#[async_trait]
impl DirectoryService for HttpBackend {
    async fn search(&self, at: Coordinate) -> Result<Vec<Provider>, DirectoryError> {
        let response = self
            .authorize(self.client.get(self.url("/api/find-doctors")))
            .query(&[("lat", at.lat), ("lng", at.lng)])
            .send()
            .await
            .map_err(directory_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::ServiceUnavailable {
                reason: format!("HTTP {status}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| DirectoryError::ServiceUnavailable {
                reason: format!("bad response body: {e}"),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

#[async_trait]
impl ConversationalService for HttpBackend {
    async fn respond(&self, message: &str) -> Result<String, ChatError> {
        let response = self
            .authorize(self.client.post(self.url("/api/chat")))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .map_err(chat_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::ServiceUnavailable {
                reason: format!("HTTP {status}"),
            });
        }

        let reply: ChatReply =
            response
                .json()
                .await
                .map_err(|e| ChatError::ServiceUnavailable {
                    reason: format!("bad response body: {e}"),
                })?;
        Ok(reply.reply)
    }
}

fn analysis_transport_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout
    } else {
        AnalysisError::ServiceUnavailable {
            reason: e.to_string(),
        }
    }
}

fn directory_transport_error(e: reqwest::Error) -> DirectoryError {
    if e.is_timeout() {
        DirectoryError::Timeout
    } else {
        DirectoryError::ServiceUnavailable {
            reason: e.to_string(),
        }
    }
}

fn chat_transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::ServiceUnavailable {
            reason: e.to_string(),
        }
    }
}
