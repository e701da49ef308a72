//! Client for the chat and speech gateway

use std::time::Duration;

use async_trait::async_trait;

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::language::Language;
use crate::protocol::{ChatReply, ChatRequest, ErrorBody, SpeechReply, SpeechRequest};
use crate::transcript::HistoryTurn;
use crate::voice::{AudioClip, Notice};

/// Message shown when the gateway reports rate limiting
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again in a moment.";

/// Message shown when the upstream quota is exhausted
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Service temporarily unavailable. Please try again later.";

/// HTTP client that gives up on a request after `timeout`
#[must_use]
pub fn timed_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Why a gateway call failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,

    #[error("{}", QUOTA_EXCEEDED_MESSAGE)]
    QuotaExceeded,

    #[error("gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("gateway unreachable: {0}")]
    Transport(String),

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Map an error status and its JSON `{error}` body
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::QuotaExceeded,
            _ => Self::Status { status, message },
        }
    }

    /// What to tell the user after a failed query
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::RateLimited => Notice::error("Rate Limited", RATE_LIMITED_MESSAGE),
            Self::QuotaExceeded => Notice::error("Service Unavailable", QUOTA_EXCEEDED_MESSAGE),
            _ => Notice::error("Error", "Failed to get response. Please try again."),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// The remote side of the assistant
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Answer a general query given recent history
    ///
    /// # Errors
    ///
    /// Returns error if the gateway or its upstream fails
    async fn complete(&self, message: &str, history: &[HistoryTurn]) -> Result<ChatReply, BackendError>;

    /// Synthesize speech for an answer
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or returns no usable audio
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip, BackendError>;
}

/// HTTP client for `/college-chat` and `/sarvam-tts`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: timed_client(DEFAULT_REQUEST_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Give up on each gateway request after `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = timed_client(timeout);
        self
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        tracing::warn!(%status, %url, error = %message, "gateway request failed");

        Err(BackendError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn complete(&self, message: &str, history: &[HistoryTurn]) -> Result<ChatReply, BackendError> {
        let request = ChatRequest {
            message: message.to_string(),
            conversation_history: history.to_vec(),
        };
        let reply: ChatReply = self.post("college-chat", &request).await?;
        tracing::debug!(language = %reply.detected_language, "chat reply received");
        Ok(reply)
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip, BackendError> {
        let request = SpeechRequest {
            text: text.to_string(),
            target_language_code: language.tts_code().to_string(),
        };
        let reply: SpeechReply = self.post("sarvam-tts", &request).await?;
        tracing::debug!(processed = %reply.processed_text, "speech received");
        AudioClip::from_base64(&reply.audio_content)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}
