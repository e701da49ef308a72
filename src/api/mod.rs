//! HTTP gateway for the college assistant

pub mod chat;
pub mod health;
pub mod rate_limit;
pub mod tts;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::client::{QUOTA_EXCEEDED_MESSAGE, RATE_LIMITED_MESSAGE};
use crate::config::Config;
use crate::knowledge::{FaqRecord, corpus};
use crate::protocol::ErrorBody;
use crate::providers::{ChatCompletions, ProviderError, SarvamTts};

/// Shared state for API handlers
pub struct ApiState {
    pub chat: ChatCompletions,
    pub tts: SarvamTts,
    /// FAQ records used to ground answers
    pub faq: &'static [FaqRecord],
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Gateway errors, rendered as `{error}` JSON bodies
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,

    #[error("{}", QUOTA_EXCEEDED_MESSAGE)]
    QuotaExceeded,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::RateLimited => Self::RateLimited,
            ProviderError::QuotaExceeded => Self::QuotaExceeded,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Builder for the API server
pub struct ApiServerBuilder {
    port: u16,
    chat: ChatCompletions,
    tts: SarvamTts,
    faq: &'static [FaqRecord],
    rate_limit_per_minute: Option<u32>,
}

impl ApiServerBuilder {
    /// Start from loaded configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        let Config {
            server,
            upstream,
            api_keys,
            ..
        } = config;

        Self {
            port: server.port,
            chat: ChatCompletions::new(&upstream, api_keys.chat),
            tts: SarvamTts::new(&upstream, api_keys.sarvam),
            faq: corpus(),
            rate_limit_per_minute: server.rate_limit_per_minute,
        }
    }

    /// Override the listening port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Ground answers in a different FAQ table
    #[must_use]
    pub const fn faq(mut self, records: &'static [FaqRecord]) -> Self {
        self.faq = records;
        self
    }

    /// Enable a global requests-per-minute quota
    #[must_use]
    pub const fn rate_limit(mut self, requests_per_minute: Option<u32>) -> Self {
        self.rate_limit_per_minute = requests_per_minute;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_per_minute.map(rate_limit::create_limiter);

        ApiServer {
            port: self.port,
            state: Arc::new(ApiState {
                chat: self.chat,
                tts: self.tts,
                faq: self.faq,
                rate_limiter,
            }),
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let endpoints = Router::new()
            .route("/college-chat", post(chat::college_chat))
            .route("/sarvam-tts", post(tts::sarvam_tts))
            .route_layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit::rate_limit_middleware,
            ))
            .with_state(self.state.clone());

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([
                header::AUTHORIZATION,
                HeaderName::from_static("x-client-info"),
                HeaderName::from_static("apikey"),
                header::CONTENT_TYPE,
            ]);

        endpoints
            .merge(health::router())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.rate_limiter.is_some() {
            tracing::info!("gateway rate limiting active");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        assert!(matches!(ApiError::from(ProviderError::RateLimited), ApiError::RateLimited));
        assert!(matches!(ApiError::from(ProviderError::QuotaExceeded), ApiError::QuotaExceeded));
        match ApiError::from(ProviderError::Upstream("Failed to get AI response".into())) {
            ApiError::Internal(msg) => assert_eq!(msg, "Failed to get AI response"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(ApiError::RateLimited.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::QuotaExceeded.into_response().status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            ApiError::BadRequest("Text is required".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
