//! Upstream services behind the gateway

pub mod llm;
pub mod sarvam;

pub use llm::ChatCompletions;
pub use sarvam::SarvamTts;

/// Errors from an upstream service
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A required key or URL is missing
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Upstream answered 429
    #[error("rate limited by upstream")]
    RateLimited,

    /// Upstream answered 402
    #[error("upstream quota exhausted")]
    QuotaExceeded,

    /// Any other upstream failure, already phrased for the caller
    #[error("{0}")]
    Upstream(String),

    /// Transport or decoding error
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
