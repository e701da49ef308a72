//! `POST /college-chat`

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};

use super::{ApiError, ApiState};
use crate::language::classify;
use crate::prompt::system_prompt;
use crate::protocol::{ChatReply, ChatRequest};

/// Answer a college question grounded in the FAQ corpus
///
/// Malformed bodies and a missing message are reported as 500, matching
/// what existing clients expect from this endpoint.
///
/// # Errors
///
/// Returns [`ApiError`] for invalid input or a failed completion
pub async fn college_chat(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let request: ChatRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::Internal(e.to_string()))?;

    if request.message.trim().is_empty() {
        return Err(ApiError::Internal("Message is required".to_string()));
    }

    let detected_language = classify(&request.message);
    tracing::info!(
        language = %detected_language,
        history = request.conversation_history.len(),
        "college chat request"
    );

    let prompt = system_prompt(state.faq, &request.message);
    let response = state
        .chat
        .complete(&prompt, &request.conversation_history, &request.message)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "college chat failed"))?;

    Ok(Json(ChatReply {
        response,
        detected_language,
    }))
}
