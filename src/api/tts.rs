//! `POST /sarvam-tts`

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};

use super::{ApiError, ApiState};
use crate::protocol::{SpeechReply, SpeechRequest};
use crate::speech_text::{prepare_for_speech, preview};

/// Synthesize speech for an answer
///
/// Every failure on this endpoint is a 400.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for invalid input or a failed synthesis
pub async fn sarvam_tts(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SpeechReply>, ApiError> {
    let request: SpeechRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text is required".to_string()));
    }

    let processed = prepare_for_speech(&request.text);
    tracing::debug!(
        language = %request.target_language_code,
        original = request.text.len(),
        processed = processed.len(),
        "synthesizing"
    );

    let audio_content = state
        .tts
        .synthesize(&processed, &request.target_language_code)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "speech synthesis failed");
            ApiError::BadRequest(e.to_string())
        })?;

    Ok(Json(SpeechReply {
        audio_content,
        processed_text: preview(&processed),
    }))
}
