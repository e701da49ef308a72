//! Sarvam text-to-speech

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::client::timed_client;
use crate::config::UpstreamConfig;

/// Output sample rate requested from Sarvam
const SAMPLE_RATE: u32 = 22050;

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    inputs: [&'a str; 1],
    target_language_code: &'a str,
    speaker: &'a str,
    pitch: f32,
    pace: f32,
    loudness: f32,
    speech_sample_rate: u32,
    enable_preprocessing: bool,
    model: &'a str,
}

#[derive(Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    audios: Vec<String>,
}

/// Sarvam TTS client
pub struct SarvamTts {
    client: reqwest::Client,
    url: String,
    speaker: String,
    model: String,
    api_key: Option<SecretString>,
}

impl SarvamTts {
    #[must_use]
    pub fn new(config: &UpstreamConfig, api_key: Option<SecretString>) -> Self {
        Self {
            client: timed_client(config.request_timeout),
            url: config.tts_url.clone(),
            speaker: config.tts_speaker.clone(),
            model: config.tts_model.clone(),
            api_key,
        }
    }

    /// Synthesize `text` and return the base64 WAV Sarvam produced
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured, the call fails, or no audio came back
    pub async fn synthesize(&self, text: &str, language_code: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::NotConfigured("SARVAM_API_KEY"))?;

        let request = SynthesisRequest {
            inputs: [text],
            target_language_code: language_code,
            speaker: &self.speaker,
            pitch: 0.0,
            pace: 1.0,
            loudness: 1.5,
            speech_sample_rate: SAMPLE_RATE,
            enable_preprocessing: true,
            model: &self.model,
        };

        tracing::debug!(chars = text.len(), language = language_code, "requesting speech");

        let response = self
            .client
            .post(&self.url)
            .header("api-subscription-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Sarvam TTS error");
            return Err(ProviderError::Upstream(format!(
                "Sarvam API error: {} - {body}",
                status.as_u16()
            )));
        }

        let synthesis: SynthesisResponse = response.json().await?;
        synthesis
            .audios
            .into_iter()
            .next()
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| ProviderError::Upstream("No audio data in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields() {
        let request = SynthesisRequest {
            inputs: ["hello"],
            target_language_code: "en-IN",
            speaker: "anushka",
            pitch: 0.0,
            pace: 1.0,
            loudness: 1.5,
            speech_sample_rate: SAMPLE_RATE,
            enable_preprocessing: true,
            model: "bulbul:v2",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"][0], "hello");
        assert_eq!(json["speech_sample_rate"], 22050);
        assert_eq!(json["enable_preprocessing"], true);
        assert_eq!(json["model"], "bulbul:v2");
    }

    #[test]
    fn test_missing_audios() {
        let parsed: SynthesisResponse = serde_json::from_str(r#"{"request_id":"x"}"#).unwrap();
        assert!(parsed.audios.is_empty());
    }
}
