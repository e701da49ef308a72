//! OpenAI-compatible chat completions

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::client::timed_client;
use crate::config::UpstreamConfig;
use crate::transcript::HistoryTurn;

/// Sampling temperature for answers
const TEMPERATURE: f32 = 0.8;

/// Upper bound on answer length
const MAX_TOKENS: u32 = 600;

/// History turns forwarded upstream
const MAX_HISTORY: usize = 10;

/// Reply used when the upstream returns no content
pub const FALLBACK_REPLY: &str = "Sorry, I could not process your request.";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client
pub struct ChatCompletions {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl ChatCompletions {
    #[must_use]
    pub fn new(config: &UpstreamConfig, api_key: Option<SecretString>) -> Self {
        Self {
            client: timed_client(config.request_timeout),
            url: config.chat_url.clone(),
            model: config.chat_model.clone(),
            api_key,
        }
    }

    /// Answer `message` with a system prompt and the most recent history
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured or the upstream call fails
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[HistoryTurn],
        message: &str,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::NotConfigured("CHAT_API_KEY"))?;

        let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Message {
            role: "system",
            content: system_prompt,
        });
        messages.extend(recent.iter().map(|turn| Message {
            role: role_name(turn),
            content: &turn.content,
        }));
        messages.push(Message {
            role: "user",
            content: message,
        });

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(model = %self.model, history = recent.len(), "requesting completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited,
                402 => ProviderError::QuotaExceeded,
                _ => ProviderError::Upstream("Failed to get AI response".to_string()),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        tracing::info!(chars = content.len(), "completion received");
        Ok(content)
    }
}

const fn role_name(turn: &HistoryTurn) -> &'static str {
    match turn.role {
        crate::transcript::Role::User => "user",
        crate::transcript::Role::Assistant => "assistant",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transcript::Role;

    #[test]
    fn test_request_shape() {
        let history = [HistoryTurn {
            role: Role::Assistant,
            content: "Hello".into(),
        }];
        let request = CompletionRequest {
            model: "m",
            messages: vec![
                Message {
                    role: "system",
                    content: "sys",
                },
                Message {
                    role: role_name(&history[0]),
                    content: &history[0].content,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["max_tokens"], 600);
        assert!((json["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_empty_choices_parse() {
        let parsed: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_requires_key() {
        let config = UpstreamConfig {
            chat_url: "http://127.0.0.1:9/chat".into(),
            chat_model: "m".into(),
            tts_url: String::new(),
            tts_speaker: String::new(),
            tts_model: String::new(),
            request_timeout: Duration::from_secs(1),
        };
        let client = ChatCompletions::new(&config, None);
        let result = client.complete("sys", &[], "hi").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured("CHAT_API_KEY"))));
    }
}
