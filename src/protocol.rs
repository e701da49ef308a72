//! JSON bodies exchanged with the assistant gateway

use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::transcript::HistoryTurn;

/// Default locale for speech synthesis requests
pub const DEFAULT_TTS_LANGUAGE: &str = "ml-IN";

/// `POST /college-chat` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
}

/// `POST /college-chat` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub detected_language: Language,
}

/// `POST /sarvam-tts` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_tts_language")]
    pub target_language_code: String,
}

fn default_tts_language() -> String {
    DEFAULT_TTS_LANGUAGE.to_string()
}

/// `POST /sarvam-tts` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechReply {
    /// Base64 encoded WAV audio
    pub audio_content: String,
    /// Preview of the text actually sent to the synthesizer
    pub processed_text: String,
}

/// Error body returned by either endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn test_chat_request_camel_case() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"hi","conversationHistory":[{"role":"assistant","content":"hello"}]}"#,
        )
        .unwrap();
        assert_eq!(req.message, "hi");
        assert_eq!(req.conversation_history[0].role, Role::Assistant);
    }

    #[test]
    fn test_chat_request_missing_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.conversation_history.is_empty());
    }

    #[test]
    fn test_speech_request_default_language() {
        let req: SpeechRequest = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(req.target_language_code, "ml-IN");
    }

    #[test]
    fn test_chat_reply_wire_names() {
        let reply = ChatReply {
            response: "ok".to_string(),
            detected_language: Language::Manglish,
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"response":"ok","detectedLanguage":"manglish"}"#
        );
    }
}
