//! Conversation transcript

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::language::Language;

/// Opaque message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// A fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub language: Option<Language>,
    /// Destination name for navigation answers
    pub location_name: Option<String>,
    /// Map link for navigation answers
    pub location_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A message typed or spoken by the user
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    /// An assistant answer in the given language
    #[must_use]
    pub fn assistant(content: impl Into<String>, language: Language) -> Self {
        Self::new(Role::Assistant, content.into(), Some(language))
    }

    /// Attach a navigation destination
    #[must_use]
    pub fn with_location(mut self, name: impl Into<String>, link: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self.location_link = Some(link.into());
        self
    }

    fn new(role: Role, content: String, language: Option<Language>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            language,
            location_name: None,
            location_link: None,
            created_at: Utc::now(),
        }
    }
}

/// A `{role, content}` pair sent upstream as conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Append-only, insertion-ordered list of messages
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Append a message and return its id
    pub fn push(&mut self, message: ChatMessage) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The last `turns` messages as upstream history
    #[must_use]
    pub fn history(&self, turns: usize) -> Vec<HistoryTurn> {
        let start = self.messages.len().saturating_sub(turns);
        self.messages[start..]
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut transcript = Transcript::new();
        let a = transcript.push(ChatMessage::user("first"));
        let b = transcript.push(ChatMessage::assistant("second", Language::English));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].id, a);
        assert_eq!(transcript.messages()[1].id, b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_history_window() {
        let mut transcript = Transcript::new();
        for i in 0..15 {
            transcript.push(ChatMessage::user(format!("q{i}")));
        }

        let history = transcript.history(10);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "q5");
        assert_eq!(history[9].content, "q14");
    }

    #[test]
    fn test_history_shorter_than_window() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("only"));
        assert_eq!(transcript.history(10).len(), 1);
        assert!(Transcript::new().history(10).is_empty());
    }

    #[test]
    fn test_with_location() {
        let msg = ChatMessage::assistant("here", Language::English)
            .with_location("Central Library", "https://maps.app.goo.gl/x");
        assert_eq!(msg.location_name.as_deref(), Some("Central Library"));
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_history_turn_wire_format() {
        let turn = HistoryTurn {
            role: Role::User,
            content: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&turn).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );
    }
}
