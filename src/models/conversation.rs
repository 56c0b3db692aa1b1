//! # Conversation Model
//!
//! Chat turns are persisted as `messages` rows grouped under a `conversations`
//! row. Only `user` and `assistant` messages are ever stored; the request may
//! carry other roles (e.g. `system`), which are forwarded to the inference
//! service but not persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{OrchestraError, OrchestraResult};

pub type ConversationId = Uuid;

/// A message as received from the caller and forwarded to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User.as_str(), content)
    }
}

/// Role of a persisted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Invalid message role: {s}")),
        }
    }
}

/// A committed message row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Insertion order within the store
    pub id: i64,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A committed diagnostic row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One chat turn as submitted by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    /// Existing conversation; absent or empty means "start a new one"
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatTurnRequest {
    pub fn new(conversation_id: Option<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            conversation_id,
            messages,
        }
    }

    /// Parse the optional conversation reference.
    ///
    /// Blank strings count as absent; anything else must be a UUID.
    pub fn parsed_conversation_id(&self) -> OrchestraResult<Option<ConversationId>> {
        match self.conversation_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|e| {
                OrchestraError::validation(format!("invalid conversation_id {raw:?}: {e}"))
            }),
        }
    }

    /// Content to persist as the user's message for this turn.
    ///
    /// The last message tagged `user` wins unless its content is empty;
    /// otherwise the last message of the list is used. `None` for an empty list.
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User.as_str())
            .map(|m| m.content.as_str())
            .filter(|content| !content.is_empty())
            .or_else(|| self.messages.last().map(|m| m.content.as_str()))
    }
}

/// Reply returned for a committed chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub conversation_id: ConversationId,
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_content_prefers_last_user_message() {
        let request = ChatTurnRequest::new(
            None,
            vec![
                ChatMessage::user("first"),
                ChatMessage::new("assistant", "answer"),
                ChatMessage::user("second"),
                ChatMessage::new("system", "be brief"),
            ],
        );
        assert_eq!(request.user_content(), Some("second"));
    }

    #[test]
    fn test_user_content_falls_back_to_last_message() {
        let request = ChatTurnRequest::new(
            None,
            vec![
                ChatMessage::new("system", "be brief"),
                ChatMessage::new("assistant", "ping"),
            ],
        );
        assert_eq!(request.user_content(), Some("ping"));
        assert_eq!(ChatTurnRequest::default().user_content(), None);
    }

    #[test]
    fn test_empty_user_message_falls_back_to_last_message() {
        let request = ChatTurnRequest::new(
            None,
            vec![
                ChatMessage::user(""),
                ChatMessage::new("assistant", "pong"),
            ],
        );
        assert_eq!(request.user_content(), Some("pong"));

        let only_empty = ChatTurnRequest::new(None, vec![ChatMessage::user("")]);
        assert_eq!(only_empty.user_content(), Some(""));
    }

    #[test]
    fn test_blank_conversation_id_is_absent() {
        let request = ChatTurnRequest::new(Some("  ".into()), vec![]);
        assert_eq!(request.parsed_conversation_id().unwrap(), None);

        let request = ChatTurnRequest::new(Some("not-a-uuid".into()), vec![]);
        assert!(matches!(
            request.parsed_conversation_id(),
            Err(OrchestraError::ValidationError(_))
        ));

        let id = Uuid::new_v4();
        let request = ChatTurnRequest::new(Some(id.to_string()), vec![]);
        assert_eq!(request.parsed_conversation_id().unwrap(), Some(id));
    }

    #[test]
    fn test_request_deserializes_without_conversation_id() {
        let request: ChatTurnRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert!(request.conversation_id.is_none());
        assert_eq!(request.messages.len(), 1);
    }
}
