//! Shared data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(Error::Internal(format!("Unknown message role: {}", other))),
        }
    }
}

/// A single turn in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A conversation owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST /chats payload.
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

/// POST /chats/{chatId}/messages payload.
#[derive(Debug, Deserialize)]
pub struct CreateMessagesRequest {
    pub messages: Vec<Message>,
}

/// Largest batch stored in a single DynamoDB transaction.
pub const MAX_MESSAGES_PER_BATCH: usize = 100;

impl CreateMessagesRequest {
    /// The messages to append. Empty or oversized batches are bad requests.
    pub fn into_messages(self) -> Result<Vec<Message>, Error> {
        let messages = non_empty(self.messages)?;
        if messages.len() > MAX_MESSAGES_PER_BATCH {
            return Err(Error::Validation(format!(
                "At most {} messages per request, got {}",
                MAX_MESSAGES_PER_BATCH,
                messages.len()
            )));
        }
        Ok(messages)
    }
}

/// POST /predict and streaming prediction payload.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub messages: Vec<Message>,
}

impl PredictRequest {
    /// The conversation to complete; an empty one is a bad request.
    pub fn into_messages(self) -> Result<Vec<Message>, Error> {
        non_empty(self.messages)
    }
}

fn non_empty(messages: Vec<Message>) -> Result<Vec<Message>, Error> {
    if messages.is_empty() {
        return Err(Error::Validation("messages must not be empty".to_string()));
    }
    Ok(messages)
}

/// `{ "messages": [...] }`
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// `{ "chats": [...] }`
#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<Chat>,
}

/// `{ "chat": {...} }`
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: Chat,
}

/// `{ "completion": "..." }`
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub completion: String,
}

/// Failure envelope: `{ "message": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let message = Message::new(Role::Assistant, "hello");
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"role":"assistant","content":"hello"}"#
        );
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed: Result<Message, _> =
            serde_json::from_str(r#"{"role":"robot","content":"beep"}"#);
        assert!(parsed.is_err());
        assert!("robot".parse::<Role>().is_err());
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_empty_conversation_rejected() {
        let request: PredictRequest = serde_json::from_str(r#"{"messages":[]}"#).unwrap();
        assert!(matches!(request.into_messages(), Err(Error::Validation(_))));

        let request: CreateMessagesRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert_eq!(
            request.into_messages().unwrap(),
            vec![Message::new(Role::User, "hi")]
        );
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let at_limit = CreateMessagesRequest {
            messages: vec![Message::new(Role::User, "hi"); MAX_MESSAGES_PER_BATCH],
        };
        assert_eq!(at_limit.into_messages().unwrap().len(), MAX_MESSAGES_PER_BATCH);

        let over = CreateMessagesRequest {
            messages: vec![Message::new(Role::User, "hi"); MAX_MESSAGES_PER_BATCH + 1],
        };
        assert!(matches!(over.into_messages(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_chat_omits_missing_title() {
        let chat = Chat {
            id: "abc123".to_string(),
            title: None,
            created_at: DateTime::from_timestamp_millis(0).unwrap(),
        };
        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["id"], "abc123");
        assert!(json.get("title").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
