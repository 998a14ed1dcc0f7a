//! Test doubles shared by the unit tests.

use chrono::{DateTime, Utc};
use lambda_http::Request;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{Chat, Message};
use crate::openai::Completer;
use crate::repository::ChatRepository;
use crate::{Error, Result};

/// Build an API Gateway REST proxy event the way the gateway delivers it.
pub fn gateway_event(
    method: &str,
    path: &str,
    user_sub: Option<&str>,
    chat_id: Option<&str>,
    body: Option<&str>,
) -> Request {
    let authorizer = match user_sub {
        Some(sub) => json!({ "claims": { "sub": sub, "email": "test@example.com" } }),
        None => json!({}),
    };

    let event = json!({
        "resource": path,
        "path": path,
        "httpMethod": method,
        "headers": {
            "Host": "abc123.execute-api.us-east-1.amazonaws.com",
            "Content-Type": "application/json"
        },
        "multiValueHeaders": {
            "Host": ["abc123.execute-api.us-east-1.amazonaws.com"],
            "Content-Type": ["application/json"]
        },
        "queryStringParameters": null,
        "multiValueQueryStringParameters": null,
        "pathParameters": chat_id.map(|id| json!({ "chatId": id })),
        "stageVariables": null,
        "requestContext": {
            "accountId": "123456789012",
            "resourceId": "r3s0urc3",
            "stage": "api",
            "requestId": "c6af9ac6-7b61-11e6-9a41-93e8deadbeef",
            "identity": { "sourceIp": "127.0.0.1", "userAgent": "test" },
            "resourcePath": path,
            "httpMethod": method,
            "apiId": "abc123",
            "path": format!("/api{}", path),
            "protocol": "HTTP/1.1",
            "requestTimeEpoch": 1700000000000i64,
            "authorizer": authorizer
        },
        "body": body,
        "isBase64Encoded": false
    });

    lambda_http::request::from_str(&event.to_string()).expect("valid API Gateway event")
}

/// In-memory stand-in for the DynamoDB table.
#[derive(Default)]
pub struct MemoryRepository {
    chats: Mutex<Vec<(String, Chat)>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
}

impl MemoryRepository {
    pub fn with_messages(chat_id: &str, messages: Vec<Message>) -> Self {
        let repo = Self::default();
        repo.messages
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), messages);
        repo
    }
}

impl ChatRepository for MemoryRepository {
    async fn create_chat(&self, user_id: &str, title: Option<&str>) -> Result<Chat> {
        let mut chats = self.chats.lock().unwrap();
        let chat = Chat {
            id: format!("chat-{}", chats.len() + 1),
            title: title.map(String::from),
            created_at: DateTime::<Utc>::from_timestamp_millis(chats.len() as i64)
                .expect("valid timestamp"),
        };
        chats.push((user_id.to_string(), chat.clone()));
        Ok(chat)
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, chat)| chat.clone())
            .collect())
    }

    async fn create_messages(&self, chat_id: &str, messages: &[Message]) -> Result<Vec<Message>> {
        self.messages
            .lock()
            .unwrap()
            .entry(chat_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(messages.to_vec())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Repository whose every call fails like a throttled table.
pub struct FailingRepository;

impl FailingRepository {
    fn failure() -> Error {
        Error::Aws("ProvisionedThroughputExceededException: rate exceeded".to_string())
    }
}

impl ChatRepository for FailingRepository {
    async fn create_chat(&self, _user_id: &str, _title: Option<&str>) -> Result<Chat> {
        Err(Self::failure())
    }

    async fn list_chats(&self, _user_id: &str) -> Result<Vec<Chat>> {
        Err(Self::failure())
    }

    async fn create_messages(&self, _chat_id: &str, _messages: &[Message]) -> Result<Vec<Message>> {
        Err(Self::failure())
    }

    async fn list_messages(&self, _chat_id: &str) -> Result<Vec<Message>> {
        Err(Self::failure())
    }
}

/// Completer that echoes a canned answer, or fails when it has none.
pub struct StubCompleter(pub Option<String>);

impl Completer for StubCompleter {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::Upstream("500 Internal Server Error".to_string()))
    }
}
