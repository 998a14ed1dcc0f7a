//! Chat and message persistence.
//!
//! One DynamoDB table holds both entities, keyed by `id` (partition) and
//! `createdDate` (sort):
//!
//! | row     | `id`              | `createdDate`                       |
//! |---------|-------------------|-------------------------------------|
//! | chat    | `user#<userId>`   | `<epoch ms>`                        |
//! | message | `chat#<chatId>`   | `<epoch ms>#<batch nonce>#<index>`  |
//!
//! Sort keys are zero padded so lexical order is creation order.

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Chat, Message};
use crate::{Error, Result};

const PARTITION_KEY: &str = "id";
const SORT_KEY: &str = "createdDate";

type Item = HashMap<String, AttributeValue>;

/// Data-access operations the handlers depend on.
pub trait ChatRepository: Send + Sync {
    /// Create a chat owned by `user_id`.
    fn create_chat(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> impl Future<Output = Result<Chat>> + Send;

    /// Chats owned by `user_id`, newest first.
    fn list_chats(&self, user_id: &str) -> impl Future<Output = Result<Vec<Chat>>> + Send;

    /// Append messages to a chat, preserving their order.
    fn create_messages(
        &self,
        chat_id: &str,
        messages: &[Message],
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// All messages of a chat in conversation order. An unknown chat has none.
    fn list_messages(&self, chat_id: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;
}

/// DynamoDB-backed repository.
#[derive(Debug, Clone)]
pub struct DynamoRepository {
    client: DynamoClient,
    table_name: String,
}

impl DynamoRepository {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Query a whole partition, following pagination until it is exhausted.
    async fn query_partition(&self, partition: String, ascending: bool) -> Result<Vec<Item>> {
        let items = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", PARTITION_KEY)
            .expression_attribute_values(":pk", AttributeValue::S(partition.clone()))
            .scan_index_forward(ascending)
            .into_paginator()
            .items()
            .send()
            .collect::<std::result::Result<Vec<_>, _>>()
            .await
            .map_err(|e| {
                Error::Aws(format!(
                    "Failed to query partition {}: {}",
                    partition,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(partition = %partition, count = items.len(), "Queried partition");
        Ok(items)
    }
}

impl ChatRepository for DynamoRepository {
    async fn create_chat(&self, user_id: &str, title: Option<&str>) -> Result<Chat> {
        let created_at = now_millis();
        let chat_id = Uuid::new_v4().to_string();

        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item(PARTITION_KEY, AttributeValue::S(user_partition(user_id)))
            .item(SORT_KEY, AttributeValue::S(chat_sort_key(&created_at)))
            .item("chatId", AttributeValue::S(chat_id.clone()));
        if let Some(title) = title {
            request = request.item("title", AttributeValue::S(title.to_string()));
        }

        request
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to create chat: {}", DisplayErrorContext(&e))))?;

        info!(chat_id = %chat_id, user_id = %user_id, "Created chat");

        Ok(Chat {
            id: chat_id,
            title: title.map(String::from),
            created_at,
        })
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let items = self.query_partition(user_partition(user_id), false).await?;
        items.iter().map(item_to_chat).collect()
    }

    async fn create_messages(&self, chat_id: &str, messages: &[Message]) -> Result<Vec<Message>> {
        let rows = message_rows(chat_id, &now_millis(), &Uuid::new_v4(), messages);

        let items = rows
            .into_iter()
            .map(|row| {
                let put = Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(row))
                    .build()
                    .map_err(|e| Error::Internal(format!("Invalid message row: {}", e)))?;
                Ok(TransactWriteItem::builder().put(put).build())
            })
            .collect::<Result<Vec<_>>>()?;

        // One transaction: either the whole batch is stored or none of it.
        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| {
                Error::Aws(format!(
                    "Failed to store messages of chat {}: {}",
                    chat_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(chat_id = %chat_id, count = messages.len(), "Stored messages");
        Ok(messages.to_vec())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let items = self.query_partition(chat_partition(chat_id), true).await?;
        items.iter().map(item_to_message).collect()
    }
}

fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn user_partition(user_id: &str) -> String {
    format!("user#{}", user_id)
}

fn chat_partition(chat_id: &str) -> String {
    format!("chat#{}", chat_id)
}

fn chat_sort_key(created_at: &DateTime<Utc>) -> String {
    format!("{:013}", created_at.timestamp_millis())
}

// One nonce per batch, ahead of the index: batches written in the same
// millisecond neither overwrite nor interleave each other.
fn message_sort_key(created_at: &DateTime<Utc>, batch: &Uuid, index: usize) -> String {
    format!(
        "{:013}#{}#{:05}",
        created_at.timestamp_millis(),
        batch.simple(),
        index
    )
}

fn message_rows(
    chat_id: &str,
    created_at: &DateTime<Utc>,
    batch: &Uuid,
    messages: &[Message],
) -> Vec<Item> {
    let partition = chat_partition(chat_id);

    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            HashMap::from([
                (PARTITION_KEY.to_string(), AttributeValue::S(partition.clone())),
                (
                    SORT_KEY.to_string(),
                    AttributeValue::S(message_sort_key(created_at, batch, index)),
                ),
                ("role".to_string(), AttributeValue::S(message.role.to_string())),
                ("content".to_string(), AttributeValue::S(message.content.clone())),
            ])
        })
        .collect()
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| Error::Internal(format!("Item is missing string attribute {}", name)))
}

fn item_to_message(item: &Item) -> Result<Message> {
    Ok(Message {
        role: string_attr(item, "role")?.parse()?,
        content: string_attr(item, "content")?.to_string(),
    })
}

fn item_to_chat(item: &Item) -> Result<Chat> {
    let sort_key = string_attr(item, SORT_KEY)?;
    let created_at = sort_key
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| Error::Internal(format!("Invalid chat sort key: {}", sort_key)))?;

    Ok(Chat {
        id: string_attr(item, "chatId")?.to_string(),
        title: item
            .get("title")
            .and_then(|value| value.as_s().ok())
            .cloned(),
        created_at,
    })
}
