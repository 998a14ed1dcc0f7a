//! OpenAI chat completion client.

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use futures::stream::{self, Stream, StreamExt};
use std::future::Future;
use tracing::{error, info};

use crate::models::{Message, Role};
use crate::{Error, Result};

/// Something that can turn a conversation into the assistant's next reply.
pub trait Completer: Send + Sync {
    fn complete(&self, messages: &[Message]) -> impl Future<Output = Result<String>> + Send;
}

/// Client for the chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);

        Self {
            client: Client::with_config(config).with_http_client(http),
            model: model.into(),
        }
    }

    fn request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(upstream)
    }

    /// Stream the reply as text deltas, in arrival order.
    ///
    /// A request the API rejects fails here, before any delta is yielded.
    pub async fn stream(
        &self,
        messages: &[Message],
    ) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
        info!(model = %self.model, messages = messages.len(), "Streaming completion");

        let request = self.request(messages)?;
        let mut chunks = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(upstream)?;

        let first = match chunks.next().await {
            Some(Err(e)) => return Err(upstream(e)),
            first => first,
        };

        Ok(stream::iter(first).chain(chunks).filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(upstream(e))),
            }
        }))
    }
}

impl Completer for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        info!(model = %self.model, messages = messages.len(), "Requesting completion");

        let request = self.request(messages)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(upstream)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Upstream("Completion had no content".to_string()))
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.as_str();

    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(upstream)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(upstream)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(upstream)?
            .into(),
    };
    Ok(converted)
}

fn upstream(err: OpenAIError) -> Error {
    match err {
        OpenAIError::ApiError(api) => {
            error!(error = %api.message, kind = ?api.r#type, "Completion request rejected");
            Error::Upstream(api.message)
        }
        OpenAIError::StreamError(message) => {
            error!(error = %message, "Completion stream failed");
            Error::Upstream(message)
        }
        other => Error::OpenAi(other),
    }
}
