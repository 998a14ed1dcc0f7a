//! Request handlers behind the REST gateway.
//!
//! Each handler extracts identifiers from the event, delegates to a
//! repository or completer, and wraps the outcome in the JSON envelope.
//! Failures of any kind become a logged error and a generic message.

use lambda_http::{Body, Request, Response};
use serde::Serialize;
use tracing::info;

use crate::auth::user_from_request;
use crate::http::{error_response, json_body, json_response, optional_json_body, path_parameter};
use crate::models::{
    ChatResponse, ChatsResponse, CreateChatRequest, CreateMessagesRequest, MessagesResponse,
    PredictRequest, PredictResponse,
};
use crate::openai::Completer;
use crate::repository::ChatRepository;
use crate::{Error, Result};

type HandlerResult = std::result::Result<Response<Body>, lambda_http::Error>;

fn respond<T: Serialize>(outcome: Result<T>) -> HandlerResult {
    match outcome {
        Ok(body) => json_response(200, &body),
        Err(e) => error_response(&e),
    }
}

/// GET /chats/{chatId}/messages
pub async fn list_messages<R: ChatRepository>(repo: &R, event: &Request) -> HandlerResult {
    let outcome = async {
        let chat_id = path_parameter(event, "chatId")?;
        info!(chat_id = %chat_id, "Listing messages");
        let messages = repo.list_messages(chat_id).await?;
        Ok::<_, Error>(MessagesResponse { messages })
    }
    .await;

    respond(outcome)
}

/// POST /chats/{chatId}/messages
pub async fn create_messages<R: ChatRepository>(repo: &R, event: &Request) -> HandlerResult {
    let outcome = async {
        let chat_id = path_parameter(event, "chatId")?;
        let messages = json_body::<CreateMessagesRequest>(event)?.into_messages()?;
        info!(chat_id = %chat_id, count = messages.len(), "Appending messages");
        let messages = repo.create_messages(chat_id, &messages).await?;
        Ok::<_, Error>(MessagesResponse { messages })
    }
    .await;

    respond(outcome)
}

/// GET /chats
pub async fn list_chats<R: ChatRepository>(repo: &R, event: &Request) -> HandlerResult {
    let outcome = async {
        let user = user_from_request(event)?;
        info!(user_id = %user.user_id, "Listing chats");
        let chats = repo.list_chats(&user.user_id).await?;
        Ok::<_, Error>(ChatsResponse { chats })
    }
    .await;

    respond(outcome)
}

/// POST /chats
pub async fn create_chat<R: ChatRepository>(repo: &R, event: &Request) -> HandlerResult {
    let outcome = async {
        let user = user_from_request(event)?;
        let request: CreateChatRequest = optional_json_body(event)?;
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty());
        info!(user_id = %user.user_id, "Creating chat");
        let chat = repo.create_chat(&user.user_id, title).await?;
        Ok::<_, Error>(ChatResponse { chat })
    }
    .await;

    respond(outcome)
}

/// POST /predict
pub async fn predict<C: Completer>(completer: &C, event: &Request) -> HandlerResult {
    let outcome = async {
        let messages = json_body::<PredictRequest>(event)?.into_messages()?;
        let completion = completer.complete(&messages).await?;
        Ok::<_, Error>(PredictResponse { completion })
    }
    .await;

    respond(outcome)
}
