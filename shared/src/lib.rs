//! Shared library for the chat Lambda functions.
//!
//! This crate provides the request handlers, persistence accessor, and clients
//! used by every function in the workspace.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod models;
pub mod openai;
pub mod repository;
pub mod secrets;

#[cfg(test)]
mod testing;

pub use auth::{extract_user_from_context, user_from_request, AuthenticatedUser};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Chat, Message, Role};
pub use openai::{Completer, OpenAiClient};
pub use repository::{ChatRepository, DynamoRepository};
pub use secrets::{get_openai_api_key, get_secret};
