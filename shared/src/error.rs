//! Error types for the chat Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a chat request.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error (DynamoDB, Secrets Manager)
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Completion client error (transport, decoding)
    #[error("OpenAI error: {0}")]
    OpenAi(async_openai::error::OpenAIError),

    /// Completion API answered with an error
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            _ => 500,
        }
    }

    /// Message safe to hand back to the caller. Never carries internal detail.
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            400 => "Bad Request",
            401 => "Unauthorized",
            _ => "Internal Server Error",
        }
    }
}
