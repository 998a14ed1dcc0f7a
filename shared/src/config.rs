//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration loaded once from environment variables at cold start.
///
/// Each function is deployed with only the variables it needs, so the table name
/// and secret reference are optional here and checked where they are used.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table holding chats and messages
    pub table_name: Option<String>,
    /// ARN of the secret containing the OpenAI API key
    pub secret_arn: Option<String>,
    /// Chat completion model
    pub openai_model: String,
    /// Base URL of the completion API
    pub openai_base_url: String,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            table_name: non_empty("TABLE_NAME"),
            secret_arn: non_empty("SECRET_ARN"),
            openai_model: non_empty("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            aws_region: non_empty("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        }
    }

    /// Table name, or a configuration error if this function was deployed without one.
    pub fn table_name(&self) -> Result<&str> {
        self.table_name
            .as_deref()
            .ok_or_else(|| Error::Config("TABLE_NAME not set".to_string()))
    }

    /// Secret ARN, or a configuration error if this function was deployed without one.
    pub fn secret_arn(&self) -> Result<&str> {
        self.secret_arn
            .as_deref()
            .ok_or_else(|| Error::Config("SECRET_ARN not set".to_string()))
    }
}
