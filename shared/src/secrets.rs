//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsClient;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Cached secrets with lazy initialization. Warm invocations skip the lookup.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", DisplayErrorContext(&e))))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get the OpenAI API key from Secrets Manager.
pub async fn get_openai_api_key(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_api_key(&secret_string)
}

/// The secret is either the bare key or a JSON object carrying `apiKey` / `api_key`.
fn parse_api_key(secret: &str) -> Result<String> {
    let secret = secret.trim();

    let key = if secret.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(secret)?;
        value
            .get("apiKey")
            .or_else(|| value.get("api_key"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .ok_or_else(|| Error::Config("Secret JSON has no apiKey field".to_string()))?
            .to_string()
    } else {
        secret.to_string()
    };

    if key.is_empty() {
        return Err(Error::Config("OpenAI API key secret is empty".to_string()));
    }
    Ok(key)
}
