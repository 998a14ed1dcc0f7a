//! Predict Lambda - Handles POST /predict.
//!
//! Forwards the conversation to the OpenAI chat completions API and returns
//! the assistant's reply in one response.

use lambda_http::{run, service_fn, Error};
use shared::{get_openai_api_key, handlers, Config, OpenAiClient};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    openai: OpenAiClient,
}

impl AppState {
    async fn new(config: &Config) -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let api_key = get_openai_api_key(&secrets_client, config.secret_arn()?).await?;

        info!(model = %config.openai_model, "Initialized predict");

        Ok(Self {
            openai: OpenAiClient::new(
                reqwest::Client::new(),
                api_key,
                &config.openai_model,
                &config.openai_base_url,
            ),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env();
    let state = Arc::new(AppState::new(&config).await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handlers::predict(&state.openai, &event).await }
    }))
    .await
}
