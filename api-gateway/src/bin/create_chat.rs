//! Create Chat Lambda - Handles POST /chats.
//!
//! The caller's Cognito subject owns the new chat.

use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{run, service_fn, Error};
use shared::{handlers, Config, DynamoRepository};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    repo: DynamoRepository,
}

impl AppState {
    async fn new(config: &Config) -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let table_name = config.table_name()?;

        info!(table = %table_name, region = %config.aws_region, "Initialized create_chat");

        Ok(Self {
            repo: DynamoRepository::new(DynamoClient::new(&aws_config), table_name),
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
        async move { handlers::create_chat(&state.repo, &event).await }
    }))
    .await
}
