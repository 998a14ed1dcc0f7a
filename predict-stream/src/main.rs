//! Predict Stream Lambda - Streams completion text back to the caller.
//!
//! Invoked directly (InvokeWithResponseStream) by the identity pool's
//! authenticated role rather than through API Gateway. The payload is the
//! conversation; the response body is the assistant's reply, written delta
//! by delta as the completion API produces it.

use futures::{Stream, StreamExt};
use lambda_runtime::streaming::{channel, Body, Response, Sender};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::models::PredictRequest;
use shared::{get_openai_api_key, Config, OpenAiClient};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across invocations.
struct AppState {
    openai: OpenAiClient,
}

impl AppState {
    async fn new(config: &Config) -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let api_key = get_openai_api_key(&secrets_client, config.secret_arn()?).await?;

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

/// Where completion text goes once the response has started.
trait ChunkSink: Send {
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), Error>> + Send;
}

impl ChunkSink for Sender {
    async fn send(&mut self, text: String) -> Result<(), Error> {
        self.send_data(text.into()).await.map_err(Into::into)
    }
}

/// How a forwarded stream ended.
#[derive(Debug, PartialEq, Eq)]
enum PumpOutcome {
    Finished { chunks: usize },
    CallerGone { chunks: usize },
    Failed { chunks: usize },
}

/// Copy deltas to the sink until the completion ends, fails, or the caller leaves.
async fn pump<S, K>(request_id: &str, deltas: S, sink: &mut K) -> PumpOutcome
where
    S: Stream<Item = shared::Result<String>>,
    K: ChunkSink,
{
    let mut deltas = std::pin::pin!(deltas);
    let mut chunks = 0usize;

    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(text) => {
                if let Err(e) = sink.send(text).await {
                    warn!(request_id = %request_id, error = %e, "Caller went away");
                    return PumpOutcome::CallerGone { chunks };
                }
                chunks += 1;
            }
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Completion stream failed");
                return PumpOutcome::Failed { chunks };
            }
        }
    }

    info!(request_id = %request_id, chunks, "Completion stream finished");
    PumpOutcome::Finished { chunks }
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<PredictRequest>,
) -> Result<Response<Body>, Error> {
    let request_id = event.context.request_id.clone();
    let messages = event.payload.into_messages()?;

    info!(request_id = %request_id, messages = messages.len(), "Streaming completion");

    // Errors up to here fail the invocation; after this point the stream has started.
    let deltas = state.openai.stream(&messages).await?;
    let (mut tx, rx) = channel();

    tokio::spawn(async move {
        pump(&request_id, deltas, &mut tx).await;
    });

    Ok(Response::from(rx))
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
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use shared::Error as ChatError;

    /// Collects text; refuses everything after `capacity` chunks.
    struct RecordingSink {
        received: Vec<String>,
        capacity: usize,
    }

    impl RecordingSink {
        fn new(capacity: usize) -> Self {
            Self {
                received: Vec::new(),
                capacity,
            }
        }
    }

    impl ChunkSink for RecordingSink {
        async fn send(&mut self, text: String) -> Result<(), Error> {
            if self.received.len() >= self.capacity {
                return Err("connection closed".into());
            }
            self.received.push(text);
            Ok(())
        }
    }

    fn deltas(items: Vec<shared::Result<String>>) -> impl Stream<Item = shared::Result<String>> {
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_forwards_every_delta() {
        let mut sink = RecordingSink::new(usize::MAX);

        let outcome = pump(
            "req-1",
            deltas(vec![Ok("Hel".to_string()), Ok("lo".to_string())]),
            &mut sink,
        )
        .await;

        assert_eq!(outcome, PumpOutcome::Finished { chunks: 2 });
        assert_eq!(sink.received, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_response() {
        let mut sink = RecordingSink::new(usize::MAX);

        let outcome = pump(
            "req-2",
            deltas(vec![
                Ok("Hel".to_string()),
                Err(ChatError::Upstream("connection reset".to_string())),
                Ok("never sent".to_string()),
            ]),
            &mut sink,
        )
        .await;

        assert_eq!(outcome, PumpOutcome::Failed { chunks: 1 });
        assert_eq!(sink.received, vec!["Hel"]);
    }

    #[tokio::test]
    async fn test_stops_when_caller_leaves() {
        let mut sink = RecordingSink::new(1);

        let outcome = pump(
            "req-3",
            deltas(vec![Ok("a".to_string()), Ok("b".to_string()), Ok("c".to_string())]),
            &mut sink,
        )
        .await;

        assert_eq!(outcome, PumpOutcome::CallerGone { chunks: 1 });
        assert_eq!(sink.received, vec!["a"]);
    }
}
