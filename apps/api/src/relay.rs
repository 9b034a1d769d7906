//! Streaming Response Relay: forwards model fragments to a single consumer.
//!
//! The producer task opens the model stream and pushes every fragment, in arrival
//! order, into a bounded channel. The channel closes when the model finishes; on
//! failure a final `Failed` event is sent first. Fragments already sent are never
//! retracted.

use std::future::Future;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::llm_client::{FragmentStream, LlmError};

pub const RELAY_CAPACITY: usize = 32;

/// Payload sent to the consumer when the stream fails.
pub const STREAM_FAILURE_MESSAGE: &str = "An unexpected error occurred during streaming.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Fragment(String),
    /// Terminal. Nothing follows it.
    Failed(String),
}

/// Everything a consumer saw, accumulated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub text: String,
    pub error: Option<String>,
}

/// Spawns the producer half and returns the consumer half.
///
/// `open` is awaited inside the spawned task, so a failure to open the model
/// stream reaches the consumer as `Failed` instead of as a return value.
pub fn spawn_relay<F>(open: F) -> mpsc::Receiver<RelayEvent>
where
    F: Future<Output = Result<FragmentStream, LlmError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(RELAY_CAPACITY);

    tokio::spawn(async move {
        let mut stream = match open.await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Streaming error: failed to open model stream: {e}");
                let _ = tx
                    .send(RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string()))
                    .await;
                return;
            }
        };

        let mut forwarded = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) if fragment.is_empty() => continue,
                Ok(fragment) => {
                    if tx.send(RelayEvent::Fragment(fragment)).await.is_err() {
                        debug!("Relay consumer dropped after {forwarded} fragments");
                        return;
                    }
                    forwarded += 1;
                }
                Err(e) => {
                    error!("Streaming error after {forwarded} fragments: {e}");
                    let _ = tx
                        .send(RelayEvent::Failed(STREAM_FAILURE_MESSAGE.to_string()))
                        .await;
                    return;
                }
            }
        }

        debug!("Relay finished: {forwarded} fragments");
    });

    rx
}

/// Drains a relay into the full answer text plus the error marker, if any.
pub async fn collect_answer(mut rx: mpsc::Receiver<RelayEvent>) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();
    while let Some(event) = rx.recv().await {
        match event {
            RelayEvent::Fragment(fragment) => outcome.text.push_str(&fragment),
            RelayEvent::Failed(message) => {
                outcome.error = Some(message);
                break;
            }
        }
    }
    outcome
}
