//! Token-by-token streaming generation with cancellation and stop detection.

use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::{LlmError, Result};
use crate::model::LanguageModel;
use crate::stop::StopWatcher;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum number of generation steps before forced completion. The
    /// only bound on a run; there is no wall-clock timeout.
    pub max_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

/// How a generation session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stop marker, model end-of-sequence, or token budget.
    Completed,
    /// A step failed mid-stream; increments already yielded stand as the
    /// answer, but the caller can tell it is truncated.
    CompletedWithError,
    /// The caller's token fired. A normal terminal state, not a failure.
    Cancelled,
}

/// One element of the answer stream. Exactly one `Done` is sent, last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Text(String),
    Done(Outcome),
}

pub type AnswerStream = ReceiverStream<StreamItem>;

/// Runs the tokenize → step → decode → stop-detect cycle on a blocking
/// task, yielding text increments in strict generation order.
pub struct StreamingGenerator<M> {
    model: Arc<M>,
    config: GenerationConfig,
}

impl<M: LanguageModel + 'static> StreamingGenerator<M> {
    #[must_use]
    pub fn new(model: Arc<M>, config: GenerationConfig) -> Self {
        Self { model, config }
    }

    /// Start generating against `prompt`.
    ///
    /// Cancellation is checked at the top of every iteration, so worst-case
    /// latency is one token's computation. A stop marker is detected before
    /// the matching increment is yielded; everything yielded earlier stays
    /// yielded. Step failures after setup are absorbed into
    /// [`Outcome::CompletedWithError`]. Dropping the returned stream stops
    /// the worker at its next send.
    ///
    /// # Errors
    ///
    /// Returns an error if tokenization or session setup fails — those are
    /// configuration failures and surface before any increment is produced.
    pub async fn stream(&self, prompt: &str, cancel: CancellationToken) -> Result<AnswerStream> {
        let (tx, rx) = tokio::sync::mpsc::channel::<StreamItem>(64);
        let (setup_tx, setup_rx) = tokio::sync::oneshot::channel::<Result<()>>();
        let model = Arc::clone(&self.model);
        let prompt = prompt.to_owned();
        let max_tokens = self.config.max_tokens;

        tokio::task::spawn_blocking(move || {
            let setup = model.encode(&prompt).and_then(|tokens| model.start(&tokens));
            let mut session = match setup {
                Ok(session) => {
                    let _ = setup_tx.send(Ok(()));
                    session
                }
                Err(e) => {
                    let _ = setup_tx.send(Err(e));
                    return;
                }
            };

            let mut watcher = StopWatcher::default();
            let mut produced = 0usize;
            let outcome = loop {
                if cancel.is_cancelled() {
                    break Outcome::Cancelled;
                }
                if produced >= max_tokens {
                    break Outcome::Completed;
                }

                let token = match session.next_token() {
                    Ok(Some(token)) => token,
                    Ok(None) => break Outcome::Completed,
                    Err(e) => {
                        tracing::warn!(error = %e, "generation step failed");
                        break Outcome::CompletedWithError;
                    }
                };
                produced += 1;

                let increment = match session.decode(token) {
                    Ok(Some(text)) => text,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "token decode failed");
                        break Outcome::CompletedWithError;
                    }
                };

                // Scan before yielding: the increment completing a marker
                // match is suppressed.
                if watcher.push(&increment) {
                    break Outcome::Completed;
                }
                if increment.is_empty() {
                    continue;
                }
                if tx.blocking_send(StreamItem::Text(increment)).is_err() {
                    // Receiver gone; no one left to report an outcome to.
                    return;
                }
            };

            tracing::debug!(produced, ?outcome, "generation finished");
            let _ = tx.blocking_send(StreamItem::Done(outcome));
        });

        setup_rx
            .await
            .map_err(|_| LlmError::Inference("generation task exited during setup".into()))??;
        Ok(ReceiverStream::new(rx))
    }
}
