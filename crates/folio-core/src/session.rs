//! Top-level coordinator: retrieve, assemble, generate, aggregate.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;

use folio_index::pipeline::{IndexingPipeline, PipelineConfig};
use folio_index::{IndexError, PageText, Retriever, chunk_pages};
use folio_llm::generate::{GenerationConfig, Outcome, StreamItem, StreamingGenerator};
use folio_llm::model::LanguageModel;
use folio_llm::prompt;

use crate::config::Config;
use crate::error::CoreError;
use crate::flight::FlightGuard;

/// Final result of one question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Distinct source pages, ascending.
    pub pages: Vec<u32>,
    pub outcome: Outcome,
}

/// Coordinates the document pipeline end to end. At most one indexing run
/// and one question are in flight at a time; a new request of either kind
/// cancels its predecessor and waits for it to step aside before starting.
pub struct QuerySession<R, M> {
    retriever: Arc<R>,
    pipeline: IndexingPipeline<R>,
    generator: StreamingGenerator<M>,
    preamble: String,
    top_k: usize,
    max_chunk_len: usize,
    indexing: FlightGuard,
    index_lock: tokio::sync::Mutex<()>,
    asking: FlightGuard,
    ask_lock: tokio::sync::Mutex<()>,
}

impl<R, M> QuerySession<R, M>
where
    R: Retriever + 'static,
    M: LanguageModel + 'static,
{
    #[must_use]
    pub fn new(retriever: Arc<R>, model: Arc<M>, config: &Config) -> Self {
        let pipeline = IndexingPipeline::new(
            Arc::clone(&retriever),
            PipelineConfig {
                batch_size: config.retrieval.batch_size,
            },
        );
        let generator = StreamingGenerator::new(
            model,
            GenerationConfig {
                max_tokens: config.generation.max_tokens,
            },
        );
        Self {
            retriever,
            pipeline,
            generator,
            preamble: prompt::DEFAULT_PREAMBLE.to_owned(),
            top_k: config.retrieval.top_k,
            max_chunk_len: config.chunking.max_len,
            indexing: FlightGuard::new(),
            index_lock: tokio::sync::Mutex::new(()),
            asking: FlightGuard::new(),
            ask_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether the retriever has loaded its resources. The model is ready
    /// from construction.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.retriever.is_ready()
    }

    /// Await readiness instead of subscribing to load events.
    pub async fn wait_ready(&self) {
        while !self.is_ready() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Chunk and index a document's pages, reporting fractional progress.
    ///
    /// Starting a new run cancels any run already in flight. A cancelled
    /// run leaves the retriever in an undefined partial state; re-index in
    /// full before querying.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Cancelled`] when superseded or cancelled,
    /// chunking configuration errors, and retriever failures.
    pub async fn index_document(
        &self,
        pages: &[PageText],
        on_progress: impl Fn(f32),
    ) -> Result<(), CoreError> {
        let cancel = self.indexing.begin();
        // Wait for the superseded run to observe its cancellation and exit,
        // so two runs never submit chunks concurrently.
        let _running = self.index_lock.lock().await;
        if cancel.is_cancelled() {
            return Err(CoreError::Index(IndexError::Cancelled));
        }

        let chunks = chunk_pages(pages, self.max_chunk_len)?;
        tracing::info!(pages = pages.len(), chunks = chunks.len(), "document chunked");
        self.pipeline.run(&chunks, on_progress, &cancel).await?;
        Ok(())
    }

    /// Answer a question about the indexed document.
    ///
    /// Each text increment is passed to `on_increment` as it arrives and
    /// accumulated into the final [`Answer`]. A search returning zero hits
    /// is valid — the model answers from the preamble alone. Cancellation
    /// (from [`Self::cancel_ask`] or a newer question) ends the stream with
    /// [`Outcome::Cancelled`]; the partial text is returned, not an error.
    ///
    /// # Errors
    ///
    /// Returns retrieval failures and generation setup failures; nothing
    /// that happens after the first token is an error.
    pub async fn ask(
        &self,
        question: &str,
        mut on_increment: impl FnMut(&str),
    ) -> Result<Answer, CoreError> {
        let cancel = self.asking.begin();
        let _running = self.ask_lock.lock().await;
        if cancel.is_cancelled() {
            return Ok(Answer {
                text: String::new(),
                pages: Vec::new(),
                outcome: Outcome::Cancelled,
            });
        }

        let hits = self.retriever.search(question, self.top_k).await?;
        let mut pages: Vec<u32> = hits.iter().map(|h| h.chunk.page).collect();
        pages.sort_unstable();
        pages.dedup();
        tracing::debug!(hits = hits.len(), pages = ?pages, "retrieval done");

        let prompt_text = prompt::assemble(&self.preamble, question, &hits);
        let mut stream = self.generator.stream(&prompt_text, cancel.clone()).await?;

        let mut text = String::new();
        let mut outcome = Outcome::Completed;
        while let Some(item) = stream.next().await {
            match item {
                StreamItem::Text(part) => {
                    on_increment(&part);
                    text.push_str(&part);
                }
                StreamItem::Done(o) => {
                    outcome = o;
                    break;
                }
            }
        }

        tracing::debug!(?outcome, chars = text.len(), "answer finished");
        Ok(Answer {
            text,
            pages,
            outcome,
        })
    }

    /// Cancel the in-flight indexing run, if any. Idempotent.
    pub fn cancel_indexing(&self) {
        self.indexing.cancel();
    }

    /// Cancel the in-flight question, if any. Idempotent.
    pub fn cancel_ask(&self) {
        self.asking.cancel();
    }
}
