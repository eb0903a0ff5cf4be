//! Test-only mock retriever.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::chunker::TextChunk;
use crate::retriever::{RetrievedChunk, Retriever, RetrieverError};

/// Records indexed chunks and replays canned search results.
#[derive(Debug, Clone)]
pub struct MockRetriever {
    indexed: Arc<Mutex<Vec<TextChunk>>>,
    results: Vec<RetrievedChunk>,
    fail_index: bool,
    fail_search: bool,
    batch_delay_ms: u64,
    ready: Arc<AtomicBool>,
    active_batches: Arc<AtomicUsize>,
    max_active_batches: Arc<AtomicUsize>,
}

impl Default for MockRetriever {
    fn default() -> Self {
        Self {
            indexed: Arc::new(Mutex::new(Vec::new())),
            results: Vec::new(),
            fail_index: false,
            fail_search: false,
            batch_delay_ms: 0,
            ready: Arc::new(AtomicBool::new(true)),
            active_batches: Arc::new(AtomicUsize::new(0)),
            max_active_batches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockRetriever {
    #[must_use]
    pub fn with_results(results: Vec<RetrievedChunk>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_search() -> Self {
        Self {
            fail_search: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_index() -> Self {
        Self {
            fail_index: true,
            ..Self::default()
        }
    }

    /// Sleep this long inside every `index_batch` call.
    #[must_use]
    pub fn with_batch_delay(mut self, ms: u64) -> Self {
        self.batch_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn not_ready() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            ..Self::default()
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Chunks indexed so far, in submission order.
    #[must_use]
    pub fn indexed(&self) -> Vec<TextChunk> {
        self.indexed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of `index_batch` calls ever observed in flight at once.
    #[must_use]
    pub fn max_concurrent_batches(&self) -> usize {
        self.max_active_batches.load(Ordering::SeqCst)
    }
}

impl Retriever for MockRetriever {
    async fn index_batch(&self, chunks: &[TextChunk]) -> Result<(), RetrieverError> {
        if self.fail_index {
            return Err(RetrieverError::Index("mock index error".into()));
        }
        let active = self.active_batches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_batches.fetch_max(active, Ordering::SeqCst);
        if self.batch_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.batch_delay_ms)).await;
        }
        self.indexed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunks);
        self.active_batches.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, RetrieverError> {
        if self.fail_search {
            return Err(RetrieverError::Search("mock search error".into()));
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
