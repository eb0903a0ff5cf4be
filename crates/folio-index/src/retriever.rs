//! Contract for the external embedding/vector-search collaborator.
//!
//! The retriever's internals (embedding model, index structure, storage)
//! are opaque; folio only depends on this interface.

use crate::chunker::TextChunk;

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("indexing failed: {0}")]
    Index(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("retriever not ready")]
    NotReady,
}

/// A chunk returned by [`Retriever::search`], ranked by relevance.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

pub trait Retriever: Send + Sync {
    /// Embed and store one batch of chunks, in the order given.
    fn index_batch(
        &self,
        chunks: &[TextChunk],
    ) -> impl Future<Output = Result<(), RetrieverError>> + Send;

    /// Rank stored chunks against a natural-language query. Returning an
    /// empty list is a valid outcome, distinct from an error.
    fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<RetrievedChunk>, RetrieverError>> + Send;

    /// Whether the retriever has finished loading its own resources.
    fn is_ready(&self) -> bool;
}
