//! Error types for folio-index.

use crate::retriever::RetrieverError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Chunk length configuration must be greater than zero.
    #[error("maximum chunk length must be greater than zero")]
    InvalidChunkLength,

    /// The caller cancelled the indexing run. Partial retriever state is
    /// undefined; the document must be re-indexed in full.
    #[error("indexing cancelled")]
    Cancelled,

    /// The external retriever failed.
    #[error("retriever error: {0}")]
    Retriever(#[from] RetrieverError),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
