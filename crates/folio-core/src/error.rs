//! Error types for folio-core.

use folio_index::{IndexError, RetrieverError};
use folio_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// The retriever failed outright. Distinct from a search that returns
    /// zero hits, which is a valid outcome.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrieverError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
