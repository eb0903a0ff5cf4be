//! Page-aware chunking and the indexing half of the folio pipeline.

pub mod chunker;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pipeline;
pub mod retriever;

pub use chunker::{PageText, TextChunk, chunk_pages};
pub use error::IndexError;
pub use pipeline::{IndexingPipeline, PipelineConfig};
pub use retriever::{RetrievedChunk, Retriever, RetrieverError};
