//! Language model capability, prompt assembly, and streaming generation.

#[cfg(feature = "candle")]
pub mod candle_model;
pub mod error;
pub mod generate;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod prompt;
pub mod stop;

pub use error::LlmError;
pub use generate::{GenerationConfig, Outcome, StreamItem, StreamingGenerator};
pub use model::{LanguageModel, TokenSession};
