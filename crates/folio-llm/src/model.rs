//! The opaque model/tokenizer capability folio generates against.
//!
//! A backend is loaded once and handed out as a [`LanguageModel`]; each
//! query opens a single-use [`TokenSession`] which owns the decode state.

use crate::error::Result;

pub trait LanguageModel: Send + Sync {
    /// Tokenize prompt text.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer rejects the input.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Begin a single-use generation session over the encoded prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a session.
    fn start(&self, input: &[u32]) -> Result<Box<dyn TokenSession>>;
}

/// One in-flight generation. Non-reentrant; discarded when the query ends.
pub trait TokenSession: Send {
    /// Select the next token. `None` means the model signalled completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass or sampling fails.
    fn next_token(&mut self) -> Result<Option<u32>>;

    /// Streaming-aware decode of a selected token. Returns `None` while the
    /// token only extends a text unit that is not yet displayable; the
    /// pending fragment is flushed once later context completes it.
    ///
    /// # Errors
    ///
    /// Returns an error if detokenization fails.
    fn decode(&mut self, token: u32) -> Result<Option<String>>;
}
