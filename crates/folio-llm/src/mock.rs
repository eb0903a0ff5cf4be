//! Test-only scripted model.

use crate::error::{LlmError, Result};
use crate::model::{LanguageModel, TokenSession};

/// Replays a fixed fragment script, one fragment per generated token. An
/// empty fragment stands for a decode step that buffers a partial unit.
#[derive(Debug, Clone, Default)]
pub struct MockModel {
    fragments: Vec<String>,
    fail_at: Option<usize>,
    fail_encode: bool,
    step_delay_ms: u64,
}

impl MockModel {
    #[must_use]
    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Fail `next_token` at this zero-based step.
    #[must_use]
    pub fn failing_at(mut self, step: usize) -> Self {
        self.fail_at = Some(step);
        self
    }

    #[must_use]
    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    /// Sleep this long in every `next_token` call.
    #[must_use]
    pub fn with_step_delay(mut self, ms: u64) -> Self {
        self.step_delay_ms = ms;
        self
    }
}

impl LanguageModel for MockModel {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        if self.fail_encode {
            return Err(LlmError::Inference("mock encode failure".into()));
        }
        Ok(text.bytes().map(u32::from).collect())
    }

    fn start(&self, _input: &[u32]) -> Result<Box<dyn TokenSession>> {
        Ok(Box::new(MockSession {
            fragments: self.fragments.clone(),
            pos: 0,
            fail_at: self.fail_at,
            step_delay_ms: self.step_delay_ms,
        }))
    }
}

struct MockSession {
    fragments: Vec<String>,
    pos: usize,
    fail_at: Option<usize>,
    step_delay_ms: u64,
}

impl TokenSession for MockSession {
    fn next_token(&mut self) -> Result<Option<u32>> {
        if self.step_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.step_delay_ms));
        }
        if self.fail_at == Some(self.pos) {
            return Err(LlmError::Inference("mock step failure".into()));
        }
        if self.pos >= self.fragments.len() {
            return Ok(None);
        }
        let token = u32::try_from(self.pos).unwrap_or(u32::MAX);
        self.pos += 1;
        Ok(Some(token))
    }

    fn decode(&mut self, token: u32) -> Result<Option<String>> {
        let fragment = self
            .fragments
            .get(token as usize)
            .ok_or_else(|| LlmError::Inference(format!("mock token {token} out of range")))?;
        if fragment.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fragment.clone()))
        }
    }
}
