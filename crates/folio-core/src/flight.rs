//! Coordinator-owned single-flight cancellation slot.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the one in-flight operation of a given
/// kind. Starting a new operation cancels the previous one: last request
/// wins, nothing queues and nothing is rejected.
#[derive(Debug, Default)]
pub struct FlightGuard {
    current: Mutex<Option<CancellationToken>>,
}

impl FlightGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is in flight and install a fresh token for the new
    /// operation.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut slot = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.replace(token.clone()) {
            prev.cancel();
        }
        token
    }

    /// Cancel the current operation, if any. Idempotent.
    pub fn cancel(&self) {
        let slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.as_ref() {
            token.cancel();
        }
    }
}
