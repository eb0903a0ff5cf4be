//! Drives chunker output into the retriever with progress and cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chunker::TextChunk;
use crate::error::{IndexError, Result};
use crate::retriever::Retriever;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Chunks submitted per retriever call.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { batch_size: 16 }
    }
}

/// Orchestrates one indexing run. The single-flight rule (at most one run
/// alive, new runs cancel the old) is enforced by the coordinator, not here.
pub struct IndexingPipeline<R> {
    retriever: Arc<R>,
    config: PipelineConfig,
}

impl<R: Retriever> IndexingPipeline<R> {
    #[must_use]
    pub fn new(retriever: Arc<R>, config: PipelineConfig) -> Self {
        Self { retriever, config }
    }

    /// Submit chunks in order, reporting fractional progress from 0 to 1.
    ///
    /// Cancellation is checked at the top of every batch iteration. After a
    /// cancelled run the retriever's partial state is undefined and the
    /// document must be re-indexed in full.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Cancelled`] when the token fires, or
    /// [`IndexError::Retriever`] when a batch submission fails.
    pub async fn run(
        &self,
        chunks: &[TextChunk],
        on_progress: impl Fn(f32),
        cancel: &CancellationToken,
    ) -> Result<()> {
        let total = chunks.len();
        if total == 0 {
            on_progress(1.0);
            return Ok(());
        }

        tracing::info!(total, "indexing started");
        on_progress(0.0);

        let mut submitted = 0usize;
        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            if cancel.is_cancelled() {
                tracing::info!(submitted, total, "indexing cancelled");
                return Err(IndexError::Cancelled);
            }
            self.retriever.index_batch(batch).await?;
            submitted += batch.len();
            on_progress(fraction(submitted, total));
            tracing::debug!(submitted, total, "batch indexed");
        }

        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(done: usize, total: usize) -> f32 {
    (done as f32 / total as f32).min(1.0)
}

/// Estimate time left from elapsed time and current progress, rounded down
/// to 5-second steps. A fraction of zero is clamped to a small epsilon so
/// the estimate stays finite.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_remaining(elapsed: Duration, fraction: f32) -> Duration {
    let fraction = fraction.clamp(1e-4, 1.0);
    let remaining = elapsed.as_secs_f64() / f64::from(fraction) * f64::from(1.0 - fraction);
    Duration::from_secs((remaining / 5.0) as u64 * 5)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::mock::MockRetriever;

    fn chunk(text: &str, page: u32) -> TextChunk {
        TextChunk {
            text: text.to_owned(),
            page,
        }
    }

    fn sample_chunks(n: usize) -> Vec<TextChunk> {
        (0..n).map(|i| chunk(&format!("chunk {i}"), 1)).collect()
    }

    #[tokio::test]
    async fn empty_input_completes_at_full_progress() {
        let pipeline = IndexingPipeline::new(
            Arc::new(MockRetriever::default()),
            PipelineConfig::default(),
        );
        let seen = Mutex::new(Vec::new());
        pipeline
            .run(&[], |p| seen.lock().unwrap().push(p), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_reaches_one() {
        let retriever = Arc::new(MockRetriever::default());
        let pipeline = IndexingPipeline::new(Arc::clone(&retriever), PipelineConfig { batch_size: 3 });
        let chunks = sample_chunks(10);
        let seen = Mutex::new(Vec::new());
        pipeline
            .run(&chunks, |p| seen.lock().unwrap().push(p), &CancellationToken::new())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!((seen[0] - 0.0).abs() < f32::EPSILON);
        assert!((seen.last().unwrap() - 1.0).abs() < f32::EPSILON);
        for pair in seen.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(retriever.indexed(), chunks);
    }

    #[tokio::test]
    async fn pre_cancelled_token_submits_nothing() {
        let retriever = Arc::new(MockRetriever::default());
        let pipeline = IndexingPipeline::new(Arc::clone(&retriever), PipelineConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline.run(&sample_chunks(4), |_| {}, &cancel).await;
        assert!(matches!(result, Err(IndexError::Cancelled)));
        assert!(retriever.indexed().is_empty());
    }

    #[tokio::test]
    async fn cancel_mid_run_stops_before_next_batch() {
        let retriever = Arc::new(MockRetriever::default());
        let pipeline = IndexingPipeline::new(Arc::clone(&retriever), PipelineConfig { batch_size: 2 });
        let cancel = CancellationToken::new();
        let cancel_after_first = cancel.clone();

        let result = pipeline
            .run(
                &sample_chunks(8),
                move |p| {
                    if p > 0.0 {
                        cancel_after_first.cancel();
                    }
                },
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(IndexError::Cancelled)));
        // First batch went through before the cancel was observed.
        assert_eq!(retriever.indexed().len(), 2);
    }

    #[tokio::test]
    async fn retriever_failure_propagates() {
        let pipeline = IndexingPipeline::new(
            Arc::new(MockRetriever::failing_index()),
            PipelineConfig::default(),
        );
        let result = pipeline
            .run(&sample_chunks(2), |_| {}, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IndexError::Retriever(_))));
    }

    #[test]
    fn eta_clamps_zero_fraction() {
        let eta = estimate_remaining(Duration::from_secs(10), 0.0);
        // Epsilon keeps the estimate finite; it is huge but defined.
        assert!(eta > Duration::from_secs(3600));
    }

    #[test]
    fn eta_at_half_progress_matches_elapsed() {
        let eta = estimate_remaining(Duration::from_secs(62), 0.5);
        // 62s elapsed at 50% predicts 62s remaining, floored to 5s steps.
        assert_eq!(eta, Duration::from_secs(60));
    }

    #[test]
    fn eta_at_completion_is_zero() {
        assert_eq!(estimate_remaining(Duration::from_secs(30), 1.0), Duration::ZERO);
    }
}
