//! Bounded pool for blocking, CPU-bound jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::warn;

use crate::types::{Stage, TranscriptionError};

/// Runs blocking closures on tokio's blocking threads, at most `max_jobs` at a
/// time, each under a wall-clock timeout.
///
/// A job that times out keeps its permit until the closure actually returns,
/// so the bound holds even for stuck work.
#[derive(Clone, Debug)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    max_jobs: usize,
    timeout: Duration,
}

impl BlockingPool {
    /// Create a pool. `max_jobs` is clamped to at least one.
    pub fn new(max_jobs: usize, timeout: Duration) -> Self {
        let max_jobs = max_jobs.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_jobs)),
            max_jobs,
            timeout,
        }
    }

    /// Concurrency limit.
    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Per-job budget, covering queueing and execution.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Jobs currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_jobs - self.permits.available_permits()
    }

    /// Run `job` on a blocking thread and wait for its result.
    pub async fn run<F, T>(&self, job: F) -> Result<T, TranscriptionError>
    where
        F: FnOnce() -> Result<T, TranscriptionError> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TranscriptionError::Transcription("worker pool closed".into()))?;
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job()
            });
            handle
                .await
                .map_err(|e| TranscriptionError::Transcription(format!("worker panicked: {e}")))?
        };

        if let Ok(result) = tokio::time::timeout(self.timeout, work).await {
            result
        } else {
            let after_ms = self.timeout.as_millis() as u64;
            warn!(after_ms, in_flight = self.in_flight(), "blocking job timed out");
            Err(TranscriptionError::Timeout {
                stage: Stage::Transcribe,
                after_ms,
            })
        }
    }
}
