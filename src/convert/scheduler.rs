//! Conversion scheduling with bounded concurrency.
//!
//! Native image codecs allocate outside the Rust heap, so admitting every
//! file in a batch to decode at once can exhaust memory in ways no
//! allocator-level backpressure will catch. The scheduler bounds the number
//! of *executing* conversions to K (default 1, trading throughput for
//! bounded codec memory); excess tasks wait in submission order on a fair
//! FIFO semaphore.
//!
//! Results are indexed by input position regardless of completion order, and
//! the batch joins all-or-nothing: the first failure aborts the whole batch
//! and no partial results are returned.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::ConvertError;

use super::pipeline::{convert_file, ConvertOptions};
use super::request::{ConversionResult, InputFile};

/// Default concurrency bound.
pub const DEFAULT_CONCURRENCY: usize = 1;

// =============================================================================
// Scheduler
// =============================================================================

/// Bounded-concurrency scheduler for per-file conversion tasks.
pub struct ConvertScheduler {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    limit: usize,
}

impl ConvertScheduler {
    /// Create a scheduler allowing at most `limit` concurrent conversions.
    ///
    /// A limit of 0 is treated as 1.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// The configured concurrency bound K.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of conversions currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// High-water mark of simultaneously executing conversions.
    ///
    /// Observability hook: tests assert this never exceeds [`Self::limit`].
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Convert a batch of files, at most K at a time.
    ///
    /// The returned vector is ordered by input position. Any single failure
    /// aborts the entire batch.
    pub async fn convert_batch(
        &self,
        files: Vec<InputFile>,
        opts: &ConvertOptions,
    ) -> Result<Vec<ConversionResult>, ConvertError> {
        let count = files.len();
        let opts = Arc::new(opts.clone());

        let tasks = files.into_iter().map(|file| {
            let opts = Arc::clone(&opts);
            self.run(move || convert_file(file, &opts))
        });

        let results = try_join_all(tasks).await?;
        debug!(files = count, "batch conversion complete");
        Ok(results)
    }

    /// Run one blocking job under the concurrency bound.
    ///
    /// The permit moves into the blocking closure, not the awaiting future:
    /// an aborted batch (or a disconnected client) drops the future, but the
    /// codec work keeps running on its blocking thread and must keep its
    /// slot until it finishes, or newly admitted work would run alongside it
    /// and exceed K.
    async fn run<T, F>(&self, job: F) -> Result<T, ConvertError>
    where
        F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ConvertError::TaskJoin(e.to_string()))?;

        let in_flight = Arc::clone(&self.in_flight);
        let peak = Arc::clone(&self.peak_in_flight);

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _guard = InFlightGuard::enter(&in_flight, &peak);
            job()
        })
        .await
        .map_err(|e| ConvertError::TaskJoin(e.to_string()));

        result?
    }
}

/// RAII gauge for executing conversions.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
