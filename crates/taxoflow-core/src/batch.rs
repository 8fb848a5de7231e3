//! Batch processor: buffers streamed items and applies a unit of work per batch

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Default number of items handed to a batch operation at once.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Success/failure split reported by one batch operation.
///
/// Partial failure is normal: a repository may accept only some of the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn all_succeeded(len: usize) -> Self {
        Self {
            succeeded: len,
            failed: 0,
        }
    }

    /// Outcome of a bulk write that reported `modified` changed items out of `len`.
    pub fn from_modified_count(len: usize, modified: usize) -> Self {
        let succeeded = modified.min(len);
        Self {
            succeeded,
            failed: len - succeeded,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.saturating_add(self.failed)
    }

    /// Whether the outcome accounts for exactly `len` items.
    pub fn is_consistent(&self, len: usize) -> bool {
        self.succeeded <= len && self.failed == len - self.succeeded
    }
}

/// Cumulative counters for a run.
///
/// `rows_success + rows_failed == rows_processed` holds for every value built
/// through [`fold`](Self::fold), [`merge`](Self::merge) or [`rejected`](Self::rejected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsProcessedStats {
    pub rows_processed: usize,
    pub rows_success: usize,
    pub rows_failed: usize,
}

impl RowsProcessedStats {
    /// Stats for `n` rows rejected before they reached a batch.
    pub fn rejected(n: usize) -> Self {
        Self {
            rows_processed: n,
            rows_success: 0,
            rows_failed: n,
        }
    }

    /// Return the stats with one batch outcome added.
    #[must_use]
    pub fn fold(self, outcome: BatchOutcome) -> Self {
        Self {
            rows_processed: self.rows_processed + outcome.total(),
            rows_success: self.rows_success + outcome.succeeded,
            rows_failed: self.rows_failed + outcome.failed,
        }
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            rows_processed: self.rows_processed + other.rows_processed,
            rows_success: self.rows_success + other.rows_success,
            rows_failed: self.rows_failed + other.rows_failed,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.rows_success + self.rows_failed == self.rows_processed
    }
}

impl std::fmt::Display for RowsProcessedStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} ok, {} failed",
            self.rows_processed, self.rows_success, self.rows_failed
        )
    }
}

/// Unit of work applied to one batch.
///
/// The operation owns all knowledge of what processing means. An `Err` aborts
/// the run; rejected rows inside a successful call go in the outcome.
pub trait BatchOperation<T> {
    fn process_batch(
        &mut self,
        batch: Vec<T>,
    ) -> impl Future<Output = Result<BatchOutcome, PipelineError>>;
}

impl<T, F, Fut> BatchOperation<T> for F
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<BatchOutcome, PipelineError>>,
{
    fn process_batch(
        &mut self,
        batch: Vec<T>,
    ) -> impl Future<Output = Result<BatchOutcome, PipelineError>> {
        self(batch)
    }
}

/// Groups incoming items into batches of at most `batch_size` and hands each
/// batch to the operation in arrival order.
///
/// Dispatch happens inline inside `add`/`flush`, so there is never more than
/// one batch in flight and a slow operation holds back the producer.
pub struct BatchProcessor<T, Op> {
    batch_size: usize,
    operation: Op,
    current: Vec<T>,
    stats: RowsProcessedStats,
    batches: usize,
    closed: bool,
}

impl<T, Op> std::fmt::Debug for BatchProcessor<T, Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("batch_size", &self.batch_size)
            .field("buffered", &self.current.len())
            .field("stats", &self.stats)
            .field("batches", &self.batches)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T, Op: BatchOperation<T>> BatchProcessor<T, Op> {
    pub fn new(batch_size: usize, operation: Op) -> Result<Self, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            batch_size,
            operation,
            current: Vec::with_capacity(batch_size),
            stats: RowsProcessedStats::default(),
            batches: 0,
            closed: false,
        })
    }

    /// Queue one item, dispatching the batch if it is now full.
    ///
    /// When this returns `Ok`, the item is either buffered for a later batch or
    /// its batch has completed and been counted.
    pub async fn add(&mut self, item: T) -> Result<(), PipelineError> {
        if self.closed {
            return Err(PipelineError::ProcessorClosed);
        }
        self.current.push(item);
        if self.current.len() >= self.batch_size {
            self.dispatch().await?;
        }
        Ok(())
    }

    /// Dispatch the final partial batch, if any. Must be called once, after the last `add`.
    pub async fn flush(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Err(PipelineError::ProcessorClosed);
        }
        let result = if self.current.is_empty() {
            Ok(())
        } else {
            self.dispatch().await
        };
        self.closed = true;
        result
    }

    /// Snapshot of the counters for batches completed so far.
    pub fn stats(&self) -> RowsProcessedStats {
        self.stats
    }

    /// Number of completed batch operations.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Items waiting for the next dispatch.
    pub fn buffered(&self) -> usize {
        self.current.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the operation, e.g. to finalize a sink it wraps.
    pub fn into_operation(self) -> Op {
        self.operation
    }

    async fn dispatch(&mut self) -> Result<(), PipelineError> {
        let batch = std::mem::replace(&mut self.current, Vec::with_capacity(self.batch_size));
        let len = batch.len();
        let outcome = match self.operation.process_batch(batch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The failed batch is gone; nothing after it may run.
                self.closed = true;
                return Err(e);
            }
        };
        let outcome = if outcome.is_consistent(len) {
            outcome
        } else {
            log::warn!(
                "batch {}: operation reported {} ok and {} failed for a batch of {len}, clamping",
                self.batches + 1,
                outcome.succeeded,
                outcome.failed
            );
            BatchOutcome::from_modified_count(len, outcome.succeeded)
        };
        self.batches += 1;
        self.stats = self.stats.fold(outcome);
        log::debug!(
            "batch {}: {} ok, {} failed",
            self.batches,
            outcome.succeeded,
            outcome.failed
        );
        Ok(())
    }
}
