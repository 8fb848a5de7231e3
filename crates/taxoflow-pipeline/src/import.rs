//! Import: tabular rows → validated records → repository batches

use std::pin::pin;
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use taxoflow_core::{
    BatchOperation, BatchOutcome, BatchProcessor, CancelToken, ObjectCounter, PipelineError,
    PlainRecord, ProgressContext, StageStreamExt,
};
use taxoflow_model::{Collection, parse_record};
use taxoflow_store::{JobKind, Repository};

use crate::config::PipelineConfig;
use crate::report::{RunFailure, RunSummary, log_failure, stats_so_far};
use crate::source::SourceRow;
use crate::ticker::Ticker;

/// Inserts each batch into one collection of a model.
struct InsertRecords<'a, R> {
    repo: &'a R,
    model_id: &'a str,
    collection: Collection,
}

impl<R: Repository> BatchOperation<PlainRecord> for InsertRecords<'_, R> {
    async fn process_batch(
        &mut self,
        batch: Vec<PlainRecord>,
    ) -> Result<BatchOutcome, PipelineError> {
        let len = batch.len();
        let report = self
            .repo
            .insert_batch(self.model_id, self.collection, batch)
            .await?;
        Ok(BatchOutcome::from_modified_count(len, report.modified_count))
    }
}

/// Import rows of one collection into a model.
///
/// Rows that fail to decode or validate are logged with their line number and
/// counted as failed; they never reach a batch. A repository error ends the
/// run with the stats of the batches completed before it.
pub async fn import_rows<S, R>(
    source: S,
    collection: Collection,
    repo: &R,
    model_id: &str,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: &ProgressContext,
) -> Result<RunSummary, RunFailure>
where
    S: Stream<Item = Result<SourceRow, PipelineError>>,
    R: Repository,
{
    let start = Instant::now();
    let op = InsertRecords {
        repo,
        model_id,
        collection,
    };
    let mut processor = BatchProcessor::new(config.batch_size, op)?;

    let counter = ObjectCounter::new();
    let objects = counter.handle();
    let mut rows = pin!(source.through(counter));

    let ticker = Ticker::new(
        progress,
        format!("import {collection}"),
        config.progress_interval,
    );
    log::info!("Importing {collection} into model {model_id}");

    let mut rejected = 0usize;
    let result = async {
        while let Some(item) = rows.next().await {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let SourceRow { line, row } = item?;
            match row.and_then(|row| parse_record(collection, &row)) {
                Ok(record) => processor.add(record).await?,
                Err(e) => {
                    rejected += 1;
                    log::warn!("{collection}: row rejected, {}", e.at_line(line));
                }
            }
            ticker.tick(
                objects.load(Ordering::Relaxed),
                &stats_so_far(&processor, rejected),
            );
        }
        processor.flush().await
    }
    .await;
    ticker.finish();

    let stats = stats_so_far(&processor, rejected);
    if let Err(e) = result {
        log_failure(&format!("Import of {collection}"), &e);
        return Err(RunFailure::new(stats, e));
    }

    Ok(RunSummary {
        kind: JobKind::Import,
        model_id: model_id.to_string(),
        collection: Some(collection),
        stats,
        objects_seen: objects.load(Ordering::Relaxed),
        batches: processor.batches(),
        elapsed: start.elapsed(),
    })
}
