//! Export: repository documents → plain records → sink batches

use std::pin::pin;
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures_util::StreamExt;
use taxoflow_core::{
    BatchOperation, BatchOutcome, BatchProcessor, CancelToken, DocumentToObject, ObjectCounter,
    PipelineError, PlainRecord, ProgressContext, Stage, StageStreamExt,
};
use taxoflow_model::Collection;
use taxoflow_store::{JobKind, Repository};

use crate::config::PipelineConfig;
use crate::report::{RunFailure, RunSummary, log_failure, stats_so_far};
use crate::sink::RecordSink;
use crate::ticker::Ticker;

struct WriteRecords<'a, K> {
    sink: &'a mut K,
}

impl<K: RecordSink> BatchOperation<PlainRecord> for WriteRecords<'_, K> {
    async fn process_batch(
        &mut self,
        batch: Vec<PlainRecord>,
    ) -> Result<BatchOutcome, PipelineError> {
        self.sink.write_batch(batch)
    }
}

/// Export every document of one collection of a model into `sink`.
///
/// A document that fails to materialize is a failed row; any other stream
/// error ends the run. The sink is left unfinished: call its finalizer (e.g.
/// [`JsonlSink::finish`](crate::sink::JsonlSink::finish)) once this returns `Ok`.
pub async fn export_records<R, K>(
    repo: &R,
    collection: Collection,
    model_id: &str,
    sink: &mut K,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: &ProgressContext,
) -> Result<RunSummary, RunFailure>
where
    R: Repository,
    K: RecordSink,
{
    let start = Instant::now();
    let mut processor = BatchProcessor::new(config.batch_size, WriteRecords { sink })?;

    let counter = ObjectCounter::new();
    let objects = counter.handle();
    let stages = DocumentToObject::<R::Doc>::new().then(counter);
    let mut records = pin!(repo.find_all(model_id, collection).through(stages));

    let ticker = Ticker::new(
        progress,
        format!("export {collection}"),
        config.progress_interval,
    );
    log::info!("Exporting {collection} of model {model_id}");

    let mut rejected = 0usize;
    let result = async {
        while let Some(item) = records.next().await {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match item {
                Ok(record) => processor.add(record).await?,
                Err(PipelineError::Materialize(msg)) => {
                    rejected += 1;
                    log::warn!("{collection}: document skipped, {msg}");
                }
                Err(e) => return Err(e),
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
        log_failure(&format!("Export of {collection}"), &e);
        return Err(RunFailure::new(stats, e));
    }

    Ok(RunSummary {
        kind: JobKind::Export,
        model_id: model_id.to_string(),
        collection: Some(collection),
        stats,
        objects_seen: objects.load(Ordering::Relaxed),
        batches: processor.batches(),
        elapsed: start.elapsed(),
    })
}
