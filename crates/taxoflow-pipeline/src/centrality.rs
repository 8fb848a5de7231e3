//! Degree centrality: relation counts per skill written back onto the skills

use std::pin::pin;
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures_util::StreamExt;
use taxoflow_core::{
    BatchOperation, BatchOutcome, BatchProcessor, CancelToken, ObjectCounter, PipelineError,
    ProgressContext, StageStreamExt,
};
use taxoflow_store::{JobKind, Repository, SkillConnection};

use crate::config::PipelineConfig;
use crate::report::{RunFailure, RunSummary, log_failure, stats_so_far};
use crate::ticker::Ticker;

struct UpdateCentrality<'a, R> {
    repo: &'a R,
    model_id: &'a str,
}

impl<R: Repository> BatchOperation<SkillConnection> for UpdateCentrality<'_, R> {
    async fn process_batch(
        &mut self,
        batch: Vec<SkillConnection>,
    ) -> Result<BatchOutcome, PipelineError> {
        let report = self
            .repo
            .update_degree_centrality(self.model_id, &batch)
            .await?;
        Ok(BatchOutcome::from_modified_count(
            batch.len(),
            report.modified_count,
        ))
    }
}

/// Store each skill's relation count as its degree centrality.
///
/// A skill the repository does not update counts as a failed row.
pub async fn compute_degree_centrality<R: Repository>(
    repo: &R,
    model_id: &str,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: &ProgressContext,
) -> Result<RunSummary, RunFailure> {
    let start = Instant::now();
    let op = UpdateCentrality { repo, model_id };
    let mut processor = BatchProcessor::new(config.centrality_batch_size, op)?;

    let counter = ObjectCounter::new();
    let objects = counter.handle();
    let mut connections = pin!(repo.group_by_skill_id(model_id).through(counter));

    let ticker = Ticker::new(
        progress,
        "centrality".to_string(),
        config.progress_interval,
    );
    log::info!("Computing degree centrality for model {model_id}");

    let result = async {
        while let Some(item) = connections.next().await {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            processor.add(item?).await?;
            ticker.tick(objects.load(Ordering::Relaxed), &processor.stats());
        }
        processor.flush().await
    }
    .await;
    ticker.finish();

    let stats = stats_so_far(&processor, 0);
    if let Err(e) = result {
        log_failure("Degree centrality", &e);
        return Err(RunFailure::new(stats, e));
    }

    Ok(RunSummary {
        kind: JobKind::Centrality,
        model_id: model_id.to_string(),
        collection: None,
        stats,
        objects_seen: objects.load(Ordering::Relaxed),
        batches: processor.batches(),
        elapsed: start.elapsed(),
    })
}
