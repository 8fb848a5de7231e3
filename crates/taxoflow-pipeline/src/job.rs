//! Job state around a pipeline run

use std::future::Future;

use taxoflow_store::{JobKind, JobResult, JobStore, JobUpdate};

use crate::report::{RunFailure, RunSummary};

/// Mark `job_id` running, await `run`, then record how it ended.
///
/// A completed run raises the job's error flag when any row failed; a failed
/// run is recorded as `Failed` with its partial stats. If the final state
/// cannot be stored the run is reported as failed with that store error.
pub async fn track_job<J, F>(
    jobs: &J,
    job_id: &str,
    kind: JobKind,
    run: F,
) -> Result<RunSummary, RunFailure>
where
    J: JobStore,
    F: Future<Output = Result<RunSummary, RunFailure>>,
{
    jobs.update(job_id, JobUpdate::running()).await?;
    log::info!("Job {job_id} ({kind}) running");

    let outcome = run.await;
    let result = match &outcome {
        Ok(summary) => JobResult::completed(kind, summary.stats),
        Err(failure) => JobResult::failed(kind, failure.partial, failure.error.to_string()),
    };
    let update = JobUpdate::finished(result);
    let status = update.status;

    if let Err(e) = jobs.update(job_id, update).await {
        log::error!("Could not record final state of job {job_id}: {e}");
        return match outcome {
            Ok(summary) => Err(RunFailure::new(summary.stats, e)),
            Err(failure) => Err(failure),
        };
    }
    log::info!("Job {job_id} {status}");
    outcome
}
