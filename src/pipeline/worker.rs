//! Worker loop
//!
//! Each worker drains the shared queue until it is closed and empty, running
//! fetch, extract and persist for every job. Failures at any stage are
//! recorded and the worker moves on to its next job.

use crate::content::{ContentExtractor, ContentFetcher};
use crate::input::IngestJob;
use crate::pipeline::queue::{JobReceiver, QueuedJob};
use crate::pipeline::report::{FailureStage, JobOutcome, ReportCollector};
use crate::sink::ArticleSink;
use std::sync::Arc;

/// Capabilities shared by every worker of a run
pub(crate) struct WorkerContext {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub sink: Arc<dyn ArticleSink>,
    pub skip_empty_content: bool,
    pub report: Arc<ReportCollector>,
}

/// Runs one worker until the queue is closed and drained
///
/// Returns the number of jobs this worker processed.
pub(crate) async fn run_worker(id: usize, jobs: JobReceiver, ctx: Arc<WorkerContext>) -> u64 {
    let mut processed = 0u64;

    while let Some(QueuedJob { job, ticket }) = jobs.next().await {
        let outcome = process_job(&ctx, &job).await;

        match &outcome {
            JobOutcome::Persisted => {
                tracing::debug!(
                    "Worker {} persisted '{}' from {}",
                    id,
                    job.title,
                    job.source_url
                );
            }
            JobOutcome::Failed { stage, cause } => {
                tracing::warn!(
                    "Worker {}: {} failed for {} (row {:?}): {}",
                    id,
                    stage,
                    job.source_url,
                    job.row,
                    cause
                );
            }
        }

        ctx.report.record_outcome(&job, outcome);
        processed += 1;
        ticket.complete();
    }

    tracing::debug!("Worker {} exiting after {} jobs", id, processed);
    processed
}

/// Fetches, extracts and persists a single job
pub(crate) async fn process_job(ctx: &WorkerContext, job: &IngestJob) -> JobOutcome {
    let body = match ctx.fetcher.fetch(&job.source_url).await {
        Ok(body) => body,
        Err(e) => return JobOutcome::failed(FailureStage::Fetch, e),
    };

    let html = String::from_utf8_lossy(&body);
    let content = ctx.extractor.extract(&html);

    if content.is_empty() && ctx.skip_empty_content {
        return JobOutcome::failed(FailureStage::Extract, "no article content found");
    }

    match ctx.sink.persist(&job.title, &content) {
        Ok(()) => JobOutcome::Persisted,
        Err(e) => JobOutcome::failed(FailureStage::Persist, e),
    }
}
