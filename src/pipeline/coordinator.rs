//! Pipeline coordinator - main ingestion orchestration logic
//!
//! This module ties the pieces of a run together:
//! - Validating the input header before anything else happens
//! - Starting the fixed worker pool ahead of the producer
//! - Streaming rows into the bounded queue
//! - Closing the queue and waiting for every job to drain
//! - Deciding the run's terminal state

use crate::config::{Config, PipelineConfig};
use crate::content::{
    ContentExtractor, ContentFetcher, FetchSettings, HttpFetcher, SelectorExtractor,
};
use crate::input::{extract_job, ColumnLayout, RowReader};
use crate::pipeline::in_flight::InFlight;
use crate::pipeline::queue::{job_queue, JobSender, QueueClosed};
use crate::pipeline::report::{ReportCollector, RunReport};
use crate::pipeline::state::{RunState, RunStateMachine};
use crate::pipeline::worker::{run_worker, WorkerContext};
use crate::sink::ArticleSink;
use crate::{ConfigError, IngestError};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sizing and behavior of one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Capacity of the bounded job queue
    pub queue_capacity: usize,

    /// Number of workers started per run
    pub worker_count: usize,

    /// Fail jobs whose extracted text is empty instead of persisting them
    pub skip_empty_content: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            worker_count: config.worker_count,
            skip_empty_content: config.skip_empty_content,
        }
    }

    /// Rejects sizes that could never complete a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Validation(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bulk ingestion pipeline
///
/// Holds the injected capabilities; every call to [`Pipeline::run`] creates
/// its own queue, worker pool and counters, so one pipeline can serve many
/// runs.
pub struct Pipeline {
    settings: PipelineSettings,
    fetcher: Arc<dyn ContentFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    sink: Arc<dyn ArticleSink>,
}

impl Pipeline {
    /// Creates a pipeline from explicit capabilities
    ///
    /// Fails with `IngestError::Config` if the settings have no workers or a
    /// zero-capacity queue.
    pub fn new(
        settings: PipelineSettings,
        fetcher: Arc<dyn ContentFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        sink: Arc<dyn ArticleSink>,
    ) -> Result<Self, IngestError> {
        settings.validate()?;
        Ok(Self {
            settings,
            fetcher,
            extractor,
            sink,
        })
    }

    /// Creates a pipeline with the HTTP fetcher and selector extractor
    ///
    /// # Arguments
    ///
    /// * `config` - The ingestion configuration
    /// * `sink` - Where extracted articles are persisted
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Pipeline ready to run
    /// * `Err(IngestError)` - The HTTP client or selector could not be built
    pub fn from_config(config: &Config, sink: Arc<dyn ArticleSink>) -> Result<Self, IngestError> {
        let fetch_settings = FetchSettings::from_config(&config.user_agent, &config.pipeline);
        let fetcher = HttpFetcher::new(&fetch_settings)?;
        let extractor = SelectorExtractor::from_config(&config.extractor)?;

        Self::new(
            PipelineSettings::from_config(&config.pipeline),
            Arc::new(fetcher),
            Arc::new(extractor),
            sink,
        )
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs the pipeline over one input to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run reached `Done`; individual jobs may still have failed
    /// * `Err(IngestError::MalformedInput)` - Header rejected, nothing processed
    /// * `Err(IngestError::Aborted)` - Input failed mid-read or a worker died; carries
    ///   the report of the jobs that were drained before giving up
    ///
    /// # Example
    ///
    /// ```no_run
    /// use article_ingest::config::load_config;
    /// use article_ingest::sink::SinkError;
    /// use article_ingest::Pipeline;
    /// use std::path::Path;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("ingest.toml"))?;
    /// let sink = |title: &str, content: &str| -> Result<(), SinkError> {
    ///     println!("{}: {} chars", title, content.len());
    ///     Ok(())
    /// };
    /// let pipeline = Pipeline::from_config(&config, Arc::new(sink))?;
    /// let report = pipeline.run(std::fs::File::open("articles.csv")?).await?;
    /// println!("{} persisted, {} failed", report.persisted, report.failed());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<R: Read>(&self, input: R) -> Result<RunReport, IngestError> {
        self.run_until_cancelled(input, CancellationToken::new())
            .await
    }

    /// Runs the pipeline, stopping input early if `cancel` fires
    ///
    /// Cancellation stops the producer only. Jobs already enqueued are still
    /// processed and drained, and the run ends in `Done` with
    /// `RunReport::cancelled` set.
    pub async fn run_until_cancelled<R: Read>(
        &self,
        input: R,
        cancel: CancellationToken,
    ) -> Result<RunReport, IngestError> {
        let started = Instant::now();
        let mut state = RunStateMachine::new();

        let rows = match RowReader::new(input) {
            Ok(rows) => rows,
            Err(e) => {
                state.transition(RunState::Aborted)?;
                tracing::error!("Rejecting input: {}", e);
                return Err(e);
            }
        };
        state.transition(RunState::HeaderValidated)?;
        let layout = rows.layout();

        let in_flight = InFlight::new();
        let report = Arc::new(ReportCollector::new());
        let (sender, receiver) = job_queue(self.settings.queue_capacity, in_flight.clone());

        // Workers first, so no job is ever enqueued without a consumer
        let ctx = Arc::new(WorkerContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            sink: self.sink.clone(),
            skip_empty_content: self.settings.skip_empty_content,
            report: report.clone(),
        });
        let workers: Vec<JoinHandle<u64>> = (0..self.settings.worker_count)
            .map(|id| tokio::spawn(run_worker(id, receiver.clone(), ctx.clone())))
            .collect();
        drop(receiver);
        state.transition(RunState::Streaming)?;

        tracing::info!(
            "Started {} workers (queue capacity {})",
            self.settings.worker_count,
            self.settings.queue_capacity
        );

        let produced = produce(rows, layout, &sender, &report, &cancel).await;

        sender.close();
        state.transition(RunState::Draining)?;
        tracing::debug!(
            "Input finished, draining {} outstanding jobs",
            in_flight.outstanding()
        );

        in_flight.wait_idle().await;
        let joined = join_workers(workers).await;

        let failure = produced.err().or(joined.err());
        let final_state = if failure.is_some() {
            RunState::Aborted
        } else {
            RunState::Done
        };
        state.transition(final_state)?;

        let report = report.finish(final_state, in_flight.completed(), started.elapsed());

        match failure {
            Some(e) => {
                tracing::error!(
                    "Run aborted after {} jobs ({} persisted, {} failed): {}",
                    report.jobs_completed,
                    report.persisted,
                    report.failed(),
                    e
                );
                Err(IngestError::Aborted {
                    cause: Box::new(e),
                    report: Box::new(report),
                })
            }
            None => {
                if !report.is_drained() {
                    tracing::warn!(
                        "{} jobs enqueued but only {} completed",
                        report.jobs_enqueued,
                        report.jobs_completed
                    );
                }
                tracing::info!(
                    "Run complete in {:?}: {} rows, {} skipped, {} persisted, {} failed{}",
                    report.elapsed,
                    report.rows_read,
                    report.rows_skipped,
                    report.persisted,
                    report.failed(),
                    if report.cancelled { " (cancelled)" } else { "" }
                );
                Ok(report)
            }
        }
    }
}

/// Streams rows into the queue until input ends, fails, or is cancelled
async fn produce<R: Read>(
    rows: RowReader<R>,
    layout: ColumnLayout,
    sender: &JobSender,
    report: &ReportCollector,
    cancel: &CancellationToken,
) -> Result<(), IngestError> {
    for raw in rows {
        if cancel.is_cancelled() {
            tracing::info!("Cancellation requested, no further rows will be enqueued");
            report.mark_cancelled();
            break;
        }

        let raw = raw?;
        report.record_row_read();

        let job = match extract_job(&raw, &layout) {
            Ok(job) => job,
            Err(skipped) => {
                tracing::warn!("{}", skipped);
                report.record_skip();
                continue;
            }
        };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("Cancellation requested while waiting for a queue slot");
                report.mark_cancelled();
                break;
            }

            sent = sender.enqueue(job) => match sent {
                Ok(()) => report.record_enqueued(),
                Err(QueueClosed(job)) => {
                    return Err(IngestError::WorkerPanicked(format!(
                        "no workers left to receive job for {}",
                        job.source_url
                    )));
                }
            },
        }
    }

    Ok(())
}

/// Waits for every worker task to exit
async fn join_workers(workers: Vec<JoinHandle<u64>>) -> Result<(), IngestError> {
    let mut first_error = None;
    let mut processed = 0u64;

    for worker in workers {
        match worker.await {
            Ok(count) => processed += count,
            Err(e) => {
                tracing::error!("Worker task failed: {}", e);
                first_error.get_or_insert_with(|| IngestError::WorkerPanicked(e.to_string()));
            }
        }
    }

    tracing::debug!("All workers exited after processing {} jobs", processed);
    first_error.map_or(Ok(()), Err)
}
