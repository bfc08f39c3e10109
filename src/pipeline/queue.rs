//! Bounded job queue
//!
//! A FIFO channel between the producer and the worker pool. `enqueue`
//! suspends while the queue is full, which is what keeps memory bounded when
//! rows arrive faster than pages can be fetched. Every receiver clone shares
//! one underlying channel, so each job goes to exactly one worker.

use crate::input::IngestJob;
use crate::pipeline::in_flight::{InFlight, JobTicket};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A job together with its outstanding-job ticket
#[derive(Debug)]
pub struct QueuedJob {
    pub job: IngestJob,
    pub ticket: JobTicket,
}

/// The queue was closed on the receiving side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub IngestJob);

/// Producer half of the job queue
#[derive(Debug)]
pub struct JobSender {
    tx: mpsc::Sender<QueuedJob>,
    in_flight: InFlight,
}

/// Consumer half of the job queue, cloned once per worker
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
}

/// Creates a bounded job queue
///
/// # Arguments
///
/// * `capacity` - Maximum number of buffered jobs (must be >= 1)
/// * `in_flight` - Counter that receives one registration per enqueued job
pub fn job_queue(capacity: usize, in_flight: InFlight) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        JobSender { tx, in_flight },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl JobSender {
    /// Enqueues a job, waiting for a free slot if the queue is full
    ///
    /// The job is registered as outstanding before it becomes visible to any
    /// worker, so its completion can never be observed ahead of its
    /// registration.
    pub async fn enqueue(&self, job: IngestJob) -> Result<(), QueueClosed> {
        let ticket = self.in_flight.register();
        self.tx
            .send(QueuedJob { job, ticket })
            .await
            // Dropping the returned ticket releases the registration
            .map_err(|mpsc::error::SendError(queued)| QueueClosed(queued.job))
    }

    /// Free slots left in the queue
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Closes the queue
    ///
    /// Workers keep draining buffered jobs and exit once the queue is empty.
    pub fn close(self) {
        drop(self.tx);
    }
}

impl JobReceiver {
    /// Takes the next job, or `None` once the queue is closed and drained
    pub async fn next(&self) -> Option<QueuedJob> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
