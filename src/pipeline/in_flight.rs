//! Outstanding-job counter
//!
//! A wait-group: the producer takes a [`JobTicket`] for every job at the
//! moment it is enqueued, and the ticket is released exactly once when the
//! worker finishes with the job. [`InFlight::wait_idle`] resolves once no
//! tickets remain. Only explicit [`JobTicket::complete`] calls count as
//! completion signals.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    outstanding: AtomicUsize,
    completed: AtomicU64,
    notify: Notify,
}

/// Shared handle to the outstanding-job counter
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: Arc<Inner>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one outstanding job
    pub fn register(&self) -> JobTicket {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        JobTicket {
            inner: Some(self.inner.clone()),
        }
    }

    /// Jobs registered but not yet completed
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Completion signals received so far
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Waits until every registered job has completed
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a release in between is not missed
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Proof that one job is outstanding
///
/// Dropping the ticket without completing it still releases the
/// registration, so a job that is lost (for example because a worker
/// panicked) can never wedge the coordinator.
#[derive(Debug)]
pub struct JobTicket {
    inner: Option<Arc<Inner>>,
}

impl JobTicket {
    /// Signals that the job finished processing
    pub fn complete(mut self) {
        self.release(true);
    }

    fn release(&mut self, completed: bool) {
        if let Some(inner) = self.inner.take() {
            if completed {
                inner.completed.fetch_add(1, Ordering::AcqRel);
            }
            if inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.notify.notify_waiters();
            }
        }
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.release(false);
    }
}
