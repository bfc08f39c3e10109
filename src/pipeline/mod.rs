//! Pipeline module: bounded queue, worker pool and run coordination
//!
//! This module contains the concurrent core of an ingestion run:
//! - A bounded job queue providing backpressure (`queue`)
//! - An outstanding-job counter the coordinator drains on (`in_flight`)
//! - The fixed worker pool loop (`worker`)
//! - The run state machine (`state`)
//! - Structured per-run results (`report`)
//! - Overall orchestration (`coordinator`)

mod coordinator;
mod in_flight;
mod queue;
mod report;
mod state;
mod worker;

pub use coordinator::{Pipeline, PipelineSettings};
pub use in_flight::{InFlight, JobTicket};
pub use queue::{job_queue, JobReceiver, JobSender, QueueClosed, QueuedJob};
pub use report::{FailureStage, JobFailure, JobOutcome, RunReport};
pub use state::{RunState, RunStateMachine};
