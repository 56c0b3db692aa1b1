//! # Orchestration
//!
//! The task lifecycle around the stores and the queue:
//!
//! - [`task_service`] - submission and query paths
//! - [`worker`] - the single-consumer dispatch loop
//! - [`reconciliation`] - the opt-in sweep that re-enqueues stuck tasks

pub mod reconciliation;
pub mod task_service;
pub mod worker;

pub use reconciliation::ReconciliationSweep;
pub use task_service::TaskService;
pub use worker::{IterationOutcome, TaskWorker, WorkerStats};
