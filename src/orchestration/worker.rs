//! # Task Worker
//!
//! Single logical consumer of the task queue. Each iteration:
//!
//! 1. waits up to `dequeue_timeout` for a task id
//! 2. loads the task fresh from the store (unknown ids are logged and dropped)
//! 3. skips tasks that are already terminal (duplicate delivery)
//! 4. moves the task to `in_progress` and persists it
//! 5. calls the inference service under the gateway timeout
//! 6. persists `completed` with the reply, or `failed` with the error text
//!
//! Storage and queue errors abandon the iteration and the loop carries on. A
//! task abandoned after step 4 stays `in_progress` until the reconciliation
//! sweep re-enqueues it.
//!
//! Duplicate queue entries can put two workers on the same task. The store
//! refuses to rewrite a terminal task, so whichever worker persists second
//! reports [`IterationOutcome::Skipped`] and its result is discarded.
//!
//! Shutdown is observed between iterations only; an in-flight dequeue or
//! inference call always runs to completion.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::OrchestraConfig;
use crate::constants::components;
use crate::error::OrchestraResult;
use crate::gateway::{call_with_timeout, InferenceGateway, TaskInferenceRequest};
use crate::logging::{log_error, log_task_operation};
use crate::messaging::TaskQueue;
use crate::models::TaskId;
use crate::state_machine::{TaskEvent, TaskStateMachine, TaskStatus};
use crate::store::TaskStore;

/// What a single loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Nothing arrived within the dequeue timeout
    Idle,
    Completed(TaskId),
    Failed(TaskId),
    /// Task was already terminal when fetched, or became terminal through
    /// another worker before this one persisted
    Skipped(TaskId),
    /// Task id not present in the store
    Missing(TaskId),
    /// Store error while processing; the task keeps its last persisted state
    Abandoned(TaskId),
    /// Queue error while waiting for work
    QueueUnavailable,
}

/// Counters accumulated by [`TaskWorker::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub idle: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub missing: u64,
    pub abandoned: u64,
    pub queue_errors: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: IterationOutcome) {
        let counter = match outcome {
            IterationOutcome::Idle => &mut self.idle,
            IterationOutcome::Completed(_) => &mut self.completed,
            IterationOutcome::Failed(_) => &mut self.failed,
            IterationOutcome::Skipped(_) => &mut self.skipped,
            IterationOutcome::Missing(_) => &mut self.missing,
            IterationOutcome::Abandoned(_) => &mut self.abandoned,
            IterationOutcome::QueueUnavailable => &mut self.queue_errors,
        };
        *counter += 1;
    }

    /// Tasks that reached a terminal state in this run
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }
}

pub struct TaskWorker {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn TaskQueue>,
    gateway: Arc<dyn InferenceGateway>,
    dequeue_timeout: Duration,
    gateway_timeout: Duration,
    idle_backoff: Duration,
}

impl TaskWorker {
    pub fn new(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn TaskQueue>,
        gateway: Arc<dyn InferenceGateway>,
        config: &OrchestraConfig,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            dequeue_timeout: config.queue.dequeue_timeout(),
            gateway_timeout: config.gateway.timeout(),
            idle_backoff: config.worker.idle_backoff(),
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> WorkerStats {
        info!(
            dequeue_timeout_ms = self.dequeue_timeout.as_millis() as u64,
            gateway_timeout_s = self.gateway_timeout.as_secs(),
            "🚀 Task worker started"
        );
        let mut stats = WorkerStats::default();

        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }

            let outcome = self.run_once().await;
            stats.record(outcome);

            if outcome == IterationOutcome::QueueUnavailable {
                tokio::select! {
                    _ = tokio::time::sleep(self.idle_backoff) => {},
                    _ = shutdown.changed() => {},
                }
            }
        }

        info!(?stats, "🛑 Task worker stopped");
        stats
    }

    /// One dequeue-and-process iteration; never returns an error
    pub async fn run_once(&self) -> IterationOutcome {
        let task_id = match self.queue.dequeue(self.dequeue_timeout).await {
            Ok(Some(task_id)) => task_id,
            Ok(None) => return IterationOutcome::Idle,
            Err(e) => {
                log_error(components::QUEUE, "dequeue", &e.to_string(), None);
                return IterationOutcome::QueueUnavailable;
            }
        };

        match self.process_task(task_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log_error(
                    components::TASK_WORKER,
                    "process_task",
                    &e.to_string(),
                    Some(&format!("task {task_id} abandoned")),
                );
                IterationOutcome::Abandoned(task_id)
            }
        }
    }

    /// Drive one task from its stored state to a terminal state
    #[instrument(skip(self))]
    pub async fn process_task(&self, task_id: TaskId) -> OrchestraResult<IterationOutcome> {
        let mut task = match self.store.get(task_id).await {
            Ok(task) => task,
            Err(e) if e.is_not_found() => {
                warn!(%task_id, "Dequeued task not found; dropping");
                return Ok(IterationOutcome::Missing(task_id));
            }
            Err(e) => return Err(e),
        };

        if task.is_terminal() {
            info!(%task_id, status = %task.status, "Task already finished; skipping duplicate delivery");
            return Ok(IterationOutcome::Skipped(task_id));
        }

        TaskStateMachine::transition(&mut task, TaskEvent::Start, Utc::now())?;
        if !self.store.update(&task).await? {
            info!(%task_id, "Task finished elsewhere before start; skipping");
            return Ok(IterationOutcome::Skipped(task_id));
        }
        debug!(%task_id, "Task marked in_progress");

        let history = task.decoded_history().unwrap_or_else(|e| {
            warn!(%task_id, error = %e, "Stored history is malformed; sending without history");
            None
        });
        let request = TaskInferenceRequest {
            task_type: task.task_type.clone(),
            prompt: task.prompt.clone(),
            history,
        };

        let event = match call_with_timeout(self.gateway_timeout, self.gateway.execute_task(&request)).await {
            Ok(result) => TaskEvent::Complete(result),
            Err(e) => {
                warn!(%task_id, error = %e, "Inference call failed");
                TaskEvent::fail_with_error(&e)
            }
        };

        let status = TaskStateMachine::transition(&mut task, event, Utc::now())?;
        if !self.store.update(&task).await? {
            warn!(%task_id, discarded = %status, "Task finished elsewhere during inference; discarding result");
            return Ok(IterationOutcome::Skipped(task_id));
        }

        log_task_operation(
            "execute",
            Some(&task_id.to_string()),
            Some(&task.task_type),
            status.as_str(),
            None,
        );

        Ok(if status == TaskStatus::Completed {
            IterationOutcome::Completed(task_id)
        } else {
            IterationOutcome::Failed(task_id)
        })
    }
}
