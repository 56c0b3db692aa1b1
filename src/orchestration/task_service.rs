//! # Task Service
//!
//! Submission stores the task as `pending` and then pushes its id onto the
//! queue. When the queue keeps failing after the configured retries the task
//! stays stored with `enqueued = false` and no queue marker; the
//! reconciliation sweep picks it up once it goes stale.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::QueueConfig;
use crate::constants::components;
use crate::error::{OrchestraError, OrchestraResult};
use crate::logging::{log_error, log_task_operation};
use crate::messaging::TaskQueue;
use crate::models::{NewTask, SubmitTaskRequest, SubmittedTask, TaskId, TaskResponse};
use crate::store::TaskStore;

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn TaskQueue>,
    config: QueueConfig,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, queue: Arc<dyn TaskQueue>, config: QueueConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Persist a new task and queue it for the worker
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, task_type = %request.task_type))]
    pub async fn submit(&self, request: SubmitTaskRequest) -> OrchestraResult<SubmittedTask> {
        if request.task_type.trim().is_empty() {
            return Err(OrchestraError::validation("task_type must not be empty"));
        }

        let task = self
            .store
            .create(NewTask {
                owner_id: request.owner_id,
                task_type: request.task_type,
                prompt: request.prompt,
                history: request.history,
            })
            .await?;

        let enqueued = self.enqueue_with_retry(task.id).await;
        if enqueued {
            // Without the marker the sweep would treat the task as orphaned
            if let Err(e) = self.store.mark_enqueued(task.id, Utc::now()).await {
                warn!(task_id = %task.id, error = %e, "Failed to record queue entry");
            }
        }
        log_task_operation(
            "submit",
            Some(&task.id.to_string()),
            Some(&task.task_type),
            task.status.as_str(),
            (!enqueued).then_some("stored without queue entry"),
        );

        Ok(SubmittedTask {
            task_id: task.id,
            status: task.status,
            enqueued,
        })
    }

    /// Full projection of a stored task
    pub async fn get(&self, task_id: TaskId) -> OrchestraResult<TaskResponse> {
        Ok(self.store.get(task_id).await?.into())
    }

    async fn enqueue_with_retry(&self, task_id: TaskId) -> bool {
        let attempts = self.config.enqueue_retry_attempts.max(1);

        for attempt in 1..=attempts {
            match self.queue.enqueue(task_id).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(%task_id, attempt, "Task enqueued after retry");
                    }
                    return true;
                }
                Err(e) if attempt < attempts => {
                    let delay = self.config.enqueue_retry_delay(attempt);
                    warn!(
                        %task_id,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Enqueue failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    log_error(
                        components::TASK_SERVICE,
                        "enqueue",
                        &e.to_string(),
                        Some(&format!("task {task_id} left pending after {attempts} attempts")),
                    );
                }
            }
        }

        false
    }
}
