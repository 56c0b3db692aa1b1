use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::TaskStore;
use crate::error::{OrchestraError, OrchestraResult};
use crate::models::{NewTask, Task, TaskId};

/// Non-durable task store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<TaskId, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task exactly as given, bypassing `create`
    pub fn insert(&self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, new_task: NewTask) -> OrchestraResult<Task> {
        let task = Task::from_new(new_task, Utc::now());
        self.tasks.insert(task.id, task.clone());
        debug!(task_id = %task.id, task_type = %task.task_type, "Task created in memory");
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> OrchestraResult<Task> {
        self.tasks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| OrchestraError::not_found("task", id))
    }

    async fn update(&self, task: &Task) -> OrchestraResult<bool> {
        // The entry guard holds the shard lock across the check and the write
        let mut entry = self
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| OrchestraError::not_found("task", task.id))?;

        let stored = entry.value_mut();
        if stored.is_terminal() {
            debug!(task_id = %task.id, stored = %stored.status, "Ignoring update of finished task");
            return Ok(false);
        }

        stored.status = task.status;
        stored.result = task.result.clone();
        stored.completed_at = task.completed_at;
        stored.updated_at = task.updated_at;
        Ok(true)
    }

    async fn mark_enqueued(&self, id: TaskId, at: DateTime<Utc>) -> OrchestraResult<()> {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| OrchestraError::not_found("task", id))?;
        entry.value_mut().enqueued_at = Some(at);
        Ok(())
    }

    async fn claim_stale(
        &self,
        id: TaskId,
        seen_updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestraResult<bool> {
        let Some(mut entry) = self.tasks.get_mut(&id) else {
            return Ok(false);
        };

        let stored = entry.value_mut();
        if stored.is_terminal() || stored.updated_at != seen_updated_at {
            return Ok(false);
        }
        stored.updated_at = now;
        Ok(true)
    }

    async fn find_stale(&self, older_than: DateTime<Utc>, limit: u32) -> OrchestraResult<Vec<Task>> {
        let mut stale: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.awaits_recovery() && entry.updated_at < older_than)
            .map(|entry| entry.value().clone())
            .collect();

        stale.sort_by_key(|task| task.updated_at);
        stale.truncate(limit as usize);
        Ok(stale)
    }
}
