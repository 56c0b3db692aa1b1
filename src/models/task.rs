//! # Task Model
//!
//! A task is one deferred call to the inference service: a task type, a prompt
//! and an optional conversation history, plus the lifecycle fields the worker
//! maintains (`status`, `result`, `completed_at`).
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table:
//! - `id`: UUID primary key, generated at submission
//! - `owner_id`: submitting user
//! - `history`: JSONB array of `{role, content}` objects (nullable)
//! - `status`: `pending | in_progress | completed | failed`
//! - `updated_at`: touched on every persisted transition; the reconciliation
//!   sweep uses it to find stuck tasks
//!
//! ## History Decoding
//!
//! History is stored loosely so that producers can evolve its shape. Readers
//! decode it leniently: anything that does not parse as a list of
//! `HistoryEntry` is treated as absent rather than failing the task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::TaskStatus;

pub type TaskId = Uuid;

/// One prior turn supplied with a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: Uuid,
    pub task_type: String,
    pub prompt: String,
    /// Raw stored history; see [`Task::decoded_history`]
    pub history: Option<serde_json::Value>,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// When a queue entry for the task was last sent; `None` while unqueued
    #[serde(default)]
    pub enqueued_at: Option<DateTime<Utc>>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub owner_id: Uuid,
    pub task_type: String,
    pub prompt: String,
    pub history: Option<Vec<HistoryEntry>>,
}

impl Task {
    /// Build a fresh `pending` task with a newly generated id
    pub fn from_new(new_task: NewTask, now: DateTime<Utc>) -> Self {
        let history = new_task
            .history
            .map(|entries| serde_json::to_value(entries).unwrap_or(serde_json::Value::Null))
            .filter(|value| !value.is_null());

        Self {
            id: Uuid::new_v4(),
            owner_id: new_task.owner_id,
            task_type: new_task.task_type,
            prompt: new_task.prompt,
            history,
            status: TaskStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            enqueued_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when no queue entry can be relied on to deliver this task:
    /// it is mid-flight, or pending without a recorded queue entry
    pub fn awaits_recovery(&self) -> bool {
        match self.status {
            TaskStatus::InProgress => true,
            TaskStatus::Pending => self.enqueued_at.is_none(),
            TaskStatus::Completed | TaskStatus::Failed => false,
        }
    }

    /// Decode the stored history.
    ///
    /// `Ok(None)` when no history was stored, `Err` when something was stored
    /// but it is not a list of `{role, content}` pairs.
    pub fn decoded_history(&self) -> Result<Option<Vec<HistoryEntry>>, serde_json::Error> {
        match &self.history {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }

    /// Lenient variant of [`Task::decoded_history`]: undecodable history is absent
    pub fn history_or_none(&self) -> Option<Vec<HistoryEntry>> {
        self.decoded_history().ok().flatten()
    }
}

/// Full task projection returned by the query path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: TaskId,
    pub owner_id: Uuid,
    pub task_type: String,
    pub prompt: String,
    pub history: Option<Vec<HistoryEntry>>,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let history = task.history_or_none();
        Self {
            id: task.id,
            owner_id: task.owner_id,
            task_type: task.task_type,
            prompt: task.prompt,
            history,
            status: task.status,
            result: task.result,
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

/// Submission request accepted by `TaskService::submit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    pub owner_id: Uuid,
    pub task_type: String,
    pub prompt: String,
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedTask {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// False when the task was stored but could not be queued; the
    /// reconciliation sweep picks such tasks up later
    pub enqueued: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_task(history: Option<Vec<HistoryEntry>>) -> NewTask {
        NewTask {
            owner_id: Uuid::new_v4(),
            task_type: "translation".to_string(),
            prompt: "Bonjour".to_string(),
            history,
        }
    }

    #[test]
    fn test_new_task_starts_pending_without_completion() {
        let task = Task::from_new(new_task(None), Utc::now());
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let now = Utc::now();
        let a = Task::from_new(new_task(None), now);
        let b = Task::from_new(new_task(None), now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_history_decodes_when_well_formed() {
        let history = vec![HistoryEntry::new("user", "hi"), HistoryEntry::new("assistant", "hello")];
        let task = Task::from_new(new_task(Some(history.clone())), Utc::now());
        assert_eq!(task.decoded_history().unwrap(), Some(history));
    }

    #[test]
    fn test_malformed_history_is_treated_as_absent() {
        let mut task = Task::from_new(new_task(None), Utc::now());
        task.history = Some(json!({"role": "user"}));

        assert!(task.decoded_history().is_err());
        assert_eq!(task.history_or_none(), None);

        let response = TaskResponse::from(task);
        assert!(response.history.is_none());
    }
}
