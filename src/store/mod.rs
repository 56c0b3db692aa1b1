//! # Task Store
//!
//! Durable record of task entities. The worker and the submission path only
//! see the [`TaskStore`] trait; [`PgTaskStore`] backs it with the `tasks`
//! table and [`InMemoryTaskStore`] with a concurrent map for tests and local
//! runs.
//!
//! A terminal task is final: `update` on a `completed` or `failed` task
//! writes nothing and reports `false`, so a worker holding a duplicate queue
//! entry cannot overwrite another worker's result. Between non-terminal
//! states the later write wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OrchestraResult;
use crate::models::{NewTask, Task, TaskId};

pub use memory::InMemoryTaskStore;
pub use postgres::PgTaskStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new `pending` task with a freshly generated id
    async fn create(&self, new_task: NewTask) -> OrchestraResult<Task>;

    /// Fetch a task; `NotFound` when absent
    async fn get(&self, id: TaskId) -> OrchestraResult<Task>;

    /// Replace the mutable fields (`status`, `result`, `completed_at`, `updated_at`).
    ///
    /// Returns `false` without writing when the stored task is already
    /// terminal; `NotFound` when absent.
    async fn update(&self, task: &Task) -> OrchestraResult<bool>;

    /// Record that a queue entry for the task was sent at `at`
    async fn mark_enqueued(&self, id: TaskId, at: DateTime<Utc>) -> OrchestraResult<()>;

    /// Move `updated_at` to `now` if it still equals `seen_updated_at` and the
    /// task is not terminal. Returns whether the touch was applied.
    async fn claim_stale(
        &self,
        id: TaskId,
        seen_updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestraResult<bool>;

    /// Tasks that look abandoned, oldest first: `in_progress` tasks and
    /// `pending` tasks without a recorded queue entry, last touched before
    /// `older_than`
    async fn find_stale(&self, older_than: DateTime<Utc>, limit: u32) -> OrchestraResult<Vec<Task>>;
}
