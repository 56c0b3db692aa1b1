//! Postgres-backed task store over the `tasks` table.
//!
//! Queries are built at runtime with `sqlx::query_as`, so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::TaskStore;
use crate::error::{OrchestraError, OrchestraResult};
use crate::models::{NewTask, Task, TaskId};
use crate::state_machine::TaskStatus;

const TASK_COLUMNS: &str = "id, owner_id, task_type, prompt, history, status, result, \
                            created_at, updated_at, completed_at, enqueued_at";

/// Row shape of the `tasks` table
#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: Uuid,
    owner_id: Uuid,
    task_type: String,
    prompt: String,
    history: Option<serde_json::Value>,
    status: String,
    result: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    enqueued_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for Task {
    type Error = OrchestraError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row
            .status
            .parse()
            .map_err(|e: String| OrchestraError::storage(format!("task {}: {e}", row.id)))?;

        Ok(Task {
            id: row.id,
            owner_id: row.owner_id,
            task_type: row.task_type,
            prompt: row.prompt,
            history: row.history,
            status,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            enqueued_at: row.enqueued_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    #[instrument(skip(self, new_task), fields(task_type = %new_task.task_type))]
    async fn create(&self, new_task: NewTask) -> OrchestraResult<Task> {
        let task = Task::from_new(new_task, Utc::now());

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (id, owner_id, task_type, prompt, history, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.id)
        .bind(task.owner_id)
        .bind(&task.task_type)
        .bind(&task.prompt)
        .bind(&task.history)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(task_id = %row.id, "Task row inserted");
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: TaskId) -> OrchestraResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestraError::not_found("task", id))?;

        row.try_into()
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, status = %task.status))]
    async fn update(&self, task: &Task) -> OrchestraResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks
             SET status = $2, result = $3, completed_at = $4, updated_at = $5
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(&task.result)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tasks WHERE id = $1)")
            .bind(task.id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(OrchestraError::not_found("task", task.id));
        }

        debug!("Ignoring update of finished task");
        Ok(false)
    }

    #[instrument(skip(self))]
    async fn mark_enqueued(&self, id: TaskId, at: DateTime<Utc>) -> OrchestraResult<()> {
        let result = sqlx::query("UPDATE tasks SET enqueued_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestraError::not_found("task", id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn claim_stale(
        &self,
        id: TaskId,
        seen_updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestraResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks
             SET updated_at = $3
             WHERE id = $1 AND updated_at = $2 AND status IN ('pending', 'in_progress')",
        )
        .bind(id)
        .bind(seen_updated_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn find_stale(&self, older_than: DateTime<Utc>, limit: u32) -> OrchestraResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE updated_at < $1
               AND (status = 'in_progress' OR (status = 'pending' AND enqueued_at IS NULL))
             ORDER BY updated_at ASC
             LIMIT $2"
        ))
        .bind(older_than)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }
}
