//! # PostgreSQL Message Queue (pgmq)
//!
//! [`TaskQueue`] over a pgmq queue. Dequeue uses `pop`, which reads and
//! deletes the head message in one statement with `SKIP LOCKED`, so two
//! workers never receive the same entry. pgmq has no blocking read, so
//! dequeue polls every `poll_interval` until the timeout elapses.

use async_trait::async_trait;
use pgmq::PGMQueue;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::{TaskQueue, TaskQueueMessage};
use crate::config::QueueConfig;
use crate::error::OrchestraResult;
use crate::logging::log_queue_operation;
use crate::models::TaskId;

#[derive(Debug, Clone)]
pub struct PgmqTaskQueue {
    pgmq: PGMQueue,
    queue_name: String,
    poll_interval: Duration,
}

impl PgmqTaskQueue {
    /// Connect to pgmq using a connection string
    pub async fn connect(database_url: &str, config: &QueueConfig) -> OrchestraResult<Self> {
        info!(queue = %config.name, "🚀 Connecting to pgmq");
        let pgmq = PGMQueue::new(database_url.to_string()).await?;

        Ok(Self {
            pgmq,
            queue_name: config.name.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Build on an existing connection pool instead of opening a new one
    pub async fn with_pool(pool: PgPool, config: &QueueConfig) -> Self {
        info!(queue = %config.name, "🚀 Creating pgmq client with shared connection pool");
        let pgmq = PGMQueue::new_with_pool(pool).await;

        Self {
            pgmq,
            queue_name: config.name.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Create the queue if it doesn't exist
    pub async fn ensure_queue(&self) -> OrchestraResult<()> {
        self.pgmq.create(&self.queue_name).await?;
        info!(queue = %self.queue_name, "✅ Queue ready");
        Ok(())
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Pop one message, dropping payloads that are not task messages
    async fn pop_task_id(&self) -> OrchestraResult<Option<TaskId>> {
        let Some(message) = self
            .pgmq
            .pop::<serde_json::Value>(&self.queue_name)
            .await?
        else {
            return Ok(None);
        };

        match TaskQueueMessage::from_json(message.message) {
            Ok(decoded) => Ok(Some(decoded.task_id)),
            Err(e) => {
                warn!(
                    queue = %self.queue_name,
                    msg_id = message.msg_id,
                    error = %e,
                    "Dropping malformed queue message"
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl TaskQueue for PgmqTaskQueue {
    #[instrument(skip(self), fields(queue = %self.queue_name))]
    async fn enqueue(&self, task_id: TaskId) -> OrchestraResult<()> {
        let msg_id = self
            .pgmq
            .send(&self.queue_name, &TaskQueueMessage::new(task_id))
            .await?;
        log_queue_operation(
            "enqueue",
            &self.queue_name,
            Some(&task_id.to_string()),
            "sent",
            Some(&format!("msg_id={msg_id}")),
        );
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> OrchestraResult<Option<TaskId>> {
        // Overflowing durations mean "wait forever"
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if let Some(task_id) = self.pop_task_id().await? {
                log_queue_operation(
                    "dequeue",
                    &self.queue_name,
                    Some(&task_id.to_string()),
                    "received",
                    None,
                );
                return Ok(Some(task_id));
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }
}
