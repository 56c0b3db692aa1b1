//! # Messaging Module
//!
//! Durable FIFO of task ids between submission and the worker.
//!
//! Queue entries carry only the task id; the worker always reads task state
//! fresh from the [`TaskStore`](crate::store::TaskStore). Each entry is handed
//! to exactly one consumer attempt. An entry dequeued by a worker that then
//! crashes is gone from the queue; the reconciliation sweep re-enqueues the
//! task later.

pub mod memory_queue;
pub mod message;
pub mod pgmq_queue;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::OrchestraResult;
use crate::models::TaskId;

pub use memory_queue::InMemoryTaskQueue;
pub use message::TaskQueueMessage;
pub use pgmq_queue::PgmqTaskQueue;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append a task id to the tail; durable once this returns
    async fn enqueue(&self, task_id: TaskId) -> OrchestraResult<()>;

    /// Wait up to `timeout` for the next task id.
    ///
    /// `Ok(None)` means the wait elapsed with nothing to deliver.
    async fn dequeue(&self, timeout: Duration) -> OrchestraResult<Option<TaskId>>;
}
