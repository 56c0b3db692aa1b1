use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::TaskQueue;
use crate::error::OrchestraResult;
use crate::models::TaskId;

/// Process-local FIFO with blocking dequeue. Not durable.
#[derive(Debug, Default)]
pub struct InMemoryTaskQueue {
    entries: Mutex<VecDeque<TaskId>>,
    available: Notify,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Snapshot of queued ids, head first
    pub async fn snapshot(&self) -> Vec<TaskId> {
        self.entries.lock().await.iter().copied().collect()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task_id: TaskId) -> OrchestraResult<()> {
        self.entries.lock().await.push_back(task_id);
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> OrchestraResult<Option<TaskId>> {
        // Overflowing durations mean "wait forever"
        let deadline = Instant::now().checked_add(timeout);

        loop {
            // Register interest before checking so a concurrent enqueue is not missed
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task_id) = self.entries.lock().await.pop_front() {
                return Ok(Some(task_id));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(self.entries.lock().await.pop_front());
                    }
                }
                None => notified.await,
            }
        }
    }
}
