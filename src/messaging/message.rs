//! # Queue Message Format
//!
//! Wire format of a queue entry: `{"task_id": "<uuid>"}`.

use serde::{Deserialize, Serialize};

use crate::models::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQueueMessage {
    pub task_id: TaskId,
}

impl TaskQueueMessage {
    pub fn new(task_id: TaskId) -> Self {
        Self { task_id }
    }

    /// Decode a raw queue payload
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
