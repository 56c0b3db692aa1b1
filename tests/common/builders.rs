#![allow(dead_code)]

use std::sync::Arc;
use uuid::Uuid;

use llm_orchestra::config::OrchestraConfig;
use llm_orchestra::models::{ChatMessage, ChatTurnRequest, HistoryEntry, SubmitTaskRequest};

/// Configuration tuned for fast tests: short dequeue waits, no backoff
pub fn fast_config() -> OrchestraConfig {
    let mut config = OrchestraConfig::default();
    config.queue.dequeue_timeout_ms = 20;
    config.queue.poll_interval_ms = 5;
    config.queue.enqueue_retry_base_delay_ms = 1;
    config.worker.idle_backoff_ms = 5;
    config.gateway.timeout_seconds = 5;
    config.reconciliation.stale_after_seconds = 30;
    config
}

/// Builder for task submissions
pub struct SubmitTaskBuilder {
    owner_id: Uuid,
    task_type: String,
    prompt: String,
    history: Option<Vec<HistoryEntry>>,
}

impl SubmitTaskBuilder {
    pub fn new() -> Self {
        Self {
            owner_id: Uuid::new_v4(),
            task_type: "summarization".to_string(),
            prompt: "Summarize the meeting notes".to_string(),
            history: None,
        }
    }

    pub fn with_task_type(mut self, task_type: &str) -> Self {
        self.task_type = task_type.to_string();
        self
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }

    pub fn with_history(mut self, history: &[(&str, &str)]) -> Self {
        self.history = Some(
            history
                .iter()
                .map(|(role, content)| HistoryEntry::new(*role, *content))
                .collect(),
        );
        self
    }

    pub fn build(self) -> SubmitTaskRequest {
        SubmitTaskRequest {
            owner_id: self.owner_id,
            task_type: self.task_type,
            prompt: self.prompt,
            history: self.history,
        }
    }
}

impl Default for SubmitTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat turn request from `(role, content)` pairs
pub fn chat_request(conversation_id: Option<&str>, messages: &[(&str, &str)]) -> ChatTurnRequest {
    ChatTurnRequest::new(
        conversation_id.map(str::to_string),
        messages
            .iter()
            .map(|(role, content)| ChatMessage::new(*role, *content))
            .collect(),
    )
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
