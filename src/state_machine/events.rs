use serde::{Deserialize, Serialize};

/// Events that can trigger task state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Dispatch the task to the inference service
    Start,
    /// Mark task as completed with the generated text
    Complete(String),
    /// Mark task as failed with a human-readable error description
    Fail(String),
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl ToString) -> Self {
        Self::Fail(error.to_string())
    }

    /// Text that becomes the task result, if this event ends the task
    pub fn result_text(&self) -> Option<&str> {
        match self {
            Self::Start => None,
            Self::Complete(text) | Self::Fail(text) => Some(text),
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Fail(_))
    }
}
