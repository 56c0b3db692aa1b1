use thiserror::Error;

use super::states::TaskStatus;

/// Errors raised while applying a lifecycle event to a task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on event {event}")]
    InvalidTransition { from: TaskStatus, event: &'static str },

    #[error("Task is already in terminal state {state}")]
    AlreadyTerminal { state: TaskStatus },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
