use chrono::{DateTime, Utc};

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::TaskStatus,
};
use crate::models::Task;

/// Transition table for the task lifecycle.
///
/// Applying an event mutates the in-memory task only; the worker persists the
/// result through the `TaskStore` right after each transition.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current: TaskStatus,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskStatus> {
        if current.is_terminal() {
            return Err(StateMachineError::AlreadyTerminal { state: current });
        }

        let target = match (current, event) {
            (TaskStatus::Pending, TaskEvent::Start) => TaskStatus::InProgress,
            // Redelivery of a task whose previous worker died mid-flight
            (TaskStatus::InProgress, TaskEvent::Start) => TaskStatus::InProgress,

            (TaskStatus::InProgress, TaskEvent::Complete(_)) => TaskStatus::Completed,
            (TaskStatus::InProgress, TaskEvent::Fail(_)) => TaskStatus::Failed,

            (from, event) => {
                return Err(StateMachineError::InvalidTransition {
                    from,
                    event: event.event_type(),
                })
            }
        };

        Ok(target)
    }

    /// Apply `event` to `task`, keeping `result` and `completed_at` consistent
    /// with the new status.
    pub fn transition(
        task: &mut Task,
        event: TaskEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<TaskStatus> {
        let target = Self::determine_target_state(task.status, &event)?;

        task.status = target;
        task.updated_at = now;
        if target.is_terminal() {
            task.result = event.result_text().map(str::to_owned);
            task.completed_at = Some(now);
        }

        Ok(target)
    }
}
