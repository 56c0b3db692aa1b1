// State machine module for the task lifecycle
//
// Tasks move pending -> in_progress -> {completed | failed}. The transition
// table lives in `TaskStateMachine`; persistence is the caller's job.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use states::TaskStatus;
pub use task_state_machine::TaskStateMachine;
