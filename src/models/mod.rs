//! # Models
//!
//! Data types for tasks and conversations. Persistence lives behind the
//! `TaskStore` and `ConversationStore` traits; these types carry no database
//! handles of their own.

pub mod conversation;
pub mod task;

pub use conversation::{
    ChatMessage, ChatTurnRequest, ChatTurnResponse, ConversationId, DiagnosticEntry, MessageRole,
    StoredMessage,
};
pub use task::{
    HistoryEntry, NewTask, SubmitTaskRequest, SubmittedTask, Task, TaskId, TaskResponse,
};
