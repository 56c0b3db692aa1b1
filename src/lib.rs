#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # LLM Orchestra Core
//!
//! Durable dispatch of deferred inference tasks and transactional chat turns
//! over a slow, unreliable external text-generation service.
//!
//! ## Overview
//!
//! Two flows share one inference gateway:
//!
//! - **Tasks**: submission stores a `pending` task and queues its id. A
//!   single-consumer [`TaskWorker`](orchestration::TaskWorker) dequeues ids,
//!   moves tasks through `pending → in_progress → completed | failed` and
//!   records either the generated text or the error description.
//! - **Chat turns**: [`ConversationService`](conversation::ConversationService)
//!   persists the user's message, calls the service and persists the reply in
//!   one database transaction. A failed call leaves no trace of the turn.
//!
//! ## Module Organization
//!
//! - [`models`] - tasks, conversations and their request/response shapes
//! - [`state_machine`] - task lifecycle transitions
//! - [`store`] - the `TaskStore` trait with Postgres and in-memory backends
//! - [`messaging`] - the `TaskQueue` trait with pgmq and in-memory backends
//! - [`gateway`] - the `InferenceGateway` trait and its HTTP client
//! - [`conversation`] - the transactional chat turn
//! - [`orchestration`] - submission, the worker loop and the reconciliation sweep
//! - [`config`] - layered configuration loading
//! - [`database`] - connection pool and migrations
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_orchestra::config::OrchestraConfig;
//! use llm_orchestra::gateway::HttpInferenceGateway;
//! use llm_orchestra::messaging::InMemoryTaskQueue;
//! use llm_orchestra::orchestration::{TaskService, TaskWorker};
//! use llm_orchestra::store::InMemoryTaskStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestraConfig::default();
//! let store = Arc::new(InMemoryTaskStore::new());
//! let queue = Arc::new(InMemoryTaskQueue::new());
//! let gateway = Arc::new(HttpInferenceGateway::new(&config.gateway)?);
//!
//! let service = TaskService::new(store.clone(), queue.clone(), config.queue.clone());
//! let worker = TaskWorker::new(store, queue, gateway, &config);
//! let outcome = worker.run_once().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod conversation;
pub mod database;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod store;

pub use config::{ConfigManager, OrchestraConfig};
pub use conversation::{ConversationService, ConversationStore, ConversationTransaction};
pub use error::{OrchestraError, OrchestraResult};
pub use gateway::InferenceGateway;
pub use messaging::TaskQueue;
pub use models::{ChatMessage, ChatTurnRequest, ChatTurnResponse, Task, TaskId};
pub use orchestration::{ReconciliationSweep, TaskService, TaskWorker};
pub use state_machine::{TaskEvent, TaskStatus};
pub use store::TaskStore;
