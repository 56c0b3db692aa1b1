//! # Conversation Transaction Flow
//!
//! One chat turn persists the user's message, asks the inference service for a
//! reply and persists that reply, all inside a single database transaction.
//! Either both messages (and the conversation row, when new) commit together
//! or nothing does.
//!
//! ## Transaction Boundary
//!
//! [`ConversationStore::begin`] hands out a boxed [`ConversationTransaction`].
//! Only an explicit [`commit`](ConversationTransaction::commit) makes writes
//! visible; dropping the transaction on any other exit path rolls it back.
//!
//! The transaction stays open across the inference call. Slow replies keep a
//! connection checked out for up to the gateway timeout.

pub mod memory;
pub mod postgres;
pub mod service;

use async_trait::async_trait;

use crate::error::OrchestraResult;
use crate::models::{ConversationId, MessageRole, StoredMessage};

pub use memory::{InMemoryConversationStore, InMemoryConversationTransaction};
pub use postgres::{PgConversationStore, PgConversationTransaction};
pub use service::ConversationService;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> OrchestraResult<Box<dyn ConversationTransaction>>;

    /// Committed messages of a conversation in insertion order; `NotFound`
    /// for an unknown conversation
    async fn messages(&self, conversation_id: ConversationId) -> OrchestraResult<Vec<StoredMessage>>;
}

#[async_trait]
pub trait ConversationTransaction: Send {
    /// Insert a new conversation row and return its id
    async fn create_conversation(&mut self) -> OrchestraResult<ConversationId>;

    async fn conversation_exists(&mut self, conversation_id: ConversationId) -> OrchestraResult<bool>;

    async fn insert_message(
        &mut self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> OrchestraResult<()>;

    /// Write a diagnostic row; it shares the fate of the transaction
    async fn record_diagnostic(&mut self, kind: &str, message: &str) -> OrchestraResult<()>;

    async fn commit(self: Box<Self>) -> OrchestraResult<()>;

    async fn rollback(self: Box<Self>) -> OrchestraResult<()>;
}
