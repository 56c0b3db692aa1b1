//! In-memory conversation store.
//!
//! Writes made through a transaction are staged privately and applied to the
//! shared state in one step on commit, so readers never observe half a turn.
//! Commit can be forced to fail to exercise the rollback path.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{ConversationStore, ConversationTransaction};
use crate::error::{OrchestraError, OrchestraResult};
use crate::models::{ConversationId, DiagnosticEntry, MessageRole, StoredMessage};

#[derive(Debug, Default)]
struct CommittedState {
    conversations: HashSet<ConversationId>,
    messages: Vec<StoredMessage>,
    diagnostics: Vec<DiagnosticEntry>,
    next_message_id: i64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<CommittedState>,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    shared: Arc<Shared>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail with a storage error
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn conversation_count(&self) -> usize {
        self.shared.state.lock().conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.shared.state.lock().messages.len()
    }

    /// Committed diagnostic rows
    pub fn diagnostics(&self) -> Vec<DiagnosticEntry> {
        self.shared.state.lock().diagnostics.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// Transactions that ended without committing, dropped ones included
    pub fn rollback_count(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn begin(&self) -> OrchestraResult<Box<dyn ConversationTransaction>> {
        Ok(Box::new(InMemoryConversationTransaction {
            shared: Arc::clone(&self.shared),
            new_conversations: Vec::new(),
            messages: Vec::new(),
            diagnostics: Vec::new(),
            finished: false,
        }))
    }

    async fn messages(&self, conversation_id: ConversationId) -> OrchestraResult<Vec<StoredMessage>> {
        let state = self.shared.state.lock();
        if !state.conversations.contains(&conversation_id) {
            return Err(OrchestraError::not_found("conversation", conversation_id));
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
pub struct InMemoryConversationTransaction {
    shared: Arc<Shared>,
    new_conversations: Vec<ConversationId>,
    messages: Vec<(ConversationId, MessageRole, String)>,
    diagnostics: Vec<(String, String)>,
    finished: bool,
}

impl InMemoryConversationTransaction {
    fn finish(&mut self, committed: bool) {
        self.finished = true;
        let counter = if committed {
            &self.shared.commits
        } else {
            &self.shared.rollbacks
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for InMemoryConversationTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(false);
        }
    }
}

#[async_trait]
impl ConversationTransaction for InMemoryConversationTransaction {
    async fn create_conversation(&mut self) -> OrchestraResult<ConversationId> {
        let id = Uuid::new_v4();
        self.new_conversations.push(id);
        Ok(id)
    }

    async fn conversation_exists(&mut self, conversation_id: ConversationId) -> OrchestraResult<bool> {
        Ok(self.new_conversations.contains(&conversation_id)
            || self.shared.state.lock().conversations.contains(&conversation_id))
    }

    async fn insert_message(
        &mut self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> OrchestraResult<()> {
        if !self.conversation_exists(conversation_id).await? {
            return Err(OrchestraError::storage(format!(
                "messages.conversation_id references unknown conversation {conversation_id}"
            )));
        }
        self.messages.push((conversation_id, role, content.to_string()));
        Ok(())
    }

    async fn record_diagnostic(&mut self, kind: &str, message: &str) -> OrchestraResult<()> {
        self.diagnostics.push((kind.to_string(), message.to_string()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> OrchestraResult<()> {
        let mut this = self;
        if this.shared.fail_commits.load(Ordering::SeqCst) {
            this.finish(false);
            return Err(OrchestraError::storage("commit failed"));
        }

        let now = Utc::now();
        {
            let mut state = this.shared.state.lock();
            state.conversations.extend(this.new_conversations.drain(..));
            for (conversation_id, role, content) in this.messages.drain(..) {
                state.next_message_id += 1;
                let id = state.next_message_id;
                state.messages.push(StoredMessage {
                    id,
                    conversation_id,
                    role,
                    content,
                    created_at: now,
                });
            }
            for (kind, message) in this.diagnostics.drain(..) {
                state.diagnostics.push(DiagnosticEntry {
                    kind,
                    message,
                    created_at: now,
                });
            }
        }

        this.finish(true);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> OrchestraResult<()> {
        let mut this = self;
        this.finish(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = InMemoryConversationStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.create_conversation().await.unwrap();
        tx.insert_message(id, MessageRole::User, "hi").await.unwrap();

        assert_eq!(store.message_count(), 0);
        drop(tx);

        assert_eq!(store.message_count(), 0);
        assert_eq!(store.conversation_count(), 0);
        assert_eq!(store.rollback_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes_in_order() {
        let store = InMemoryConversationStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.create_conversation().await.unwrap();
        tx.insert_message(id, MessageRole::User, "2+2?").await.unwrap();
        tx.insert_message(id, MessageRole::Assistant, "4").await.unwrap();
        tx.commit().await.unwrap();

        let messages = store.messages(id).await.unwrap();
        let log: Vec<_> = messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(log, vec![(MessageRole::User, "2+2?"), (MessageRole::Assistant, "4")]);
        assert!(messages[0].id < messages[1].id);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_discards_everything() {
        let store = InMemoryConversationStore::new();
        store.set_fail_commits(true);

        let mut tx = store.begin().await.unwrap();
        let id = tx.create_conversation().await.unwrap();
        tx.insert_message(id, MessageRole::User, "hi").await.unwrap();
        assert!(tx.commit().await.is_err());

        assert_eq!(store.conversation_count(), 0);
        assert_eq!(store.rollback_count(), 1);
        assert!(store.messages(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_message_for_unknown_conversation_is_rejected() {
        let store = InMemoryConversationStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_message(Uuid::new_v4(), MessageRole::User, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestraError::StorageError(_)));
    }
}
