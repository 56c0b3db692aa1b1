//! # Conversation Service
//!
//! Runs one chat turn inside a [`ConversationTransaction`]:
//!
//! 1. begin a transaction
//! 2. create the conversation, or verify the given one exists
//! 3. insert the selected user content as a `user` message (when non-empty)
//! 4. call the inference service with the full message list
//! 5. insert the reply as an `assistant` message
//! 6. commit
//!
//! Any failure after step 1 rolls the whole turn back. Inference failures are
//! additionally recorded as a diagnostic row inside the doomed transaction
//! and surface to the caller as upstream errors.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{ConversationStore, ConversationTransaction};
use crate::config::GatewayConfig;
use crate::constants::{components, diagnostics};
use crate::error::{OrchestraError, OrchestraResult};
use crate::gateway::{call_with_timeout, GenerateRequest, InferenceGateway};
use crate::logging::{log_conversation_operation, log_error};
use crate::models::{
    ChatTurnRequest, ChatTurnResponse, ConversationId, MessageRole, StoredMessage,
};

pub struct ConversationService {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn InferenceGateway>,
    model: String,
    timeout: Duration,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn InferenceGateway>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }

    /// Run one chat turn; either both messages commit or nothing does
    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    pub async fn chat_turn(&self, request: ChatTurnRequest) -> OrchestraResult<ChatTurnResponse> {
        let requested = request.parsed_conversation_id()?;

        let mut tx = self.store.begin().await?;
        let outcome = self.run_turn(tx.as_mut(), requested, &request).await;

        match outcome {
            Ok(response) => {
                tx.commit().await?;
                log_conversation_operation(
                    "chat_turn",
                    Some(&response.conversation_id.to_string()),
                    "committed",
                    None,
                );
                Ok(response)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "Rollback failed; dropping transaction");
                }
                log_error(
                    components::CONVERSATION,
                    "chat_turn",
                    &e.to_string(),
                    Some("turn rolled back"),
                );
                Err(e)
            }
        }
    }

    async fn run_turn(
        &self,
        tx: &mut dyn ConversationTransaction,
        requested: Option<ConversationId>,
        request: &ChatTurnRequest,
    ) -> OrchestraResult<ChatTurnResponse> {
        let conversation_id = match requested {
            Some(id) => {
                if !tx.conversation_exists(id).await? {
                    return Err(OrchestraError::not_found("conversation", id));
                }
                id
            }
            None => {
                let id = tx.create_conversation().await?;
                debug!(conversation_id = %id, "Started new conversation");
                id
            }
        };

        if let Some(content) = request.user_content().filter(|c| !c.is_empty()) {
            tx.insert_message(conversation_id, MessageRole::User, content)
                .await?;
        }

        let generate = GenerateRequest {
            model: self.model.clone(),
            messages: request.messages.clone(),
        };
        let reply = match call_with_timeout(self.timeout, self.gateway.generate(&generate)).await {
            Ok(reply) => reply,
            Err(e) => {
                let kind = match e {
                    OrchestraError::GatewayBadResponse(_) => diagnostics::LLM_DECODE_ERROR,
                    _ => diagnostics::LLM_CALL_ERROR,
                };
                if let Err(log_failure) = tx.record_diagnostic(kind, &e.to_string()).await {
                    warn!(error = %log_failure, kind, "Failed to record diagnostic");
                }
                warn!(%conversation_id, kind, error = %e, "Inference call failed during chat turn");
                return Err(e);
            }
        };

        tx.insert_message(conversation_id, MessageRole::Assistant, &reply)
            .await?;

        info!(%conversation_id, reply_len = reply.len(), "Chat turn ready to commit");
        Ok(ChatTurnResponse {
            conversation_id,
            reply,
        })
    }

    /// Committed messages of a conversation, oldest first
    pub async fn history(&self, conversation_id: ConversationId) -> OrchestraResult<Vec<StoredMessage>> {
        self.store.messages(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::TaskInferenceRequest;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use uuid::Uuid;

    /// Records every call a transaction receives, including ones later rolled back
    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    struct JournalStore(Arc<Journal>);

    struct JournalTransaction(Arc<Journal>);

    #[async_trait]
    impl ConversationStore for JournalStore {
        async fn begin(&self) -> OrchestraResult<Box<dyn ConversationTransaction>> {
            self.0.calls.lock().push("begin".into());
            Ok(Box::new(JournalTransaction(Arc::clone(&self.0))))
        }

        async fn messages(&self, _id: ConversationId) -> OrchestraResult<Vec<StoredMessage>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ConversationTransaction for JournalTransaction {
        async fn create_conversation(&mut self) -> OrchestraResult<ConversationId> {
            self.0.calls.lock().push("create_conversation".into());
            Ok(Uuid::new_v4())
        }

        async fn conversation_exists(&mut self, _id: ConversationId) -> OrchestraResult<bool> {
            Ok(true)
        }

        async fn insert_message(
            &mut self,
            _id: ConversationId,
            role: MessageRole,
            content: &str,
        ) -> OrchestraResult<()> {
            self.0.calls.lock().push(format!("insert {role} {content}"));
            Ok(())
        }

        async fn record_diagnostic(&mut self, kind: &str, _message: &str) -> OrchestraResult<()> {
            self.0.calls.lock().push(format!("diagnostic {kind}"));
            Ok(())
        }

        async fn commit(self: Box<Self>) -> OrchestraResult<()> {
            self.0.calls.lock().push("commit".into());
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> OrchestraResult<()> {
            self.0.calls.lock().push("rollback".into());
            Ok(())
        }
    }

    struct FixedGateway(OrchestraResult<String>);

    #[async_trait]
    impl InferenceGateway for FixedGateway {
        async fn execute_task(&self, _request: &TaskInferenceRequest) -> OrchestraResult<String> {
            self.0.clone()
        }

        async fn generate(&self, _request: &GenerateRequest) -> OrchestraResult<String> {
            self.0.clone()
        }
    }

    async fn journal_for(reply: OrchestraResult<String>) -> Vec<String> {
        let journal = Arc::new(Journal::default());
        let service = ConversationService::new(
            Arc::new(JournalStore(Arc::clone(&journal))),
            Arc::new(FixedGateway(reply)),
            &GatewayConfig::default(),
        );
        let request = ChatTurnRequest::new(None, vec![crate::models::ChatMessage::user("hi")]);
        let _ = service.chat_turn(request).await;
        let calls = journal.calls.lock().clone();
        calls
    }

    #[tokio::test]
    async fn test_success_commits_after_both_inserts() {
        let calls = journal_for(Ok("hello".into())).await;
        assert_eq!(
            calls,
            vec![
                "begin",
                "create_conversation",
                "insert user hi",
                "insert assistant hello",
                "commit"
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_records_call_error_then_rolls_back() {
        let calls = journal_for(Err(OrchestraError::gateway_unavailable("refused"))).await;
        assert_eq!(
            calls,
            vec![
                "begin",
                "create_conversation",
                "insert user hi",
                "diagnostic llm_call_error",
                "rollback"
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_body_records_decode_error() {
        let calls = journal_for(Err(OrchestraError::gateway_bad_response("no content"))).await;
        assert!(calls.contains(&"diagnostic llm_decode_error".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("rollback"));
    }
}
