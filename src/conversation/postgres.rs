//! Postgres-backed conversation store over the `conversations`, `messages`
//! and `logs` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{ConversationStore, ConversationTransaction};
use crate::error::{OrchestraError, OrchestraResult};
use crate::models::{ConversationId, MessageRole, StoredMessage};

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for StoredMessage {
    type Error = OrchestraError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role: MessageRole = row
            .role
            .parse()
            .map_err(|e: String| OrchestraError::storage(format!("message {}: {e}", row.id)))?;

        Ok(StoredMessage {
            id: row.id,
            conversation_id: row.conversation_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn begin(&self) -> OrchestraResult<Box<dyn ConversationTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgConversationTransaction { tx }))
    }

    #[instrument(skip(self))]
    async fn messages(&self, conversation_id: ConversationId) -> OrchestraResult<Vec<StoredMessage>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM conversations WHERE id = $1)")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(OrchestraError::not_found("conversation", conversation_id));
        }

        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = $1 ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredMessage::try_from).collect()
    }
}

/// Open database transaction; sqlx rolls it back when dropped uncommitted
pub struct PgConversationTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ConversationTransaction for PgConversationTransaction {
    async fn create_conversation(&mut self) -> OrchestraResult<ConversationId> {
        let id: Uuid = sqlx::query_scalar("INSERT INTO conversations (id) VALUES ($1) RETURNING id")
            .bind(Uuid::new_v4())
            .fetch_one(&mut *self.tx)
            .await?;
        debug!(conversation_id = %id, "Conversation created");
        Ok(id)
    }

    async fn conversation_exists(&mut self, conversation_id: ConversationId) -> OrchestraResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM conversations WHERE id = $1)")
                .bind(conversation_id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn insert_message(
        &mut self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> OrchestraResult<()> {
        sqlx::query("INSERT INTO messages (conversation_id, role, content) VALUES ($1, $2, $3)")
            .bind(conversation_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn record_diagnostic(&mut self, kind: &str, message: &str) -> OrchestraResult<()> {
        sqlx::query("INSERT INTO logs (kind, message) VALUES ($1, $2)")
            .bind(kind)
            .bind(message)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> OrchestraResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> OrchestraResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
