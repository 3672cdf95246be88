// src/store/messages.rs

use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{Citation, Message, Role, StoreError, StoreResult, new_id, now_millis};
use crate::events::{ChangeEvent, EventHub};

const COLUMNS: &str = "id, conversation_id, role, content, citations, created_at";

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    citations: Option<String>,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(r: MessageRow) -> Result<Self, Self::Error> {
        let citations = r
            .citations
            .as_deref()
            .map(serde_json::from_str::<Vec<Citation>>)
            .transpose()?;

        Ok(Message {
            id: r.id,
            conversation_id: r.conversation_id,
            role: r.role.parse().unwrap_or(Role::User),
            content: r.content,
            citations,
            created_at: r.created_at,
        })
    }
}

fn encode_citations(citations: Option<&[Citation]>) -> StoreResult<Option<String>> {
    Ok(citations.map(serde_json::to_string).transpose()?)
}

#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
    events: EventHub,
}

impl MessageStore {
    pub fn new(pool: SqlitePool, events: EventHub) -> Self {
        Self { pool, events }
    }

    /// Messages of a conversation, oldest first
    pub async fn list(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!("SELECT {COLUMNS} FROM messages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Message::try_from).transpose()
    }

    pub async fn add_user_message(&self, conversation_id: &str, content: &str) -> StoreResult<Message> {
        self.append(conversation_id, Role::User, content, None).await
    }

    pub async fn add_assistant_message(
        &self,
        conversation_id: &str,
        content: &str,
        citations: Option<Vec<Citation>>,
    ) -> StoreResult<Message> {
        self.append(conversation_id, Role::Assistant, content, citations).await
    }

    /// Overwrite the content of a message, and its citations when given.
    /// Used while an assistant reply is still streaming in.
    pub async fn update_message(
        &self,
        id: &str,
        content: &str,
        citations: Option<Vec<Citation>>,
    ) -> StoreResult<Message> {
        let encoded = encode_citations(citations.as_deref())?;

        let result = sqlx::query(
            "UPDATE messages SET content = ?, citations = COALESCE(?, citations) WHERE id = ?",
        )
        .bind(content)
        .bind(encoded)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let message = self.get(id).await?.ok_or(StoreError::NotFound)?;
        debug!("Updated message {} ({} chars)", id, message.content.len());
        self.events.publish(ChangeEvent::MessageUpdated { message: message.clone() });
        Ok(message)
    }

    pub async fn count(&self, conversation_id: &str) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Remove the most recent message if it is an assistant message.
    /// Returns its id, or `None` when the conversation ends on a user
    /// message (or is empty).
    pub async fn delete_last_assistant(&self, conversation_id: &str) -> StoreResult<Option<String>> {
        let mut tx = self.pool.begin().await?;

        let last: Option<(String, String)> = sqlx::query_as(
            "SELECT id, role FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
        )
        .bind(conversation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id, role)) = last else {
            return Ok(None);
        };
        if role != Role::Assistant.as_str() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted last assistant message {} in {}", id, conversation_id);
        self.events.publish(ChangeEvent::MessageDeleted {
            conversation_id: conversation_id.to_string(),
            message_id: id.clone(),
        });
        Ok(Some(id))
    }

    /// Remove one message by id. Returns false when it did not exist.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let deleted: Option<(String,)> =
            sqlx::query_as("DELETE FROM messages WHERE id = ? RETURNING conversation_id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((conversation_id,)) = deleted else {
            return Ok(false);
        };

        debug!("Deleted message {} in {}", id, conversation_id);
        self.events.publish(ChangeEvent::MessageDeleted {
            conversation_id,
            message_id: id.to_string(),
        });
        Ok(true)
    }

    /// Insert a message and touch the parent conversation in one transaction
    async fn append(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        citations: Option<Vec<Citation>>,
    ) -> StoreResult<Message> {
        let encoded = encode_citations(citations.as_deref())?;
        let now = now_millis();
        let message = Message {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            citations,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let touched =
            sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ? AND is_deleted = 0")
                .bind(now)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, citations, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(&message.content)
        .bind(encoded)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Appended {} message {} to {}", role, message.id, conversation_id);
        self.events.publish(ChangeEvent::MessageAdded { message: message.clone() });
        Ok(message)
    }
}
