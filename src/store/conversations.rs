// src/store/conversations.rs

use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{Conversation, DEFAULT_TITLE, Mode, StoreError, StoreResult, new_id, now_millis};
use crate::events::{ChangeEvent, EventHub};

const SHARE_TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SHARE_TOKEN_LEN: usize = 12;
const SHARE_TOKEN_ATTEMPTS: usize = 3;

const COLUMNS: &str =
    "id, session_id, title, mode, created_at, updated_at, is_deleted, is_public, share_token";

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    session_id: String,
    title: String,
    mode: String,
    created_at: i64,
    updated_at: i64,
    is_deleted: bool,
    is_public: bool,
    share_token: Option<String>,
}

impl From<ConversationRow> for Conversation {
    fn from(r: ConversationRow) -> Self {
        Conversation {
            id: r.id,
            session_id: r.session_id,
            title: r.title,
            // CHECK constraint keeps this to the two known values
            mode: r.mode.parse().unwrap_or_default(),
            created_at: r.created_at,
            updated_at: r.updated_at,
            is_deleted: r.is_deleted,
            is_public: r.is_public,
            share_token: r.share_token,
        }
    }
}

/// Random share token: 12 chars of lowercase letters and digits
pub fn generate_share_token() -> String {
    let mut rng = rand::rng();
    (0..SHARE_TOKEN_LEN)
        .map(|_| SHARE_TOKEN_ALPHABET[rng.random_range(0..SHARE_TOKEN_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
    events: EventHub,
}

impl ConversationStore {
    pub fn new(pool: SqlitePool, events: EventHub) -> Self {
        Self { pool, events }
    }

    /// Non-deleted conversations of a session, most recently updated first
    pub async fn list(&self, session_id: &str) -> StoreResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE session_id = ? AND is_deleted = 0
             ORDER BY updated_at DESC, rowid DESC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    /// `None` for both absent and soft-deleted conversations
    pub async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Conversation::from))
    }

    /// Like [`get`](Self::get), but other sessions' conversations are not found
    pub async fn get_owned(&self, id: &str, session_id: &str) -> StoreResult<Conversation> {
        match self.get(id).await? {
            Some(conversation) if conversation.session_id == session_id => Ok(conversation),
            _ => Err(StoreError::NotFound),
        }
    }

    pub async fn create(&self, session_id: &str, mode: Mode) -> StoreResult<Conversation> {
        let now = now_millis();
        let conversation = Conversation {
            id: new_id(),
            session_id: session_id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            mode,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            is_public: false,
            share_token: None,
        };

        sqlx::query(
            "INSERT INTO conversations (id, session_id, title, mode, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.session_id)
        .bind(&conversation.title)
        .bind(conversation.mode.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!("Created conversation {} ({})", conversation.id, mode);
        Ok(conversation)
    }

    pub async fn update_title(&self, id: &str, title: &str) -> StoreResult<Conversation> {
        let result = sqlx::query(
            "UPDATE conversations SET title = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(title)
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.after_update(id, result.rows_affected()).await
    }

    pub async fn update_mode(&self, id: &str, mode: Mode) -> StoreResult<Conversation> {
        let result = sqlx::query(
            "UPDATE conversations SET mode = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(mode.as_str())
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.after_update(id, result.rows_affected()).await
    }

    /// Bump `updated_at` without changing anything else
    pub async fn touch(&self, id: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ? AND is_deleted = 0")
                .bind(now_millis())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Soft delete. Messages and usage are left in place.
    pub async fn soft_delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        info!("Soft-deleted conversation {}", id);
        self.events.publish(ChangeEvent::ConversationDeleted {
            conversation_id: id.to_string(),
        });
        Ok(())
    }

    /// Flip the public flag. Returns the new token when sharing was
    /// enabled, `None` when it was disabled. Each write only applies to the
    /// state that was read; if another toggle got there first, the current
    /// state is returned instead.
    pub async fn toggle_share(&self, id: &str) -> StoreResult<Option<String>> {
        let conversation = self.get(id).await?.ok_or(StoreError::NotFound)?;

        if conversation.is_public {
            let result = sqlx::query(
                "UPDATE conversations SET is_public = 0, share_token = NULL
                 WHERE id = ? AND is_deleted = 0 AND is_public = 1",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return self.current_share_token(id).await;
            }

            info!("Sharing disabled for conversation {}", id);
            self.publish_current(id).await?;
            return Ok(None);
        }

        for attempt in 1..=SHARE_TOKEN_ATTEMPTS {
            let token = generate_share_token();
            let result = sqlx::query(
                "UPDATE conversations SET is_public = 1, share_token = ?
                 WHERE id = ? AND is_deleted = 0 AND is_public = 0",
            )
            .bind(&token)
            .bind(id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => return self.current_share_token(id).await,
                Ok(_) => {
                    info!("Sharing enabled for conversation {}", id);
                    self.publish_current(id).await?;
                    return Ok(Some(token));
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    warn!("Share token collision (attempt {})", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::ShareTokenExhausted)
    }

    /// Public, non-deleted conversation for a share token
    pub async fn get_by_share_token(&self, token: &str) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE share_token = ? AND is_public = 1 AND is_deleted = 0"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            debug!("No shared conversation for token");
        }
        Ok(row.map(Conversation::from))
    }

    async fn current_share_token(&self, id: &str) -> StoreResult<Option<String>> {
        let conversation = self.get(id).await?.ok_or(StoreError::NotFound)?;
        debug!("Share state of {} changed concurrently", id);
        Ok(conversation.share_token.filter(|_| conversation.is_public))
    }

    async fn after_update(&self, id: &str, rows_affected: u64) -> StoreResult<Conversation> {
        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.publish_current(id).await
    }

    async fn publish_current(&self, id: &str) -> StoreResult<Conversation> {
        let conversation = self.get(id).await?.ok_or(StoreError::NotFound)?;
        self.events.publish(ChangeEvent::ConversationUpdated {
            conversation: conversation.clone(),
        });
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_tokens_use_the_fixed_alphabet() {
        for _ in 0..100 {
            let token = generate_share_token();
            assert_eq!(token.len(), 12);
            assert!(token.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        }
    }
}
