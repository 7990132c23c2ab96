//! Repository for the `messages` table.

use empathy_core::types::DbId;
use sqlx::PgPool;

use crate::models::conversation::{CreateMessage, Message};

const COLUMNS: &str = "id, conversation_id, role, content, created_at, updated_at";

pub struct MessageRepo;

impl MessageRepo {
    pub async fn create(pool: &PgPool, input: &CreateMessage) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages (conversation_id, role, content)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.conversation_id)
            .bind(&input.role)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    /// All messages of a conversation, oldest first.
    pub async fn list_for_conversation(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_all(pool)
            .await
    }

    /// The `limit` most recent messages, returned oldest first.
    pub async fn recent(
        pool: &PgPool,
        conversation_id: DbId,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM (
                SELECT {COLUMNS} FROM messages
                WHERE conversation_id = $1
                ORDER BY id DESC
                LIMIT $2
             ) recent ORDER BY id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
