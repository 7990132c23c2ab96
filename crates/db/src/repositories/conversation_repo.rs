//! Repository for the `conversations` table.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible to every
//! query here.

use empathy_core::types::DbId;
use sqlx::PgPool;

use crate::models::conversation::{Conversation, CreateConversation, UpdateConversation};

const COLUMNS: &str = "id, user_id, title, is_archived, deleted_at, created_at, updated_at";

pub struct ConversationRepo;

impl ConversationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateConversation,
    ) -> Result<Conversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversations (user_id, title)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(input.user_id)
            .bind(&input.title)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Conversation>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM conversations WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's conversations, most recently active first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        include_archived: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE user_id = $1 AND deleted_at IS NULL AND ($2 OR is_archived = false)
             ORDER BY updated_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user_id)
            .bind(include_archived)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateConversation,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "UPDATE conversations SET
                title = COALESCE($2, title),
                is_archived = COALESCE($3, is_archived)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.is_archived)
            .fetch_optional(pool)
            .await
    }

    /// Bump `updated_at` so the conversation sorts as recently active.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Soft delete. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversations SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
