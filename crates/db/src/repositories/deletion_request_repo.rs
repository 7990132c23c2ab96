//! Repository for the `deletion_requests` table and the erasure it triggers.

use empathy_core::deletion;
use empathy_core::types::DbId;
use sqlx::PgPool;

use crate::models::deletion_request::{DeletionRequest, ErasureSummary};

const COLUMNS: &str = "id, user_id, status, reason, processed_by, processed_at, notes, \
                       created_at, updated_at";

pub struct DeletionRequestRepo;

impl DeletionRequestRepo {
    /// Open a pending request. A second pending request for the same user
    /// violates `uq_deletion_requests_pending_user`.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        reason: Option<&str>,
    ) -> Result<DeletionRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO deletion_requests (user_id, reason)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(user_id)
            .bind(reason)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DeletionRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM deletion_requests WHERE id = $1");
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<DeletionRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM deletion_requests WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Admin listing, optionally filtered by status, oldest first so the
    /// queue is worked in order.
    pub async fn list(
        pool: &PgPool,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DeletionRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM deletion_requests
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel the caller's own pending request. Returns `None` when no
    /// pending request with that id belongs to `user_id`.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<DeletionRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE deletion_requests SET status = $3, processed_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(id)
            .bind(user_id)
            .bind(deletion::STATUS_CANCELLED)
            .bind(deletion::STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Reject a pending request. Returns `None` if it is no longer pending.
    pub async fn reject(
        pool: &PgPool,
        id: DbId,
        admin_id: DbId,
        notes: &str,
    ) -> Result<Option<DeletionRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE deletion_requests
             SET status = $4, processed_by = $2, processed_at = NOW(), notes = $3
             WHERE id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(id)
            .bind(admin_id)
            .bind(notes)
            .bind(deletion::STATUS_REJECTED)
            .bind(deletion::STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Approve a pending request and erase the requester's data.
    ///
    /// In one transaction: lock the request row, delete conversations
    /// (messages cascade), goals and analytics events, revoke sessions,
    /// anonymize and deactivate the user, and mark the request completed.
    /// Returns `None` if the request is missing or no longer pending.
    pub async fn approve_and_erase(
        pool: &PgPool,
        id: DbId,
        admin_id: DbId,
        notes: Option<&str>,
    ) -> Result<Option<(DeletionRequest, ErasureSummary)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM deletion_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(request) = request.filter(|r| r.status == deletion::STATUS_PENDING) else {
            return Ok(None);
        };
        let user_id = request.user_id;

        let conversations_deleted = sqlx::query("DELETE FROM conversations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let goals_deleted = sqlx::query("DELETE FROM goals WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let analytics_events_deleted =
            sqlx::query("DELETE FROM analytics_events WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let sessions_revoked = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "UPDATE users SET
                username = $2,
                email = $3,
                password_hash = $4,
                is_active = false,
                failed_login_count = 0,
                locked_until = NULL
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(deletion::anonymized_username(user_id))
        .bind(deletion::anonymized_email(user_id))
        .bind(deletion::ERASED_PASSWORD_HASH)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE deletion_requests
             SET status = $4, processed_by = $2, processed_at = NOW(), notes = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let completed = sqlx::query_as::<_, DeletionRequest>(&query)
            .bind(id)
            .bind(admin_id)
            .bind(notes)
            .bind(deletion::STATUS_COMPLETED)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = id,
            user_id,
            conversations_deleted,
            goals_deleted,
            analytics_events_deleted,
            "User data erased"
        );

        Ok(Some((
            completed,
            ErasureSummary {
                conversations_deleted,
                goals_deleted,
                analytics_events_deleted,
                sessions_revoked,
            },
        )))
    }
}
