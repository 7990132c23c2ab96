//! Repository for the `goals` table.

use empathy_core::types::DbId;
use sqlx::PgPool;

use crate::models::goal::{CreateGoal, Goal, UpdateGoal};

const COLUMNS: &str = "id, user_id, created_by, title, description, category, status, \
                       progress, target_date, completed_at, created_at, updated_at";

pub struct GoalRepo;

impl GoalRepo {
    pub async fn create(pool: &PgPool, input: &CreateGoal) -> Result<Goal, sqlx::Error> {
        let query = format!(
            "INSERT INTO goals (user_id, created_by, title, description, category, progress, target_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Goal>(&query)
            .bind(input.user_id)
            .bind(input.created_by)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.progress)
            .bind(input.target_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Goal>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM goals WHERE id = $1");
        sqlx::query_as::<_, Goal>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's goals, optionally filtered by status, newest first.
    /// A user's goals, newest first. `created_by` narrows to goals one
    /// clinician assigned; the filter applies before pagination.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<&str>,
        created_by: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Goal>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM goals
             WHERE user_id = $1
               AND ($2::text IS NULL OR status = $2)
               AND ($3::bigint IS NULL OR created_by = $3)
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Goal>(&query)
            .bind(user_id)
            .bind(status)
            .bind(created_by)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGoal,
    ) -> Result<Option<Goal>, sqlx::Error> {
        let query = format!(
            "UPDATE goals SET
                title = $2,
                description = $3,
                category = $4,
                status = $5,
                progress = $6,
                target_date = $7,
                completed_at = $8
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Goal>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.status)
            .bind(input.progress)
            .bind(input.target_date)
            .bind(input.completed_at)
            .fetch_optional(pool)
            .await
    }

    /// Hard delete. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
