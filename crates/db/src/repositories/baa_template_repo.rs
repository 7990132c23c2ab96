//! Repository for the `baa_templates` table.

use empathy_core::types::DbId;
use sqlx::PgPool;

use crate::models::baa_template::{BaaTemplate, CreateBaaTemplate, UpdateBaaTemplate};

const COLUMNS: &str = "id, name, description, body, required_variables, version, is_active, \
                       created_by, created_at, updated_at";

pub struct BaaTemplateRepo;

impl BaaTemplateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateBaaTemplate,
    ) -> Result<BaaTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO baa_templates (name, description, body, required_variables, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BaaTemplate>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.body)
            .bind(&input.required_variables)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BaaTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM baa_templates WHERE id = $1");
        sqlx::query_as::<_, BaaTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<BaaTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM baa_templates ORDER BY name ASC");
        sqlx::query_as::<_, BaaTemplate>(&query)
            .fetch_all(pool)
            .await
    }

    /// Apply a patch. The version increments only when the body actually
    /// changes.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBaaTemplate,
    ) -> Result<Option<BaaTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE baa_templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                body = COALESCE($4, body),
                required_variables = COALESCE($5, required_variables),
                is_active = COALESCE($6, is_active),
                version = CASE
                    WHEN $4::text IS NOT NULL AND $4::text <> body THEN version + 1
                    ELSE version
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BaaTemplate>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.body)
            .bind(&input.required_variables)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Hard delete. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM baa_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
