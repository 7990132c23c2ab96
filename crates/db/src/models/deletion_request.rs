//! Data deletion request model.

use empathy_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `deletion_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeletionRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub status: String,
    pub reason: Option<String>,
    pub processed_by: Option<DbId>,
    pub processed_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Row counts removed by an approved erasure.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ErasureSummary {
    pub conversations_deleted: u64,
    pub goals_deleted: u64,
    pub analytics_events_deleted: u64,
    pub sessions_revoked: u64,
}
