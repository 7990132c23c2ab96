//! Therapy goal model and DTOs.

use chrono::NaiveDate;
use empathy_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `goals` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Goal {
    pub id: DbId,
    pub user_id: DbId,
    pub created_by: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub progress: i32,
    pub target_date: Option<NaiveDate>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateGoal {
    pub user_id: DbId,
    pub created_by: DbId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub progress: i32,
    pub target_date: Option<NaiveDate>,
}

/// Full replacement of the mutable goal fields, resolved by the handler
/// after status-transition checks.
#[derive(Debug)]
pub struct UpdateGoal {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub progress: i32,
    pub target_date: Option<NaiveDate>,
    pub completed_at: Option<Timestamp>,
}
