//! BAA template model and DTOs.

use empathy_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `baa_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BaaTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub body: String,
    pub required_variables: Vec<String>,
    pub version: i32,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateBaaTemplate {
    pub name: String,
    pub description: Option<String>,
    pub body: String,
    pub required_variables: Vec<String>,
    pub created_by: DbId,
}

/// Patch for a template. When `body` is set, `required_variables` must be
/// set too and the version is bumped.
#[derive(Debug, Default)]
pub struct UpdateBaaTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub required_variables: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
