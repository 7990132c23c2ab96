//! Audit log entity models and DTOs.
//!
//! Models for the append-only audit trail, retention policies, and integrity
//! verification. Audit logs have no `updated_at` field (immutable records).

use empathy_core::audit::ChainFields;
use empathy_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Audit log entity
// ---------------------------------------------------------------------------

/// A single audit log entry. Immutable once created (no updated_at).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub timestamp: Timestamp,
    pub user_id: Option<DbId>,
    pub action_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub outcome: String,
    pub details_json: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    #[serde(skip_serializing)]
    pub prev_hash: Option<String>,
    pub integrity_hash: Option<String>,
    pub created_at: Timestamp,
}

impl AuditLog {
    /// The fields covered by the integrity hash.
    pub fn chain_fields(&self) -> ChainFields<'_> {
        ChainFields {
            timestamp: self.timestamp,
            user_id: self.user_id,
            action_type: &self.action_type,
            entity_type: self.entity_type.as_deref(),
            entity_id: self.entity_id,
            outcome: &self.outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for appending a new audit log entry. `details_json` must already be
/// redacted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateAuditLog {
    pub user_id: Option<DbId>,
    pub action_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub outcome: String,
    pub details_json: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter parameters for querying audit logs.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_id: Option<DbId>,
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub outcome: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub search_text: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Retention policy entity
// ---------------------------------------------------------------------------

/// A retention policy for a specific log category.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditRetentionPolicy {
    pub id: DbId,
    pub log_category: String,
    pub active_retention_days: i32,
    pub archive_retention_days: i32,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for updating a retention policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRetentionPolicy {
    pub active_retention_days: Option<i32>,
    pub archive_retention_days: Option<i32>,
    pub enabled: Option<bool>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Paginated response for audit log queries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditLog>,
    pub total: i64,
}

/// Result of an audit log integrity verification.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityCheckResult {
    /// Number of entries verified.
    pub verified_entries: i64,
    /// Whether the entire chain is valid.
    pub chain_valid: bool,
    /// ID of the first entry where the chain breaks, if any.
    pub first_break: Option<DbId>,
}
