//! Handlers for audit log review and retention.
//!
//! All endpoints require the admin role.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use empathy_core::audit::{
    action_types, canonical_entry, outcomes, verify_chain, ChainRow, ALL_CATEGORIES,
};
use empathy_core::error::CoreError;
use empathy_db::models::audit::{
    AuditLog, AuditLogPage, AuditQuery, AuditRetentionPolicy, IntegrityCheckResult,
    UpdateRetentionPolicy,
};
use empathy_db::repositories::{AuditLogRepo, AuditRetentionPolicyRepo};
use serde::Deserialize;
use serde_json::json;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::{parse_timestamp_param, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub user_id: Option<i64>,
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub outcome: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search_text: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// GET /admin/audit-logs
pub async fn query_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AuditLogQueryParams>,
) -> AppResult<Json<DataResponse<AuditLogPage>>> {
    let from = parse_timestamp_param("from", params.from.as_deref())?;
    let to = parse_timestamp_param("to", params.to.as_deref())?;
    if let Some(outcome) = params.outcome.as_deref() {
        if ![outcomes::SUCCESS, outcomes::FAILURE, outcomes::DENIED].contains(&outcome) {
            return Err(AppError::BadRequest(format!(
                "Invalid outcome '{outcome}'. Must be one of: success, failure, denied"
            )));
        }
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let query = AuditQuery {
        user_id: params.user_id,
        action_type: params.action_type,
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        outcome: params.outcome,
        from,
        to,
        search_text: params.search_text.filter(|s| !s.trim().is_empty()),
        limit,
        offset,
    };

    let items = AuditLogRepo::query(&state.pool, &query).await?;
    let total = AuditLogRepo::count(&state.pool, &query).await?;

    Ok(Json(DataResponse {
        data: AuditLogPage { items, total },
    }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

const CSV_HEADER: &str = "id,timestamp,user_id,action_type,entity_type,entity_id,outcome,\
ip_address,user_agent,request_id,details_json,integrity_hash\n";

/// GET /admin/audit-logs/export?format=csv|json&from=X&to=Y
///
/// Without `from`/`to` the whole retained log is exported.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let format = params.format.as_deref().unwrap_or("json");
    if format != "csv" && format != "json" {
        return Err(AppError::BadRequest(format!(
            "Invalid export format '{format}'. Must be 'csv' or 'json'"
        )));
    }
    let from = parse_timestamp_param("from", params.from.as_deref())?;
    let to = parse_timestamp_param("to", params.to.as_deref())?;

    let logs = AuditLogRepo::export_range(&state.pool, from, to).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::CONFIG_CHANGE)
                .actor(admin.user_id)
                .entity_type("audit_log_export")
                .details(json!({ "format": format, "rows": logs.len(), "from": from, "to": to }))
                .meta(&meta),
        )
        .await;

    if format == "csv" {
        let body = render_csv(&logs);
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"audit-logs.csv\"",
                ),
            ],
            body,
        )
            .into_response());
    }

    Ok(Json(DataResponse { data: logs }).into_response())
}

fn render_csv(logs: &[AuditLog]) -> String {
    let mut out = String::from(CSV_HEADER);
    for log in logs {
        let details = log
            .details_json
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        let fields = [
            log.id.to_string(),
            log.timestamp.to_rfc3339(),
            log.user_id.map(|id| id.to_string()).unwrap_or_default(),
            log.action_type.clone(),
            log.entity_type.clone().unwrap_or_default(),
            log.entity_id.map(|id| id.to_string()).unwrap_or_default(),
            log.outcome.clone(),
            log.ip_address.clone().unwrap_or_default(),
            log.user_agent.clone().unwrap_or_default(),
            log.request_id.clone().unwrap_or_default(),
            details,
            log.integrity_hash.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Quote a CSV field, doubling embedded quotes.
///
/// Values that a spreadsheet would evaluate as a formula get a leading `'`.
pub fn csv_field(value: &str) -> String {
    let neutralized = if value.starts_with(['=', '+', '-', '@']) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    format!("\"{}\"", neutralized.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Integrity check
// ---------------------------------------------------------------------------

/// GET /admin/audit-logs/integrity-check
///
/// Walk the retained chain from its oldest row. Id gaps left by category
/// retention are tolerated; adjacent rows must still link.
pub async fn check_integrity(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<IntegrityCheckResult>>> {
    let entries = AuditLogRepo::fetch_for_integrity_check(&state.pool).await?;
    let result = verify_entries(&entries);

    if !result.chain_valid {
        tracing::error!(
            first_break = ?result.first_break,
            verified = result.verified_entries,
            requested_by = admin.user_id,
            "Audit log hash chain is broken",
        );
    }

    Ok(Json(DataResponse { data: result }))
}

pub fn verify_entries(entries: &[AuditLog]) -> IntegrityCheckResult {
    let verification = verify_chain(entries.iter().map(|e| ChainRow {
        id: e.id,
        entry_data: canonical_entry(&e.chain_fields()),
        prev_hash: e.prev_hash.as_deref(),
        integrity_hash: e.integrity_hash.as_deref(),
    }));
    IntegrityCheckResult {
        verified_entries: verification.verified_entries,
        chain_valid: verification.first_break.is_none(),
        first_break: verification.first_break,
    }
}

// ---------------------------------------------------------------------------
// Retention policies
// ---------------------------------------------------------------------------

/// GET /admin/audit-logs/retention
pub async fn list_retention_policies(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<AuditRetentionPolicy>>>> {
    let policies = AuditRetentionPolicyRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: policies }))
}

/// PUT /admin/audit-logs/retention/{category}
pub async fn update_retention_policy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(category): Path<String>,
    ValidatedJson(input): ValidatedJson<RetentionUpdateRequest>,
) -> AppResult<Json<DataResponse<AuditRetentionPolicy>>> {
    if !ALL_CATEGORIES.contains(&category.as_str()) {
        return Err(AppError::NotFound(format!(
            "Retention policy for category '{category}' not found"
        )));
    }

    for (field, days) in [
        ("active_retention_days", input.active_retention_days),
        ("archive_retention_days", input.archive_retention_days),
    ] {
        if days.is_some_and(|d| d <= 0) {
            return Err(CoreError::Validation(format!("{field}: must be positive")).into());
        }
    }

    let current = AuditRetentionPolicyRepo::find_by_category(&state.pool, &category)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Retention policy for category '{category}' not found"))
        })?;
    let active = input.active_retention_days.unwrap_or(current.active_retention_days);
    let archive = input.archive_retention_days.unwrap_or(current.archive_retention_days);
    if archive < active {
        return Err(CoreError::Validation(
            "archive_retention_days: must not be shorter than active_retention_days".into(),
        )
        .into());
    }

    let update = UpdateRetentionPolicy {
        active_retention_days: input.active_retention_days,
        archive_retention_days: input.archive_retention_days,
        enabled: input.enabled,
    };
    let policy = AuditRetentionPolicyRepo::update(&state.pool, &category, &update)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Retention policy for category '{category}' not found"))
        })?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::CONFIG_CHANGE)
                .actor(admin.user_id)
                .entity("audit_retention_policy", policy.id)
                .details(json!({
                    "category": category,
                    "active_retention_days": policy.active_retention_days,
                    "archive_retention_days": policy.archive_retention_days,
                    "enabled": policy.enabled,
                }))
                .meta(&meta),
        )
        .await;

    tracing::info!(category = %category, user_id = admin.user_id, "Audit retention policy updated");

    Ok(Json(DataResponse { data: policy }))
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct RetentionUpdateRequest {
    pub active_retention_days: Option<i32>,
    pub archive_retention_days: Option<i32>,
    pub enabled: Option<bool>,
}
