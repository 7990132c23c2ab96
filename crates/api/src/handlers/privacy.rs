//! Handlers for data deletion requests.
//!
//! Users file and withdraw their own requests under `/privacy`; admins
//! review them under `/admin/deletion-requests`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use empathy_core::audit::action_types;
use empathy_core::deletion::{
    decision_status, validate_status, validate_transition, STATUS_CANCELLED, STATUS_COMPLETED,
    STATUS_PENDING,
};
use empathy_core::error::CoreError;
use empathy_core::types::DbId;
use empathy_db::models::deletion_request::{DeletionRequest, ErasureSummary};
use empathy_db::repositories::DeletionRequestRepo;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateDeletionRequest {
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListDeletionRequestsParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessDeletionRequest {
    pub decision: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessedDeletionRequest {
    pub request: DeletionRequest,
    /// Present when the request was approved.
    pub erasure: Option<ErasureSummary>,
}

// ---------------------------------------------------------------------------
// User endpoints
// ---------------------------------------------------------------------------

/// POST /api/v1/privacy/deletion-requests
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<CreateDeletionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<DeletionRequest>>)> {
    let existing = DeletionRequestRepo::list_for_user(&state.pool, user.user_id).await?;
    if existing.iter().any(|r| r.status == STATUS_PENDING) {
        return Err(CoreError::Conflict("A pending deletion request already exists".into()).into());
    }

    let reason = input
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    // The partial unique index still guards against a concurrent insert.
    let request = DeletionRequestRepo::create(&state.pool, user.user_id, reason).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::DELETION_REQUESTED)
                .actor(user.user_id)
                .entity("deletion_request", request.id)
                .meta(&meta),
        )
        .await;

    tracing::info!(user_id = user.user_id, request_id = request.id, "Deletion request filed");
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/privacy/deletion-requests
pub async fn list_my_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<DeletionRequest>>>> {
    let requests = DeletionRequestRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// DELETE /api/v1/privacy/deletion-requests/{id}
///
/// Withdraw the caller's own pending request.
pub async fn cancel_request(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DeletionRequest>>> {
    let current = match DeletionRequestRepo::find_by_id(&state.pool, id).await? {
        Some(r) if r.user_id == user.user_id => r,
        _ => return Err(not_found(id).into()),
    };
    validate_transition(&current.status, STATUS_CANCELLED).map_err(CoreError::Conflict)?;

    let request = DeletionRequestRepo::cancel(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| CoreError::Conflict("Deletion request is no longer pending".into()))?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::DELETION_CANCELLED)
                .actor(user.user_id)
                .entity("deletion_request", id)
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// Admin endpoints
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/deletion-requests?status
pub async fn list_requests(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ListDeletionRequestsParams>,
) -> AppResult<Json<DataResponse<Vec<DeletionRequest>>>> {
    if let Some(status) = params.status.as_deref() {
        validate_status(status).map_err(CoreError::Validation)?;
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let requests =
        DeletionRequestRepo::list(&state.pool, params.status.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// POST /api/v1/admin/deletion-requests/{id}/process
///
/// `approve` erases the user's data in one transaction. `reject` needs notes.
pub async fn process_request(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<ProcessDeletionRequest>,
) -> AppResult<Json<DataResponse<ProcessedDeletionRequest>>> {
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let target_status =
        decision_status(&input.decision, notes).map_err(CoreError::Validation)?;

    let current = DeletionRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    validate_transition(&current.status, target_status).map_err(CoreError::Conflict)?;

    let no_longer_pending = || CoreError::Conflict("Deletion request is no longer pending".into());

    let processed = if target_status == STATUS_COMPLETED {
        let (request, erasure) =
            DeletionRequestRepo::approve_and_erase(&state.pool, id, admin.user_id, notes)
                .await?
                .ok_or_else(no_longer_pending)?;

        tracing::warn!(
            request_id = id,
            subject_user_id = request.user_id,
            processed_by = admin.user_id,
            conversations = erasure.conversations_deleted,
            goals = erasure.goals_deleted,
            "User data erased",
        );
        state
            .audit
            .record(
                AuditEvent::new(action_types::DELETION_COMPLETED)
                    .actor(admin.user_id)
                    .entity("deletion_request", id)
                    .details(json!({ "subject_user_id": request.user_id, "erasure": erasure }))
                    .meta(&meta),
            )
            .await;

        ProcessedDeletionRequest {
            request,
            erasure: Some(erasure),
        }
    } else {
        let notes = notes.unwrap_or_default();
        let request = DeletionRequestRepo::reject(&state.pool, id, admin.user_id, notes)
            .await?
            .ok_or_else(no_longer_pending)?;

        state
            .audit
            .record(
                AuditEvent::new(action_types::DELETION_REJECTED)
                    .actor(admin.user_id)
                    .entity("deletion_request", id)
                    .details(json!({ "subject_user_id": request.user_id }))
                    .meta(&meta),
            )
            .await;

        ProcessedDeletionRequest {
            request,
            erasure: None,
        }
    };

    Ok(Json(DataResponse { data: processed }))
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "DeletionRequest",
        id,
    }
}
